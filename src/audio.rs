use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::AudioConfig;
use crate::exercise::{ExerciseKind, FEEDBACK_GOOD_FORM};

/// 同一メッセージの既定抑制間隔
pub const DEFAULT_MIN_MESSAGE_INTERVAL: Duration = Duration::from_millis(2500);

/// ワーカーがスロットを見るポーリング周期
const WORKER_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// 外部音声合成エンジンの境界
///
/// 実装は発話完了までブロックしてよい（ワーカースレッドからしか呼ばれない）。
pub trait SpeechSink: Send + Sync {
    fn say(&self, text: &str) -> Result<()>;
}

/// TTSが使えない環境向けのコンソール出力フォールバック
pub struct ConsoleSink;

impl SpeechSink for ConsoleSink {
    fn say(&self, text: &str) -> Result<()> {
        eprintln!("[tts] {}", text);
        Ok(())
    }
}

/// 直前と同一のメッセージを一定時間抑制するスロットラー
///
/// priority 指定は抑制を素通りする。判定時刻を引数で受けるのはテスト用。
pub struct NotificationThrottle {
    last_message: String,
    last_time: Option<Instant>,
    min_interval: Duration,
}

impl NotificationThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_message: String::new(),
            last_time: None,
            min_interval,
        }
    }

    /// message を now 時点で発話してよいか。許可時は内部状態を更新する
    pub fn allow(&mut self, message: &str, priority: bool, now: Instant) -> bool {
        if !priority {
            if let Some(last) = self.last_time {
                if message == self.last_message
                    && now.duration_since(last) < self.min_interval
                {
                    return false;
                }
            }
        }
        self.last_message = message.to_string();
        self.last_time = Some(now);
        true
    }
}

/// レップ数アナウンスの文言。1回目は特別扱い、5回までは毎回、
/// 以降は5の倍数のみ。それ以外は無言
fn rep_count_message(count: u32) -> Option<String> {
    if count == 1 {
        Some("First repetition!".to_string())
    } else if count <= 5 {
        Some(format!("{} repetitions!", count))
    } else if count % 5 == 0 {
        Some(format!("Great! {} repetitions!", count))
    } else {
        None
    }
}

/// 音声フィードバックのディスパッチャ
///
/// 発話はフレーム処理パスから外す: speak はスロットにメッセージを置くだけで
/// 決してブロックしない。ワーカースレッドがスロットを取り出してシンクへ流す。
/// 未発話のメッセージは新しいもので置き換わる（同時発話は常に1件以下）。
/// シンクのエラーはログに落として握りつぶす（フレームループへは波及させない）。
pub struct AudioFeedback {
    throttle: NotificationThrottle,
    pending: Arc<Mutex<Option<String>>>,
    running: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
}

impl AudioFeedback {
    pub fn new(sink: Arc<dyn SpeechSink>) -> Self {
        Self::with_interval(sink, DEFAULT_MIN_MESSAGE_INTERVAL)
    }

    pub fn from_config(config: &AudioConfig, sink: Arc<dyn SpeechSink>) -> Self {
        Self::with_interval(
            sink,
            Duration::from_secs_f32(config.min_message_interval.max(0.0)),
        )
    }

    pub fn with_interval(sink: Arc<dyn SpeechSink>, min_interval: Duration) -> Self {
        let pending: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
        let running = Arc::new(AtomicBool::new(true));

        let worker_pending = Arc::clone(&pending);
        let worker_running = Arc::clone(&running);
        let worker = thread::spawn(move || {
            while worker_running.load(Ordering::Relaxed) {
                let message = worker_pending.lock().unwrap().take();
                match message {
                    Some(text) => {
                        if let Err(e) = sink.say(&text) {
                            eprintln!("[audio] speech sink error: {e:#}");
                        }
                    }
                    None => thread::sleep(WORKER_POLL_INTERVAL),
                }
            }
        });

        Self {
            throttle: NotificationThrottle::new(min_interval),
            pending,
            running,
            worker: Some(worker),
        }
    }

    /// メッセージを発話キューに置く。抑制された場合は何もしない
    pub fn speak(&mut self, message: &str, priority: bool) {
        if message.is_empty() {
            return;
        }
        if !self.throttle.allow(message, priority, Instant::now()) {
            return;
        }
        eprintln!("[audio] {}", message);
        *self.pending.lock().unwrap() = Some(message.to_string());
    }

    /// レップ数のアナウンス（常に priority）
    pub fn announce_rep_count(&mut self, count: u32) {
        if let Some(message) = rep_count_message(count) {
            self.speak(&message, true);
        }
    }

    /// フォーム修正のフィードバック。肯定文と空文字は読み上げない
    pub fn provide_form_feedback(&mut self, feedback: &str) {
        if feedback.is_empty() || feedback == FEEDBACK_GOOD_FORM {
            return;
        }
        self.speak(feedback, false);
    }

    /// エクササイズ開始のアナウンス（常に priority）
    pub fn announce_exercise_start(&mut self, exercise: ExerciseKind) {
        let message = format!("Let's begin {}!", exercise.display_name());
        self.speak(&message, true);
    }

    /// ワーカーを停止する。未発話のメッセージは破棄される
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for AudioFeedback {
    fn drop(&mut self) {
        self.stop();
    }
}
