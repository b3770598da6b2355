use std::sync::Arc;

use crate::audio::{AudioFeedback, ConsoleSink, SpeechSink};
use crate::config::Config;
use crate::counter::{CounterStatus, RepetitionCounter, SessionStats};
use crate::exercise::{EvaluationResult, ExerciseKind, FormEvaluator};
use crate::pose::LandmarkFrame;

/// 1フレーム分の処理結果（UI重畳用）
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub evaluation: EvaluationResult,
    pub status: CounterStatus,
}

/// 1トレーニングセッション
///
/// 評価器・カウンタ・音声を明示的に所有する。プロセス全域の共有状態は
/// 持たない。複数ユーザーを扱う場合はセッションを人数分作ること。
pub struct CoachSession {
    exercise: ExerciseKind,
    evaluator: FormEvaluator,
    counter: RepetitionCounter,
    audio: AudioFeedback,
}

impl CoachSession {
    /// コンソールフォールバックのシンクで作成
    pub fn new(config: &Config) -> Self {
        Self::with_sink(config, Arc::new(ConsoleSink))
    }

    pub fn with_sink(config: &Config, sink: Arc<dyn SpeechSink>) -> Self {
        let mut counter = RepetitionCounter::new();
        counter.set_form_requirement(config.form_required);
        Self {
            exercise: config.exercise,
            evaluator: FormEvaluator::from_config(&config.thresholds),
            counter,
            audio: AudioFeedback::from_config(&config.audio, sink),
        }
    }

    pub fn exercise(&self) -> ExerciseKind {
        self.exercise
    }

    /// セッション開始のアナウンス
    pub fn start(&mut self) {
        self.audio.announce_exercise_start(self.exercise);
    }

    /// フレーム処理の入口。評価 → カウント → 音声の順で一方向に流す
    ///
    /// 同期・非ブロッキング。キャプチャループから毎フレーム呼んでよい。
    pub fn process_frame(&mut self, frame: &LandmarkFrame) -> FrameReport {
        let evaluation = self.evaluator.evaluate(self.exercise, frame);
        let status = self.counter.update(self.exercise, &evaluation);

        if !evaluation.correct {
            self.audio.provide_form_feedback(&evaluation.feedback);
        }
        if status.rep_completed {
            self.audio.announce_rep_count(status.count);
        }

        FrameReport { evaluation, status }
    }

    /// エクササイズを切り替える。カウンタをリセットし開始をアナウンスする。
    /// 同一種別への切替は何もしない
    pub fn switch_exercise(&mut self, exercise: ExerciseKind) {
        if exercise == self.exercise {
            return;
        }
        self.exercise = exercise;
        self.counter.reset();
        self.audio.announce_exercise_start(exercise);
    }

    /// カウンタの明示リセット（ユーザー操作）
    pub fn reset(&mut self) {
        self.counter.reset();
    }

    pub fn set_form_requirement(&mut self, required: bool) {
        self.counter.set_form_requirement(required);
    }

    pub fn statistics(&self) -> SessionStats {
        self.counter.statistics()
    }

    /// 音声ワーカーを止める。以降のフレーム処理は無音で続行できる
    pub fn shutdown_audio(&mut self) {
        self.audio.stop();
    }
}
