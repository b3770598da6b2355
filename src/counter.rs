use serde::Serialize;
use std::collections::VecDeque;

use crate::exercise::{EvaluationResult, ExerciseKind, Phase};

/// 位相履歴の既定容量
pub const DEFAULT_HISTORY_CAPACITY: usize = 5;

/// 1レップを構成する位相パターン長
const PATTERN_LEN: usize = 3;

/// 位相履歴1件。位相の切り替わり毎に1件（同一位相の連続フレームは
/// 1件にまとめ、correct はラン内のどれか1フレームが正しければ true）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseHistoryEntry {
    pub phase: Phase,
    pub correct: bool,
}

/// update 毎に返すカウンタ状態のスナップショット
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CounterStatus {
    pub count: u32,
    pub rep_completed: bool,
    pub current_phase: Option<Phase>,
    pub form_correct: bool,
}

/// セッション統計。フォーム正答率は現在の履歴窓のみで計算する
/// （直近のフォーム品質を見せる意図。生涯平均ではない）
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SessionStats {
    pub total_reps: u32,
    pub correct_form_percentage: f32,
    pub total_phases_tracked: usize,
}

/// 位相履歴からレップ完了を検出するカウンタ
///
/// 1セッション = 1インスタンス。複数セッションで共有しないこと。
/// エクササイズ切替時は次の update の前に reset() を呼ぶ。
pub struct RepetitionCounter {
    count: u32,
    last_phase: Option<Phase>,
    history: VecDeque<PhaseHistoryEntry>,
    history_capacity: usize,
    form_required: bool,
}

/// エクササイズ毎の1レップ位相パターン（履歴末尾と照合する）
pub fn rep_pattern(exercise: ExerciseKind) -> [Phase; PATTERN_LEN] {
    match exercise {
        ExerciseKind::Squat | ExerciseKind::Pushup => [Phase::Up, Phase::Down, Phase::Up],
        ExerciseKind::BicepCurl => [Phase::Down, Phase::Up, Phase::Down],
    }
}

impl RepetitionCounter {
    pub fn new() -> Self {
        Self {
            count: 0,
            last_phase: None,
            history: VecDeque::with_capacity(DEFAULT_HISTORY_CAPACITY),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            form_required: true,
        }
    }

    /// 履歴容量を変更する（パターン長未満には縮めない）
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity.max(PATTERN_LEN);
        self
    }

    /// 1フレーム分の評価結果を取り込み、レップ完了を検出する
    ///
    /// Unknown/Error 位相は履歴に積まず状態を変えない（フレーム落ちと同じ扱い）。
    /// 同一位相が続く間は履歴エントリを増やさないので、保持したままの姿勢で
    /// 同じ窓が再トリガーすることはない。
    pub fn update(&mut self, exercise: ExerciseKind, evaluation: &EvaluationResult) -> CounterStatus {
        let phase = evaluation.phase;
        if !phase.is_trackable() {
            return self.status();
        }

        match self.history.back_mut() {
            Some(entry) if entry.phase == phase => {
                // 位相継続中: ラン内に1フレームでも正しい姿勢があれば correct
                entry.correct |= evaluation.correct;
            }
            _ => {
                self.history.push_back(PhaseHistoryEntry {
                    phase,
                    correct: evaluation.correct,
                });
                while self.history.len() > self.history_capacity {
                    self.history.pop_front();
                }
                if self.check_completion(exercise) {
                    self.count += 1;
                    return CounterStatus {
                        count: self.count,
                        rep_completed: true,
                        current_phase: Some(phase),
                        form_correct: evaluation.correct,
                    };
                }
            }
        }

        self.last_phase = Some(phase);
        self.status()
    }

    /// 履歴末尾3件が対象パターンに一致し、かつフォーム条件を満たすか
    fn check_completion(&self, exercise: ExerciseKind) -> bool {
        if self.history.len() < PATTERN_LEN {
            return false;
        }
        let pattern = rep_pattern(exercise);
        let start = self.history.len() - PATTERN_LEN;
        let window = self.history.iter().skip(start);
        if !window.clone().map(|e| e.phase).eq(pattern.iter().copied()) {
            return false;
        }
        if self.form_required {
            // 窓内のどれか1件が正しければ成立（緩い OR 条件）
            self.history.iter().skip(start).any(|e| e.correct)
        } else {
            true
        }
    }

    fn status(&self) -> CounterStatus {
        CounterStatus {
            count: self.count,
            rep_completed: false,
            current_phase: self.last_phase,
            form_correct: false,
        }
    }

    /// カウント・履歴・直前位相をゼロに戻す。エクササイズ切替時と
    /// 明示リセット時に呼ぶ。form_required は変更しない
    pub fn reset(&mut self) {
        self.count = 0;
        self.last_phase = None;
        self.history.clear();
    }

    /// 次の update から反映される
    pub fn set_form_requirement(&mut self, required: bool) {
        self.form_required = required;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn statistics(&self) -> SessionStats {
        if self.history.is_empty() {
            return SessionStats {
                total_reps: self.count,
                correct_form_percentage: 0.0,
                total_phases_tracked: 0,
            };
        }
        let correct = self.history.iter().filter(|e| e.correct).count();
        let percentage = (correct as f32 / self.history.len() as f32) * 100.0;
        SessionStats {
            total_reps: self.count,
            correct_form_percentage: (percentage * 10.0).round() / 10.0,
            total_phases_tracked: self.history.len(),
        }
    }
}

impl Default for RepetitionCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(phase: Phase, correct: bool) -> EvaluationResult {
        EvaluationResult {
            correct,
            feedback: String::new(),
            phase,
            primary_angle: 0.0,
        }
    }

    fn feed(counter: &mut RepetitionCounter, exercise: ExerciseKind, phases: &[(Phase, bool)]) -> CounterStatus {
        let mut status = counter.update(exercise, &eval(phases[0].0, phases[0].1));
        for &(phase, correct) in &phases[1..] {
            status = counter.update(exercise, &eval(phase, correct));
        }
        status
    }

    #[test]
    fn test_squat_pattern_completes() {
        let mut counter = RepetitionCounter::new();
        let status = feed(
            &mut counter,
            ExerciseKind::Squat,
            &[(Phase::Up, true), (Phase::Down, true), (Phase::Up, true)],
        );
        assert_eq!(status.count, 1);
        assert!(status.rep_completed);
        assert!(status.form_correct);
        assert_eq!(status.current_phase, Some(Phase::Up));
    }

    #[test]
    fn test_incorrect_form_blocks_completion() {
        let mut counter = RepetitionCounter::new();
        let status = feed(
            &mut counter,
            ExerciseKind::Squat,
            &[(Phase::Up, false), (Phase::Down, false), (Phase::Up, false)],
        );
        assert_eq!(status.count, 0);
        assert!(!status.rep_completed);
    }

    #[test]
    fn test_form_not_required_allows_completion() {
        let mut counter = RepetitionCounter::new();
        counter.set_form_requirement(false);
        let status = feed(
            &mut counter,
            ExerciseKind::Squat,
            &[(Phase::Up, false), (Phase::Down, false), (Phase::Up, false)],
        );
        assert_eq!(status.count, 1);
        assert!(status.rep_completed);
        assert!(!status.form_correct);
    }

    #[test]
    fn test_single_correct_frame_suffices() {
        // 窓内に1フレームでも正しい姿勢があれば成立する（緩い OR）
        let mut counter = RepetitionCounter::new();
        let status = feed(
            &mut counter,
            ExerciseKind::Squat,
            &[(Phase::Up, false), (Phase::Down, true), (Phase::Up, false)],
        );
        assert_eq!(status.count, 1);
    }

    #[test]
    fn test_correct_frame_mid_run_counts() {
        // down 継続中の1フレームだけ正しい場合もラン全体が correct になる
        let mut counter = RepetitionCounter::new();
        let status = feed(
            &mut counter,
            ExerciseKind::Squat,
            &[
                (Phase::Up, false),
                (Phase::Down, false),
                (Phase::Down, true),
                (Phase::Down, false),
                (Phase::Up, false),
            ],
        );
        assert_eq!(status.count, 1);
    }

    #[test]
    fn test_curl_pattern_inverted() {
        let mut counter = RepetitionCounter::new();
        let status = feed(
            &mut counter,
            ExerciseKind::BicepCurl,
            &[(Phase::Down, true), (Phase::Up, true), (Phase::Down, true)],
        );
        assert_eq!(status.count, 1);

        // スクワットのパターンではカールは完了しない
        let mut counter = RepetitionCounter::new();
        let status = feed(
            &mut counter,
            ExerciseKind::BicepCurl,
            &[(Phase::Up, true), (Phase::Down, true), (Phase::Up, true)],
        );
        assert_eq!(status.count, 0);
    }

    #[test]
    fn test_unknown_phase_ignored() {
        let mut counter = RepetitionCounter::new();
        counter.update(ExerciseKind::Squat, &eval(Phase::Up, true));
        let before = counter.statistics();
        let status = counter.update(ExerciseKind::Squat, &eval(Phase::Unknown, false));
        // 履歴は変化せず、直前の位相がそのまま返る
        assert_eq!(counter.statistics(), before);
        assert_eq!(status.current_phase, Some(Phase::Up));
        assert!(!status.rep_completed);

        let status = counter.update(ExerciseKind::Squat, &eval(Phase::Error, false));
        assert_eq!(counter.statistics(), before);
        assert!(!status.rep_completed);
    }

    #[test]
    fn test_unknown_frames_do_not_break_cycle() {
        // 途中で検出が途切れてもサイクルは継続する
        let mut counter = RepetitionCounter::new();
        let status = feed(
            &mut counter,
            ExerciseKind::Squat,
            &[
                (Phase::Up, true),
                (Phase::Unknown, false),
                (Phase::Down, true),
                (Phase::Unknown, false),
                (Phase::Up, true),
            ],
        );
        assert_eq!(status.count, 1);
    }

    #[test]
    fn test_held_phase_does_not_retrigger() {
        let mut counter = RepetitionCounter::new();
        let status = feed(
            &mut counter,
            ExerciseKind::Squat,
            &[
                (Phase::Up, true),
                (Phase::Down, true),
                (Phase::Up, true),
                (Phase::Up, true),
                (Phase::Up, true),
            ],
        );
        // up を保持し続けても同じ窓で再カウントしない
        assert_eq!(status.count, 1);
        assert!(!status.rep_completed);
    }

    #[test]
    fn test_rapid_oscillation_counts_overlapping_windows() {
        // up/down/up/down/up の急激な往復は窓が重なって2回成立する
        let mut counter = RepetitionCounter::new();
        let status = feed(
            &mut counter,
            ExerciseKind::Squat,
            &[
                (Phase::Up, true),
                (Phase::Down, true),
                (Phase::Up, true),
                (Phase::Down, true),
                (Phase::Up, true),
            ],
        );
        assert_eq!(status.count, 2);
    }

    #[test]
    fn test_history_bounded() {
        let mut counter = RepetitionCounter::new().with_history_capacity(10);
        let phases = [Phase::Up, Phase::Down, Phase::Transition];
        for i in 0..20 {
            counter.update(ExerciseKind::Squat, &eval(phases[i % 3], false));
        }
        assert!(counter.statistics().total_phases_tracked <= 10);
    }

    #[test]
    fn test_history_bounded_default_capacity() {
        let mut counter = RepetitionCounter::new();
        let phases = [Phase::Up, Phase::Transition, Phase::Down, Phase::Transition];
        for i in 0..20 {
            counter.update(ExerciseKind::Squat, &eval(phases[i % 4], true));
        }
        assert!(counter.statistics().total_phases_tracked <= DEFAULT_HISTORY_CAPACITY);
    }

    #[test]
    fn test_reset_idempotent() {
        let mut counter = RepetitionCounter::new();
        feed(
            &mut counter,
            ExerciseKind::Squat,
            &[(Phase::Up, true), (Phase::Down, true), (Phase::Up, true)],
        );
        assert_eq!(counter.count(), 1);

        counter.reset();
        let once = counter.statistics();
        let status_once = counter.update(ExerciseKind::Squat, &eval(Phase::Unknown, false));
        counter.reset();
        counter.reset();
        let twice = counter.statistics();
        let status_twice = counter.update(ExerciseKind::Squat, &eval(Phase::Unknown, false));

        assert_eq!(once, twice);
        assert_eq!(status_once, status_twice);
        assert_eq!(once.total_reps, 0);
        assert_eq!(once.total_phases_tracked, 0);
        assert_eq!(status_once.current_phase, None);
    }

    #[test]
    fn test_reset_preserves_form_requirement() {
        let mut counter = RepetitionCounter::new();
        counter.set_form_requirement(false);
        counter.reset();
        let status = feed(
            &mut counter,
            ExerciseKind::Squat,
            &[(Phase::Up, false), (Phase::Down, false), (Phase::Up, false)],
        );
        assert_eq!(status.count, 1);
    }

    #[test]
    fn test_count_monotonic_between_resets() {
        let mut counter = RepetitionCounter::new();
        counter.set_form_requirement(false);
        let mut last_count = 0;
        let phases = [Phase::Up, Phase::Down];
        for i in 0..50 {
            let status = counter.update(ExerciseKind::Squat, &eval(phases[i % 2], false));
            assert!(status.count >= last_count);
            last_count = status.count;
        }
        assert!(last_count > 0);
    }

    #[test]
    fn test_statistics_over_current_window() {
        let mut counter = RepetitionCounter::new();
        counter.update(ExerciseKind::Squat, &eval(Phase::Up, true));
        counter.update(ExerciseKind::Squat, &eval(Phase::Down, false));
        let stats = counter.statistics();
        assert_eq!(stats.total_phases_tracked, 2);
        assert!((stats.correct_form_percentage - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_statistics_empty() {
        let counter = RepetitionCounter::new();
        let stats = counter.statistics();
        assert_eq!(stats.total_reps, 0);
        assert_eq!(stats.correct_form_percentage, 0.0);
        assert_eq!(stats.total_phases_tracked, 0);
    }

    #[test]
    fn test_statistics_rounded_to_one_decimal() {
        let mut counter = RepetitionCounter::new();
        counter.update(ExerciseKind::Squat, &eval(Phase::Up, true));
        counter.update(ExerciseKind::Squat, &eval(Phase::Down, false));
        counter.update(ExerciseKind::Squat, &eval(Phase::Transition, false));
        // 1/3 = 33.333...% → 33.3
        let stats = counter.statistics();
        assert!((stats.correct_form_percentage - 33.3).abs() < 1e-3);
    }
}
