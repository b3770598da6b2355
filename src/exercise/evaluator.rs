use crate::config::ThresholdConfig;
use crate::exercise::{EvaluationResult, ExerciseKind, Phase};
use crate::pose::{joint_angle, Joint, LandmarkFrame};

/// ルール違反なしのときの固定フィードバック
pub const FEEDBACK_GOOD_FORM: &str = "Good form!";

const FEEDBACK_NO_PERSON: &str = "No person detected";
const FEEDBACK_REPOSITION: &str = "Position yourself in front of the camera";
const FEEDBACK_MALFORMED: &str = "Could not evaluate the pose";
const FEEDBACK_SQUAT_DEPTH: &str = "Go deeper!";
const FEEDBACK_KNEE_ALIGN: &str = "Keep your knees aligned!";
const FEEDBACK_PUSHUP_DEPTH: &str = "Go lower!";
const FEEDBACK_ELBOW_ALIGN: &str = "Keep your elbows aligned!";
const FEEDBACK_CURL_FLEX: &str = "Bend your elbows more!";
const FEEDBACK_CURL_TUCK: &str = "Keep your elbows close to your body!";

/// down 位相で knee_min + この値を超えていたら「しゃがみが浅い」
const SQUAT_DEPTH_TOLERANCE: f32 = 20.0;

/// 評価を打ち切る理由
enum Abort {
    /// 必要なランドマークが欠けている
    Missing,
    /// 座標が非有限（上流の推定が壊れている）
    Malformed,
}

/// エクササイズ毎の角度ルールで1フレームを判定する評価器
///
/// フレーム間の状態を一切持たない。位相のスムージングはカウンタ側の責務。
pub struct FormEvaluator {
    thresholds: ThresholdConfig,
}

impl FormEvaluator {
    pub fn new() -> Self {
        Self {
            thresholds: ThresholdConfig::default(),
        }
    }

    pub fn from_config(thresholds: &ThresholdConfig) -> Self {
        Self {
            thresholds: thresholds.clone(),
        }
    }

    /// 1フレーム評価。決して呼び出し側にエラーを返さない
    /// （不足・不正入力はセンチネル位相の結果として表現する）
    pub fn evaluate(&self, exercise: ExerciseKind, frame: &LandmarkFrame) -> EvaluationResult {
        if frame.is_empty() {
            return EvaluationResult::unknown(FEEDBACK_NO_PERSON);
        }
        match exercise {
            ExerciseKind::Squat => self.evaluate_squat(frame),
            ExerciseKind::Pushup => self.evaluate_pushup(frame),
            ExerciseKind::BicepCurl => self.evaluate_bicep_curl(frame),
        }
    }

    fn evaluate_squat(&self, frame: &LandmarkFrame) -> EvaluationResult {
        let t = &self.thresholds.squat;
        let (left, right) = match bilateral_angles(
            frame,
            [Joint::LeftHip, Joint::LeftKnee, Joint::LeftAnkle],
            [Joint::RightHip, Joint::RightKnee, Joint::RightAnkle],
        ) {
            Ok(angles) => angles,
            Err(Abort::Missing) => return EvaluationResult::unknown(FEEDBACK_REPOSITION),
            Err(Abort::Malformed) => return EvaluationResult::error(FEEDBACK_MALFORMED),
        };

        // 両脚の平均を診断角度にする（左右対称の仮定）
        let knee_angle = (left + right) / 2.0;
        let phase = classify(knee_angle, t.phase_down, t.phase_up);

        let mut violations: Vec<&str> = Vec::new();
        if phase == Phase::Down && knee_angle > t.knee_min + SQUAT_DEPTH_TOLERANCE {
            violations.push(FEEDBACK_SQUAT_DEPTH);
        }
        if (left - right).abs() > t.knee_diff_max {
            violations.push(FEEDBACK_KNEE_ALIGN);
        }
        finish(phase, knee_angle, violations)
    }

    fn evaluate_pushup(&self, frame: &LandmarkFrame) -> EvaluationResult {
        let t = &self.thresholds.pushup;
        let (left, right) = match bilateral_angles(
            frame,
            [Joint::LeftShoulder, Joint::LeftElbow, Joint::LeftWrist],
            [Joint::RightShoulder, Joint::RightElbow, Joint::RightWrist],
        ) {
            Ok(angles) => angles,
            Err(Abort::Missing) => return EvaluationResult::unknown(FEEDBACK_REPOSITION),
            Err(Abort::Malformed) => return EvaluationResult::error(FEEDBACK_MALFORMED),
        };

        let elbow_angle = (left + right) / 2.0;
        let phase = classify(elbow_angle, t.phase_down, t.phase_up);

        let mut violations: Vec<&str> = Vec::new();
        if phase == Phase::Down && elbow_angle > t.depth_max {
            violations.push(FEEDBACK_PUSHUP_DEPTH);
        }
        if (left - right).abs() > t.elbow_diff_max {
            violations.push(FEEDBACK_ELBOW_ALIGN);
        }
        finish(phase, elbow_angle, violations)
    }

    fn evaluate_bicep_curl(&self, frame: &LandmarkFrame) -> EvaluationResult {
        let t = &self.thresholds.bicep_curl;
        let (left, right) = match bilateral_angles(
            frame,
            [Joint::LeftShoulder, Joint::LeftElbow, Joint::LeftWrist],
            [Joint::RightShoulder, Joint::RightElbow, Joint::RightWrist],
        ) {
            Ok(angles) => angles,
            Err(Abort::Missing) => return EvaluationResult::unknown(FEEDBACK_REPOSITION),
            Err(Abort::Malformed) => return EvaluationResult::error(FEEDBACK_MALFORMED),
        };

        let elbow_angle = (left + right) / 2.0;
        // カールは位相が反転: 伸展 = down, 屈曲 = up
        let phase = classify_inverted(elbow_angle, t.flexed_max, t.extended_min);

        let mut violations: Vec<&str> = Vec::new();
        if phase == Phase::Up && elbow_angle > t.flexion_max {
            violations.push(FEEDBACK_CURL_FLEX);
        }
        // 肘が外に開いていないか（肩幅との比で見る）
        if let (Some(ls), Some(rs), Some(le), Some(re)) = (
            frame.point(Joint::LeftShoulder),
            frame.point(Joint::RightShoulder),
            frame.point(Joint::LeftElbow),
            frame.point(Joint::RightElbow),
        ) {
            let shoulder_width = (ls.0 - rs.0).abs();
            let elbow_width = (le.0 - re.0).abs();
            if elbow_width > shoulder_width * t.elbow_width_ratio {
                violations.push(FEEDBACK_CURL_TUCK);
            }
        }
        finish(phase, elbow_angle, violations)
    }
}

impl Default for FormEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// 角度から位相を決める。境界値ちょうどは transition 側に倒す
fn classify(angle: f32, down: f32, up: f32) -> Phase {
    if angle > up {
        Phase::Up
    } else if angle < down {
        Phase::Down
    } else {
        Phase::Transition
    }
}

/// カール用の反転版（角度が大きい = 腕が伸びている = down）
fn classify_inverted(angle: f32, flexed: f32, extended: f32) -> Phase {
    if angle > extended {
        Phase::Down
    } else if angle < flexed {
        Phase::Up
    } else {
        Phase::Transition
    }
}

fn finish(phase: Phase, primary_angle: f32, violations: Vec<&str>) -> EvaluationResult {
    let correct = violations.is_empty();
    let feedback = if correct {
        FEEDBACK_GOOD_FORM.to_string()
    } else {
        violations.join(" ")
    };
    EvaluationResult {
        correct,
        feedback,
        phase,
        primary_angle,
    }
}

/// 左右それぞれの関節チェーン角度。どちらかが欠けていれば打ち切り
fn bilateral_angles(
    frame: &LandmarkFrame,
    left: [Joint; 3],
    right: [Joint; 3],
) -> Result<(f32, f32), Abort> {
    Ok((chain_angle(frame, left)?, chain_angle(frame, right)?))
}

fn chain_angle(frame: &LandmarkFrame, joints: [Joint; 3]) -> Result<f32, Abort> {
    let mut points = [(0.0_f32, 0.0_f32); 3];
    for (slot, joint) in points.iter_mut().zip(joints) {
        let lm = frame.get(joint).ok_or(Abort::Missing)?;
        if !lm.x.is_finite() || !lm.y.is_finite() {
            return Err(Abort::Malformed);
        }
        *slot = (lm.x, lm.y);
    }
    Ok(joint_angle(points[0], points[1], points[2]))
}
