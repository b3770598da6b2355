use anyhow::bail;
use serde::{Deserialize, Serialize};

/// 対応エクササイズ種別
///
/// 文字列比較ではなく閉じた列挙型にして、評価器・カウンタ側の match を
/// 網羅的にチェックできるようにする。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    Squat,
    Pushup,
    BicepCurl,
}

impl ExerciseKind {
    /// 設定ファイル・CLIで使う snake_case 名
    pub fn name(&self) -> &'static str {
        match self {
            Self::Squat => "squat",
            Self::Pushup => "pushup",
            Self::BicepCurl => "bicep_curl",
        }
    }

    /// 音声アナウンス用の表示名
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Squat => "squats",
            Self::Pushup => "push-ups",
            Self::BicepCurl => "bicep curls",
        }
    }
}

impl std::str::FromStr for ExerciseKind {
    type Err = anyhow::Error;

    /// 未知の名前は設定ミス（フレーム毎の条件ではない）なのでエラーにする
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "squat" => Ok(Self::Squat),
            "pushup" => Ok(Self::Pushup),
            "bicep_curl" => Ok(Self::BicepCurl),
            other => bail!("unknown exercise kind: {}", other),
        }
    }
}

/// レップサイクル内の位相
///
/// エクササイズ間で意味は共有しない（スクワットの down は膝屈曲、
/// カールの up は肘屈曲）。`Unknown`/`Error` はランドマーク不足・
/// 不正入力のセンチネルで、履歴には決して積まれない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Up,
    Down,
    Transition,
    Unknown,
    Error,
}

impl Phase {
    /// 履歴・サイクル判定に使える位相か
    pub fn is_trackable(&self) -> bool {
        !matches!(self, Self::Unknown | Self::Error)
    }
}

/// 1フレーム分の姿勢評価結果
///
/// フレーム毎に新しく作られ、使い捨てる。feedback はルール違反メッセージの
/// 空白連結、違反なしなら固定の肯定文。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult {
    pub correct: bool,
    pub feedback: String,
    pub phase: Phase,
    /// 診断角度（度）。位相が Unknown/Error のときは 0.0
    pub primary_angle: f32,
}

impl EvaluationResult {
    pub(crate) fn unknown(feedback: &str) -> Self {
        Self {
            correct: false,
            feedback: feedback.to_string(),
            phase: Phase::Unknown,
            primary_angle: 0.0,
        }
    }

    pub(crate) fn error(feedback: &str) -> Self {
        Self {
            correct: false,
            feedback: feedback.to_string(),
            phase: Phase::Error,
            primary_angle: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_exercise_kind_name_roundtrip() {
        for kind in [
            ExerciseKind::Squat,
            ExerciseKind::Pushup,
            ExerciseKind::BicepCurl,
        ] {
            assert_eq!(ExerciseKind::from_str(kind.name()).unwrap(), kind);
        }
    }

    #[test]
    fn test_exercise_kind_unknown_name() {
        assert!(ExerciseKind::from_str("jumping_jack").is_err());
    }

    #[test]
    fn test_exercise_kind_serde_snake_case() {
        let kind: ExerciseKind = serde_json::from_str("\"bicep_curl\"").unwrap();
        assert_eq!(kind, ExerciseKind::BicepCurl);
        assert_eq!(serde_json::to_string(&kind).unwrap(), "\"bicep_curl\"");
    }

    #[test]
    fn test_phase_is_trackable() {
        assert!(Phase::Up.is_trackable());
        assert!(Phase::Down.is_trackable());
        assert!(Phase::Transition.is_trackable());
        assert!(!Phase::Unknown.is_trackable());
        assert!(!Phase::Error.is_trackable());
    }
}
