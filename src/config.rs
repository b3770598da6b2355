use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::exercise::ExerciseKind;
use crate::pose::DEFAULT_MIN_CONFIDENCE;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// 起動時に選択するエクササイズ
    #[serde(default = "default_exercise")]
    pub exercise: ExerciseKind,
    /// 正しいフォームのフレームをレップ成立の条件にするか
    #[serde(default = "default_form_required")]
    pub form_required: bool,
    /// ランドマーク取り込みの信頼度閾値
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// 同一メッセージの抑制間隔（秒）
    #[serde(default = "default_min_message_interval")]
    pub min_message_interval: f32,
}

/// エクササイズ毎の角度閾値（度）
///
/// 既定値は経験的に調整されたもの。上書きする場合も
/// down境界 < transition帯 < up境界 の順序は維持すること（loadで検証）。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThresholdConfig {
    #[serde(default)]
    pub squat: SquatThresholds,
    #[serde(default)]
    pub pushup: PushupThresholds,
    #[serde(default)]
    pub bicep_curl: CurlThresholds,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SquatThresholds {
    /// この角度を超えたら up
    #[serde(default = "default_squat_phase_up")]
    pub phase_up: f32,
    /// この角度を下回ったら down
    #[serde(default = "default_squat_phase_down")]
    pub phase_down: f32,
    /// 最深部の目標膝角度
    #[serde(default = "default_squat_knee_min")]
    pub knee_min: f32,
    /// 左右の膝角度差の許容量
    #[serde(default = "default_squat_knee_diff_max")]
    pub knee_diff_max: f32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PushupThresholds {
    #[serde(default = "default_pushup_phase_up")]
    pub phase_up: f32,
    #[serde(default = "default_pushup_phase_down")]
    pub phase_down: f32,
    /// down位相でこの肘角度を超えていたら浅い
    #[serde(default = "default_pushup_depth_max")]
    pub depth_max: f32,
    /// 左右の肘角度差の許容量
    #[serde(default = "default_pushup_elbow_diff_max")]
    pub elbow_diff_max: f32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CurlThresholds {
    /// この角度を超えたら down（腕が伸びている）
    #[serde(default = "default_curl_extended_min")]
    pub extended_min: f32,
    /// この角度を下回ったら up（肘を畳んでいる）
    #[serde(default = "default_curl_flexed_max")]
    pub flexed_max: f32,
    /// up位相で許容する最大肘角度（完全屈曲の判定）
    #[serde(default = "default_curl_flexion_max")]
    pub flexion_max: f32,
    /// 肘間隔 / 肩間隔 の許容倍率
    #[serde(default = "default_curl_elbow_width_ratio")]
    pub elbow_width_ratio: f32,
}

fn default_exercise() -> ExerciseKind {
    ExerciseKind::Squat
}
fn default_form_required() -> bool {
    true
}
fn default_min_confidence() -> f32 {
    DEFAULT_MIN_CONFIDENCE
}
fn default_min_message_interval() -> f32 {
    2.5
}
fn default_squat_phase_up() -> f32 {
    140.0
}
fn default_squat_phase_down() -> f32 {
    100.0
}
fn default_squat_knee_min() -> f32 {
    80.0
}
fn default_squat_knee_diff_max() -> f32 {
    30.0
}
fn default_pushup_phase_up() -> f32 {
    140.0
}
fn default_pushup_phase_down() -> f32 {
    90.0
}
fn default_pushup_depth_max() -> f32 {
    100.0
}
fn default_pushup_elbow_diff_max() -> f32 {
    40.0
}
fn default_curl_extended_min() -> f32 {
    140.0
}
fn default_curl_flexed_max() -> f32 {
    60.0
}
fn default_curl_flexion_max() -> f32 {
    80.0
}
fn default_curl_elbow_width_ratio() -> f32 {
    1.4
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exercise: default_exercise(),
            form_required: default_form_required(),
            min_confidence: default_min_confidence(),
            audio: AudioConfig::default(),
            thresholds: ThresholdConfig::default(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            min_message_interval: default_min_message_interval(),
        }
    }
}

impl Default for SquatThresholds {
    fn default() -> Self {
        Self {
            phase_up: default_squat_phase_up(),
            phase_down: default_squat_phase_down(),
            knee_min: default_squat_knee_min(),
            knee_diff_max: default_squat_knee_diff_max(),
        }
    }
}

impl Default for PushupThresholds {
    fn default() -> Self {
        Self {
            phase_up: default_pushup_phase_up(),
            phase_down: default_pushup_phase_down(),
            depth_max: default_pushup_depth_max(),
            elbow_diff_max: default_pushup_elbow_diff_max(),
        }
    }
}

impl Default for CurlThresholds {
    fn default() -> Self {
        Self {
            extended_min: default_curl_extended_min(),
            flexed_max: default_curl_flexed_max(),
            flexion_max: default_curl_flexion_max(),
            elbow_width_ratio: default_curl_elbow_width_ratio(),
        }
    }
}

impl ThresholdConfig {
    /// 閾値の順序関係を検証する。違反は設定ミスなので起動時に失敗させる
    pub fn validate(&self) -> Result<()> {
        if self.squat.phase_down >= self.squat.phase_up {
            bail!(
                "squat: phase_down ({}) must be below phase_up ({})",
                self.squat.phase_down,
                self.squat.phase_up
            );
        }
        if self.pushup.phase_down >= self.pushup.phase_up {
            bail!(
                "pushup: phase_down ({}) must be below phase_up ({})",
                self.pushup.phase_down,
                self.pushup.phase_up
            );
        }
        if self.bicep_curl.flexed_max >= self.bicep_curl.extended_min {
            bail!(
                "bicep_curl: flexed_max ({}) must be below extended_min ({})",
                self.bicep_curl.flexed_max,
                self.bicep_curl.extended_min
            );
        }
        if self.squat.knee_diff_max <= 0.0 || self.pushup.elbow_diff_max <= 0.0 {
            bail!("alignment tolerances must be positive");
        }
        if self.bicep_curl.elbow_width_ratio < 1.0 {
            bail!(
                "bicep_curl: elbow_width_ratio ({}) must be at least 1.0",
                self.bicep_curl.elbow_width_ratio
            );
        }
        Ok(())
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.as_ref().display()))?;
        let config: Config = toml::from_str(&content)?;
        config.thresholds.validate()?;
        Ok(config)
    }

    /// 設定ファイルが無い・壊れている場合は既定値で続行する
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!(
                    "[config] {} not loaded ({e:#}), using defaults",
                    path.as_ref().display()
                );
                Config::default()
            }
        }
    }
}
