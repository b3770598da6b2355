/// 評価に使う13ランドマークのインデックス
///
/// 姿勢推定側のボキャブラリ（MediaPipe 33点 / MoveNet 17点など）のうち、
/// エクササイズ評価が参照する部位のみを持つ。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Joint {
    Nose = 0,
    LeftShoulder = 1,
    RightShoulder = 2,
    LeftElbow = 3,
    RightElbow = 4,
    LeftWrist = 5,
    RightWrist = 6,
    LeftHip = 7,
    RightHip = 8,
    LeftKnee = 9,
    RightKnee = 10,
    LeftAnkle = 11,
    RightAnkle = 12,
}

impl Joint {
    pub const COUNT: usize = 13;

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Nose),
            1 => Some(Self::LeftShoulder),
            2 => Some(Self::RightShoulder),
            3 => Some(Self::LeftElbow),
            4 => Some(Self::RightElbow),
            5 => Some(Self::LeftWrist),
            6 => Some(Self::RightWrist),
            7 => Some(Self::LeftHip),
            8 => Some(Self::RightHip),
            9 => Some(Self::LeftKnee),
            10 => Some(Self::RightKnee),
            11 => Some(Self::LeftAnkle),
            12 => Some(Self::RightAnkle),
            _ => None,
        }
    }

    /// 姿勢推定コラボレーターが使う snake_case 名
    pub fn name(&self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
        }
    }

    /// snake_case 名からの逆引き（名前キーのランドマークマップ取り込み用）
    pub fn from_name(name: &str) -> Option<Self> {
        (0..Self::COUNT)
            .filter_map(Self::from_index)
            .find(|j| j.name() == name)
    }
}

/// 検出されたランドマーク1点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    /// 正規化されたX座標 (0.0〜1.0)
    pub x: f32,
    /// 正規化されたY座標 (0.0〜1.0)
    pub y: f32,
    /// 信頼度スコア (0.0〜1.0)
    pub confidence: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    /// 信頼度が閾値以上か
    pub fn is_valid(&self, threshold: f32) -> bool {
        self.confidence >= threshold
    }
}

/// 信頼度がこの値未満のランドマークはフレームに含めない
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.3;

/// 1フレーム分のランドマーク集合
///
/// `None` は「現在映っていない」。低信頼度の部位は座標ごと落とす方針で、
/// ゴミ座標が角度計算に混ざるのを防ぐ。フレームをまたいで保持しない。
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkFrame {
    landmarks: [Option<Landmark>; Joint::COUNT],
}

impl LandmarkFrame {
    /// 誰も映っていないフレーム
    pub fn empty() -> Self {
        Self {
            landmarks: [None; Joint::COUNT],
        }
    }

    /// 検出結果から構築。min_confidence 未満の部位は除外する
    pub fn from_detections<I>(detections: I, min_confidence: f32) -> Self
    where
        I: IntoIterator<Item = (Joint, Landmark)>,
    {
        let mut frame = Self::empty();
        for (joint, lm) in detections {
            if lm.is_valid(min_confidence) {
                frame.set(joint, lm);
            }
        }
        frame
    }

    pub fn set(&mut self, joint: Joint, landmark: Landmark) {
        self.landmarks[joint as usize] = Some(landmark);
    }

    pub fn get(&self, joint: Joint) -> Option<Landmark> {
        self.landmarks[joint as usize]
    }

    /// 座標のみ取り出すショートカット
    pub fn point(&self, joint: Joint) -> Option<(f32, f32)> {
        self.get(joint).map(|lm| (lm.x, lm.y))
    }

    pub fn len(&self) -> usize {
        self.landmarks.iter().filter(|lm| lm.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.iter().all(|lm| lm.is_none())
    }

    /// 指定した部位が全て揃っているか
    pub fn has_all(&self, joints: &[Joint]) -> bool {
        joints.iter().all(|j| self.get(*j).is_some())
    }
}

impl Default for LandmarkFrame {
    fn default() -> Self {
        Self::empty()
    }
}
