//! 関節角度の幾何計算

/// これより短いベクトルは方向が定まらないため縮退扱い
const MIN_VECTOR_NORM: f32 = 1e-4;

/// 縮退入力時のフォールバック角度（伸び切った関節とみなす）
pub const DEGENERATE_ANGLE: f32 = 180.0;

/// 3点 a-b-c が頂点 b でなす内角（度, 0〜180）
///
/// ベクトル (a-b), (c-b) の正規化内積の arccos。
/// cos は [-1,1] にクランプするので丸め誤差で NaN にはならない。
/// どちらかのベクトルが縮退している（点が一致している）場合は
/// エラーにせず `DEGENERATE_ANGLE` を返す。
pub fn joint_angle(a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> f32 {
    let ba = (a.0 - b.0, a.1 - b.1);
    let bc = (c.0 - b.0, c.1 - b.1);

    let norm_ba = (ba.0 * ba.0 + ba.1 * ba.1).sqrt();
    let norm_bc = (bc.0 * bc.0 + bc.1 * bc.1).sqrt();

    if norm_ba < MIN_VECTOR_NORM || norm_bc < MIN_VECTOR_NORM {
        return DEGENERATE_ANGLE;
    }

    let dot = ba.0 * bc.0 + ba.1 * bc.1;
    let cos = (dot / (norm_ba * norm_bc)).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}
