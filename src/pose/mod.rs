pub mod geometry;
pub mod keypoint;

pub use geometry::{joint_angle, DEGENERATE_ANGLE};
pub use keypoint::{Joint, Landmark, LandmarkFrame, DEFAULT_MIN_CONFIDENCE};
