pub mod speed;

pub use speed::PulseSpeedEstimator;
