//! A/B/C Detector (C5): window/day aggregation, three candidate predicates,
//! deterministic sampling.

pub mod detect;
pub mod thresholds;
pub mod windows;

pub use detect::{detect_abc, DetectionMetadata};
pub use thresholds::Thresholds;
