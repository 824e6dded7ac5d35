//! Candidate region detection and reconciliation.

pub mod heuristic;
pub mod learned;
pub mod merge;

pub use heuristic::HeuristicDetector;
pub use learned::{LearnedDetector, decode_detections};
pub use merge::RegionMerger;
