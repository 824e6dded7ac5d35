//! Domain types: regions, extracted designs and quality reports.

pub mod quality;
pub mod region;

pub use quality::{QualityLevel, QualityReport};
pub use region::{DesignRegion, DetectionSource, EnhancedDesignRegion, ExtractedDesign};
