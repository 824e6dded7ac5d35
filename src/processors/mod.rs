//! Shared pixel and geometry processing primitives.

pub mod geometry;
pub mod pixel;

pub use geometry::{Rect, region_iou};
pub use pixel::{BoolMask, connected_component_boxes, grayscale, sobel_magnitude};
