//! Axis-aligned rectangle geometry used by detection and merging.
//!
//! Regions in this pipeline are always axis-aligned integer boxes, so the
//! geometry here stays deliberately simple: intersection, union, IoU,
//! clamping and margin expansion.

use crate::domain::region::DesignRegion;

/// An axis-aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Rect {
    /// Creates a rectangle from its top-left corner and size.
    #[inline]
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    #[inline]
    pub fn right(&self) -> u64 {
        u64::from(self.x) + u64::from(self.width)
    }

    /// Exclusive bottom edge.
    #[inline]
    pub fn bottom(&self) -> u64 {
        u64::from(self.y) + u64::from(self.height)
    }

    /// Area in pixels.
    #[inline]
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Area of the intersection with `other`, zero when disjoint.
    pub fn intersection_area(&self, other: &Rect) -> u64 {
        let left = u64::from(self.x.max(other.x));
        let top = u64::from(self.y.max(other.y));
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return 0;
        }
        (right - left) * (bottom - top)
    }

    /// Intersection-over-union with `other`.
    ///
    /// Returns 0.0 for disjoint boxes and when both boxes are empty.
    pub fn iou(&self, other: &Rect) -> f32 {
        let intersection = self.intersection_area(other);
        if intersection == 0 {
            return 0.0;
        }
        let union = self.area() + other.area() - intersection;
        if union == 0 {
            return 0.0;
        }
        intersection as f32 / union as f32
    }

    /// Expands the rectangle by `margin` pixels on every side, clamped to an
    /// image of the given dimensions.
    pub fn expand(&self, margin: u32, image_width: u32, image_height: u32) -> Rect {
        let x = self.x.saturating_sub(margin);
        let y = self.y.saturating_sub(margin);
        let right = self
            .right()
            .saturating_add(u64::from(margin))
            .min(u64::from(image_width)) as u32;
        let bottom = self
            .bottom()
            .saturating_add(u64::from(margin))
            .min(u64::from(image_height)) as u32;
        Rect::new(x, y, right.saturating_sub(x), bottom.saturating_sub(y))
    }

    /// Clamps the rectangle into an image of the given dimensions.
    ///
    /// Returns `None` when nothing of the rectangle remains in bounds.
    pub fn clamp_to(&self, image_width: u32, image_height: u32) -> Option<Rect> {
        if self.x >= image_width || self.y >= image_height {
            return None;
        }
        let width = self.width.min(image_width - self.x);
        let height = self.height.min(image_height - self.y);
        if width == 0 || height == 0 {
            return None;
        }
        Some(Rect::new(self.x, self.y, width, height))
    }
}

impl From<&DesignRegion> for Rect {
    fn from(region: &DesignRegion) -> Self {
        Rect::new(region.x, region.y, region.width, region.height)
    }
}

/// IoU between two detected regions.
pub fn region_iou(a: &DesignRegion, b: &DesignRegion) -> f32 {
    Rect::from(a).iou(&Rect::from(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::region::DetectionSource;

    #[test]
    fn test_iou_identical_boxes() {
        let a = Rect::new(10, 10, 40, 40);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_disjoint_boxes() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(20, 20, 10, 10);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_touching_boxes_is_zero() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(10, 0, 10, 10);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_half_overlap() {
        let a = Rect::new(0, 0, 20, 10);
        let b = Rect::new(10, 0, 20, 10);
        // intersection 100, union 300
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_is_symmetric() {
        let a = Rect::new(5, 5, 30, 20);
        let b = Rect::new(15, 10, 25, 25);
        assert!((a.iou(&b) - b.iou(&a)).abs() < 1e-6);
    }

    #[test]
    fn test_iou_in_unit_range() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(50, 50, 100, 100);
        let iou = a.iou(&b);
        assert!((0.0..=1.0).contains(&iou));
    }

    #[test]
    fn test_expand_clamps_at_image_edges() {
        let r = Rect::new(2, 3, 10, 10);
        let expanded = r.expand(5, 100, 100);
        assert_eq!(expanded, Rect::new(0, 0, 17, 18));

        let near_edge = Rect::new(90, 90, 8, 8);
        let expanded = near_edge.expand(5, 100, 100);
        assert_eq!(expanded, Rect::new(85, 85, 15, 15));
    }

    #[test]
    fn test_clamp_to_shrinks_overflowing_box() {
        let r = Rect::new(80, 80, 50, 50);
        let clamped = r.clamp_to(100, 100).unwrap();
        assert_eq!(clamped, Rect::new(80, 80, 20, 20));
    }

    #[test]
    fn test_clamp_to_rejects_out_of_bounds_origin() {
        let r = Rect::new(120, 10, 50, 50);
        assert!(r.clamp_to(100, 100).is_none());
    }

    #[test]
    fn test_region_iou_red_square_scenario() {
        // An edge detection ringed one pixel outside the true square should
        // still overlap it almost completely.
        let truth = DesignRegion::new(50, 50, 100, 100, 1.0, "truth", DetectionSource::Heuristic);
        let detected =
            DesignRegion::new(49, 49, 102, 102, 0.8, "edge_detected", DetectionSource::Heuristic);
        assert!(region_iou(&truth, &detected) >= 0.8);
    }
}
