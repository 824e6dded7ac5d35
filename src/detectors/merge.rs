//! Reconciliation of candidates from both detectors.
//!
//! Merging runs in two stages. First, learned detections are accepted
//! outright and heuristic candidates that substantially duplicate an
//! already-accepted region are dropped. Second, greedy non-maximum
//! suppression removes remaining overlaps, keeping the higher-confidence
//! region of any conflicting pair. With the NMS threshold at or below the
//! dedup threshold the operation is idempotent.

use tracing::debug;

use crate::domain::region::{DesignRegion, EnhancedDesignRegion};
use crate::processors::geometry::region_iou;

/// Two-stage merger: IoU dedup followed by greedy NMS.
#[derive(Debug, Clone)]
pub struct RegionMerger {
    dedup_iou_threshold: f32,
    nms_iou_threshold: f32,
}

impl RegionMerger {
    /// Creates a merger with the given IoU thresholds.
    pub fn new(dedup_iou_threshold: f32, nms_iou_threshold: f32) -> Self {
        Self {
            dedup_iou_threshold,
            nms_iou_threshold,
        }
    }

    /// Merges heuristic and learned candidates into enhanced region shells.
    pub fn merge(
        &self,
        heuristic: Vec<DesignRegion>,
        learned: Vec<DesignRegion>,
    ) -> Vec<EnhancedDesignRegion> {
        let merged = self.merge_regions(heuristic, learned);
        merged
            .into_iter()
            .map(EnhancedDesignRegion::from_region)
            .collect()
    }

    /// Merges raw regions, returning the survivors.
    pub fn merge_regions(
        &self,
        heuristic: Vec<DesignRegion>,
        learned: Vec<DesignRegion>,
    ) -> Vec<DesignRegion> {
        // Stage 1: learned detections win; heuristic candidates that mostly
        // re-detect an accepted region are duplicates.
        let mut accepted = learned;
        let mut dropped = 0usize;
        for candidate in heuristic {
            let duplicate = accepted
                .iter()
                .any(|existing| region_iou(existing, &candidate) > self.dedup_iou_threshold);
            if duplicate {
                dropped += 1;
            } else {
                accepted.push(candidate);
            }
        }
        if dropped > 0 {
            debug!(dropped, "heuristic candidates removed as duplicates");
        }

        // Stage 2: greedy NMS by confidence.
        accepted.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let mut kept: Vec<DesignRegion> = Vec::with_capacity(accepted.len());
        for candidate in accepted {
            let suppressed = kept
                .iter()
                .any(|winner| region_iou(winner, &candidate) > self.nms_iou_threshold);
            if !suppressed {
                kept.push(candidate);
            }
        }
        debug!(count = kept.len(), "regions after merge");
        kept
    }
}
