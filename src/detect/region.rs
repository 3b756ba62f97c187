//! Geometric classification of image placements
//!
//! Scanner-app QR codes and badges are small and anchored in the lower-right
//! part of the page. Full-page scans fail the size checks, which keeps the
//! heuristic from wiping real content.

use crate::config::RegionThresholds;
use crate::layout::Rect;

/// Outcome of classifying one placement, with the numbers used to decide
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionVerdict {
    pub is_watermark: bool,
    /// Left edge as a fraction of the page width
    pub rel_x: f32,
    /// Top edge as a fraction of the page height
    pub rel_y: f32,
    pub rel_height: f32,
    /// Absolute size in points
    pub width: f32,
    pub height: f32,
}

impl RegionVerdict {
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Whether the placement sits in the lower-right corner, ignoring its size
    pub fn is_bottom_right(&self, thresholds: &RegionThresholds) -> bool {
        self.rel_x > thresholds.min_rel_x && self.rel_y > thresholds.min_rel_y
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RegionHeuristic {
    thresholds: RegionThresholds,
}

impl RegionHeuristic {
    pub fn new(thresholds: RegionThresholds) -> Self {
        Self { thresholds }
    }

    /// Classify a placement rectangle (top-left page space) on a page of the given size
    pub fn classify(&self, rect: &Rect, page_width: f32, page_height: f32) -> RegionVerdict {
        let x0 = rect.x0.min(rect.x1);
        let y0 = rect.y0.min(rect.y1);
        let (rel_x, rel_y, rel_height) = if page_width > 0.0 && page_height > 0.0 {
            (x0 / page_width, y0 / page_height, rect.height() / page_height)
        } else {
            (0.0, 0.0, 1.0)
        };

        let mut verdict = RegionVerdict {
            is_watermark: false,
            rel_x,
            rel_y,
            rel_height,
            width: rect.width(),
            height: rect.height(),
        };

        let t = &self.thresholds;
        verdict.is_watermark = verdict.is_bottom_right(t)
            && verdict.area() < t.max_area
            && rel_height < t.max_rel_height;
        verdict
    }
}
