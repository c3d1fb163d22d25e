//! Normalized rectangles for mask geometry.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use crate::constants::MIN_MASK_NORM_SIZE;

/// A rectangle in page-relative normalized coordinates.
///
/// Invariant, enforced by clamping on every construction and translation:
/// `0 <= x`, `0 <= y`, `x + w <= 1`, `y + h <= 1`, and both dimensions are at
/// least [`MIN_MASK_NORM_SIZE`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl NormRect {
    /// Build a rect from raw values, clamping into the valid range.
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        let w = w.clamp(MIN_MASK_NORM_SIZE, 1.0);
        let h = h.clamp(MIN_MASK_NORM_SIZE, 1.0);
        Self {
            x: x.clamp(0.0, 1.0 - w),
            y: y.clamp(0.0, 1.0 - h),
            w,
            h,
        }
    }

    /// Build a rect from two opposite corners in normalized space.
    pub fn from_corners(a: Vec2, b: Vec2) -> Self {
        let min = a.min(b);
        let max = a.max(b);
        Self::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    /// Translate by a normalized delta, keeping the rect inside the page.
    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: (self.x + dx).clamp(0.0, 1.0 - self.w),
            y: (self.y + dy).clamp(0.0, 1.0 - self.h),
            w: self.w,
            h: self.h,
        }
    }

    /// Whether a normalized point falls inside the rect (edges inclusive).
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x <= self.x + self.w && p.y >= self.y && p.y <= self.y + self.h
    }

    /// Center of the rect in normalized space.
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Size scaled to page pixel dimensions.
    pub fn size_on_page(&self, page: Vec2) -> Vec2 {
        Vec2::new(self.w * page.x, self.h * page.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps_into_unit_square() {
        let r = NormRect::new(0.9, 0.9, 0.5, 0.5);
        assert!(r.x + r.w <= 1.0 + f32::EPSILON);
        assert!(r.y + r.h <= 1.0 + f32::EPSILON);
        assert_eq!(r.w, 0.5);
        assert_eq!(r.x, 0.5);
    }

    #[test]
    fn test_new_enforces_minimum_size() {
        let r = NormRect::new(0.5, 0.5, 0.0, -0.2);
        assert!(r.w >= MIN_MASK_NORM_SIZE);
        assert!(r.h >= MIN_MASK_NORM_SIZE);
    }

    #[test]
    fn test_from_corners_orders_points() {
        let r = NormRect::from_corners(Vec2::new(0.6, 0.7), Vec2::new(0.2, 0.3));
        assert_eq!(r.x, 0.2);
        assert_eq!(r.y, 0.3);
        assert!((r.w - 0.4).abs() < 1e-6);
        assert!((r.h - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_translated_clamps_at_page_edges() {
        let r = NormRect::new(0.1, 0.1, 0.3, 0.3);
        let moved = r.translated(5.0, -5.0);
        assert!((moved.x - 0.7).abs() < 1e-6);
        assert_eq!(moved.y, 0.0);
        // Size never changes on translation
        assert_eq!(moved.w, r.w);
        assert_eq!(moved.h, r.h);
    }

    #[test]
    fn test_contains_edges_inclusive() {
        let r = NormRect::new(0.25, 0.25, 0.5, 0.5);
        assert!(r.contains(Vec2::new(0.25, 0.25)));
        assert!(r.contains(Vec2::new(0.75, 0.75)));
        assert!(r.contains(Vec2::new(0.5, 0.5)));
        assert!(!r.contains(Vec2::new(0.76, 0.5)));
        assert!(!r.contains(Vec2::new(0.5, 0.1)));
    }

    #[test]
    fn test_invariant_holds_after_any_translation() {
        let r = NormRect::new(0.0, 0.0, 0.4, 0.2);
        for (dx, dy) in [(0.9, 0.9), (-1.0, -1.0), (0.3, 0.0), (0.0, 100.0)] {
            let m = r.translated(dx, dy);
            assert!(m.x >= 0.0 && m.y >= 0.0);
            assert!(m.x + m.w <= 1.0 + f32::EPSILON);
            assert!(m.y + m.h <= 1.0 + f32::EPSILON);
        }
    }
}
