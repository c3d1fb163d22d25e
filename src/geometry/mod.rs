//! Viewport math between screen, page, and normalized coordinates.
//!
//! The page lives in a y-down world space measured in page pixels, with the
//! origin at the page's top-left corner. A [`Viewport`] maps that world into
//! screen space through a pan offset and a zoom factor:
//!
//! `screen = world * zoom + pan`
//!
//! Mask rects are stored normalized to the page dimensions, so there is a
//! third conversion layer between world and `[0, 1]` space.

use bevy::math::Vec2;

use crate::constants::{
    MAX_ZOOM_FIT_FACTOR, MAX_ZOOM_FLOOR, MIN_ZOOM_FIT_FACTOR, MIN_ZOOM_FLOOR,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Screen position of the world origin, in screen pixels.
    pub pan: Vec2,
    /// Screen pixels per world pixel.
    pub zoom: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        (screen - self.pan) / self.zoom
    }

    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        world * self.zoom + self.pan
    }

    /// Change zoom while keeping the world point under `anchor` fixed on
    /// screen. This is what makes wheel and pinch zoom feel planted.
    pub fn zoom_at(&mut self, anchor: Vec2, new_zoom: f32) {
        let world = self.screen_to_world(anchor);
        self.zoom = new_zoom;
        self.pan = anchor - world * new_zoom;
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Viewport that fits the whole page inside `area`, centered.
    pub fn fit(area: Vec2, page: Vec2) -> Self {
        let zoom = fit_zoom(area, page);
        let shown = page * zoom;
        Self {
            pan: (area - shown) / 2.0,
            zoom,
        }
    }
}

/// Largest zoom at which the whole page fits inside `area`.
pub fn fit_zoom(area: Vec2, page: Vec2) -> f32 {
    if page.x <= 0.0 || page.y <= 0.0 {
        return 1.0;
    }
    (area.x / page.x).min(area.y / page.y).max(f32::MIN_POSITIVE)
}

/// Allowed zoom range relative to the fit zoom, with absolute floors so tiny
/// pages stay zoomable.
pub fn zoom_limits(fit: f32) -> (f32, f32) {
    (
        (fit * MIN_ZOOM_FIT_FACTOR).max(MIN_ZOOM_FLOOR),
        (fit * MAX_ZOOM_FIT_FACTOR).max(MAX_ZOOM_FLOOR),
    )
}

/// World point in page pixels to normalized `[0, 1]` page space. Not clamped.
pub fn world_to_normalized(world: Vec2, page: Vec2) -> Vec2 {
    Vec2::new(world.x / page.x, world.y / page.y)
}

pub fn normalized_to_world(norm: Vec2, page: Vec2) -> Vec2 {
    Vec2::new(norm.x * page.x, norm.y * page.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_world_roundtrip() {
        let vp = Viewport {
            pan: Vec2::new(37.0, -12.5),
            zoom: 1.75,
        };
        let screen = Vec2::new(410.0, 222.0);
        let back = vp.world_to_screen(vp.screen_to_world(screen));
        assert!((back - screen).length() < 1e-3);
    }

    #[test]
    fn test_zoom_at_keeps_anchor_fixed() {
        let mut vp = Viewport {
            pan: Vec2::new(50.0, 80.0),
            zoom: 0.8,
        };
        let anchor = Vec2::new(300.0, 200.0);
        let world_before = vp.screen_to_world(anchor);
        vp.zoom_at(anchor, 2.4);
        let world_after = vp.screen_to_world(anchor);
        assert!((world_before - world_after).length() < 1e-3);
        assert_eq!(vp.zoom, 2.4);
    }

    #[test]
    fn test_fit_centers_page() {
        let area = Vec2::new(1000.0, 800.0);
        let page = Vec2::new(500.0, 800.0);
        let vp = Viewport::fit(area, page);
        // Height-limited: zoom 1.0, horizontally centered
        assert!((vp.zoom - 1.0).abs() < 1e-6);
        assert!((vp.pan.x - 250.0).abs() < 1e-3);
        assert!(vp.pan.y.abs() < 1e-3);
    }

    #[test]
    fn test_fit_zoom_picks_limiting_axis() {
        let z = fit_zoom(Vec2::new(800.0, 600.0), Vec2::new(1600.0, 600.0));
        assert!((z - 0.5).abs() < 1e-6);
        let z = fit_zoom(Vec2::new(800.0, 300.0), Vec2::new(1600.0, 600.0));
        assert!((z - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_zoom_limits_floors() {
        // Large fit zoom: limits scale with it
        let (lo, hi) = zoom_limits(2.0);
        assert!((lo - 1.2).abs() < 1e-6);
        assert!((hi - 12.0).abs() < 1e-6);
        // Tiny fit zoom: absolute floors win
        let (lo, hi) = zoom_limits(0.05);
        assert!((lo - MIN_ZOOM_FLOOR).abs() < 1e-6);
        assert!((hi - MAX_ZOOM_FLOOR).abs() < 1e-6);
    }

    #[test]
    fn test_normalized_roundtrip() {
        let page = Vec2::new(1600.0, 2100.0);
        let world = Vec2::new(480.0, 1312.5);
        let n = world_to_normalized(world, page);
        assert!((n - Vec2::new(0.3, 0.625)).length() < 1e-6);
        let back = normalized_to_world(n, page);
        assert!((back - world).length() < 1e-3);
    }
}
