//! Page canvas: camera, page sprite, and mask sprites.
//!
//! The page lives in a y-down space measured in page pixels with the origin
//! at the page's top-left corner. Bevy's world is y-up, so every placement
//! negates y. The camera is derived each frame from the [`Viewport`] held in
//! [`CanvasView`]: its orthographic scale is `1 / zoom` and its translation
//! is whatever world point sits at the window center.

use bevy::camera::visibility::RenderLayers;
use bevy::input::mouse::{MouseScrollUnit, MouseWheel};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use std::collections::HashSet;
use std::path::PathBuf;
use uuid::Uuid;

use crate::constants::WHEEL_ZOOM_STEP;
use crate::geometry::{Viewport, fit_zoom, zoom_limits};
use crate::store::Cache;

use super::gestures::GestureEngine;

/// Z layers for canvas content.
const PAGE_Z: f32 = 0.0;
const MASK_Z: f32 = 10.0;
const LABEL_Z: f32 = 20.0;

#[derive(Component)]
pub struct CanvasCamera;

#[derive(Component)]
pub struct PageSprite;

#[derive(Component)]
pub struct MaskSprite {
    pub mask_id: Uuid,
}

#[derive(Component)]
pub struct MaskLabel;

/// The page currently shown on the canvas.
pub struct OpenPage {
    pub print_id: Uuid,
    /// Page size in page pixels.
    pub page: Vec2,
    pub image_path: PathBuf,
    pub viewport: Viewport,
    /// Zoom at which the whole page fits the canvas area.
    pub fit: f32,
}

impl OpenPage {
    pub fn zoom_limits(&self) -> (f32, f32) {
        zoom_limits(self.fit)
    }

    /// Zoom about `anchor`, clamped to the allowed range.
    pub fn zoom_clamped(&mut self, anchor: Vec2, new_zoom: f32) {
        let (lo, hi) = self.zoom_limits();
        self.viewport.zoom_at(anchor, new_zoom.clamp(lo, hi));
    }

    /// Refit the page to `area` and center it.
    pub fn fit_to(&mut self, area: Rect) {
        self.fit = fit_zoom(area.size(), self.page);
        let mut vp = Viewport::fit(area.size(), self.page);
        vp.pan += area.min;
        self.viewport = vp;
    }
}

#[derive(Resource, Default)]
pub struct CanvasView {
    pub open: Option<OpenPage>,
}

/// Screen rectangle (window logical coordinates) left free by the egui
/// panels, captured during the UI pass each frame.
#[derive(Resource)]
pub struct CanvasArea {
    pub rect: Rect,
}

impl Default for CanvasArea {
    fn default() -> Self {
        Self {
            rect: Rect::new(0.0, 0.0, 1.0, 1.0),
        }
    }
}

/// How mask sprites are drawn, written by the active screen's systems.
#[derive(Resource, Default)]
pub struct MaskStyle {
    /// Masks drawn nearly transparent (revealed during review).
    pub revealed: HashSet<Uuid>,
    /// Groups tinted as selected (picker, current edit group).
    pub highlighted_groups: HashSet<Uuid>,
    /// Show the group label on each mask.
    pub show_labels: bool,
}

pub fn spawn_canvas_camera(mut commands: Commands) {
    commands.spawn((
        Camera2d,
        CanvasCamera,
        Transform::from_translation(Vec3::new(0.0, 0.0, 1000.0)),
        RenderLayers::layer(0),
    ));
}

/// Convert a page-space point to a Bevy world translation.
fn page_to_bevy(p: Vec2, z: f32) -> Vec3 {
    Vec3::new(p.x, -p.y, z)
}

/// Derives the camera transform and projection from the viewport.
pub fn sync_camera_to_view(
    view: Res<CanvasView>,
    window_query: Query<&Window, With<PrimaryWindow>>,
    mut camera_query: Query<(&mut Transform, &mut Projection), With<CanvasCamera>>,
) {
    let Some(open) = view.open.as_ref() else {
        return;
    };
    let Ok(window) = window_query.single() else {
        return;
    };
    let Ok((mut transform, mut projection)) = camera_query.single_mut() else {
        return;
    };

    let center = Vec2::new(window.width(), window.height()) / 2.0;
    let world_center = open.viewport.screen_to_world(center);
    transform.translation.x = world_center.x;
    transform.translation.y = -world_center.y;
    if let Projection::Orthographic(ref mut ortho) = *projection {
        ortho.scale = 1.0 / open.viewport.zoom;
    }
}

/// Rebuilds the page and mask sprites whenever the cache or the open page
/// changes. Sprite counts here are small, so a full rebuild beats diffing.
pub fn sync_canvas_sprites(
    mut commands: Commands,
    view: Res<CanvasView>,
    cache: Res<Cache>,
    style: Res<MaskStyle>,
    asset_server: Res<AssetServer>,
    existing: Query<Entity, Or<(With<PageSprite>, With<MaskSprite>, With<MaskLabel>)>>,
) {
    if !view.is_changed() && !cache.is_changed() && !style.is_changed() {
        return;
    }

    for entity in existing.iter() {
        commands.entity(entity).despawn();
    }

    let Some(open) = view.open.as_ref() else {
        return;
    };

    let texture = asset_server.load(open.image_path.to_string_lossy().to_string());
    let mut page_sprite = Sprite::from_image(texture);
    page_sprite.custom_size = Some(open.page);
    commands.spawn((
        page_sprite,
        Transform::from_translation(page_to_bevy(open.page / 2.0, PAGE_Z)),
        PageSprite,
    ));

    for (i, mask) in cache.masks_of_print(open.print_id).iter().enumerate() {
        let alpha = if style.revealed.contains(&mask.id) {
            0.15
        } else {
            1.0
        };
        let color = if style.highlighted_groups.contains(&mask.group_id) {
            Color::srgba(0.16, 0.35, 0.16, alpha)
        } else {
            Color::srgba(0.04, 0.04, 0.05, alpha)
        };

        let center = crate::geometry::normalized_to_world(mask.rect.center(), open.page);
        let size = mask.rect.size_on_page(open.page);
        // Later masks stack above earlier ones, matching hit test order
        let z = MASK_Z + i as f32 * 0.01;
        commands.spawn((
            Sprite::from_color(color, size),
            Transform::from_translation(page_to_bevy(center, z)),
            MaskSprite { mask_id: mask.id },
        ));

        if style.show_labels && alpha >= 1.0 {
            let label = cache
                .group(mask.group_id)
                .map(|g| g.label.clone())
                .unwrap_or_default();
            let font_size = (size.y * 0.4).clamp(10.0, 28.0);
            commands.spawn((
                Text2d::new(label),
                TextFont::from_font_size(font_size),
                TextColor(Color::srgba(1.0, 1.0, 1.0, 0.85)),
                Transform::from_translation(page_to_bevy(center, LABEL_Z)),
                MaskLabel,
            ));
        }
    }
}

/// Wheel zoom about the cursor.
pub fn wheel_zoom(
    mut scroll_events: MessageReader<MouseWheel>,
    mut view: ResMut<CanvasView>,
    window_query: Query<&Window, With<PrimaryWindow>>,
    area: Res<CanvasArea>,
) {
    let Some(open) = view.open.as_mut() else {
        scroll_events.clear();
        return;
    };
    let Ok(window) = window_query.single() else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        scroll_events.clear();
        return;
    };
    if !area.rect.contains(cursor) {
        scroll_events.clear();
        return;
    }

    for event in scroll_events.read() {
        let steps = match event.unit {
            MouseScrollUnit::Line => event.y,
            MouseScrollUnit::Pixel => event.y / 40.0,
        };
        if steps == 0.0 {
            continue;
        }
        let factor = WHEEL_ZOOM_STEP.powf(steps);
        let new_zoom = open.viewport.zoom * factor;
        open.zoom_clamped(cursor, new_zoom);
    }
}

/// Draws the in-progress mask rectangle.
pub fn draw_preview_gizmo(mut gizmos: Gizmos, engine: Res<GestureEngineRes>, view: Res<CanvasView>) {
    let Some(open) = view.open.as_ref() else {
        return;
    };
    let Some((start, current)) = engine.0.draw_preview() else {
        return;
    };

    let a = open.viewport.screen_to_world(start);
    let b = open.viewport.screen_to_world(current);
    let center = (a + b) / 2.0;
    let size = (a - b).abs();
    gizmos.rect_2d(
        Isometry2d::from_translation(Vec2::new(center.x, -center.y)),
        size,
        Color::srgb(0.9, 0.6, 0.1),
    );
}

/// The gesture engine as a resource. The inner type stays Bevy-free.
#[derive(Resource, Default)]
pub struct GestureEngineRes(pub GestureEngine);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_to_bevy_negates_y() {
        let v = page_to_bevy(Vec2::new(30.0, 40.0), 5.0);
        assert_eq!(v, Vec3::new(30.0, -40.0, 5.0));
    }

    #[test]
    fn test_fit_to_accounts_for_area_origin() {
        let mut open = OpenPage {
            print_id: Uuid::new_v4(),
            page: Vec2::new(500.0, 800.0),
            image_path: PathBuf::new(),
            viewport: Viewport::default(),
            fit: 1.0,
        };
        // Canvas area offset by a 300 px side panel
        open.fit_to(Rect::new(300.0, 0.0, 1300.0, 800.0));
        assert!((open.fit - 1.0).abs() < 1e-6);
        // Page centered within the area, not the window
        assert!((open.viewport.pan.x - 550.0).abs() < 1e-3);
        assert!(open.viewport.pan.y.abs() < 1e-3);
    }

    #[test]
    fn test_zoom_clamped_respects_limits() {
        let mut open = OpenPage {
            print_id: Uuid::new_v4(),
            page: Vec2::new(500.0, 800.0),
            image_path: PathBuf::new(),
            viewport: Viewport::default(),
            fit: 1.0,
        };
        open.zoom_clamped(Vec2::ZERO, 100.0);
        let (_, hi) = open.zoom_limits();
        assert!((open.viewport.zoom - hi).abs() < 1e-6);
    }
}
