//! Pointer gesture state machine for the page canvas.
//!
//! One engine instance handles mouse and touch alike: callers feed it
//! pointer samples in screen space plus a little context (what surface mode
//! is active, whether the press landed on a mask) and apply the returned
//! [`GestureOutcome`]s. The engine owns no Bevy state, which keeps every
//! transition unit-testable.
//!
//! Transitions:
//! - Edit mode press on a mask starts a mask drag at once.
//! - Edit mode press on empty page arms a long-press timer. Holding still
//!   past [`LONG_PRESS_SECS`] turns the press into a pan; moving past the
//!   jitter threshold first turns it into a rectangle draw. Shift skips
//!   straight to panning.
//! - Review and Picker presses pan after jitter, or tap on release.
//! - A second pointer always wins: any in-flight press, draw, or drag is
//!   abandoned and the gesture becomes a pinch.

use bevy::math::Vec2;
use uuid::Uuid;

use crate::constants::{
    JITTER_THRESHOLD_PX, LONG_PRESS_SECS, MIN_MASK_DRAW_PX, PINCH_MOVE_THRESHOLD_PX,
};
use crate::geometry::{Viewport, world_to_normalized};
use crate::model::NormRect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceMode {
    Edit,
    Review,
    Picker,
}

/// Page context the engine needs to convert between spaces.
#[derive(Debug, Clone, Copy)]
pub struct GestureContext {
    /// Page size in page pixels.
    pub page: Vec2,
    pub min_zoom: f32,
    pub max_zoom: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum GestureState {
    Idle,
    /// Press not yet classified. `armed` presses can become a draw or a
    /// long-press pan; unarmed ones (review, picker) only pan or tap.
    Pressed {
        start: Vec2,
        held: f32,
        armed: bool,
    },
    Panning {
        last: Vec2,
    },
    Drawing {
        start: Vec2,
        current: Vec2,
    },
    MovingMask {
        mask_id: Uuid,
        last: Vec2,
        moved: bool,
    },
    Pinching {
        a: Vec2,
        b: Vec2,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureOutcome {
    None,
    /// The engine changed the viewport (pan or pinch zoom).
    ViewChanged,
    /// A draw rectangle is in progress; both corners in screen space.
    DrawPreview { start: Vec2, current: Vec2 },
    /// A completed draw, already converted to normalized page space.
    CommitDraw(NormRect),
    /// A mask is being dragged; delta in normalized page space.
    MaskDrag { mask_id: Uuid, delta: Vec2 },
    /// Drag finished and should be written to the store.
    CommitMaskMove { mask_id: Uuid },
    /// Press released without qualifying as anything else.
    Tap { pos: Vec2 },
}

pub struct GestureEngine {
    state: GestureState,
}

impl Default for GestureEngine {
    fn default() -> Self {
        Self {
            state: GestureState::Idle,
        }
    }
}

impl GestureEngine {
    pub fn is_pinching(&self) -> bool {
        matches!(self.state, GestureState::Pinching { .. })
    }

    /// Screen-space draw rectangle in progress, for the preview overlay.
    pub fn draw_preview(&self) -> Option<(Vec2, Vec2)> {
        match self.state {
            GestureState::Drawing { start, current } => Some((start, current)),
            _ => None,
        }
    }

    /// First pointer down. `hit` is the topmost mask under the pointer, only
    /// meaningful in edit mode.
    pub fn pointer_down(
        &mut self,
        pos: Vec2,
        shift: bool,
        hit: Option<Uuid>,
        mode: SurfaceMode,
    ) -> GestureOutcome {
        self.state = match mode {
            SurfaceMode::Edit if shift => GestureState::Panning { last: pos },
            SurfaceMode::Edit => match hit {
                Some(mask_id) => GestureState::MovingMask {
                    mask_id,
                    last: pos,
                    moved: false,
                },
                None => GestureState::Pressed {
                    start: pos,
                    held: 0.0,
                    armed: true,
                },
            },
            SurfaceMode::Review | SurfaceMode::Picker => GestureState::Pressed {
                start: pos,
                held: 0.0,
                armed: false,
            },
        };
        GestureOutcome::None
    }

    /// A second pointer arrived. Whatever was in flight is abandoned.
    pub fn second_pointer_down(&mut self, a: Vec2, b: Vec2) {
        self.state = GestureState::Pinching { a, b };
    }

    /// Advance the long-press timer. Call once per frame while a pointer is
    /// held.
    pub fn tick(&mut self, dt: f32) {
        if let GestureState::Pressed { start, held, armed } = self.state {
            let held = held + dt;
            if armed && held >= LONG_PRESS_SECS {
                self.state = GestureState::Panning { last: start };
            } else {
                self.state = GestureState::Pressed { start, held, armed };
            }
        }
    }

    pub fn pointer_move(
        &mut self,
        pos: Vec2,
        viewport: &mut Viewport,
        ctx: &GestureContext,
    ) -> GestureOutcome {
        match self.state {
            GestureState::Idle | GestureState::Pinching { .. } => GestureOutcome::None,
            GestureState::Pressed { start, held, armed } => {
                if (pos - start).length() <= JITTER_THRESHOLD_PX {
                    return GestureOutcome::None;
                }
                if armed {
                    self.state = GestureState::Drawing {
                        start,
                        current: pos,
                    };
                    GestureOutcome::DrawPreview {
                        start,
                        current: pos,
                    }
                } else {
                    // Keep the distance already travelled instead of jumping
                    viewport.translate(pos - start);
                    self.state = GestureState::Panning { last: pos };
                    let _ = held;
                    GestureOutcome::ViewChanged
                }
            }
            GestureState::Panning { last } => {
                viewport.translate(pos - last);
                self.state = GestureState::Panning { last: pos };
                GestureOutcome::ViewChanged
            }
            GestureState::Drawing { start, .. } => {
                self.state = GestureState::Drawing {
                    start,
                    current: pos,
                };
                GestureOutcome::DrawPreview {
                    start,
                    current: pos,
                }
            }
            GestureState::MovingMask { mask_id, last, .. } => {
                let screen_delta = pos - last;
                if screen_delta == Vec2::ZERO {
                    return GestureOutcome::None;
                }
                self.state = GestureState::MovingMask {
                    mask_id,
                    last: pos,
                    moved: true,
                };
                let world_delta = screen_delta / viewport.zoom;
                GestureOutcome::MaskDrag {
                    mask_id,
                    delta: Vec2::new(world_delta.x / ctx.page.x, world_delta.y / ctx.page.y),
                }
            }
        }
    }

    /// Both pinch pointers moved. Applies the zoom about the midpoint and
    /// carries midpoint travel into the pan.
    pub fn pinch_move(
        &mut self,
        a: Vec2,
        b: Vec2,
        viewport: &mut Viewport,
        ctx: &GestureContext,
    ) -> GestureOutcome {
        let GestureState::Pinching { a: pa, b: pb } = self.state else {
            return GestureOutcome::None;
        };
        let prev_dist = (pa - pb).length();
        let dist = (a - b).length();
        if (dist - prev_dist).abs() < PINCH_MOVE_THRESHOLD_PX && (a - pa).length() < 0.5 {
            return GestureOutcome::None;
        }

        let prev_mid = (pa + pb) / 2.0;
        let mid = (a + b) / 2.0;
        if prev_dist > f32::EPSILON {
            let new_zoom = (viewport.zoom * dist / prev_dist).clamp(ctx.min_zoom, ctx.max_zoom);
            viewport.zoom_at(mid, new_zoom);
        }
        viewport.translate(mid - prev_mid);

        self.state = GestureState::Pinching { a, b };
        GestureOutcome::ViewChanged
    }

    /// One pinch pointer lifted; the survivor continues as a pan.
    pub fn pinch_end(&mut self, remaining: Vec2) {
        if matches!(self.state, GestureState::Pinching { .. }) {
            self.state = GestureState::Panning { last: remaining };
        }
    }

    pub fn pointer_up(
        &mut self,
        pos: Vec2,
        viewport: &Viewport,
        ctx: &GestureContext,
    ) -> GestureOutcome {
        let state = std::mem::replace(&mut self.state, GestureState::Idle);
        match state {
            GestureState::Idle | GestureState::Panning { .. } | GestureState::Pinching { .. } => {
                GestureOutcome::None
            }
            GestureState::Pressed { start, .. } => GestureOutcome::Tap { pos: start },
            GestureState::Drawing { start, .. } => {
                let extent = (pos - start).abs();
                if extent.x < MIN_MASK_DRAW_PX || extent.y < MIN_MASK_DRAW_PX {
                    // Too small to be a deliberate mask
                    return GestureOutcome::Tap { pos: start };
                }
                let a = world_to_normalized(viewport.screen_to_world(start), ctx.page);
                let b = world_to_normalized(viewport.screen_to_world(pos), ctx.page);
                GestureOutcome::CommitDraw(NormRect::from_corners(a, b))
            }
            GestureState::MovingMask { mask_id, moved, .. } => {
                if moved {
                    GestureOutcome::CommitMaskMove { mask_id }
                } else {
                    GestureOutcome::Tap { pos }
                }
            }
        }
    }

    /// Abandon whatever gesture is in flight (focus loss, screen change).
    pub fn cancel(&mut self) {
        self.state = GestureState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> GestureContext {
        GestureContext {
            page: Vec2::new(1000.0, 800.0),
            min_zoom: 0.1,
            max_zoom: 10.0,
        }
    }

    fn vp() -> Viewport {
        Viewport {
            pan: Vec2::ZERO,
            zoom: 1.0,
        }
    }

    #[test]
    fn test_edit_press_then_drag_draws() {
        let mut engine = GestureEngine::default();
        let mut viewport = vp();
        engine.pointer_down(Vec2::new(100.0, 100.0), false, None, SurfaceMode::Edit);

        // Inside jitter: still undecided
        let out = engine.pointer_move(Vec2::new(103.0, 100.0), &mut viewport, &ctx());
        assert_eq!(out, GestureOutcome::None);

        let out = engine.pointer_move(Vec2::new(140.0, 160.0), &mut viewport, &ctx());
        assert!(matches!(out, GestureOutcome::DrawPreview { .. }));

        let out = engine.pointer_up(Vec2::new(200.0, 180.0), &viewport, &ctx());
        let GestureOutcome::CommitDraw(rect) = out else {
            panic!("expected a committed draw, got {out:?}");
        };
        assert!((rect.x - 0.1).abs() < 1e-4);
        assert!((rect.y - 0.125).abs() < 1e-4);
        assert!((rect.w - 0.1).abs() < 1e-4);
        assert!((rect.h - 0.1).abs() < 1e-4);
    }

    #[test]
    fn test_tiny_draw_degrades_to_tap() {
        let mut engine = GestureEngine::default();
        let mut viewport = vp();
        engine.pointer_down(Vec2::new(100.0, 100.0), false, None, SurfaceMode::Edit);
        engine.pointer_move(Vec2::new(110.0, 104.0), &mut viewport, &ctx());
        let out = engine.pointer_up(Vec2::new(110.0, 104.0), &viewport, &ctx());
        assert_eq!(
            out,
            GestureOutcome::Tap {
                pos: Vec2::new(100.0, 100.0)
            }
        );
    }

    #[test]
    fn test_long_press_becomes_pan() {
        let mut engine = GestureEngine::default();
        let mut viewport = vp();
        engine.pointer_down(Vec2::new(50.0, 50.0), false, None, SurfaceMode::Edit);
        engine.tick(LONG_PRESS_SECS + 0.01);

        let out = engine.pointer_move(Vec2::new(80.0, 50.0), &mut viewport, &ctx());
        assert_eq!(out, GestureOutcome::ViewChanged);
        assert!((viewport.pan.x - 30.0).abs() < 1e-3);
    }

    #[test]
    fn test_jitter_before_timer_cancels_long_press() {
        let mut engine = GestureEngine::default();
        let mut viewport = vp();
        engine.pointer_down(Vec2::new(50.0, 50.0), false, None, SurfaceMode::Edit);
        engine.tick(0.1);
        let out = engine.pointer_move(Vec2::new(70.0, 50.0), &mut viewport, &ctx());
        assert!(matches!(out, GestureOutcome::DrawPreview { .. }));
        // Timer must not fire once the draw started
        engine.tick(LONG_PRESS_SECS);
        assert!(engine.draw_preview().is_some());
    }

    #[test]
    fn test_shift_press_pans_immediately() {
        let mut engine = GestureEngine::default();
        let mut viewport = vp();
        engine.pointer_down(Vec2::new(10.0, 10.0), true, None, SurfaceMode::Edit);
        let out = engine.pointer_move(Vec2::new(15.0, 25.0), &mut viewport, &ctx());
        assert_eq!(out, GestureOutcome::ViewChanged);
        assert!((viewport.pan - Vec2::new(5.0, 15.0)).length() < 1e-3);
    }

    #[test]
    fn test_press_on_mask_drags_it() {
        let mask_id = Uuid::new_v4();
        let mut engine = GestureEngine::default();
        let mut viewport = Viewport {
            pan: Vec2::ZERO,
            zoom: 2.0,
        };
        engine.pointer_down(Vec2::new(100.0, 100.0), false, Some(mask_id), SurfaceMode::Edit);
        let out = engine.pointer_move(Vec2::new(120.0, 100.0), &mut viewport, &ctx());
        let GestureOutcome::MaskDrag { mask_id: id, delta } = out else {
            panic!("expected a mask drag, got {out:?}");
        };
        assert_eq!(id, mask_id);
        // 20 screen px at zoom 2 is 10 world px, 0.01 of a 1000 px page
        assert!((delta.x - 0.01).abs() < 1e-5);
        assert_eq!(delta.y, 0.0);

        let out = engine.pointer_up(Vec2::new(120.0, 100.0), &viewport, &ctx());
        assert_eq!(out, GestureOutcome::CommitMaskMove { mask_id });
    }

    #[test]
    fn test_press_on_mask_without_motion_is_tap() {
        let mut engine = GestureEngine::default();
        let viewport = vp();
        engine.pointer_down(Vec2::new(100.0, 100.0), false, Some(Uuid::new_v4()), SurfaceMode::Edit);
        let out = engine.pointer_up(Vec2::new(100.0, 100.0), &viewport, &ctx());
        assert!(matches!(out, GestureOutcome::Tap { .. }));
    }

    #[test]
    fn test_review_tap_and_pan() {
        let mut engine = GestureEngine::default();
        let mut viewport = vp();

        // Tap: press and release without exceeding jitter
        engine.pointer_down(Vec2::new(30.0, 40.0), false, None, SurfaceMode::Review);
        let out = engine.pointer_up(Vec2::new(32.0, 41.0), &viewport, &ctx());
        assert_eq!(
            out,
            GestureOutcome::Tap {
                pos: Vec2::new(30.0, 40.0)
            }
        );

        // Pan: exceed jitter, never draw in review mode
        engine.pointer_down(Vec2::new(30.0, 40.0), false, None, SurfaceMode::Review);
        let out = engine.pointer_move(Vec2::new(60.0, 40.0), &mut viewport, &ctx());
        assert_eq!(out, GestureOutcome::ViewChanged);
        let out = engine.pointer_up(Vec2::new(60.0, 40.0), &viewport, &ctx());
        assert_eq!(out, GestureOutcome::None);
    }

    #[test]
    fn test_review_long_hold_does_not_pan_in_place() {
        let mut engine = GestureEngine::default();
        let viewport = vp();
        engine.pointer_down(Vec2::new(30.0, 40.0), false, None, SurfaceMode::Review);
        engine.tick(10.0);
        // Without the armed flag the timer must not promote to pan
        let out = engine.pointer_up(Vec2::new(30.0, 40.0), &viewport, &ctx());
        assert!(matches!(out, GestureOutcome::Tap { .. }));
    }

    #[test]
    fn test_second_pointer_aborts_draw() {
        let mut engine = GestureEngine::default();
        let mut viewport = vp();
        engine.pointer_down(Vec2::new(100.0, 100.0), false, None, SurfaceMode::Edit);
        engine.pointer_move(Vec2::new(150.0, 150.0), &mut viewport, &ctx());
        assert!(engine.draw_preview().is_some());

        engine.second_pointer_down(Vec2::new(150.0, 150.0), Vec2::new(250.0, 150.0));
        assert!(engine.draw_preview().is_none());
        let out = engine.pointer_up(Vec2::new(150.0, 150.0), &viewport, &ctx());
        assert_eq!(out, GestureOutcome::None);
    }

    #[test]
    fn test_pinch_zooms_about_midpoint() {
        let mut engine = GestureEngine::default();
        let mut viewport = vp();
        let mid = Vec2::new(200.0, 200.0);
        engine.second_pointer_down(Vec2::new(150.0, 200.0), Vec2::new(250.0, 200.0));
        let world_at_mid = viewport.screen_to_world(mid);

        let out = engine.pinch_move(
            Vec2::new(100.0, 200.0),
            Vec2::new(300.0, 200.0),
            &mut viewport,
            &ctx(),
        );
        assert_eq!(out, GestureOutcome::ViewChanged);
        assert!((viewport.zoom - 2.0).abs() < 1e-4);
        // Same world point stays under the midpoint
        assert!((viewport.screen_to_world(mid) - world_at_mid).length() < 1e-3);
    }

    #[test]
    fn test_pinch_zoom_clamps_to_limits() {
        let mut engine = GestureEngine::default();
        let mut viewport = vp();
        engine.second_pointer_down(Vec2::new(190.0, 200.0), Vec2::new(210.0, 200.0));
        engine.pinch_move(
            Vec2::new(0.0, 200.0),
            Vec2::new(400.0, 200.0),
            &mut viewport,
            &ctx(),
        );
        assert!(viewport.zoom <= ctx().max_zoom + 1e-6);
    }

    #[test]
    fn test_pinch_end_continues_as_pan() {
        let mut engine = GestureEngine::default();
        let mut viewport = vp();
        engine.second_pointer_down(Vec2::new(100.0, 100.0), Vec2::new(200.0, 100.0));
        engine.pinch_end(Vec2::new(100.0, 100.0));
        let out = engine.pointer_move(Vec2::new(120.0, 100.0), &mut viewport, &ctx());
        assert_eq!(out, GestureOutcome::ViewChanged);
    }
}
