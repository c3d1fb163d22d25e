//! Mask editor: pointer input translation, canvas state, and group/mask
//! mutations.

mod canvas;
mod gestures;

pub use canvas::{
    CanvasArea, CanvasCamera, CanvasView, GestureEngineRes, MaskStyle, OpenPage,
};
pub use gestures::{GestureContext, GestureEngine, GestureOutcome, SurfaceMode};

use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_egui::EguiContexts;
use chrono::Utc;
use std::collections::HashSet;
use uuid::Uuid;

use crate::config::UpdateLastPrintRequest;
use crate::geometry::world_to_normalized;
use crate::model::{self, Mask, MoveDirection, NormRect};
use crate::store::{Cache, Store};
use crate::ui::Screen;

/// Editor selection state: the open print, the group new masks land in, and
/// the masks selected for reassignment or deletion.
#[derive(Resource, Default)]
pub struct EditorState {
    pub current_print: Option<Uuid>,
    pub current_group: Option<Uuid>,
    pub selected_masks: HashSet<Uuid>,
}

/// Resource holding the last canvas open failure for display to the user.
#[derive(Resource, Default)]
pub struct CanvasLoadError {
    pub message: Option<String>,
}

/// Open a print's page on the canvas. Does not change the active screen.
#[derive(Message)]
pub struct OpenPrintRequest {
    pub print_id: Uuid,
}

/// A press released without becoming a pan, draw, or drag. Carries the
/// normalized page position and the topmost mask under it.
#[derive(Message)]
pub struct CanvasTap {
    pub norm: Vec2,
    pub mask: Option<Uuid>,
}

#[derive(Message)]
pub struct CommitDrawRequest {
    pub rect: NormRect,
}

#[derive(Message)]
pub struct CommitMaskMoveRequest {
    pub mask_id: Uuid,
}

#[derive(Message)]
pub struct CreateGroupRequest;

#[derive(Message)]
pub struct RenameGroupRequest {
    pub group_id: Uuid,
    pub label: String,
}

#[derive(Message)]
pub struct ReorderGroupRequest {
    pub group_id: Uuid,
    pub direction: MoveDirection,
}

#[derive(Message)]
pub struct DeleteGroupRequest {
    pub group_id: Uuid,
}

#[derive(Message)]
pub struct SetGroupActiveRequest {
    pub group_id: Uuid,
    pub is_active: bool,
}

#[derive(Message)]
pub struct DeleteSelectedMasksRequest;

#[derive(Message)]
pub struct ReassignSelectedMasksRequest {
    pub target_group: Uuid,
}

#[derive(Message)]
pub struct DeletePrintRequest {
    pub print_id: Uuid,
}

#[derive(Message)]
pub struct RenamePrintRequest {
    pub print_id: Uuid,
    pub title: String,
}

#[derive(Message)]
pub struct SetPrintSubjectRequest {
    pub print_id: Uuid,
    pub subject: String,
    pub subject_other: String,
}

#[derive(Message)]
pub struct FitViewRequest;

#[derive(Message)]
pub struct ZoomStepRequest {
    pub zoom_in: bool,
}

fn surface_mode(screen: &Screen) -> Option<SurfaceMode> {
    match screen {
        Screen::Edit => Some(SurfaceMode::Edit),
        Screen::Review => Some(SurfaceMode::Review),
        Screen::Picker => Some(SurfaceMode::Picker),
        _ => None,
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Feeds mouse and touch input to the gesture engine and applies the
/// outcomes. Mask drags mutate the cache directly so the sprite follows the
/// pointer; the store write happens on release via [`CommitMaskMoveRequest`].
#[allow(clippy::too_many_arguments)]
fn pointer_input(
    time: Res<Time>,
    mouse: Res<ButtonInput<MouseButton>>,
    keys: Res<ButtonInput<KeyCode>>,
    touches: Res<Touches>,
    window_query: Query<&Window, With<PrimaryWindow>>,
    mut contexts: EguiContexts,
    mut engine: ResMut<GestureEngineRes>,
    mut view: ResMut<CanvasView>,
    area: Res<CanvasArea>,
    mut cache: ResMut<Cache>,
    screen: Res<State<Screen>>,
    mut taps: MessageWriter<CanvasTap>,
    mut draw_commits: MessageWriter<CommitDrawRequest>,
    mut move_commits: MessageWriter<CommitMaskMoveRequest>,
) {
    let Some(mode) = surface_mode(screen.get()) else {
        engine.0.cancel();
        return;
    };
    let Some(open) = view.open.as_mut() else {
        engine.0.cancel();
        return;
    };
    let (min_zoom, max_zoom) = open.zoom_limits();
    let ctx = GestureContext {
        page: open.page,
        min_zoom,
        max_zoom,
    };

    let touch_positions: Vec<Vec2> = touches.iter().map(|t| t.position()).collect();

    // Two fingers override everything else
    if touch_positions.len() >= 2 {
        let (a, b) = (touch_positions[0], touch_positions[1]);
        if engine.0.is_pinching() {
            engine.0.pinch_move(a, b, &mut open.viewport, &ctx);
        } else {
            engine.0.second_pointer_down(a, b);
        }
        return;
    }
    if engine.0.is_pinching() {
        match touch_positions.first() {
            Some(&pos) => engine.0.pinch_end(pos),
            None => engine.0.cancel(),
        }
        return;
    }

    // Single pointer: a touch if there is one, the mouse otherwise
    let (pos, just_pressed, pressed, just_released) = if let Some(&pos) = touch_positions.first() {
        (
            Some(pos),
            touches.iter_just_pressed().next().is_some(),
            true,
            false,
        )
    } else if touches.iter_just_released().next().is_some() {
        (
            touches.iter_just_released().next().map(|t| t.position()),
            false,
            false,
            true,
        )
    } else {
        let cursor = window_query.single().ok().and_then(|w| w.cursor_position());
        (
            cursor,
            mouse.just_pressed(MouseButton::Left),
            mouse.pressed(MouseButton::Left),
            mouse.just_released(MouseButton::Left),
        )
    };
    let Some(pos) = pos else {
        return;
    };

    if just_pressed {
        if let Ok(egui_ctx) = contexts.ctx_mut()
            && egui_ctx.is_pointer_over_area()
        {
            return;
        }
        if !area.rect.contains(pos) {
            return;
        }
        let shift = keys.pressed(KeyCode::ShiftLeft) || keys.pressed(KeyCode::ShiftRight);
        let hit = if mode == SurfaceMode::Edit {
            let norm = world_to_normalized(open.viewport.screen_to_world(pos), open.page);
            let masks = cache.masks_of_print(open.print_id);
            model::hit_test_masks(&masks, norm)
        } else {
            None
        };
        engine.0.pointer_down(pos, shift, hit, mode);
        return;
    }

    if pressed {
        engine.0.tick(time.delta_secs());
        let outcome = engine.0.pointer_move(pos, &mut open.viewport, &ctx);
        if let GestureOutcome::MaskDrag { mask_id, delta } = outcome
            && let Some(mask) = cache.mask_mut(mask_id)
        {
            mask.rect = mask.rect.translated(delta.x, delta.y);
        }
        return;
    }

    if just_released {
        match engine.0.pointer_up(pos, &open.viewport, &ctx) {
            GestureOutcome::CommitDraw(rect) => {
                draw_commits.write(CommitDrawRequest { rect });
            }
            GestureOutcome::CommitMaskMove { mask_id } => {
                move_commits.write(CommitMaskMoveRequest { mask_id });
            }
            GestureOutcome::Tap { pos } => {
                let norm = world_to_normalized(open.viewport.screen_to_world(pos), open.page);
                let mask = model::hit_test_masks(&cache.masks_of_print(open.print_id), norm);
                taps.write(CanvasTap { norm, mask });
            }
            _ => {}
        }
    }
}

/// Locate a page image on disk. Returns an absolute path: the asset server
/// resolves relative paths under the asset root, and in dev mode the pages
/// directory is relative to the working directory.
fn resolve_page_image(
    dir: &std::path::Path,
    file_name: &std::path::Path,
) -> Result<std::path::PathBuf, crate::store::StoreError> {
    let path = dir.join(file_name);
    if !path.exists() {
        return Err(crate::store::StoreError::MissingImage(path));
    }
    Ok(path.canonicalize().unwrap_or(path))
}

fn handle_open_print(
    mut events: MessageReader<OpenPrintRequest>,
    cache: Res<Cache>,
    mut view: ResMut<CanvasView>,
    mut editor_state: ResMut<EditorState>,
    mut load_error: ResMut<CanvasLoadError>,
    area: Res<CanvasArea>,
    mut config_events: MessageWriter<UpdateLastPrintRequest>,
) {
    for event in events.read() {
        let page = match cache.page_for_print(event.print_id) {
            Ok(page) => page,
            Err(e) => {
                error!("Cannot open print: {e}");
                load_error.message = Some(e.to_string());
                continue;
            }
        };
        let image_path = match resolve_page_image(&crate::paths::pages_dir(), &page.image_path) {
            Ok(path) => path,
            Err(e) => {
                error!("Cannot open print: {e}");
                load_error.message = Some(e.to_string());
                continue;
            }
        };

        let mut open = OpenPage {
            print_id: event.print_id,
            page: page.size(),
            image_path,
            viewport: Default::default(),
            fit: 1.0,
        };
        open.fit_to(area.rect);
        view.open = Some(open);

        editor_state.current_print = Some(event.print_id);
        editor_state.current_group = cache.groups_of_print(event.print_id).first().map(|g| g.id);
        editor_state.selected_masks.clear();
        config_events.write(UpdateLastPrintRequest {
            print_id: event.print_id,
        });
    }
}

fn apply_commit_draw(
    mut events: MessageReader<CommitDrawRequest>,
    mut store: ResMut<Store>,
    mut cache: ResMut<Cache>,
    mut editor_state: ResMut<EditorState>,
) {
    for event in events.read() {
        // A drawn mask always lands in a group. If none is selected (the
        // print's last group was deleted), create one on the spot.
        let group_id = match editor_state.current_group {
            Some(id) if store.group(id).is_some() => id,
            _ => {
                let Some(print_id) = editor_state.current_print else {
                    warn!("Drawn mask dropped: no print open");
                    continue;
                };
                let id = model::create_group(&mut store, print_id, 0, now_ms());
                editor_state.current_group = Some(id);
                id
            }
        };
        if model::draw_mask(&mut store, group_id, event.rect, now_ms()).is_none() {
            warn!("Drawn mask dropped: group no longer exists");
            continue;
        }
        cache.reload(&store);
    }
}

/// Writes the cache's optimistically moved rect back to the store.
fn apply_commit_mask_move(
    mut events: MessageReader<CommitMaskMoveRequest>,
    mut store: ResMut<Store>,
    mut cache: ResMut<Cache>,
) {
    for event in events.read() {
        let Some(mask) = cache.mask(event.mask_id) else {
            continue;
        };
        let moved: Mask = mask.clone();
        store.put_mask(moved);
        cache.reload(&store);
    }
}

/// Edit-mode tap: toggle the mask under the pointer in the selection, or
/// clear the selection on empty page.
fn edit_tap(
    mut events: MessageReader<CanvasTap>,
    mut editor_state: ResMut<EditorState>,
    cache: Res<Cache>,
) {
    for event in events.read() {
        match event.mask {
            Some(mask_id) => {
                if !editor_state.selected_masks.remove(&mask_id) {
                    editor_state.selected_masks.insert(mask_id);
                }
                // Selecting a mask also makes its group current
                if let Some(mask) = cache.mask(mask_id) {
                    editor_state.current_group = Some(mask.group_id);
                }
            }
            None => editor_state.selected_masks.clear(),
        }
    }
}

fn handle_create_group(
    mut events: MessageReader<CreateGroupRequest>,
    mut store: ResMut<Store>,
    mut cache: ResMut<Cache>,
    mut editor_state: ResMut<EditorState>,
) {
    for _ in events.read() {
        let Some(print_id) = editor_state.current_print else {
            continue;
        };
        let id = model::create_group(&mut store, print_id, 0, now_ms());
        editor_state.current_group = Some(id);
        cache.reload(&store);
    }
}

fn handle_rename_group(
    mut events: MessageReader<RenameGroupRequest>,
    mut store: ResMut<Store>,
    mut cache: ResMut<Cache>,
) {
    for event in events.read() {
        let label = event.label.trim();
        if label.is_empty() {
            continue;
        }
        if let Some(mut group) = store.group(event.group_id).cloned() {
            group.label = label.to_string();
            store.put_group(group);
            cache.reload(&store);
        }
    }
}

fn handle_reorder_group(
    mut events: MessageReader<ReorderGroupRequest>,
    mut store: ResMut<Store>,
    mut cache: ResMut<Cache>,
) {
    for event in events.read() {
        if model::reorder_group(&mut store, event.group_id, event.direction) {
            cache.reload(&store);
        }
    }
}

fn handle_delete_group(
    mut events: MessageReader<DeleteGroupRequest>,
    mut store: ResMut<Store>,
    mut cache: ResMut<Cache>,
    mut editor_state: ResMut<EditorState>,
) {
    for event in events.read() {
        let fallback = model::delete_group(&mut store, event.group_id);
        if editor_state.current_group == Some(event.group_id) {
            editor_state.current_group = fallback;
        }
        editor_state
            .selected_masks
            .retain(|id| store.mask(*id).is_some());
        cache.reload(&store);
    }
}

fn handle_set_group_active(
    mut events: MessageReader<SetGroupActiveRequest>,
    mut store: ResMut<Store>,
    mut cache: ResMut<Cache>,
) {
    for event in events.read() {
        if let Some(mut group) = store.group(event.group_id).cloned() {
            group.is_active = event.is_active;
            store.put_group(group);
            cache.reload(&store);
        }
    }
}

fn handle_delete_selected_masks(
    mut events: MessageReader<DeleteSelectedMasksRequest>,
    mut store: ResMut<Store>,
    mut cache: ResMut<Cache>,
    mut editor_state: ResMut<EditorState>,
) {
    for _ in events.read() {
        let ids: Vec<Uuid> = editor_state.selected_masks.drain().collect();
        model::delete_masks(&mut store, &ids);
        cache.reload(&store);
    }
}

fn handle_reassign_selected_masks(
    mut events: MessageReader<ReassignSelectedMasksRequest>,
    mut store: ResMut<Store>,
    mut cache: ResMut<Cache>,
    mut editor_state: ResMut<EditorState>,
) {
    for event in events.read() {
        let ids: Vec<Uuid> = editor_state.selected_masks.iter().copied().collect();
        model::reassign_masks(&mut store, &ids, event.target_group);
        editor_state.selected_masks.clear();
        cache.reload(&store);
    }
}

fn handle_rename_print(
    mut events: MessageReader<RenamePrintRequest>,
    mut store: ResMut<Store>,
    mut cache: ResMut<Cache>,
) {
    for event in events.read() {
        if model::rename_print(&mut store, event.print_id, &event.title) {
            cache.reload(&store);
        }
    }
}

fn handle_set_print_subject(
    mut events: MessageReader<SetPrintSubjectRequest>,
    mut store: ResMut<Store>,
    mut cache: ResMut<Cache>,
) {
    for event in events.read() {
        if model::set_print_subject(&mut store, event.print_id, &event.subject, &event.subject_other)
        {
            cache.reload(&store);
        }
    }
}

fn handle_delete_print(
    mut events: MessageReader<DeletePrintRequest>,
    mut store: ResMut<Store>,
    mut cache: ResMut<Cache>,
    mut view: ResMut<CanvasView>,
    mut editor_state: ResMut<EditorState>,
) {
    for event in events.read() {
        let orphaned_images = store.delete_print_cascade(event.print_id);
        for relative in orphaned_images {
            let path = crate::paths::pages_dir().join(relative);
            if let Err(e) = std::fs::remove_file(&path) {
                warn!("Could not remove page image {:?}: {}", path, e);
            }
        }
        if editor_state.current_print == Some(event.print_id) {
            *editor_state = EditorState::default();
            view.open = None;
        }
        cache.reload(&store);
    }
}

fn handle_view_requests(
    mut fit_events: MessageReader<FitViewRequest>,
    mut zoom_events: MessageReader<ZoomStepRequest>,
    mut view: ResMut<CanvasView>,
    area: Res<CanvasArea>,
) {
    let Some(open) = view.open.as_mut() else {
        fit_events.clear();
        zoom_events.clear();
        return;
    };
    for _ in fit_events.read() {
        open.fit_to(area.rect);
    }
    for event in zoom_events.read() {
        let factor = if event.zoom_in {
            crate::constants::ZOOM_BUTTON_STEP
        } else {
            1.0 / crate::constants::ZOOM_BUTTON_STEP
        };
        let anchor = area.rect.center();
        let new_zoom = open.viewport.zoom * factor;
        open.zoom_clamped(anchor, new_zoom);
    }
}

/// Keeps the mask styling in sync with the editor selection.
fn edit_mask_style(editor_state: Res<EditorState>, mut style: ResMut<MaskStyle>) {
    if !editor_state.is_changed() {
        return;
    }
    style.revealed.clear();
    style.highlighted_groups.clear();
    if let Some(group_id) = editor_state.current_group {
        style.highlighted_groups.insert(group_id);
    }
    style.show_labels = true;
}

pub struct EditorPlugin;

impl Plugin for EditorPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CanvasView>()
            .init_resource::<CanvasArea>()
            .init_resource::<MaskStyle>()
            .init_resource::<GestureEngineRes>()
            .init_resource::<EditorState>()
            .init_resource::<CanvasLoadError>()
            .add_message::<OpenPrintRequest>()
            .add_message::<CanvasTap>()
            .add_message::<CommitDrawRequest>()
            .add_message::<CommitMaskMoveRequest>()
            .add_message::<CreateGroupRequest>()
            .add_message::<RenameGroupRequest>()
            .add_message::<ReorderGroupRequest>()
            .add_message::<DeleteGroupRequest>()
            .add_message::<SetGroupActiveRequest>()
            .add_message::<DeleteSelectedMasksRequest>()
            .add_message::<ReassignSelectedMasksRequest>()
            .add_message::<DeletePrintRequest>()
            .add_message::<RenamePrintRequest>()
            .add_message::<SetPrintSubjectRequest>()
            .add_message::<FitViewRequest>()
            .add_message::<ZoomStepRequest>()
            .add_systems(Startup, canvas::spawn_canvas_camera)
            .add_systems(
                Update,
                (
                    pointer_input,
                    canvas::wheel_zoom,
                    handle_view_requests,
                    handle_open_print.run_if(on_message::<OpenPrintRequest>),
                    apply_commit_draw.run_if(on_message::<CommitDrawRequest>),
                    apply_commit_mask_move.run_if(on_message::<CommitMaskMoveRequest>),
                ),
            )
            .add_systems(
                Update,
                (
                    edit_tap.run_if(in_state(Screen::Edit).and(on_message::<CanvasTap>)),
                    edit_mask_style.run_if(in_state(Screen::Edit)),
                    handle_create_group.run_if(on_message::<CreateGroupRequest>),
                    handle_rename_group.run_if(on_message::<RenameGroupRequest>),
                    handle_reorder_group.run_if(on_message::<ReorderGroupRequest>),
                    handle_delete_group.run_if(on_message::<DeleteGroupRequest>),
                    handle_set_group_active.run_if(on_message::<SetGroupActiveRequest>),
                    handle_delete_selected_masks.run_if(on_message::<DeleteSelectedMasksRequest>),
                    handle_reassign_selected_masks
                        .run_if(on_message::<ReassignSelectedMasksRequest>),
                    handle_delete_print.run_if(on_message::<DeletePrintRequest>),
                    handle_rename_print.run_if(on_message::<RenamePrintRequest>),
                    handle_set_print_subject.run_if(on_message::<SetPrintSubjectRequest>),
                ),
            )
            .add_systems(
                PostUpdate,
                (
                    canvas::sync_camera_to_view,
                    canvas::sync_canvas_sprites,
                    canvas::draw_preview_gizmo,
                ),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_resolve_page_image_yields_absolute_path() {
        // Relative base, as pages_dir() is in dev mode
        let dir = Path::new("target").join("page-image-test");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("page.jpg"), b"jpeg").unwrap();

        let resolved = resolve_page_image(&dir, Path::new("page.jpg")).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_resolve_page_image_missing_is_error() {
        let result = resolve_page_image(Path::new("target"), Path::new("no-such-page.jpg"));
        assert!(matches!(
            result,
            Err(crate::store::StoreError::MissingImage(_))
        ));
    }
}
