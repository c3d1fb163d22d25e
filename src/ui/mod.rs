mod edit_panel;
mod home;
mod picker_panel;
mod review_panel;
mod today;

use bevy::prelude::*;
use bevy_egui::{EguiContexts, EguiPrimaryContextPass, egui};

use crate::editor::{CanvasArea, CanvasLoadError};
use crate::import::{AsyncImportOperation, ImportError};
use crate::store::{AsyncStoreOperation, StoreSaveError};

/// Set containing every screen's panel systems, so the shared overlays and
/// the canvas-area capture can run after all of them.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScreenPanels;

/// Top-level application screens.
#[derive(States, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Screen {
    #[default]
    Home,
    Edit,
    Today,
    Review,
    Picker,
    Done,
}

/// Captures the screen rectangle left free by the egui panels, for fitting
/// the page and gating pointer input. Must run after every panel system.
fn capture_canvas_area(mut contexts: EguiContexts, mut area: ResMut<CanvasArea>) -> Result {
    let ctx = contexts.ctx_mut()?;
    let rect = ctx.available_rect();
    let new = Rect::new(rect.min.x, rect.min.y, rect.max.x, rect.max.y);
    // Writing every frame would retrigger change detection downstream
    if area.rect != new {
        area.rect = new;
    }
    Ok(())
}

/// Error dialogs shared by every screen.
fn error_dialogs_ui(
    mut contexts: EguiContexts,
    mut save_error: ResMut<StoreSaveError>,
    mut load_error: ResMut<CanvasLoadError>,
    mut import_error: ResMut<ImportError>,
) -> Result {
    let ctx = contexts.ctx_mut()?.clone();

    let mut dialogs: [(&str, &mut Option<String>); 3] = [
        ("Save failed", &mut save_error.message),
        ("Could not open print", &mut load_error.message),
        ("Import failed", &mut import_error.message),
    ];
    for (title, message) in dialogs.iter_mut() {
        let Some(text) = message.clone() else {
            continue;
        };
        let mut dismissed = false;
        egui::Window::new(*title)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(&ctx, |ui| {
                ui.label(text);
                ui.add_space(8.0);
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });
        if dismissed {
            **message = None;
        }
    }
    Ok(())
}

/// Small corner indicator while a flush or import is running.
fn busy_indicator_ui(
    mut contexts: EguiContexts,
    store_op: Res<AsyncStoreOperation>,
    import_op: Res<AsyncImportOperation>,
) -> Result {
    let label = if import_op.is_importing {
        "Importing photo..."
    } else if store_op.is_flushing {
        "Saving..."
    } else {
        return Ok(());
    };

    egui::Area::new(egui::Id::new("busy_indicator"))
        .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-12.0, -12.0))
        .show(contexts.ctx_mut()?, |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(label);
                });
            });
        });
    Ok(())
}

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<Screen>()
            .init_resource::<home::HomeUiState>()
            .init_resource::<edit_panel::EditUiState>()
            .init_resource::<today::TodayUiState>()
            .add_systems(
                EguiPrimaryContextPass,
                (
                    home::home_ui.run_if(in_state(Screen::Home)),
                    today::today_ui.run_if(in_state(Screen::Today)),
                    edit_panel::edit_panel_ui.run_if(in_state(Screen::Edit)),
                    review_panel::review_panel_ui.run_if(in_state(Screen::Review)),
                    review_panel::done_ui.run_if(in_state(Screen::Done)),
                    picker_panel::picker_panel_ui.run_if(in_state(Screen::Picker)),
                )
                    .chain()
                    .in_set(ScreenPanels),
            )
            .add_systems(
                EguiPrimaryContextPass,
                (error_dialogs_ui, busy_indicator_ui, capture_canvas_area)
                    .chain()
                    .after(ScreenPanels),
            );
    }
}
