//! Edit screen side panel: question groups, mask selection, view controls.

use bevy::prelude::*;
use bevy_egui::{EguiContexts, egui};
use uuid::Uuid;

use crate::editor::{
    CanvasView, CreateGroupRequest, DeleteGroupRequest, DeleteSelectedMasksRequest, EditorState,
    FitViewRequest, ReassignSelectedMasksRequest, RenameGroupRequest, RenamePrintRequest,
    ReorderGroupRequest, SetGroupActiveRequest, SetPrintSubjectRequest, ZoomStepRequest,
};
use crate::model::{MoveDirection, SUBJECT_PRESETS};
use crate::store::Cache;

use super::Screen;

#[derive(Resource, Default)]
pub struct EditUiState {
    /// Group being renamed and the in-progress text.
    pub renaming: Option<(Uuid, String)>,
    /// In-progress print title, when the title is being edited.
    pub renaming_print: Option<String>,
    pub subject_other_draft: String,
    /// Print the draft was seeded from, so switching prints refreshes it.
    pub subject_draft_for: Option<Uuid>,
    pub reassign_target: Option<Uuid>,
    pub confirm_delete_group: Option<Uuid>,
}

#[allow(clippy::too_many_arguments)]
pub fn edit_panel_ui(
    mut contexts: EguiContexts,
    mut state: ResMut<EditUiState>,
    cache: Res<Cache>,
    mut editor_state: ResMut<EditorState>,
    view: Res<CanvasView>,
    mut next_screen: ResMut<NextState<Screen>>,
    mut create_events: MessageWriter<CreateGroupRequest>,
    mut rename_events: MessageWriter<RenameGroupRequest>,
    mut reorder_events: MessageWriter<ReorderGroupRequest>,
    mut delete_events: MessageWriter<DeleteGroupRequest>,
    mut active_events: MessageWriter<SetGroupActiveRequest>,
    mut delete_mask_events: MessageWriter<DeleteSelectedMasksRequest>,
    mut reassign_events: MessageWriter<ReassignSelectedMasksRequest>,
    mut fit_events: MessageWriter<FitViewRequest>,
    mut zoom_events: MessageWriter<ZoomStepRequest>,
    mut print_meta_events: (
        MessageWriter<RenamePrintRequest>,
        MessageWriter<SetPrintSubjectRequest>,
    ),
) -> Result {
    let Some(print_id) = editor_state.current_print else {
        return Ok(());
    };
    let (title, subject) = cache
        .print(print_id)
        .map(|p| (p.title.clone(), p.subject.clone()))
        .unwrap_or_default();
    if state.subject_draft_for != Some(print_id) {
        state.subject_draft_for = Some(print_id);
        state.subject_other_draft = cache
            .print(print_id)
            .map(|p| p.subject_other.clone())
            .unwrap_or_default();
        state.renaming_print = None;
    }
    let groups: Vec<_> = cache
        .groups_of_print(print_id)
        .into_iter()
        .cloned()
        .collect();

    egui::SidePanel::left("edit_panel")
        .resizable(false)
        .default_width(260.0)
        .show(contexts.ctx_mut()?, |ui| {
            ui.horizontal(|ui| {
                if ui.button("\u{2190} Home").clicked() {
                    next_screen.set(Screen::Home);
                }
                if let Some(text) = state.renaming_print.as_mut() {
                    let response = ui.add(egui::TextEdit::singleline(text).desired_width(110.0));
                    let committed =
                        response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                    if committed || ui.button("\u{2713}").clicked() {
                        print_meta_events.0.write(RenamePrintRequest {
                            print_id,
                            title: text.clone(),
                        });
                        state.renaming_print = None;
                    }
                } else {
                    ui.label(egui::RichText::new(&title).strong());
                    if ui.small_button("\u{270e}").on_hover_text("Rename print").clicked() {
                        state.renaming_print = Some(title.clone());
                    }
                }
            });
            ui.horizontal(|ui| {
                ui.label("Subject:");
                egui::ComboBox::from_id_salt("print_subject")
                    .selected_text(subject.clone())
                    .show_ui(ui, |ui| {
                        for preset in SUBJECT_PRESETS {
                            if ui.selectable_label(subject == preset, preset).clicked()
                                && subject != preset
                            {
                                print_meta_events.1.write(SetPrintSubjectRequest {
                                    print_id,
                                    subject: preset.to_string(),
                                    subject_other: state.subject_other_draft.clone(),
                                });
                            }
                        }
                    });
            });
            if subject == "Other" {
                ui.horizontal(|ui| {
                    ui.add(
                        egui::TextEdit::singleline(&mut state.subject_other_draft)
                            .hint_text("Subject name")
                            .desired_width(110.0),
                    );
                    if ui.button("Set").clicked() {
                        print_meta_events.1.write(SetPrintSubjectRequest {
                            print_id,
                            subject: "Other".to_string(),
                            subject_other: state.subject_other_draft.clone(),
                        });
                    }
                });
            }
            ui.separator();

            ui.label(
                egui::RichText::new(
                    "Drag on the page to cover an answer. Drag a mask to move it, \
                     tap it to select. Hold to pan, pinch or scroll to zoom.",
                )
                .color(egui::Color32::GRAY)
                .size(11.0),
            );
            ui.add_space(6.0);

            ui.horizontal(|ui| {
                ui.label(egui::RichText::new("Questions").strong());
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("+ Add").clicked() {
                        create_events.write(CreateGroupRequest);
                    }
                });
            });

            egui::ScrollArea::vertical().max_height(320.0).show(ui, |ui| {
                for (i, group) in groups.iter().enumerate() {
                    group_row(
                        ui,
                        group,
                        i,
                        groups.len(),
                        cache.masks_of_group(group.id).len(),
                        &mut state,
                        &mut editor_state,
                        &mut rename_events,
                        &mut reorder_events,
                        &mut delete_events,
                        &mut active_events,
                    );
                }
            });

            ui.add_space(8.0);
            ui.separator();

            // Mask selection controls
            let selected = editor_state.selected_masks.len();
            ui.label(egui::RichText::new(format!("{selected} masks selected")).strong());
            ui.add_enabled_ui(selected > 0, |ui| {
                if ui.button("Delete selected").clicked() {
                    delete_mask_events.write(DeleteSelectedMasksRequest);
                }
                ui.horizontal(|ui| {
                    ui.label("Move to:");
                    let target_label = state
                        .reassign_target
                        .and_then(|id| groups.iter().find(|g| g.id == id))
                        .map(|g| g.label.clone())
                        .unwrap_or_else(|| "...".to_string());
                    egui::ComboBox::from_id_salt("reassign_target")
                        .selected_text(target_label)
                        .show_ui(ui, |ui| {
                            for group in &groups {
                                if ui
                                    .selectable_label(
                                        state.reassign_target == Some(group.id),
                                        &group.label,
                                    )
                                    .clicked()
                                {
                                    state.reassign_target = Some(group.id);
                                }
                            }
                        });
                    if ui.button("Go").clicked()
                        && let Some(target_group) = state.reassign_target
                    {
                        reassign_events.write(ReassignSelectedMasksRequest { target_group });
                    }
                });
            });

            ui.add_space(8.0);
            ui.separator();

            // View controls
            ui.horizontal(|ui| {
                if ui.button("Fit").clicked() {
                    fit_events.write(FitViewRequest);
                }
                if ui.button("\u{2212}").clicked() {
                    zoom_events.write(ZoomStepRequest { zoom_in: false });
                }
                if let Some(open) = view.open.as_ref() {
                    ui.label(format!("{:.0}%", open.viewport.zoom / open.fit * 100.0));
                }
                if ui.button("+").clicked() {
                    zoom_events.write(ZoomStepRequest { zoom_in: true });
                }
            });
        });
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn group_row(
    ui: &mut egui::Ui,
    group: &crate::model::Group,
    index: usize,
    count: usize,
    mask_count: usize,
    state: &mut EditUiState,
    editor_state: &mut EditorState,
    rename_events: &mut MessageWriter<RenameGroupRequest>,
    reorder_events: &mut MessageWriter<ReorderGroupRequest>,
    delete_events: &mut MessageWriter<DeleteGroupRequest>,
    active_events: &mut MessageWriter<SetGroupActiveRequest>,
) {
    ui.horizontal(|ui| {
        if let Some((renaming_id, text)) = state.renaming.as_mut()
            && *renaming_id == group.id
        {
            let response = ui.add(egui::TextEdit::singleline(text).desired_width(90.0));
            let committed = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if committed || ui.button("\u{2713}").clicked() {
                rename_events.write(RenameGroupRequest {
                    group_id: group.id,
                    label: text.clone(),
                });
                state.renaming = None;
            }
            return;
        }

        let is_current = editor_state.current_group == Some(group.id);
        let label = format!("{} ({mask_count})", group.label);
        if ui.selectable_label(is_current, label).clicked() {
            editor_state.current_group = Some(group.id);
        }

        let mut is_active = group.is_active;
        if ui
            .checkbox(&mut is_active, "")
            .on_hover_text("Include in scheduled reviews")
            .changed()
        {
            active_events.write(SetGroupActiveRequest {
                group_id: group.id,
                is_active,
            });
        }

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if state.confirm_delete_group == Some(group.id) {
                if ui
                    .add(egui::Button::new(
                        egui::RichText::new("Sure?").color(egui::Color32::LIGHT_RED),
                    ))
                    .clicked()
                {
                    delete_events.write(DeleteGroupRequest { group_id: group.id });
                    state.confirm_delete_group = None;
                }
                if ui.button("No").clicked() {
                    state.confirm_delete_group = None;
                }
            } else {
                if ui.small_button("\u{1f5d1}").on_hover_text("Delete question").clicked() {
                    state.confirm_delete_group = Some(group.id);
                }
                if ui.small_button("\u{270e}").on_hover_text("Rename").clicked() {
                    state.renaming = Some((group.id, group.label.clone()));
                }
                ui.add_enabled_ui(index + 1 < count, |ui| {
                    if ui.small_button("\u{2193}").clicked() {
                        reorder_events.write(ReorderGroupRequest {
                            group_id: group.id,
                            direction: MoveDirection::Down,
                        });
                    }
                });
                ui.add_enabled_ui(index > 0, |ui| {
                    if ui.small_button("\u{2191}").clicked() {
                        reorder_events.write(ReorderGroupRequest {
                            group_id: group.id,
                            direction: MoveDirection::Up,
                        });
                    }
                });
            }
        });
    });
}
