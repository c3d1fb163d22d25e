//! Home screen: the print library, grouped by subject, plus import and
//! backup controls.

use bevy::prelude::*;
use bevy_egui::{EguiContexts, egui};
use chrono::{Local, TimeZone};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::config::{AppConfig, SaveConfigRequest};
use crate::editor::{DeletePrintRequest, OpenPrintRequest};
use crate::import::ImportPrintRequest;
use crate::model::{Print, SUBJECT_PRESETS};
use crate::review::OpenPickerRequest;
use crate::scheduler::compute_due;
use crate::store::{Cache, RestoreStoreRequest, SaveBackupRequest};

use super::Screen;

#[derive(Resource)]
pub struct HomeUiState {
    pub import_title: String,
    pub import_subject: String,
    pub import_subject_other: String,
    pub confirm_delete: Option<Uuid>,
}

impl Default for HomeUiState {
    fn default() -> Self {
        Self {
            import_title: String::new(),
            import_subject: SUBJECT_PRESETS[0].to_string(),
            import_subject_other: String::new(),
            confirm_delete: None,
        }
    }
}

fn format_date(ms: i64) -> String {
    match Local.timestamp_millis_opt(ms).single() {
        Some(dt) => dt.format("%b %e, %Y").to_string(),
        None => String::new(),
    }
}

#[allow(clippy::too_many_arguments)]
pub fn home_ui(
    mut contexts: EguiContexts,
    mut state: ResMut<HomeUiState>,
    cache: Res<Cache>,
    mut config: ResMut<AppConfig>,
    mut next_screen: ResMut<NextState<Screen>>,
    mut import_events: MessageWriter<ImportPrintRequest>,
    mut open_events: MessageWriter<OpenPrintRequest>,
    mut picker_events: MessageWriter<OpenPickerRequest>,
    mut delete_events: MessageWriter<DeletePrintRequest>,
    mut backup_events: MessageWriter<SaveBackupRequest>,
    mut restore_events: MessageWriter<RestoreStoreRequest>,
    mut config_save_events: MessageWriter<SaveConfigRequest>,
) -> Result {
    let now = chrono::Utc::now().timestamp_millis();
    let due = compute_due(&cache.groups, &cache.prints, &cache.srs, &cache.skips, now, None);
    let mut due_per_print: BTreeMap<Uuid, usize> = BTreeMap::new();
    for entry in &due {
        *due_per_print.entry(entry.print_id).or_default() += 1;
    }

    egui::CentralPanel::default().show(contexts.ctx_mut()?, |ui| {
        ui.horizontal(|ui| {
            ui.heading("Maskdrill");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Restore backup").clicked() {
                    restore_events.write(RestoreStoreRequest);
                }
                if ui.button("Back up").clicked() {
                    backup_events.write(SaveBackupRequest);
                }
                ui.add_space(8.0);
                let today_label = if due.is_empty() {
                    "Today".to_string()
                } else {
                    format!("Today ({})", due.len())
                };
                if ui
                    .add(egui::Button::new(egui::RichText::new(today_label).strong()))
                    .clicked()
                {
                    next_screen.set(Screen::Today);
                }
            });
        });
        ui.separator();

        // Import form
        ui.add_space(4.0);
        ui.horizontal(|ui| {
            ui.label("Title:");
            ui.add(
                egui::TextEdit::singleline(&mut state.import_title)
                    .hint_text("e.g. Fractions worksheet")
                    .desired_width(220.0),
            );

            ui.label("Subject:");
            egui::ComboBox::from_id_salt("import_subject")
                .selected_text(state.import_subject.clone())
                .show_ui(ui, |ui| {
                    for preset in SUBJECT_PRESETS {
                        if ui
                            .selectable_label(state.import_subject == preset, preset)
                            .clicked()
                        {
                            state.import_subject = preset.to_string();
                        }
                    }
                });
            if state.import_subject == "Other" {
                ui.add(
                    egui::TextEdit::singleline(&mut state.import_subject_other)
                        .hint_text("Subject name")
                        .desired_width(120.0),
                );
            }

            if ui
                .add(egui::Button::new(egui::RichText::new("Import photo").strong()))
                .clicked()
            {
                import_events.write(ImportPrintRequest {
                    title: state.import_title.clone(),
                    subject: state.import_subject.clone(),
                    subject_other: state.import_subject_other.clone(),
                });
                state.import_title.clear();
            }
        });
        ui.add_space(8.0);
        ui.separator();

        if cache.prints.is_empty() {
            ui.add_space(24.0);
            ui.vertical_centered(|ui| {
                ui.label(
                    egui::RichText::new("No prints yet. Import a worksheet photo to start.")
                        .color(egui::Color32::GRAY),
                );
            });
            return;
        }

        // Prints grouped by subject
        let mut by_subject: BTreeMap<String, Vec<&Print>> = BTreeMap::new();
        for print in &cache.prints {
            by_subject
                .entry(print.display_subject().to_string())
                .or_default()
                .push(print);
        }

        egui::ScrollArea::vertical().show(ui, |ui| {
            for (subject, prints) in by_subject {
                let collapsed = config.data.collapsed_subjects.contains(&subject);
                let arrow = if collapsed { "\u{25b6}" } else { "\u{25bc}" };
                let header = format!("{arrow} {subject} ({})", prints.len());
                if ui
                    .add(egui::Button::new(egui::RichText::new(header).strong()).frame(false))
                    .clicked()
                {
                    config.toggle_subject_collapsed(&subject);
                    config_save_events.write(SaveConfigRequest);
                }
                if collapsed {
                    continue;
                }

                for print in prints {
                    print_row(
                        ui,
                        print,
                        cache.groups_of_print(print.id).len(),
                        due_per_print.get(&print.id).copied().unwrap_or(0),
                        &mut state,
                        &mut next_screen,
                        &mut open_events,
                        &mut picker_events,
                        &mut delete_events,
                    );
                }
                ui.add_space(6.0);
            }
        });
    });
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn print_row(
    ui: &mut egui::Ui,
    print: &Print,
    group_count: usize,
    due_count: usize,
    state: &mut HomeUiState,
    next_screen: &mut NextState<Screen>,
    open_events: &mut MessageWriter<OpenPrintRequest>,
    picker_events: &mut MessageWriter<OpenPickerRequest>,
    delete_events: &mut MessageWriter<DeletePrintRequest>,
) {
    ui.horizontal(|ui| {
        ui.add_space(12.0);
        ui.label(egui::RichText::new(&print.title).strong());
        ui.label(
            egui::RichText::new(format_date(print.created_at))
                .color(egui::Color32::GRAY)
                .size(11.0),
        );
        ui.label(format!("{group_count} questions"));
        if due_count > 0 {
            ui.colored_label(
                egui::Color32::from_rgb(230, 160, 60),
                format!("{due_count} due"),
            );
        }

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if state.confirm_delete == Some(print.id) {
                if ui
                    .add(egui::Button::new(
                        egui::RichText::new("Really delete?").color(egui::Color32::LIGHT_RED),
                    ))
                    .clicked()
                {
                    delete_events.write(DeletePrintRequest { print_id: print.id });
                    state.confirm_delete = None;
                }
                if ui.button("Cancel").clicked() {
                    state.confirm_delete = None;
                }
            } else {
                if ui.button("Delete").clicked() {
                    state.confirm_delete = Some(print.id);
                }
                if ui.button("Practice").clicked() {
                    picker_events.write(OpenPickerRequest { print_id: print.id });
                }
                if ui.button("Edit").clicked() {
                    open_events.write(OpenPrintRequest { print_id: print.id });
                    next_screen.set(Screen::Edit);
                }
            }
        });
    });
}
