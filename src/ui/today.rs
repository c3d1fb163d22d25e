//! Today screen: what is due, filterable by subject.

use bevy::prelude::*;
use bevy_egui::{EguiContexts, egui};
use std::collections::BTreeSet;

use crate::review::StartDueReviewRequest;
use crate::scheduler::compute_due;
use crate::store::Cache;

use super::Screen;

#[derive(Resource, Default)]
pub struct TodayUiState {
    /// `None` means all subjects.
    pub subject: Option<String>,
}

pub fn today_ui(
    mut contexts: EguiContexts,
    mut state: ResMut<TodayUiState>,
    cache: Res<Cache>,
    mut next_screen: ResMut<NextState<Screen>>,
    mut start_events: MessageWriter<StartDueReviewRequest>,
) -> Result {
    let now = chrono::Utc::now().timestamp_millis();
    let due = compute_due(
        &cache.groups,
        &cache.prints,
        &cache.srs,
        &cache.skips,
        now,
        state.subject.as_deref(),
    );
    let subjects: BTreeSet<String> = cache
        .prints
        .iter()
        .map(|p| p.display_subject().to_string())
        .collect();

    egui::CentralPanel::default().show(contexts.ctx_mut()?, |ui| {
        ui.horizontal(|ui| {
            if ui.button("\u{2190} Home").clicked() {
                next_screen.set(Screen::Home);
            }
            ui.heading("Today");

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                egui::ComboBox::from_id_salt("today_subject")
                    .selected_text(state.subject.clone().unwrap_or_else(|| "All subjects".into()))
                    .show_ui(ui, |ui| {
                        if ui
                            .selectable_label(state.subject.is_none(), "All subjects")
                            .clicked()
                        {
                            state.subject = None;
                        }
                        for subject in &subjects {
                            if ui
                                .selectable_label(state.subject.as_deref() == Some(subject), subject)
                                .clicked()
                            {
                                state.subject = Some(subject.clone());
                            }
                        }
                    });
            });
        });
        ui.separator();

        if due.is_empty() {
            ui.add_space(32.0);
            ui.vertical_centered(|ui| {
                ui.heading("All caught up!");
                ui.label(
                    egui::RichText::new("Nothing due right now. Come back tomorrow.")
                        .color(egui::Color32::GRAY),
                );
            });
            return;
        }

        ui.horizontal(|ui| {
            ui.label(format!("{} questions due", due.len()));
            if ui
                .add(egui::Button::new(egui::RichText::new("Start review").strong()))
                .clicked()
            {
                start_events.write(StartDueReviewRequest {
                    subject: state.subject.clone(),
                });
            }
        });
        ui.add_space(8.0);

        egui::ScrollArea::vertical().show(ui, |ui| {
            for entry in &due {
                let Some(group) = cache.group(entry.group_id) else {
                    continue;
                };
                let print_title = cache
                    .print(entry.print_id)
                    .map(|p| format!("{} \u{00b7} {}", p.title, p.display_subject()))
                    .unwrap_or_default();
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new(&group.label).strong());
                    ui.label(print_title);
                    let overdue_days = (now - entry.next_due_at) / crate::constants::DAY_MS;
                    if overdue_days > 0 {
                        ui.colored_label(
                            egui::Color32::from_rgb(230, 160, 60),
                            format!("{overdue_days}d overdue"),
                        );
                    }
                });
            }
        });
    });
    Ok(())
}
