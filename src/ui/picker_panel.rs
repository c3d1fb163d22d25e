//! Practice picker chrome: selection count and start controls.

use bevy::prelude::*;
use bevy_egui::{EguiContexts, egui};

use crate::review::{PickerState, StartPracticeRequest};
use crate::store::Cache;

use super::Screen;

pub fn picker_panel_ui(
    mut contexts: EguiContexts,
    mut picker: ResMut<PickerState>,
    cache: Res<Cache>,
    mut next_screen: ResMut<NextState<Screen>>,
    mut start_events: MessageWriter<StartPracticeRequest>,
) -> Result {
    let Some(print_id) = picker.print_id else {
        return Ok(());
    };
    let title = cache
        .print(print_id)
        .map(|p| p.title.clone())
        .unwrap_or_default();
    let group_count = cache.groups_of_print(print_id).len();

    egui::TopBottomPanel::top("picker_header").show(contexts.ctx_mut()?, |ui| {
        ui.horizontal(|ui| {
            if ui.button("\u{2190} Home").clicked() {
                next_screen.set(Screen::Home);
            }
            ui.label(egui::RichText::new(format!("Practice: {title}")).strong());
            ui.label(
                egui::RichText::new("Tap questions on the page to pick them.")
                    .color(egui::Color32::GRAY)
                    .size(11.0),
            );
        });
    });

    egui::TopBottomPanel::bottom("picker_controls").show(contexts.ctx_mut()?, |ui| {
        ui.horizontal(|ui| {
            ui.label(format!("{} of {group_count} picked", picker.selected.len()));
            if ui.button("All").clicked() {
                picker.selected = cache
                    .groups_of_print(print_id)
                    .iter()
                    .map(|g| g.id)
                    .collect();
            }
            if ui.button("None").clicked() {
                picker.selected.clear();
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.add_enabled_ui(!picker.selected.is_empty(), |ui| {
                    if ui
                        .add(egui::Button::new(
                            egui::RichText::new("Start practice").strong(),
                        ))
                        .clicked()
                    {
                        start_events.write(StartPracticeRequest);
                    }
                });
            });
        });
    });
    Ok(())
}
