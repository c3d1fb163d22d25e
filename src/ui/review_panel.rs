//! Review screen chrome: card position, reveal controls, rating bar.

use bevy::prelude::*;
use bevy_egui::{EguiContexts, egui};

use crate::constants::DAY_MS;
use crate::review::{
    NextCardRequest, PrevCardRequest, RateRequest, ReviewSession, ShowAllMasksRequest,
    SkipCurrentRequest,
};
use crate::scheduler::{Rating, SrsState};
use crate::store::Cache;

use super::Screen;

fn rating_color(rating: Rating) -> egui::Color32 {
    match rating {
        Rating::Again => egui::Color32::from_rgb(200, 90, 90),
        Rating::Hard => egui::Color32::from_rgb(210, 160, 70),
        Rating::Good => egui::Color32::from_rgb(110, 180, 110),
        Rating::Easy => egui::Color32::from_rgb(100, 150, 210),
    }
}

#[allow(clippy::too_many_arguments)]
pub fn review_panel_ui(
    mut contexts: EguiContexts,
    session: Res<ReviewSession>,
    cache: Res<Cache>,
    mut next_screen: ResMut<NextState<Screen>>,
    mut rate_events: MessageWriter<RateRequest>,
    mut skip_events: MessageWriter<SkipCurrentRequest>,
    mut show_all_events: MessageWriter<ShowAllMasksRequest>,
    mut next_events: MessageWriter<NextCardRequest>,
    mut prev_events: MessageWriter<PrevCardRequest>,
) -> Result {
    let Some(group_id) = session.current_group() else {
        return Ok(());
    };
    let group = cache.group(group_id).cloned();
    let title = group
        .as_ref()
        .and_then(|g| cache.print(g.print_id))
        .map(|p| format!("{} \u{00b7} {}", p.title, p.display_subject()))
        .unwrap_or_default();
    let label = group.map(|g| g.label).unwrap_or_default();

    egui::TopBottomPanel::top("review_header").show(contexts.ctx_mut()?, |ui| {
        ui.horizontal(|ui| {
            if ui.button("\u{2715} End").clicked() {
                next_screen.set(Screen::Home);
            }
            ui.label(egui::RichText::new(&label).strong().size(16.0));
            ui.label(title);
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(format!(
                    "Card {} of {}",
                    session.cursor + 1,
                    session.queue.len()
                ));
                ui.add_enabled_ui(session.cursor + 1 < session.queue.len(), |ui| {
                    if ui.button("Next \u{2192}").clicked() {
                        next_events.write(NextCardRequest);
                    }
                });
                ui.add_enabled_ui(session.cursor > 0, |ui| {
                    if ui.button("\u{2190} Prev").clicked() {
                        prev_events.write(PrevCardRequest);
                    }
                });
            });
        });
    });

    // Candidate intervals shown on the rating buttons
    let now = chrono::Utc::now().timestamp_millis();
    let srs = cache
        .srs_for(group_id)
        .cloned()
        .unwrap_or_else(|| SrsState::new(group_id, now));

    egui::TopBottomPanel::bottom("review_ratings")
        .frame(
            egui::Frame::side_top_panel(&contexts.ctx_mut()?.style())
                .inner_margin(egui::Margin::symmetric(12, 10)),
        )
        .show(contexts.ctx_mut()?, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Show all").clicked() {
                    show_all_events.write(ShowAllMasksRequest);
                }
                if !session.is_practice() && ui.button("Skip today").clicked() {
                    skip_events.write(SkipCurrentRequest);
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    // Easy..Again right to left keeps Again leftmost
                    for rating in Rating::ALL.iter().rev() {
                        let days = (srs.update(*rating, now).next_due_at - now) / DAY_MS;
                        let text = format!("{}\n{}d", rating.label(), days);
                        let button = egui::Button::new(
                            egui::RichText::new(text).color(egui::Color32::WHITE).strong(),
                        )
                        .fill(rating_color(*rating))
                        .min_size(egui::vec2(72.0, 40.0));
                        if ui.add(button).clicked() {
                            rate_events.write(RateRequest { rating: *rating });
                        }
                    }
                });
            });
        });
    Ok(())
}

pub fn done_ui(
    mut contexts: EguiContexts,
    session: Res<ReviewSession>,
    mut next_screen: ResMut<NextState<Screen>>,
) -> Result {
    egui::CentralPanel::default().show(contexts.ctx_mut()?, |ui| {
        ui.add_space(48.0);
        ui.vertical_centered(|ui| {
            ui.heading("Session complete");
            ui.add_space(8.0);
            ui.label(format!("{} questions rated", session.rated_count));
            ui.add_space(16.0);
            if ui.button("Back to Today").clicked() {
                next_screen.set(Screen::Today);
            }
            if ui.button("Home").clicked() {
                next_screen.set(Screen::Home);
            }
        });
    });
    Ok(())
}
