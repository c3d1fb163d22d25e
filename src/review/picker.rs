//! Practice picker: choose groups on a print to drill outside the schedule.

use bevy::prelude::*;
use std::collections::HashSet;
use uuid::Uuid;

use crate::editor::{CanvasTap, FitViewRequest, MaskStyle, OpenPrintRequest};
use crate::store::Cache;
use crate::ui::Screen;

use super::{ReviewMode, ReviewSession};

#[derive(Resource, Default)]
pub struct PickerState {
    pub print_id: Option<Uuid>,
    /// Group ids chosen for practice.
    pub selected: HashSet<Uuid>,
}

#[derive(Message)]
pub struct OpenPickerRequest {
    pub print_id: Uuid,
}

/// Start practicing the picked groups, in worksheet order.
#[derive(Message)]
pub struct StartPracticeRequest;

pub fn handle_open_picker(
    mut events: MessageReader<OpenPickerRequest>,
    mut picker: ResMut<PickerState>,
    mut next_screen: ResMut<NextState<Screen>>,
    mut open_events: MessageWriter<OpenPrintRequest>,
    mut fit_events: MessageWriter<FitViewRequest>,
) {
    for event in events.read() {
        picker.print_id = Some(event.print_id);
        picker.selected.clear();
        open_events.write(OpenPrintRequest {
            print_id: event.print_id,
        });
        fit_events.write(FitViewRequest);
        next_screen.set(Screen::Picker);
    }
}

/// Tapping a mask toggles its whole group in the practice selection.
pub fn picker_tap(
    mut events: MessageReader<CanvasTap>,
    mut picker: ResMut<PickerState>,
    cache: Res<Cache>,
) {
    for event in events.read() {
        let Some(mask_id) = event.mask else {
            continue;
        };
        let Some(mask) = cache.mask(mask_id) else {
            continue;
        };
        if !picker.selected.remove(&mask.group_id) {
            picker.selected.insert(mask.group_id);
        }
    }
}

pub fn handle_start_practice(
    mut events: MessageReader<StartPracticeRequest>,
    picker: Res<PickerState>,
    cache: Res<Cache>,
    mut session: ResMut<ReviewSession>,
    mut next_screen: ResMut<NextState<Screen>>,
    mut open_events: MessageWriter<OpenPrintRequest>,
    mut fit_events: MessageWriter<FitViewRequest>,
) {
    for _ in events.read() {
        let Some(print_id) = picker.print_id else {
            continue;
        };
        // Cache groups are already ordered by order_index
        let queue: Vec<Uuid> = cache
            .groups_of_print(print_id)
            .iter()
            .filter(|g| picker.selected.contains(&g.id))
            .map(|g| g.id)
            .collect();
        if queue.is_empty() {
            info!("No groups picked for practice");
            continue;
        }
        *session = ReviewSession {
            queue,
            cursor: 0,
            revealed: HashSet::new(),
            rated_count: 0,
            mode: Some(ReviewMode::Practice),
        };
        super::open_current_card(&mut session, &cache, &mut open_events, &mut fit_events);
        next_screen.set(Screen::Review);
    }
}

pub fn picker_mask_style(picker: Res<PickerState>, mut style: ResMut<MaskStyle>) {
    if !picker.is_changed() {
        return;
    }
    style.revealed.clear();
    style.highlighted_groups = picker.selected.clone();
    style.show_labels = true;
}
