//! Review session controller.
//!
//! A session drills through a queue of question groups one card at a time.
//! Due sessions pull from the scheduler and recompute the queue after every
//! rating, so a card rated Again can come straight back. Practice sessions
//! run a fixed, picker-chosen queue in worksheet order; ratings still count,
//! but the queue does not change under the user.

mod picker;

pub use picker::{OpenPickerRequest, PickerState, StartPracticeRequest};

use bevy::prelude::*;
use chrono::Utc;
use std::collections::HashSet;
use uuid::Uuid;

use crate::constants::DAY_MS;
use crate::editor::{CanvasTap, FitViewRequest, MaskStyle, OpenPrintRequest};
use crate::model;
use crate::scheduler::{
    Rating, ReviewLogEntry, SkipRecord, SrsState, compute_due, start_of_next_local_day,
};
use crate::store::{Cache, Store};
use crate::ui::Screen;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewMode {
    Due { subject: Option<String> },
    Practice,
}

#[derive(Resource, Default)]
pub struct ReviewSession {
    pub queue: Vec<Uuid>,
    pub cursor: usize,
    /// Masks of the current card the user has tapped open.
    pub revealed: HashSet<Uuid>,
    pub rated_count: usize,
    pub mode: Option<ReviewMode>,
}

impl ReviewSession {
    pub fn current_group(&self) -> Option<Uuid> {
        self.queue.get(self.cursor).copied()
    }

    pub fn is_practice(&self) -> bool {
        matches!(self.mode, Some(ReviewMode::Practice))
    }
}

#[derive(Message)]
pub struct StartDueReviewRequest {
    pub subject: Option<String>,
}

#[derive(Message)]
pub struct RateRequest {
    pub rating: Rating,
}

/// Skip the current card until tomorrow without rating it.
#[derive(Message)]
pub struct SkipCurrentRequest;

#[derive(Message)]
pub struct ShowAllMasksRequest;

#[derive(Message)]
pub struct NextCardRequest;

#[derive(Message)]
pub struct PrevCardRequest;

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Open the current card's page and reset per-card state.
fn open_current_card(
    session: &mut ReviewSession,
    cache: &Cache,
    open_events: &mut MessageWriter<OpenPrintRequest>,
    fit_events: &mut MessageWriter<FitViewRequest>,
) {
    session.revealed.clear();
    let Some(group_id) = session.current_group() else {
        return;
    };
    let Some(group) = cache.group(group_id) else {
        return;
    };
    open_events.write(OpenPrintRequest {
        print_id: group.print_id,
    });
    fit_events.write(FitViewRequest);
}

#[allow(clippy::too_many_arguments)]
fn handle_start_due(
    mut events: MessageReader<StartDueReviewRequest>,
    cache: Res<Cache>,
    mut session: ResMut<ReviewSession>,
    mut next_screen: ResMut<NextState<Screen>>,
    mut open_events: MessageWriter<OpenPrintRequest>,
    mut fit_events: MessageWriter<FitViewRequest>,
) {
    for event in events.read() {
        let due = compute_due(
            &cache.groups,
            &cache.prints,
            &cache.srs,
            &cache.skips,
            now_ms(),
            event.subject.as_deref(),
        );
        if due.is_empty() {
            info!("Nothing due for review");
            continue;
        }
        *session = ReviewSession {
            queue: due.iter().map(|e| e.group_id).collect(),
            cursor: 0,
            revealed: HashSet::new(),
            rated_count: 0,
            mode: Some(ReviewMode::Due {
                subject: event.subject.clone(),
            }),
        };
        open_current_card(&mut session, &cache, &mut open_events, &mut fit_events);
        next_screen.set(Screen::Review);
    }
}

/// After a rating or skip in due mode the queue is recomputed, because the
/// mutation itself changes what is due.
fn refresh_due_queue(
    session: &mut ReviewSession,
    cache: &Cache,
    subject: Option<&str>,
) -> bool {
    let due = compute_due(
        &cache.groups,
        &cache.prints,
        &cache.srs,
        &cache.skips,
        now_ms(),
        subject,
    );
    session.queue = due.iter().map(|e| e.group_id).collect();
    if session.queue.is_empty() {
        return false;
    }
    session.cursor = session.cursor.min(session.queue.len() - 1);
    true
}

#[allow(clippy::too_many_arguments)]
fn handle_rate(
    mut events: MessageReader<RateRequest>,
    mut store: ResMut<Store>,
    mut cache: ResMut<Cache>,
    mut session: ResMut<ReviewSession>,
    mut next_screen: ResMut<NextState<Screen>>,
    mut open_events: MessageWriter<OpenPrintRequest>,
    mut fit_events: MessageWriter<FitViewRequest>,
) {
    for event in events.read() {
        let Some(group_id) = session.current_group() else {
            continue;
        };
        commit_rating(&mut store, group_id, event.rating, now_ms());
        cache.reload(&store);
        session.rated_count += 1;

        advance_after_mutation(
            &mut session,
            &cache,
            &mut next_screen,
            &mut open_events,
            &mut fit_events,
        );
    }
}

/// Commit one rating against the store: advance the scheduling state, clear
/// any pending skip, append the log entry, and reactivate the group.
fn commit_rating(store: &mut Store, group_id: Uuid, rating: Rating, now: i64) -> SrsState {
    let prev = store
        .srs(group_id)
        .cloned()
        .unwrap_or_else(|| SrsState::new(group_id, now));
    let updated = prev.update(rating, now);
    let interval_days = (updated.next_due_at - now) / DAY_MS;

    store.put_srs(updated.clone());
    store.delete_skip(group_id);
    store.put_review(ReviewLogEntry {
        id: Uuid::new_v4(),
        group_id,
        rating,
        reviewed_at: now,
        interval_days,
    });
    // Rating a group always reactivates it
    if let Some(mut group) = store.group(group_id).cloned()
        && !group.is_active
    {
        group.is_active = true;
        store.put_group(group);
    }
    updated
}

#[allow(clippy::too_many_arguments)]
fn handle_skip(
    mut events: MessageReader<SkipCurrentRequest>,
    mut store: ResMut<Store>,
    mut cache: ResMut<Cache>,
    mut session: ResMut<ReviewSession>,
    mut next_screen: ResMut<NextState<Screen>>,
    mut open_events: MessageWriter<OpenPrintRequest>,
    mut fit_events: MessageWriter<FitViewRequest>,
) {
    for _ in events.read() {
        let Some(group_id) = session.current_group() else {
            continue;
        };
        store.put_skip(SkipRecord {
            group_id,
            skip_until: start_of_next_local_day(now_ms()),
        });
        cache.reload(&store);

        advance_after_mutation(
            &mut session,
            &cache,
            &mut next_screen,
            &mut open_events,
            &mut fit_events,
        );
    }
}

/// Move on after a rating or skip. Due mode recomputes the queue; practice
/// steps forward through its fixed one.
fn advance_after_mutation(
    session: &mut ReviewSession,
    cache: &Cache,
    next_screen: &mut NextState<Screen>,
    open_events: &mut MessageWriter<OpenPrintRequest>,
    fit_events: &mut MessageWriter<FitViewRequest>,
) {
    match session.mode.clone() {
        Some(ReviewMode::Due { subject }) => {
            if refresh_due_queue(session, cache, subject.as_deref()) {
                open_current_card(session, cache, open_events, fit_events);
            } else {
                next_screen.set(Screen::Done);
            }
        }
        Some(ReviewMode::Practice) => {
            if session.cursor + 1 < session.queue.len() {
                session.cursor += 1;
                open_current_card(session, cache, open_events, fit_events);
            } else {
                next_screen.set(Screen::Done);
            }
        }
        None => {}
    }
}

fn handle_navigation(
    mut next_events: MessageReader<NextCardRequest>,
    mut prev_events: MessageReader<PrevCardRequest>,
    cache: Res<Cache>,
    mut session: ResMut<ReviewSession>,
    mut open_events: MessageWriter<OpenPrintRequest>,
    mut fit_events: MessageWriter<FitViewRequest>,
) {
    let mut moved = false;
    for _ in next_events.read() {
        if session.cursor + 1 < session.queue.len() {
            session.cursor += 1;
            moved = true;
        }
    }
    for _ in prev_events.read() {
        if session.cursor > 0 {
            session.cursor -= 1;
            moved = true;
        }
    }
    if moved {
        open_current_card(&mut session, &cache, &mut open_events, &mut fit_events);
    }
}

/// Topmost mask of one group under a tap position, ignoring every other
/// group's masks.
fn current_card_mask_at(cache: &Cache, group_id: Uuid, norm: Vec2) -> Option<Uuid> {
    model::hit_test_masks(&cache.masks_of_group(group_id), norm)
}

/// Tap on a mask of the current card toggles it between hidden and
/// revealed. The hit test only considers the current group's masks, so an
/// overlapping mask from another question cannot swallow the tap.
fn review_tap(
    mut events: MessageReader<CanvasTap>,
    mut session: ResMut<ReviewSession>,
    cache: Res<Cache>,
) {
    for event in events.read() {
        let Some(current) = session.current_group() else {
            continue;
        };
        let Some(mask_id) = current_card_mask_at(&cache, current, event.norm) else {
            continue;
        };
        if !session.revealed.remove(&mask_id) {
            session.revealed.insert(mask_id);
        }
    }
}

fn handle_show_all(
    mut events: MessageReader<ShowAllMasksRequest>,
    mut session: ResMut<ReviewSession>,
    cache: Res<Cache>,
) {
    for _ in events.read() {
        let Some(group_id) = session.current_group() else {
            continue;
        };
        let mask_ids: Vec<Uuid> = cache.masks_of_group(group_id).iter().map(|m| m.id).collect();
        session.revealed.extend(mask_ids);
    }
}

fn review_mask_style(session: Res<ReviewSession>, mut style: ResMut<MaskStyle>) {
    if !session.is_changed() {
        return;
    }
    style.revealed = session.revealed.clone();
    style.highlighted_groups.clear();
    style.show_labels = false;
}

pub struct ReviewPlugin;

impl Plugin for ReviewPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ReviewSession>()
            .init_resource::<PickerState>()
            .add_message::<StartDueReviewRequest>()
            .add_message::<RateRequest>()
            .add_message::<SkipCurrentRequest>()
            .add_message::<ShowAllMasksRequest>()
            .add_message::<NextCardRequest>()
            .add_message::<PrevCardRequest>()
            .add_message::<OpenPickerRequest>()
            .add_message::<StartPracticeRequest>()
            .add_systems(
                Update,
                (
                    handle_start_due.run_if(on_message::<StartDueReviewRequest>),
                    handle_rate.run_if(on_message::<RateRequest>),
                    handle_skip.run_if(on_message::<SkipCurrentRequest>),
                    handle_show_all.run_if(on_message::<ShowAllMasksRequest>),
                    handle_navigation
                        .run_if(on_message::<NextCardRequest>.or(on_message::<PrevCardRequest>)),
                    review_tap.run_if(in_state(Screen::Review).and(on_message::<CanvasTap>)),
                    review_mask_style.run_if(in_state(Screen::Review)),
                    picker::handle_open_picker.run_if(on_message::<OpenPickerRequest>),
                    picker::handle_start_practice.run_if(on_message::<StartPracticeRequest>),
                    picker::picker_tap
                        .run_if(in_state(Screen::Picker).and(on_message::<CanvasTap>)),
                    picker::picker_mask_style.run_if(in_state(Screen::Picker)),
                ),
            );
    }
}
