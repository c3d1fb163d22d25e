//! Mutation helpers for groups and masks.
//!
//! Every function here commits a complete unit of work against the store.
//! Callers reload the cache afterwards.

use bevy::math::Vec2;
use uuid::Uuid;

use crate::scheduler::SrsState;
use crate::store::Store;

use super::{Group, Mask, NormRect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// Create the next question group on a print, with a fresh scheduling state
/// due immediately. Returns the new group's id.
pub fn create_group(store: &mut Store, print_id: Uuid, page_index: u32, now: i64) -> Uuid {
    let siblings = store.groups_of_print(print_id);
    let order_index = siblings.iter().map(|g| g.order_index + 1).max().unwrap_or(0);
    let label = format!("Q{}", siblings.len() + 1);

    let id = Uuid::new_v4();
    store.put_group(Group {
        id,
        print_id,
        page_index,
        label,
        order_index,
        is_active: true,
        created_at: now,
    });
    store.put_srs(SrsState::new(id, now));
    id
}

/// Rename a print. Blank titles and missing prints are ignored.
pub fn rename_print(store: &mut Store, print_id: Uuid, title: &str) -> bool {
    let title = title.trim();
    if title.is_empty() {
        return false;
    }
    let Some(mut print) = store.print(print_id).cloned() else {
        return false;
    };
    print.title = title.to_string();
    store.put_print(print);
    true
}

/// Move a print to another subject. The free-text label only survives on
/// "Other"; switching to a preset clears it.
pub fn set_print_subject(
    store: &mut Store,
    print_id: Uuid,
    subject: &str,
    subject_other: &str,
) -> bool {
    let Some(mut print) = store.print(print_id).cloned() else {
        return false;
    };
    print.subject = subject.to_string();
    print.subject_other = if subject == "Other" {
        subject_other.trim().to_string()
    } else {
        String::new()
    };
    store.put_print(print);
    true
}

/// Swap a group with its neighbor in display order. No-op at either end or
/// when the group is gone.
pub fn reorder_group(store: &mut Store, group_id: Uuid, direction: MoveDirection) -> bool {
    let Some(group) = store.group(group_id) else {
        return false;
    };
    let siblings: Vec<Group> = store
        .groups_of_print(group.print_id)
        .into_iter()
        .cloned()
        .collect();
    let Some(pos) = siblings.iter().position(|g| g.id == group_id) else {
        return false;
    };
    let neighbor_pos = match direction {
        MoveDirection::Up if pos > 0 => pos - 1,
        MoveDirection::Down if pos + 1 < siblings.len() => pos + 1,
        _ => return false,
    };

    let mut a = siblings[pos].clone();
    let mut b = siblings[neighbor_pos].clone();
    std::mem::swap(&mut a.order_index, &mut b.order_index);
    store.put_group(a);
    store.put_group(b);
    true
}

/// Delete a group and all records keyed to it. Returns the first remaining
/// sibling in display order, for the editor to select next.
pub fn delete_group(store: &mut Store, group_id: Uuid) -> Option<Uuid> {
    let print_id = store.group(group_id)?.print_id;
    store.delete_group_cascade(group_id);
    store.groups_of_print(print_id).first().map(|g| g.id)
}

/// Add a drawn mask to a group. Returns `None` when the group no longer
/// exists (deleted under a racing pointer).
pub fn draw_mask(store: &mut Store, group_id: Uuid, rect: NormRect, now: i64) -> Option<Uuid> {
    let group = store.group(group_id)?;
    let mask = Mask {
        id: Uuid::new_v4(),
        group_id,
        print_id: group.print_id,
        page_index: group.page_index,
        rect,
        created_at: now,
    };
    let id = mask.id;
    store.put_mask(mask);
    Some(id)
}

/// Move masks into another group. Masks or targets that disappeared are
/// skipped.
pub fn reassign_masks(store: &mut Store, mask_ids: &[Uuid], target_group: Uuid) {
    if store.group(target_group).is_none() {
        return;
    }
    for &id in mask_ids {
        if let Some(mut mask) = store.mask(id).cloned() {
            mask.group_id = target_group;
            store.put_mask(mask);
        }
    }
}

pub fn delete_masks(store: &mut Store, mask_ids: &[Uuid]) {
    for &id in mask_ids {
        store.delete_mask(id);
    }
}

/// Topmost mask under a normalized point. Masks are passed in creation
/// order, so the last hit wins.
pub fn hit_test_masks(masks: &[&Mask], point: Vec2) -> Option<Uuid> {
    masks
        .iter()
        .rev()
        .find(|m| m.rect.contains(point))
        .map(|m| m.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Print;
    use std::path::PathBuf;

    fn store_with_print() -> (Store, Uuid) {
        let mut store = Store::empty(PathBuf::from("test-store"));
        let print_id = Uuid::new_v4();
        store.put_print(Print {
            id: print_id,
            title: "t".into(),
            subject: "Math".into(),
            subject_other: String::new(),
            created_at: 0,
        });
        (store, print_id)
    }

    #[test]
    fn test_create_group_labels_and_orders_sequentially() {
        let (mut store, print_id) = store_with_print();
        let g1 = create_group(&mut store, print_id, 0, 10);
        let g2 = create_group(&mut store, print_id, 0, 20);

        let groups = store.groups_of_print(print_id);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].id, g1);
        assert_eq!(groups[0].label, "Q1");
        assert_eq!(groups[1].id, g2);
        assert_eq!(groups[1].label, "Q2");
        assert_eq!(groups[1].order_index, 1);
    }

    #[test]
    fn test_create_group_seeds_srs_state() {
        let (mut store, print_id) = store_with_print();
        create_group(&mut store, print_id, 0, 42);
        let snapshot = store.snapshot();
        assert_eq!(snapshot.srs.len(), 1);
        assert_eq!(snapshot.srs[0].next_due_at, 42);
    }

    #[test]
    fn test_rename_print_trims_and_rejects_blank() {
        let (mut store, print_id) = store_with_print();
        assert!(rename_print(&mut store, print_id, "  Long division  "));
        assert_eq!(store.print(print_id).unwrap().title, "Long division");

        assert!(!rename_print(&mut store, print_id, "   "));
        assert_eq!(store.print(print_id).unwrap().title, "Long division");
        assert!(!rename_print(&mut store, Uuid::new_v4(), "x"));
    }

    #[test]
    fn test_set_print_subject_clears_other_on_preset() {
        let (mut store, print_id) = store_with_print();
        assert!(set_print_subject(&mut store, print_id, "Other", " Geography "));
        let print = store.print(print_id).unwrap();
        assert_eq!(print.subject, "Other");
        assert_eq!(print.subject_other, "Geography");

        assert!(set_print_subject(&mut store, print_id, "Science", "Geography"));
        let print = store.print(print_id).unwrap();
        assert_eq!(print.subject, "Science");
        assert_eq!(print.subject_other, "");
    }

    #[test]
    fn test_reorder_swaps_with_neighbor() {
        let (mut store, print_id) = store_with_print();
        let g1 = create_group(&mut store, print_id, 0, 0);
        let g2 = create_group(&mut store, print_id, 0, 0);

        assert!(reorder_group(&mut store, g2, MoveDirection::Up));
        let ids: Vec<Uuid> = store.groups_of_print(print_id).iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![g2, g1]);
    }

    #[test]
    fn test_reorder_noop_at_bounds() {
        let (mut store, print_id) = store_with_print();
        let g1 = create_group(&mut store, print_id, 0, 0);
        create_group(&mut store, print_id, 0, 0);

        assert!(!reorder_group(&mut store, g1, MoveDirection::Up));
        let ids: Vec<Uuid> = store.groups_of_print(print_id).iter().map(|g| g.id).collect();
        assert_eq!(ids[0], g1);
    }

    #[test]
    fn test_delete_group_returns_fallback_sibling() {
        let (mut store, print_id) = store_with_print();
        let g1 = create_group(&mut store, print_id, 0, 0);
        let g2 = create_group(&mut store, print_id, 0, 0);

        assert_eq!(delete_group(&mut store, g1), Some(g2));
        assert_eq!(delete_group(&mut store, g2), None);
    }

    #[test]
    fn test_draw_mask_inherits_group_location() {
        let (mut store, print_id) = store_with_print();
        let gid = create_group(&mut store, print_id, 0, 0);
        let mid = draw_mask(&mut store, gid, NormRect::new(0.1, 0.1, 0.2, 0.2), 5).unwrap();

        let mask = store.mask(mid).unwrap();
        assert_eq!(mask.print_id, print_id);
        assert_eq!(mask.group_id, gid);
    }

    #[test]
    fn test_draw_mask_into_missing_group_fails() {
        let (mut store, _print_id) = store_with_print();
        assert!(draw_mask(&mut store, Uuid::new_v4(), NormRect::new(0.0, 0.0, 0.1, 0.1), 0).is_none());
    }

    #[test]
    fn test_reassign_moves_masks_between_groups() {
        let (mut store, print_id) = store_with_print();
        let g1 = create_group(&mut store, print_id, 0, 0);
        let g2 = create_group(&mut store, print_id, 0, 0);
        let m = draw_mask(&mut store, g1, NormRect::new(0.1, 0.1, 0.2, 0.2), 0).unwrap();

        reassign_masks(&mut store, &[m], g2);
        assert_eq!(store.mask(m).unwrap().group_id, g2);

        // Missing target leaves masks untouched
        reassign_masks(&mut store, &[m], Uuid::new_v4());
        assert_eq!(store.mask(m).unwrap().group_id, g2);
    }

    #[test]
    fn test_hit_test_prefers_topmost() {
        let (mut store, print_id) = store_with_print();
        let gid = create_group(&mut store, print_id, 0, 0);
        let bottom = draw_mask(&mut store, gid, NormRect::new(0.0, 0.0, 0.5, 0.5), 1).unwrap();
        let top = draw_mask(&mut store, gid, NormRect::new(0.2, 0.2, 0.5, 0.5), 2).unwrap();

        let snapshot = store.snapshot();
        let masks: Vec<&Mask> = snapshot.masks.iter().collect();
        assert_eq!(hit_test_masks(&masks, Vec2::new(0.3, 0.3)), Some(top));
        assert_eq!(hit_test_masks(&masks, Vec2::new(0.1, 0.1)), Some(bottom));
        assert_eq!(hit_test_masks(&masks, Vec2::new(0.9, 0.9)), None);
    }
}
