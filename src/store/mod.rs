//! Keyed record store and the in-memory cache over it.
//!
//! Each record kind (prints, pages, groups, masks, srs, reviews, skips)
//! persists as one JSON file under the store directory. All reads go through
//! the [`Cache`], a read-mostly snapshot rebuilt with an explicit
//! [`Cache::reload`] after each committed mutation. Writes mutate the
//! [`Store`] maps and mark them dirty; a single outstanding async flush task
//! writes the whole store back to disk (see [`flush`]).
//!
//! Cascading deletes run as one in-memory unit over the explicit dependency
//! graph (Print -> Page, Groups; Group -> Masks, SrsState, Skip, Reviews),
//! so a crash mid-delete can never be observed by readers.

mod backup;
mod flush;

pub use backup::{BackupPayload, RestoreStoreRequest, SaveBackupRequest, handle_backup_requests};
pub use flush::{AsyncStoreOperation, FlushStoreTask, StoreSaveError, flush_store_system,
    poll_flush_tasks};

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

use crate::model::{Group, Mask, Page, Print};
use crate::scheduler::{ReviewLogEntry, SkipRecord, SrsState};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// The page record for a print is gone. Aborts opening that print.
    #[error("no page record for print {0}")]
    MissingPage(Uuid),
    /// The page record exists but its image file does not.
    #[error("page image missing at {0:?}")]
    MissingImage(PathBuf),
}

/// Serializable snapshot of every record kind, used by the async flush and
/// by backup/restore.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub prints: Vec<Print>,
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub masks: Vec<Mask>,
    #[serde(default)]
    pub srs: Vec<SrsState>,
    #[serde(default)]
    pub reviews: Vec<ReviewLogEntry>,
    #[serde(default)]
    pub skips: Vec<SkipRecord>,
}

/// The authoritative in-memory record maps, persisted to one JSON file per
/// kind under `root`.
#[derive(Resource)]
pub struct Store {
    root: PathBuf,
    prints: HashMap<Uuid, Print>,
    pages: HashMap<Uuid, Page>,
    groups: HashMap<Uuid, Group>,
    masks: HashMap<Uuid, Mask>,
    /// Keyed by group id (one-to-one with groups).
    srs: HashMap<Uuid, SrsState>,
    reviews: HashMap<Uuid, ReviewLogEntry>,
    /// Keyed by group id.
    skips: HashMap<Uuid, SkipRecord>,
    dirty: bool,
}

impl Default for Store {
    fn default() -> Self {
        Self::empty(crate::paths::store_dir())
    }
}

fn load_kind<T: for<'de> Deserialize<'de>>(root: &Path, kind: &str) -> Result<Vec<T>, StoreError> {
    let path = root.join(format!("{kind}.json"));
    if !path.exists() {
        return Ok(Vec::new());
    }
    let json = std::fs::read_to_string(&path).map_err(|source| StoreError::Io {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&json).map_err(|source| StoreError::Parse { path, source })
}

impl Store {
    pub fn empty(root: PathBuf) -> Self {
        Self {
            root,
            prints: HashMap::new(),
            pages: HashMap::new(),
            groups: HashMap::new(),
            masks: HashMap::new(),
            srs: HashMap::new(),
            reviews: HashMap::new(),
            skips: HashMap::new(),
            dirty: false,
        }
    }

    /// Load every record kind from disk. Missing files mean an empty kind
    /// (first run); unreadable or corrupt files are a hard error so we never
    /// silently start from scratch over real data.
    pub fn open(root: PathBuf) -> Result<Self, StoreError> {
        let mut store = Self::empty(root);
        for p in load_kind::<Print>(&store.root, "prints")? {
            store.prints.insert(p.id, p);
        }
        for p in load_kind::<Page>(&store.root, "pages")? {
            store.pages.insert(p.id, p);
        }
        for g in load_kind::<Group>(&store.root, "groups")? {
            store.groups.insert(g.id, g);
        }
        for m in load_kind::<Mask>(&store.root, "masks")? {
            store.masks.insert(m.id, m);
        }
        for s in load_kind::<SrsState>(&store.root, "srs")? {
            store.srs.insert(s.group_id, s);
        }
        for r in load_kind::<ReviewLogEntry>(&store.root, "reviews")? {
            store.reviews.insert(r.id, r);
        }
        for s in load_kind::<SkipRecord>(&store.root, "skips")? {
            store.skips.insert(s.group_id, s);
        }
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    // Record-level writes. Every write marks the store dirty for the flush.

    pub fn put_print(&mut self, print: Print) {
        self.prints.insert(print.id, print);
        self.dirty = true;
    }

    pub fn put_page(&mut self, page: Page) {
        self.pages.insert(page.id, page);
        self.dirty = true;
    }

    pub fn put_group(&mut self, group: Group) {
        self.groups.insert(group.id, group);
        self.dirty = true;
    }

    pub fn put_mask(&mut self, mask: Mask) {
        self.masks.insert(mask.id, mask);
        self.dirty = true;
    }

    pub fn put_srs(&mut self, state: SrsState) {
        self.srs.insert(state.group_id, state);
        self.dirty = true;
    }

    pub fn put_review(&mut self, entry: ReviewLogEntry) {
        self.reviews.insert(entry.id, entry);
        self.dirty = true;
    }

    pub fn put_skip(&mut self, skip: SkipRecord) {
        self.skips.insert(skip.group_id, skip);
        self.dirty = true;
    }

    pub fn delete_mask(&mut self, id: Uuid) {
        if self.masks.remove(&id).is_some() {
            self.dirty = true;
        }
    }

    pub fn delete_skip(&mut self, group_id: Uuid) {
        if self.skips.remove(&group_id).is_some() {
            self.dirty = true;
        }
    }

    pub fn print(&self, id: Uuid) -> Option<&Print> {
        self.prints.get(&id)
    }

    pub fn group(&self, id: Uuid) -> Option<&Group> {
        self.groups.get(&id)
    }

    pub fn srs(&self, group_id: Uuid) -> Option<&SrsState> {
        self.srs.get(&group_id)
    }

    pub fn mask(&self, id: Uuid) -> Option<&Mask> {
        self.masks.get(&id)
    }

    pub fn groups_of_print(&self, print_id: Uuid) -> Vec<&Group> {
        let mut groups: Vec<&Group> = self
            .groups
            .values()
            .filter(|g| g.print_id == print_id)
            .collect();
        groups.sort_by_key(|g| (g.order_index, g.created_at, g.id));
        groups
    }

    /// Delete a group and everything keyed to it, as one unit.
    pub fn delete_group_cascade(&mut self, group_id: Uuid) {
        if self.groups.remove(&group_id).is_none() {
            // Stale selection; nothing to do
            return;
        }
        self.masks.retain(|_, m| m.group_id != group_id);
        self.srs.remove(&group_id);
        self.skips.remove(&group_id);
        self.reviews.retain(|_, r| r.group_id != group_id);
        self.dirty = true;
    }

    /// Delete a print, its page, and every group-owned record, as one unit.
    /// Returns the image paths whose files should be removed from disk.
    pub fn delete_print_cascade(&mut self, print_id: Uuid) -> Vec<PathBuf> {
        if self.prints.remove(&print_id).is_none() {
            return Vec::new();
        }
        let mut orphaned_images = Vec::new();
        self.pages.retain(|_, p| {
            if p.print_id == print_id {
                orphaned_images.push(p.image_path.clone());
                false
            } else {
                true
            }
        });

        let doomed_groups: Vec<Uuid> = self
            .groups
            .values()
            .filter(|g| g.print_id == print_id)
            .map(|g| g.id)
            .collect();
        self.groups.retain(|_, g| g.print_id != print_id);
        self.masks.retain(|_, m| m.print_id != print_id);
        for gid in &doomed_groups {
            self.srs.remove(gid);
            self.skips.remove(gid);
        }
        self.reviews.retain(|_, r| !doomed_groups.contains(&r.group_id));
        self.dirty = true;
        orphaned_images
    }

    /// Ordered snapshot of every kind, for flushing and backup.
    pub fn snapshot(&self) -> StoreSnapshot {
        let mut snapshot = StoreSnapshot {
            prints: self.prints.values().cloned().collect(),
            pages: self.pages.values().cloned().collect(),
            groups: self.groups.values().cloned().collect(),
            masks: self.masks.values().cloned().collect(),
            srs: self.srs.values().cloned().collect(),
            reviews: self.reviews.values().cloned().collect(),
            skips: self.skips.values().cloned().collect(),
        };
        snapshot.prints.sort_by_key(|p| (p.created_at, p.id));
        snapshot.pages.sort_by_key(|p| p.id);
        snapshot.groups.sort_by_key(|g| (g.created_at, g.id));
        snapshot.masks.sort_by_key(|m| (m.created_at, m.id));
        snapshot.srs.sort_by_key(|s| s.group_id);
        snapshot.reviews.sort_by_key(|r| (r.reviewed_at, r.id));
        snapshot.skips.sort_by_key(|s| s.group_id);
        snapshot
    }

    /// Replace the whole store contents (backup restore).
    pub fn replace_with(&mut self, snapshot: StoreSnapshot) {
        self.prints = snapshot.prints.into_iter().map(|p| (p.id, p)).collect();
        self.pages = snapshot.pages.into_iter().map(|p| (p.id, p)).collect();
        self.groups = snapshot.groups.into_iter().map(|g| (g.id, g)).collect();
        self.masks = snapshot.masks.into_iter().map(|m| (m.id, m)).collect();
        self.srs = snapshot.srs.into_iter().map(|s| (s.group_id, s)).collect();
        self.reviews = snapshot.reviews.into_iter().map(|r| (r.id, r)).collect();
        self.skips = snapshot.skips.into_iter().map(|s| (s.group_id, s)).collect();
        self.dirty = true;
    }
}

/// Read-mostly snapshot of the store, rebuilt after each committed mutation.
///
/// Vectors are pre-sorted: prints newest-first, groups by order index, masks
/// in creation order (which doubles as z-order for hit testing).
#[derive(Resource, Default)]
pub struct Cache {
    pub prints: Vec<Print>,
    pub pages: Vec<Page>,
    pub groups: Vec<Group>,
    pub masks: Vec<Mask>,
    pub srs: Vec<SrsState>,
    pub reviews: Vec<ReviewLogEntry>,
    pub skips: Vec<SkipRecord>,
}

impl Cache {
    pub fn reload(&mut self, store: &Store) {
        let snapshot = store.snapshot();
        self.prints = snapshot.prints;
        self.prints.sort_by_key(|p| std::cmp::Reverse((p.created_at, p.id)));
        self.pages = snapshot.pages;
        self.groups = snapshot.groups;
        self.groups.sort_by_key(|g| (g.order_index, g.created_at, g.id));
        self.masks = snapshot.masks;
        self.srs = snapshot.srs;
        self.reviews = snapshot.reviews;
        self.skips = snapshot.skips;
    }

    pub fn print(&self, id: Uuid) -> Option<&Print> {
        self.prints.iter().find(|p| p.id == id)
    }

    /// First page of a print, or a missing-dependency error for the caller
    /// to surface.
    pub fn page_for_print(&self, print_id: Uuid) -> Result<&Page, StoreError> {
        self.pages
            .iter()
            .find(|p| p.print_id == print_id && p.page_index == 0)
            .ok_or(StoreError::MissingPage(print_id))
    }

    pub fn group(&self, id: Uuid) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn groups_of_print(&self, print_id: Uuid) -> Vec<&Group> {
        self.groups.iter().filter(|g| g.print_id == print_id).collect()
    }

    pub fn mask(&self, id: Uuid) -> Option<&Mask> {
        self.masks.iter().find(|m| m.id == id)
    }

    pub fn mask_mut(&mut self, id: Uuid) -> Option<&mut Mask> {
        self.masks.iter_mut().find(|m| m.id == id)
    }

    /// Masks of a print in creation order (bottom to top of the z stack).
    pub fn masks_of_print(&self, print_id: Uuid) -> Vec<&Mask> {
        self.masks.iter().filter(|m| m.print_id == print_id).collect()
    }

    pub fn masks_of_group(&self, group_id: Uuid) -> Vec<&Mask> {
        self.masks.iter().filter(|m| m.group_id == group_id).collect()
    }

    pub fn srs_for(&self, group_id: Uuid) -> Option<&SrsState> {
        self.srs.iter().find(|s| s.group_id == group_id)
    }
}

pub struct StorePlugin;

impl Plugin for StorePlugin {
    fn build(&self, app: &mut App) {
        let store = match Store::open(crate::paths::store_dir()) {
            Ok(store) => store,
            Err(e) => {
                error!("Failed to open record store: {e}");
                // Start empty rather than crash; the flush will not overwrite
                // the unreadable files until something is actually edited.
                Store::empty(crate::paths::store_dir())
            }
        };
        let mut cache = Cache::default();
        cache.reload(&store);

        app.insert_resource(store)
            .insert_resource(cache)
            .init_resource::<AsyncStoreOperation>()
            .init_resource::<StoreSaveError>()
            .add_message::<SaveBackupRequest>()
            .add_message::<RestoreStoreRequest>()
            .add_systems(
                Update,
                (flush_store_system, poll_flush_tasks, handle_backup_requests),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NormRect;

    fn print_with_group() -> (Store, Uuid, Uuid) {
        let mut store = Store::empty(PathBuf::from("test-store"));
        let print_id = Uuid::new_v4();
        let group_id = Uuid::new_v4();
        store.put_print(Print {
            id: print_id,
            title: "p".into(),
            subject: "Math".into(),
            subject_other: String::new(),
            created_at: 1,
        });
        store.put_page(Page {
            id: Uuid::new_v4(),
            print_id,
            page_index: 0,
            image_path: PathBuf::from("pages/x.jpg"),
            width: 800,
            height: 600,
        });
        store.put_group(Group {
            id: group_id,
            print_id,
            page_index: 0,
            label: "Q1".into(),
            order_index: 0,
            is_active: true,
            created_at: 1,
        });
        store.put_mask(Mask {
            id: Uuid::new_v4(),
            group_id,
            print_id,
            page_index: 0,
            rect: NormRect::new(0.1, 0.1, 0.2, 0.2),
            created_at: 2,
        });
        store.put_srs(SrsState::new(group_id, 1));
        store.put_skip(SkipRecord {
            group_id,
            skip_until: 99,
        });
        (store, print_id, group_id)
    }

    #[test]
    fn test_delete_group_cascade_removes_owned_records() {
        let (mut store, _print_id, group_id) = print_with_group();
        store.delete_group_cascade(group_id);

        let snapshot = store.snapshot();
        assert!(snapshot.groups.is_empty());
        assert!(snapshot.masks.is_empty());
        assert!(snapshot.srs.is_empty());
        assert!(snapshot.skips.is_empty());
        // The print and page survive
        assert_eq!(snapshot.prints.len(), 1);
        assert_eq!(snapshot.pages.len(), 1);
    }

    #[test]
    fn test_delete_print_cascade_is_total() {
        let (mut store, print_id, _group_id) = print_with_group();
        let images = store.delete_print_cascade(print_id);

        assert_eq!(images, vec![PathBuf::from("pages/x.jpg")]);
        let snapshot = store.snapshot();
        assert!(snapshot.prints.is_empty());
        assert!(snapshot.pages.is_empty());
        assert!(snapshot.groups.is_empty());
        assert!(snapshot.masks.is_empty());
        assert!(snapshot.srs.is_empty());
        assert!(snapshot.skips.is_empty());
    }

    #[test]
    fn test_delete_missing_print_is_noop() {
        let (mut store, _print_id, _group_id) = print_with_group();
        store.clear_dirty();
        let images = store.delete_print_cascade(Uuid::new_v4());
        assert!(images.is_empty());
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_cache_reload_orders_groups_by_order_index() {
        let mut store = Store::empty(PathBuf::from("test-store"));
        let print_id = Uuid::new_v4();
        for (i, order) in [2u32, 0, 1].iter().enumerate() {
            store.put_group(Group {
                id: Uuid::new_v4(),
                print_id,
                page_index: 0,
                label: format!("Q{i}"),
                order_index: *order,
                is_active: true,
                created_at: i as i64,
            });
        }
        let mut cache = Cache::default();
        cache.reload(&store);
        let orders: Vec<u32> = cache.groups.iter().map(|g| g.order_index).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn test_page_for_print_missing_is_error() {
        let cache = Cache::default();
        let result = cache.page_for_print(Uuid::new_v4());
        assert!(matches!(result, Err(StoreError::MissingPage(_))));
    }

    #[test]
    fn test_snapshot_roundtrip_through_replace() {
        let (store, print_id, group_id) = print_with_group();
        let mut other = Store::empty(PathBuf::from("other"));
        other.replace_with(store.snapshot());
        assert!(other.group(group_id).is_some());
        assert_eq!(other.groups_of_print(print_id).len(), 1);
    }
}
