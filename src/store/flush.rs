//! Write-behind flush of the store to disk.
//!
//! The store marks itself dirty on every mutation. Once per frame, if the
//! store is dirty and no flush is running, a snapshot is handed to an
//! [`IoTaskPool`] task that writes one JSON file per record kind. At most
//! one flush task exists at a time.

use bevy::prelude::*;
use bevy::tasks::{IoTaskPool, Task};
use futures_lite::future;
use std::path::PathBuf;

use super::{Store, StoreSnapshot};

/// Resource tracking the in-flight flush for the status line.
#[derive(Resource, Default)]
pub struct AsyncStoreOperation {
    pub is_flushing: bool,
}

/// Resource holding the last flush failure for display to the user.
#[derive(Resource, Default)]
pub struct StoreSaveError {
    pub message: Option<String>,
}

pub struct FlushResult {
    pub success: bool,
    pub error: Option<String>,
}

/// Component for an in-flight flush task.
#[derive(Component)]
pub struct FlushStoreTask(pub Task<FlushResult>);

fn write_kind<T: serde::Serialize>(root: &PathBuf, kind: &str, records: &[T]) -> Result<(), String> {
    let json = serde_json::to_string_pretty(records)
        .map_err(|e| format!("Failed to serialize {kind}: {e}"))?;
    let path = root.join(format!("{kind}.json"));
    let tmp = root.join(format!("{kind}.json.tmp"));
    std::fs::write(&tmp, json).map_err(|e| format!("Failed to write {tmp:?}: {e}"))?;
    // Rename over the old file so readers never see a partial write
    std::fs::rename(&tmp, &path).map_err(|e| format!("Failed to replace {path:?}: {e}"))
}

pub fn write_snapshot(root: &PathBuf, snapshot: &StoreSnapshot) -> Result<(), String> {
    std::fs::create_dir_all(root).map_err(|e| format!("Failed to create {root:?}: {e}"))?;
    write_kind(root, "prints", &snapshot.prints)?;
    write_kind(root, "pages", &snapshot.pages)?;
    write_kind(root, "groups", &snapshot.groups)?;
    write_kind(root, "masks", &snapshot.masks)?;
    write_kind(root, "srs", &snapshot.srs)?;
    write_kind(root, "reviews", &snapshot.reviews)?;
    write_kind(root, "skips", &snapshot.skips)?;
    Ok(())
}

/// Starts a flush when the store is dirty and none is in flight.
pub fn flush_store_system(
    mut commands: Commands,
    mut store: ResMut<Store>,
    mut async_op: ResMut<AsyncStoreOperation>,
) {
    if !store.is_dirty() || async_op.is_flushing {
        return;
    }

    let snapshot = store.snapshot();
    let root = store.root().to_path_buf();
    store.clear_dirty();
    async_op.is_flushing = true;

    let task_pool = IoTaskPool::get();
    let task = task_pool.spawn(async move {
        match write_snapshot(&root, &snapshot) {
            Ok(()) => FlushResult {
                success: true,
                error: None,
            },
            Err(error) => FlushResult {
                success: false,
                error: Some(error),
            },
        }
    });

    commands.spawn(FlushStoreTask(task));
}

/// Polls flush tasks and records completion or failure.
pub fn poll_flush_tasks(
    mut commands: Commands,
    mut tasks: Query<(Entity, &mut FlushStoreTask)>,
    mut async_op: ResMut<AsyncStoreOperation>,
    mut save_error: ResMut<StoreSaveError>,
) {
    for (entity, mut task) in tasks.iter_mut() {
        if let Some(result) = future::block_on(future::poll_once(&mut task.0)) {
            async_op.is_flushing = false;

            if result.success {
                debug!("Store flushed to disk");
                save_error.message = None;
            } else if let Some(error) = result.error {
                error!("{}", error);
                save_error.message = Some(error);
            }

            commands.entity(entity).despawn();
        }
    }
}
