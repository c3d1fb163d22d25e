//! Backup export and restore of the whole store as a single JSON file.

use bevy::prelude::*;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{Cache, Store, StoreSnapshot};

pub const BACKUP_VERSION: u32 = 1;

/// The on-disk backup format: a versioned envelope around a full snapshot.
#[derive(Debug, Serialize, Deserialize)]
pub struct BackupPayload {
    pub version: u32,
    pub exported_at: i64,
    pub data: StoreSnapshot,
}

#[derive(Message)]
pub struct SaveBackupRequest;

/// Replaces the entire store with the contents of a chosen backup file.
#[derive(Message)]
pub struct RestoreStoreRequest;

pub fn handle_backup_requests(
    mut save_events: MessageReader<SaveBackupRequest>,
    mut restore_events: MessageReader<RestoreStoreRequest>,
    mut store: ResMut<Store>,
    mut cache: ResMut<Cache>,
    mut save_error: ResMut<super::StoreSaveError>,
) {
    for _ in save_events.read() {
        let default_name = format!("maskdrill-backup-{}.json", Utc::now().format("%Y-%m-%d"));
        let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON backup", &["json"])
            .set_file_name(&default_name)
            .save_file()
        else {
            continue;
        };

        let payload = BackupPayload {
            version: BACKUP_VERSION,
            exported_at: Utc::now().timestamp_millis(),
            data: store.snapshot(),
        };
        let result = serde_json::to_string_pretty(&payload)
            .map_err(|e| format!("Failed to serialize backup: {e}"))
            .and_then(|json| {
                std::fs::write(&path, json).map_err(|e| format!("Failed to write backup: {e}"))
            });
        match result {
            Ok(()) => info!("Backup written to {:?}", path),
            Err(error) => {
                error!("{}", error);
                save_error.message = Some(error);
            }
        }
    }

    for _ in restore_events.read() {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON backup", &["json"])
            .pick_file()
        else {
            continue;
        };

        let result = std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read backup: {e}"))
            .and_then(|json| {
                serde_json::from_str::<BackupPayload>(&json)
                    .map_err(|e| format!("Not a valid backup file: {e}"))
            });
        match result {
            Ok(payload) => {
                if payload.version > BACKUP_VERSION {
                    let error = format!(
                        "Backup version {} is newer than this app supports",
                        payload.version
                    );
                    error!("{}", error);
                    save_error.message = Some(error);
                    continue;
                }
                info!("Restoring backup from {:?}", path);
                store.replace_with(payload.data);
                cache.reload(&store);
            }
            Err(error) => {
                error!("{}", error);
                save_error.message = Some(error);
            }
        }
    }
}
