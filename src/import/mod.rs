//! Worksheet photo import.
//!
//! The user picks an image file, which is decoded, downscaled to at most
//! [`IMPORT_MAX_WIDTH`] pixels wide, and re-encoded as JPEG into the pages
//! directory. Decode and re-encode run on the IO task pool; the records are
//! created when the task completes, so a half-imported print never exists.

use bevy::prelude::*;
use bevy::tasks::{IoTaskPool, Task};
use chrono::Utc;
use futures_lite::future;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use std::path::PathBuf;
use uuid::Uuid;

use crate::constants::{IMPORT_JPEG_QUALITY, IMPORT_MAX_WIDTH};
use crate::editor::OpenPrintRequest;
use crate::model::{self, Page, Print};
use crate::store::{Cache, Store};
use crate::ui::Screen;

/// Import a new print from a user-chosen photo.
#[derive(Message)]
pub struct ImportPrintRequest {
    pub title: String,
    pub subject: String,
    pub subject_other: String,
}

#[derive(Resource, Default)]
pub struct AsyncImportOperation {
    pub is_importing: bool,
}

/// Resource holding the last import failure for display to the user.
#[derive(Resource, Default)]
pub struct ImportError {
    pub message: Option<String>,
}

struct ImportedImage {
    page_id: Uuid,
    /// File name relative to the pages directory.
    file_name: String,
    width: u32,
    height: u32,
}

#[derive(Component)]
pub struct ImportTask {
    task: Task<Result<ImportedImage, String>>,
    title: String,
    subject: String,
    subject_other: String,
}

fn process_image(source: PathBuf, page_id: Uuid) -> Result<ImportedImage, String> {
    let img = image::open(&source).map_err(|e| format!("Could not read image: {e}"))?;

    let img = if img.width() > IMPORT_MAX_WIDTH {
        let scale = IMPORT_MAX_WIDTH as f32 / img.width() as f32;
        let height = ((img.height() as f32 * scale).round() as u32).max(1);
        img.resize(IMPORT_MAX_WIDTH, height, FilterType::Triangle)
    } else {
        img
    };

    let file_name = format!("{page_id}.jpg");
    let dest = crate::paths::pages_dir().join(&file_name);
    let mut file =
        std::fs::File::create(&dest).map_err(|e| format!("Could not create {dest:?}: {e}"))?;
    let rgb = img.to_rgb8();
    JpegEncoder::new_with_quality(&mut file, IMPORT_JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| format!("Could not encode image: {e}"))?;

    Ok(ImportedImage {
        page_id,
        file_name,
        width: img.width(),
        height: img.height(),
    })
}

pub fn handle_import_request(
    mut commands: Commands,
    mut events: MessageReader<ImportPrintRequest>,
    mut async_op: ResMut<AsyncImportOperation>,
) {
    for event in events.read() {
        if async_op.is_importing {
            warn!("Import already in progress");
            continue;
        }
        let Some(source) = rfd::FileDialog::new()
            .add_filter("Images", &["png", "jpg", "jpeg", "webp", "bmp"])
            .pick_file()
        else {
            continue;
        };

        async_op.is_importing = true;
        let page_id = Uuid::new_v4();
        let task_pool = IoTaskPool::get();
        let task = task_pool.spawn(async move { process_image(source, page_id) });
        commands.spawn(ImportTask {
            task,
            title: event.title.clone(),
            subject: event.subject.clone(),
            subject_other: event.subject_other.clone(),
        });
    }
}

/// Completes imports: creates the print, its page, and a first question
/// group, then opens it in the editor.
#[allow(clippy::too_many_arguments)]
pub fn poll_import_tasks(
    mut commands: Commands,
    mut tasks: Query<(Entity, &mut ImportTask)>,
    mut async_op: ResMut<AsyncImportOperation>,
    mut import_error: ResMut<ImportError>,
    mut store: ResMut<Store>,
    mut cache: ResMut<Cache>,
    mut open_events: MessageWriter<OpenPrintRequest>,
    mut next_screen: ResMut<NextState<Screen>>,
) {
    for (entity, mut import) in tasks.iter_mut() {
        let Some(result) = future::block_on(future::poll_once(&mut import.task)) else {
            continue;
        };
        async_op.is_importing = false;

        match result {
            Ok(imported) => {
                let now = Utc::now().timestamp_millis();
                let print_id = Uuid::new_v4();
                let title = if import.title.trim().is_empty() {
                    "Untitled print".to_string()
                } else {
                    import.title.trim().to_string()
                };
                store.put_print(Print {
                    id: print_id,
                    title,
                    subject: import.subject.clone(),
                    subject_other: import.subject_other.clone(),
                    created_at: now,
                });
                store.put_page(Page {
                    id: imported.page_id,
                    print_id,
                    page_index: 0,
                    image_path: PathBuf::from(&imported.file_name),
                    width: imported.width,
                    height: imported.height,
                });
                model::create_group(&mut store, print_id, 0, now);
                cache.reload(&store);

                import_error.message = None;
                info!("Imported print {print_id} ({}x{})", imported.width, imported.height);
                open_events.write(OpenPrintRequest { print_id });
                next_screen.set(Screen::Edit);
            }
            Err(error) => {
                error!("Import failed: {error}");
                import_error.message = Some(error);
            }
        }

        commands.entity(entity).despawn();
    }
}

pub struct ImportPlugin;

impl Plugin for ImportPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AsyncImportOperation>()
            .init_resource::<ImportError>()
            .add_message::<ImportPrintRequest>()
            .add_systems(Update, (handle_import_request, poll_import_tasks));
    }
}
