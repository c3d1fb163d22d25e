//! Record types for prints, pages, question groups, and answer masks.
//!
//! A **Print** is one imported worksheet: a single Page image plus any number
//! of Groups. A **Group** is one question unit made of one or more **Masks**,
//! opaque rectangles hidden over the page image. Masks store normalized
//! page-relative coordinates so they survive any display size.
//!
//! Scheduling records ([`crate::scheduler::SrsState`], skip records, review
//! log entries) are keyed by group id and cascade with their group.

mod ops;
mod rect;

pub use ops::{
    MoveDirection, create_group, delete_group, delete_masks, draw_mask, hit_test_masks,
    reassign_masks, rename_print, reorder_group, set_print_subject,
};
pub use rect::NormRect;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Subject presets offered in the UI. "Other" carries a free-text label in
/// `Print::subject_other`.
pub const SUBJECT_PRESETS: [&str; 6] = [
    "Math",
    "Reading",
    "Science",
    "Social Studies",
    "English",
    "Other",
];

/// One imported worksheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Print {
    pub id: Uuid,
    pub title: String,
    /// One of [`SUBJECT_PRESETS`]; custom subjects are stored as "Other"
    /// plus `subject_other`.
    pub subject: String,
    #[serde(default)]
    pub subject_other: String,
    pub created_at: i64,
}

impl Print {
    /// The subject label shown to the user: the preset name, or the free-text
    /// label when the preset is "Other".
    pub fn display_subject(&self) -> &str {
        if self.subject != "Other" {
            return &self.subject;
        }
        let other = self.subject_other.trim();
        if other.is_empty() { "Other" } else { other }
    }
}

/// The immutable raster image of a print. The image bytes live on disk at
/// `image_path`; the record only carries the path and pixel dimensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub id: Uuid,
    pub print_id: Uuid,
    pub page_index: u32,
    pub image_path: std::path::PathBuf,
    pub width: u32,
    pub height: u32,
}

impl Page {
    pub fn size(&self) -> bevy::math::Vec2 {
        bevy::math::Vec2::new(self.width as f32, self.height as f32)
    }
}

/// A question unit: one or more masks revealed and rated together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub print_id: Uuid,
    pub page_index: u32,
    pub label: String,
    /// Display/traversal order among siblings of the same print.
    pub order_index: u32,
    pub is_active: bool,
    pub created_at: i64,
}

/// An opaque answer region, normalized to the page dimensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mask {
    pub id: Uuid,
    pub group_id: Uuid,
    pub print_id: Uuid,
    pub page_index: u32,
    pub rect: NormRect,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_print(subject: &str, other: &str) -> Print {
        Print {
            id: Uuid::new_v4(),
            title: "Fractions worksheet".to_string(),
            subject: subject.to_string(),
            subject_other: other.to_string(),
            created_at: 0,
        }
    }

    #[test]
    fn test_display_subject_preset() {
        let p = sample_print("Math", "");
        assert_eq!(p.display_subject(), "Math");
    }

    #[test]
    fn test_display_subject_custom() {
        let p = sample_print("Other", "Geography");
        assert_eq!(p.display_subject(), "Geography");
    }

    #[test]
    fn test_display_subject_other_blank_falls_back() {
        let p = sample_print("Other", "   ");
        assert_eq!(p.display_subject(), "Other");
    }

    #[test]
    fn test_print_serialization_roundtrip() {
        let p = sample_print("Science", "");
        let json = serde_json::to_string(&p).unwrap();
        let parsed: Print = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, p.id);
        assert_eq!(parsed.title, p.title);
        assert_eq!(parsed.subject, p.subject);
    }

    #[test]
    fn test_print_subject_other_defaults_on_deserialize() {
        // Old records without the field should still parse
        let json = r#"{"id":"6f0c2f50-0000-0000-0000-000000000000","title":"t","subject":"Math","created_at":5}"#;
        let parsed: Print = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.subject_other, "");
    }

    #[test]
    fn test_mask_serialization_roundtrip() {
        let m = Mask {
            id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            print_id: Uuid::new_v4(),
            page_index: 0,
            rect: NormRect::new(0.1, 0.2, 0.3, 0.4),
            created_at: 42,
        };
        let json = serde_json::to_string(&m).unwrap();
        let parsed: Mask = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, m.id);
        assert_eq!(parsed.rect, m.rect);
    }
}
