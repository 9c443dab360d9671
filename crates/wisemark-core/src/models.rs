//! Core data models for wisemark.
//!
//! These types are shared across all wisemark crates and represent the
//! domain entities: lenses and their palette entries, projects, documents,
//! highlights, and notes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::Error;

// =============================================================================
// LENS TYPES
// =============================================================================

/// One (key, display name, hex) tuple inside a lens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PaletteEntry {
    pub id: Uuid,
    pub lens_id: Uuid,
    /// Short identifier, unique within the lens (e.g. `yellow`, `custom_1`).
    pub key: String,
    pub display_name: String,
    /// `#RRGGBB`
    pub hex: String,
    pub sort_order: i32,
}

/// A named, ordered palette of highlight categories.
///
/// `owner_id = None` marks a system lens: shared by every user, read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Lens {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Option<Uuid>,
    /// Ordered by `sort_order`, then key.
    pub entries: Vec<PaletteEntry>,
    pub created_at: DateTime<Utc>,
}

impl Lens {
    pub fn is_system(&self) -> bool {
        self.owner_id.is_none()
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == Some(user_id)
    }

    /// Entry for a colour key, if the lens still has it.
    pub fn entry(&self, key: &str) -> Option<&PaletteEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// Key of the first entry in palette order.
    pub fn first_key(&self) -> Option<&str> {
        self.entries
            .iter()
            .min_by(|a, b| (a.sort_order, &a.key).cmp(&(b.sort_order, &b.key)))
            .map(|e| e.key.as_str())
    }
}

/// Palette entry as supplied by a caller creating or replacing entries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaletteEntryInput {
    pub key: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub hex: String,
    #[serde(default)]
    pub sort_order: Option<i32>,
}

/// Validated palette entry ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPaletteEntry {
    pub key: String,
    pub display_name: String,
    pub hex: String,
    pub sort_order: i32,
}

/// Request for creating a user lens.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateLensRequest {
    pub name: String,
    #[serde(default, alias = "colors")]
    pub entries: Vec<PaletteEntryInput>,
}

/// Request for updating a user lens. `entries`, when present, replaces the
/// whole entry set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateLensRequest {
    pub name: Option<String>,
    #[serde(default, alias = "colors")]
    pub entries: Option<Vec<PaletteEntryInput>>,
}

/// Request for adding one palette entry to a lens.
#[derive(Debug, Clone, Deserialize)]
pub struct AddPaletteEntryRequest {
    pub key: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub hex: String,
}

/// Request for updating a palette entry. Only renaming is supported.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePaletteEntryRequest {
    pub display_name: String,
}

// =============================================================================
// PROJECT TYPES
// =============================================================================

/// A project (deal) grouping several PDFs.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Project {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    /// Accent colour for the project card.
    pub color: String,
    pub document_count: i64,
    pub annotation_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub color: Option<String>,
}

// =============================================================================
// DOCUMENT TYPES
// =============================================================================

/// Where the PDF bytes of a document live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StorageLocation {
    #[default]
    Postgres,
    S3,
}

impl std::fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageLocation::Postgres => write!(f, "postgres"),
            StorageLocation::S3 => write!(f, "s3"),
        }
    }
}

impl std::str::FromStr for StorageLocation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" => Ok(StorageLocation::Postgres),
            "s3" => Ok(StorageLocation::S3),
            other => Err(Error::Validation(format!(
                "Unknown storage location: {}",
                other
            ))),
        }
    }
}

/// A PDF inside a project.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Document {
    pub id: Uuid,
    pub project_id: Uuid,
    /// SHA-256 of the PDF bytes, unique within the project.
    pub pdf_hash: String,
    pub filename: String,
    pub file_size: i64,
    /// Accent colour; `None` falls back to the project colour.
    pub color: Option<String>,
    /// Explicit lens assignment; `None` means "use the default system lens".
    pub lens_id: Option<Uuid>,
    pub storage_location: StorageLocation,
    pub annotation_count: i64,
    pub last_opened_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDocumentRequest {
    pub project_id: Uuid,
    #[serde(default)]
    pub pdf_hash: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub file_size: Option<i64>,
}

/// Partial document update.
///
/// `color` and `lens_id` distinguish "absent" (leave unchanged) from an
/// explicit `null` (clear).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDocumentRequest {
    pub filename: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub color: Option<Option<String>>,
    #[serde(default, alias = "highlight_preset", deserialize_with = "double_option")]
    pub lens_id: Option<Option<Uuid>>,
    pub color_labels: Option<DocumentLabels>,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// =============================================================================
// LEGACY COLOUR OVERLAY
// =============================================================================

/// Entry of the flat, global legacy colour list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LegacyColor {
    pub key: String,
    pub display_name: String,
    pub hex: String,
    pub sort_order: i32,
}

/// Per-document custom names keyed by legacy colour key.
pub type DocumentLabels = BTreeMap<String, String>;

// =============================================================================
// HIGHLIGHT TYPES
// =============================================================================

/// Colour of a highlight as captured when it was created.
///
/// This is historical data, not a reference into a lens: the key stays as
/// written even after the lens loses that key, and `last_known_name` keeps
/// the label the user last saw so a stale key still renders meaningfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ColorSnapshot {
    pub key: String,
    pub last_known_name: Option<String>,
}

/// Free-text note attached 1:1 to a highlight.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Note {
    pub id: Uuid,
    pub highlight_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Highlight {
    pub id: Uuid,
    pub document_id: Uuid,
    pub page_number: i32,
    /// Selection range data for re-rendering; opaque to the server.
    #[schema(value_type = Object)]
    pub position_data: JsonValue,
    pub color: ColorSnapshot,
    pub highlighted_text: String,
    pub note: Option<Note>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateHighlightRequest {
    /// Kept loose so non-integer input is reported as a validation error.
    #[serde(default)]
    pub page_number: Option<JsonValue>,
    #[serde(default)]
    pub position_data: Option<JsonValue>,
    #[serde(default, alias = "color_key")]
    pub color: Option<String>,
    #[serde(default)]
    pub highlighted_text: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateHighlightRequest {
    #[serde(default, alias = "color_key")]
    pub color: Option<String>,
    /// New note content; blank deletes the note.
    #[serde(default)]
    pub note: Option<String>,
    /// Accepted as an alias for `note` when `note` is absent.
    #[serde(default)]
    pub comment: Option<String>,
}

impl UpdateHighlightRequest {
    pub fn note_content(&self) -> Option<&str> {
        self.note.as_deref().or(self.comment.as_deref())
    }
}

/// Display name and hex a highlight renders with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DisplayColor {
    pub name: String,
    pub hex: String,
    /// True when the colour key is absent from the effective lens.
    pub is_stale: bool,
}
