//! Core traits for wisemark abstractions.
//!
//! These traits define the storage interfaces the API layer depends on.
//! Every method takes the caller's user id where ownership matters; a
//! resource owned by someone else is reported as `NotFound` unless the
//! operation documents `Forbidden`.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;
use crate::resolve::LensCache;

// =============================================================================
// LENS CATALOG
// =============================================================================

/// Repository for system and user lenses and their palette entries.
#[async_trait]
pub trait LensRepository: Send + Sync {
    /// System lenses plus the caller's own lenses, ordered by name.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Lens>>;

    /// A lens the caller may see (system or own).
    async fn get_visible(&self, user_id: Uuid, lens_id: Uuid) -> Result<Option<Lens>>;

    /// Create a user lens; enforces quota, name uniqueness, and entry rules.
    async fn create(&self, user_id: Uuid, req: CreateLensRequest) -> Result<Lens>;

    /// Rename and/or atomically replace all entries of a user lens.
    async fn update(&self, user_id: Uuid, lens_id: Uuid, req: UpdateLensRequest) -> Result<Lens>;

    /// Delete a user lens and its entries. Rejected while documents use it.
    async fn delete(&self, user_id: Uuid, lens_id: Uuid) -> Result<()>;

    /// Append one entry; `sort_order` becomes the current entry count.
    async fn add_entry(
        &self,
        user_id: Uuid,
        lens_id: Uuid,
        req: AddPaletteEntryRequest,
    ) -> Result<PaletteEntry>;

    /// Rename an entry.
    async fn update_entry(
        &self,
        user_id: Uuid,
        lens_id: Uuid,
        entry_id: Uuid,
        req: UpdatePaletteEntryRequest,
    ) -> Result<PaletteEntry>;

    /// Remove an entry. Highlights keep their colour key.
    async fn remove_entry(&self, user_id: Uuid, lens_id: Uuid, entry_id: Uuid) -> Result<()>;

    /// Effective lens for a document's `lens_id`, memoized in `cache`.
    async fn effective_lens(
        &self,
        lens_id: Option<Uuid>,
        cache: &mut LensCache,
    ) -> Result<Option<Lens>>;
}

// =============================================================================
// PROJECTS
// =============================================================================

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Caller's projects, most recently updated first, with counts.
    async fn list(&self, user_id: Uuid) -> Result<Vec<Project>>;

    async fn get(&self, user_id: Uuid, project_id: Uuid) -> Result<Project>;

    async fn create(&self, user_id: Uuid, req: CreateProjectRequest) -> Result<Project>;

    async fn update(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        req: UpdateProjectRequest,
    ) -> Result<Project>;

    /// Delete a project with all its documents, highlights, and notes.
    async fn delete(&self, user_id: Uuid, project_id: Uuid) -> Result<()>;
}

// =============================================================================
// DOCUMENTS
// =============================================================================

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Caller's documents, optionally within one project, most recent first.
    async fn list(&self, user_id: Uuid, project_id: Option<Uuid>) -> Result<Vec<Document>>;

    async fn get(&self, user_id: Uuid, document_id: Uuid) -> Result<Document>;

    /// Fetch and stamp `last_opened_at`.
    async fn open(&self, user_id: Uuid, document_id: Uuid) -> Result<Document>;

    async fn create(&self, user_id: Uuid, req: CreateDocumentRequest) -> Result<Document>;

    /// Partial update, including lens assignment and legacy colour labels.
    async fn update(
        &self,
        user_id: Uuid,
        document_id: Uuid,
        req: UpdateDocumentRequest,
    ) -> Result<Document>;

    async fn delete(&self, user_id: Uuid, document_id: Uuid) -> Result<()>;

    /// Legacy overlay labels (key → custom name) of a document.
    async fn color_labels(&self, document_id: Uuid) -> Result<DocumentLabels>;
}

// =============================================================================
// HIGHLIGHTS
// =============================================================================

#[async_trait]
pub trait HighlightRepository: Send + Sync {
    /// Highlights of a document ordered by page, then creation time.
    async fn list(&self, document_id: Uuid) -> Result<Vec<Highlight>>;

    async fn get(&self, document_id: Uuid, highlight_id: Uuid) -> Result<Highlight>;

    /// Create a highlight against the document's effective lens, plus its
    /// note when `comment` is non-blank, in one transaction.
    async fn create(
        &self,
        document_id: Uuid,
        lens: Option<&Lens>,
        req: CreateHighlightRequest,
    ) -> Result<Highlight>;

    /// Apply a colour change and/or note change in one transaction. The new
    /// colour key must exist in `lens`; a blank note deletes the note.
    async fn update(
        &self,
        document_id: Uuid,
        highlight_id: Uuid,
        lens: Option<&Lens>,
        req: UpdateHighlightRequest,
    ) -> Result<Highlight>;

    /// Change the colour key; the new key must exist in `lens`.
    async fn update_color(
        &self,
        document_id: Uuid,
        highlight_id: Uuid,
        lens: Option<&Lens>,
        color_key: &str,
    ) -> Result<Highlight>;

    /// Blank content deletes the note; otherwise create or update it.
    async fn set_note(
        &self,
        document_id: Uuid,
        highlight_id: Uuid,
        content: &str,
    ) -> Result<Highlight>;

    /// Delete a highlight and its note.
    async fn delete(&self, document_id: Uuid, highlight_id: Uuid) -> Result<()>;
}

// =============================================================================
// LEGACY COLOURS
// =============================================================================

#[async_trait]
pub trait LegacyColorRepository: Send + Sync {
    /// The flat legacy colour list in display order.
    async fn list(&self) -> Result<Vec<LegacyColor>>;
}

// =============================================================================
// IDENTITY
// =============================================================================

/// Resolves a bearer token to the user it was issued to.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve_token(&self, token: &str) -> Result<Option<Uuid>>;
}
