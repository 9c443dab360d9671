//! HTTP handlers for wisemark-api.

pub mod documents;
pub mod highlights;
pub mod lenses;
pub mod projects;
pub mod system;

use uuid::Uuid;

use wisemark_core::{
    Document, DocumentLabels, DocumentRepository, LabelLayers, Lens, LensCache, LensRepository,
    Result,
};
use wisemark_db::Database;

/// A document loaded together with everything its highlight colours
/// resolve against.
#[derive(Debug, Clone)]
pub struct DocumentContext {
    pub document: Document,
    pub lens: Option<Lens>,
    pub labels: DocumentLabels,
}

impl DocumentContext {
    /// Load a document owned by `user_id`; someone else's document is
    /// `NotFound`.
    pub async fn load(db: &Database, user_id: Uuid, document_id: Uuid) -> Result<Self> {
        let document = db.documents.get(user_id, document_id).await?;
        Self::for_document(db, document).await
    }

    pub async fn for_document(db: &Database, document: Document) -> Result<Self> {
        let mut cache = LensCache::new();
        let lens = db.lenses.effective_lens(document.lens_id, &mut cache).await?;
        let labels = db.documents.color_labels(document.id).await?;
        Ok(Self {
            document,
            lens,
            labels,
        })
    }

    pub fn layers(&self) -> LabelLayers<'_> {
        LabelLayers::new(Some(&self.labels), self.lens.as_ref())
    }
}
