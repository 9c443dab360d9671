//! PDF byte storage.
//!
//! Document metadata always lives in PostgreSQL; the PDF bytes go through a
//! [`PdfStorage`] backend selected at startup. Storing bytes recomputes the
//! document's `pdf_hash` (SHA-256 hex) and `file_size`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use wisemark_db::{PdfStorage, PgPdfStorage};
//!
//! let storage = PgPdfStorage::new(pool);
//! let stored = storage.store(document_id, &bytes).await?;
//! let bytes = storage.load(document_id).await?;
//! ```

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use wisemark_core::{Error, Result, StorageLocation};

use crate::map_db_error;

/// SHA-256 hex digest of PDF bytes.
pub fn compute_pdf_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Result of storing a PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPdf {
    pub pdf_hash: String,
    pub file_size: i64,
    pub location: StorageLocation,
}

/// Storage backend for PDF bytes.
#[async_trait]
pub trait PdfStorage: Send + Sync {
    /// Backend identifier recorded on the document row.
    fn location(&self) -> StorageLocation;

    /// Write the bytes of a document, replacing any previous upload.
    async fn store(&self, document_id: Uuid, data: &[u8]) -> Result<StoredPdf>;

    /// Read the bytes of a document.
    async fn load(&self, document_id: Uuid) -> Result<Vec<u8>>;
}

/// Stores PDF bytes in the `document.pdf_data` column.
#[derive(Clone)]
pub struct PgPdfStorage {
    pool: PgPool,
}

impl PgPdfStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PdfStorage for PgPdfStorage {
    fn location(&self) -> StorageLocation {
        StorageLocation::Postgres
    }

    async fn store(&self, document_id: Uuid, data: &[u8]) -> Result<StoredPdf> {
        if data.is_empty() {
            return Err(Error::Validation("PDF upload is empty".to_string()));
        }

        let pdf_hash = compute_pdf_hash(data);
        let file_size = data.len() as i64;

        let result = sqlx::query(
            "UPDATE document SET
                pdf_data = $2,
                pdf_hash = $3,
                file_size = $4,
                storage_location = 'postgres',
                s3_key = NULL,
                updated_at = now()
             WHERE id = $1",
        )
        .bind(document_id)
        .bind(data)
        .bind(&pdf_hash)
        .bind(file_size)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Document {} not found", document_id)));
        }

        info!(
            subsystem = "db",
            component = "pdf_storage",
            op = "store",
            document_id = %document_id,
            byte_len = file_size,
            "PDF stored in database"
        );
        Ok(StoredPdf {
            pdf_hash,
            file_size,
            location: StorageLocation::Postgres,
        })
    }

    async fn load(&self, document_id: Uuid) -> Result<Vec<u8>> {
        let row = sqlx::query("SELECT pdf_data FROM document WHERE id = $1")
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or_else(|| Error::NotFound(format!("Document {} not found", document_id)))?;

        let data: Option<Vec<u8>> = row.get("pdf_data");
        let data = data.ok_or_else(|| {
            Error::NotFound(format!("No PDF has been uploaded for document {}", document_id))
        })?;

        debug!(
            subsystem = "db",
            component = "pdf_storage",
            op = "load",
            document_id = %document_id,
            byte_len = data.len(),
            "PDF loaded from database"
        );
        Ok(data)
    }
}

/// Object storage backend. Declared so `PDF_STORAGE=s3` is a recognised
/// setting; every operation reports a configuration error until a client is
/// wired in.
#[derive(Debug, Clone, Default)]
pub struct S3PdfStorage {
    pub bucket: Option<String>,
}

impl S3PdfStorage {
    pub fn new(bucket: Option<String>) -> Self {
        Self { bucket }
    }

    fn unavailable(&self) -> Error {
        Error::Config(format!(
            "S3 PDF storage is not available (bucket: {})",
            self.bucket.as_deref().unwrap_or("unset")
        ))
    }
}

#[async_trait]
impl PdfStorage for S3PdfStorage {
    fn location(&self) -> StorageLocation {
        StorageLocation::S3
    }

    async fn store(&self, _document_id: Uuid, _data: &[u8]) -> Result<StoredPdf> {
        Err(self.unavailable())
    }

    async fn load(&self, _document_id: Uuid) -> Result<Vec<u8>> {
        Err(self.unavailable())
    }
}
