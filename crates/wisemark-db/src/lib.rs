//! # wisemark-db
//!
//! PostgreSQL database layer for wisemark.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for lenses, projects, documents, highlights
//! - PDF byte storage backends
//! - Translation of constraint violations into domain errors
//!
//! ## Example
//!
//! ```rust,ignore
//! use wisemark_db::{Database, LensRepository, LensCache};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/wisemark").await?;
//!
//!     let mut cache = LensCache::new();
//!     let lens = db.lenses.effective_lens(None, &mut cache).await?;
//!     println!("Default lens: {:?}", lens.map(|l| l.name));
//!     Ok(())
//! }
//! ```
pub mod documents;
pub mod highlights;
pub mod identity;
pub mod legacy_colors;
pub mod lenses;
pub mod pdf_storage;
pub mod pool;
pub mod projects;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use wisemark_core::*;

pub use documents::PgDocumentRepository;
pub use highlights::PgHighlightRepository;
pub use identity::{hash_token, PgIdentityResolver};
pub use legacy_colors::PgLegacyColorRepository;
pub use lenses::PgLensRepository;
pub use pdf_storage::{compute_pdf_hash, PdfStorage, PgPdfStorage, S3PdfStorage, StoredPdf};
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use projects::PgProjectRepository;

use std::sync::Arc;

/// Translate a store error into a domain error.
///
/// Unique and foreign-key violations are recognised by constraint name so the
/// caller sees `DuplicateName`/`DuplicateKey`/`InUse` instead of a generic
/// database failure. Anything else passes through as `Error::Database`.
pub fn map_db_error(err: sqlx::Error) -> Error {
    if let Some(db_err) = err.as_database_error() {
        if let Some(mapped) = map_constraint(
            db_err.constraint(),
            db_err.is_unique_violation(),
            db_err.is_foreign_key_violation(),
        ) {
            return mapped;
        }
    }
    Error::Database(err)
}

fn map_constraint(constraint: Option<&str>, unique: bool, foreign_key: bool) -> Option<Error> {
    let constraint = constraint?;
    match constraint {
        "lens_owner_name_key" | "lens_system_name_key" if unique => Some(Error::DuplicateName(
            "A lens with this name already exists".to_string(),
        )),
        "palette_entry_lens_key_key" if unique => Some(Error::DuplicateKey(
            "This colour key already exists in the lens".to_string(),
        )),
        "document_project_hash_key" if unique => Some(Error::DuplicateName(
            "This PDF is already in this project".to_string(),
        )),
        "document_lens_id_fkey" if foreign_key => Some(Error::InUse(
            "Lens is still assigned to one or more documents".to_string(),
        )),
        _ => None,
    }
}

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// System and user lenses with their palette entries.
    pub lenses: PgLensRepository,
    pub projects: PgProjectRepository,
    pub documents: PgDocumentRepository,
    pub highlights: PgHighlightRepository,
    /// Flat legacy colour list.
    pub legacy_colors: PgLegacyColorRepository,
    /// Bearer token lookup.
    pub identity: PgIdentityResolver,
    /// Where PDF bytes are written. Postgres unless configured otherwise.
    pub pdf_storage: Arc<dyn PdfStorage>,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            lenses: PgLensRepository::new(pool.clone()),
            projects: PgProjectRepository::new(pool.clone()),
            documents: PgDocumentRepository::new(pool.clone()),
            highlights: PgHighlightRepository::new(pool.clone()),
            legacy_colors: PgLegacyColorRepository::new(pool.clone()),
            identity: PgIdentityResolver::new(pool.clone()),
            pdf_storage: Arc::new(PgPdfStorage::new(pool.clone())),
            pool,
        }
    }

    /// Select the PDF storage backend.
    pub fn with_pdf_storage(mut self, storage: Arc<dyn PdfStorage>) -> Self {
        self.pdf_storage = storage;
        self
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
