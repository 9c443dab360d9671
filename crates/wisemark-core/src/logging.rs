//! Structured logging field name constants for wisemark.
//!
//! All crates use these names for structured `tracing` fields so log
//! aggregation can query the same keys across the API and database layers.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, fallback applied (e.g. stale colour key) |
//! | INFO  | Lifecycle events and completed mutations |
//! | DEBUG | Decision points such as lens resolution |
//! | TRACE | Per-item iteration |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated per request (UUIDv7).
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event: "api", "db".
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem: "lenses", "documents", "highlights", "pool".
pub const COMPONENT: &str = "component";

/// Logical operation name: "create_lens", "effective_lens", ...
pub const OPERATION: &str = "op";

/// Authenticated caller.
pub const USER_ID: &str = "user_id";

// ─── Entity fields ─────────────────────────────────────────────────────────

pub const LENS_ID: &str = "lens_id";
pub const ENTRY_ID: &str = "entry_id";
pub const PROJECT_ID: &str = "project_id";
pub const DOCUMENT_ID: &str = "document_id";
pub const HIGHLIGHT_ID: &str = "highlight_id";

/// Palette entry key / highlight colour key.
pub const COLOR_KEY: &str = "color_key";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of rows returned or affected.
pub const RESULT_COUNT: &str = "result_count";

/// Byte length of a stored PDF.
pub const BYTE_LEN: &str = "byte_len";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Machine-readable error kind (see `Error::kind`).
pub const ERROR_KIND: &str = "error_kind";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error_msg";
