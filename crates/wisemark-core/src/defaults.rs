//! Centralized default constants for wisemark.
//!
//! **This module is the single source of truth** for policy limits and
//! fallback values. Repositories, resolvers, and the API reference these
//! constants instead of defining their own magic numbers.

// =============================================================================
// LENS POLICY
// =============================================================================

/// Maximum number of lenses a single user may own. System lenses don't count.
pub const MAX_USER_LENSES: usize = 3;

/// Maximum number of palette entries (colours) per lens.
pub const MAX_LENS_COLORS: usize = 5;

/// Maximum length of a palette entry key, e.g. `yellow` or `custom_1`.
pub const MAX_ENTRY_KEY_LEN: usize = 30;

/// Maximum length of lens, project, and palette display names.
pub const MAX_NAME_LEN: usize = 255;

/// Maximum length of a document display filename.
pub const MAX_FILENAME_LEN: usize = 500;

// =============================================================================
// COLOUR FALLBACKS
// =============================================================================

/// Colour key assigned to a highlight when no lens is available at all.
pub const DEFAULT_COLOR_KEY: &str = "yellow";

/// Hex used for stale colour keys that match no legacy colour.
pub const NEUTRAL_GRAY_HEX: &str = "#94A3B8";

/// Name rendered for a stale key that has no cached display name.
pub const UNKNOWN_COLOR_NAME: &str = "Unknown";

/// Suffix appended to the name of a stale colour key.
pub const DELETED_SUFFIX: &str = " (Deleted)";

/// Default accent colour for new projects.
pub const DEFAULT_PROJECT_COLOR: &str = "#f59e0b";

/// Legacy flat colour list as `(key, display name, hex)`.
///
/// These are the five colours that predate lenses. They seed the
/// `legacy_color` table and back the hex fallback for stale keys.
pub const LEGACY_COLORS: [(&str, &str, &str); 5] = [
    ("yellow", "Key Metrics", "#FBBF24"),
    ("green", "Competitive Advantages", "#34D399"),
    ("blue", "Management Questions", "#60A5FA"),
    ("pink", "Investment Risks", "#F472B6"),
    ("orange", "Commercial DD", "#FB923C"),
];

/// Hex of a legacy colour key, if `key` is one of the five legacy names.
pub fn legacy_hex(key: &str) -> Option<&'static str> {
    LEGACY_COLORS
        .iter()
        .find(|(k, _, _)| *k == key)
        .map(|(_, _, hex)| *hex)
}

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default rate limit: max requests per period.
pub const RATE_LIMIT_REQUESTS: u64 = 100;

/// Default rate limit: period in seconds.
pub const RATE_LIMIT_PERIOD_SECS: u64 = 60;

/// Default maximum PDF upload size (50 MiB).
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
