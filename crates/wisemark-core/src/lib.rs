//! # wisemark-core
//!
//! Core types, traits, and lens resolution logic for wisemark.
//!
//! This crate holds everything that does not touch storage: the domain
//! models, the error taxonomy, lens catalog policy (quota, capacity, entry
//! validation), and the effective-lens and highlight-colour resolvers.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod palette;
pub mod resolve;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use palette::{
    check_entry_capacity, check_lens_quota, ensure_mutable_by, is_valid_hex, parse_page_number,
    validate_entries, validate_hex,
};
pub use resolve::{
    display_color, resolve_color_key, select_default_lens, LabelLayers, LensCache,
};
pub use traits::*;
