//! Lens catalog policy: input validation and the quota/capacity limits.
//!
//! Repositories call these before touching storage so a rejected request
//! never leaves a partial mutation behind.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::defaults::{
    MAX_ENTRY_KEY_LEN, MAX_FILENAME_LEN, MAX_LENS_COLORS, MAX_NAME_LEN, MAX_USER_LENSES,
};
use crate::error::{Error, Result};
use crate::models::{Lens, NewPaletteEntry, PaletteEntryInput};

static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("hex colour pattern is valid"));

/// True for a 7-character `#RRGGBB` string.
pub fn is_valid_hex(value: &str) -> bool {
    HEX_COLOR.is_match(value)
}

/// Validate a `#RRGGBB` colour for the named field.
pub fn validate_hex(field: &str, value: &str) -> Result<()> {
    if is_valid_hex(value) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "{} must be a #RRGGBB hex colour, got '{}'",
            field, value
        )))
    }
}

/// Trim and bound a display name (lens, project, palette entry).
pub fn validate_name(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(format!("{} must not be empty", field)));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(Error::Validation(format!(
            "{} must be at most {} characters",
            field, MAX_NAME_LEN
        )));
    }
    Ok(trimmed.to_string())
}

/// Trim and bound a document filename.
pub fn validate_filename(value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("filename is required".to_string()));
    }
    if trimmed.chars().count() > MAX_FILENAME_LEN {
        return Err(Error::Validation(format!(
            "filename must be at most {} characters",
            MAX_FILENAME_LEN
        )));
    }
    Ok(trimmed.to_string())
}

/// Validate a palette entry key: non-empty, bounded, no surrounding whitespace.
pub fn validate_entry_key(key: &str) -> Result<String> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("colour key must not be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_ENTRY_KEY_LEN {
        return Err(Error::Validation(format!(
            "colour key must be at most {} characters",
            MAX_ENTRY_KEY_LEN
        )));
    }
    Ok(trimmed.to_string())
}

/// Build one validated entry. A blank display name falls back to the key.
pub fn new_entry(
    key: &str,
    display_name: Option<&str>,
    hex: &str,
    sort_order: i32,
) -> Result<NewPaletteEntry> {
    let key = validate_entry_key(key)?;
    validate_hex("hex", hex)?;
    let display_name = match display_name.map(str::trim) {
        Some(name) if !name.is_empty() => validate_name("display_name", name)?,
        _ => key.clone(),
    };
    Ok(NewPaletteEntry {
        key,
        display_name,
        hex: hex.to_string(),
        sort_order,
    })
}

/// Validate a complete entry list for `create`/`replace` operations.
///
/// Fails with `CapacityExceeded` above [`MAX_LENS_COLORS`] entries and with
/// `Validation` on a duplicated key or malformed hex. Entries without an
/// explicit `sort_order` take their list index.
pub fn validate_entries(entries: &[PaletteEntryInput]) -> Result<Vec<NewPaletteEntry>> {
    if entries.len() > MAX_LENS_COLORS {
        return Err(Error::CapacityExceeded {
            limit: MAX_LENS_COLORS,
        });
    }

    let mut seen = HashSet::with_capacity(entries.len());
    let mut validated = Vec::with_capacity(entries.len());
    for (index, input) in entries.iter().enumerate() {
        let entry = new_entry(
            &input.key,
            input.display_name.as_deref(),
            &input.hex,
            input.sort_order.unwrap_or(index as i32),
        )?;
        if !seen.insert(entry.key.clone()) {
            return Err(Error::Validation(format!(
                "colour key '{}' appears more than once",
                entry.key
            )));
        }
        validated.push(entry);
    }
    Ok(validated)
}

/// Reject lens creation when the user already owns the maximum.
pub fn check_lens_quota(owned: usize) -> Result<()> {
    if owned >= MAX_USER_LENSES {
        return Err(Error::QuotaExceeded {
            limit: MAX_USER_LENSES,
        });
    }
    Ok(())
}

/// Reject adding an entry to a lens that is already full.
pub fn check_entry_capacity(current: usize) -> Result<()> {
    if current >= MAX_LENS_COLORS {
        return Err(Error::CapacityExceeded {
            limit: MAX_LENS_COLORS,
        });
    }
    Ok(())
}

/// Mutations are only allowed on lenses the caller owns.
pub fn ensure_mutable_by(lens: &Lens, user_id: Uuid) -> Result<()> {
    if lens.is_system() {
        return Err(Error::Forbidden(format!(
            "Lens '{}' is a system lens and cannot be modified",
            lens.name
        )));
    }
    if !lens.is_owned_by(user_id) {
        return Err(Error::Forbidden(format!(
            "Lens {} is not owned by the caller",
            lens.id
        )));
    }
    Ok(())
}

/// Parse a highlight page number: a non-negative integer, or a string holding one.
pub fn parse_page_number(value: Option<&JsonValue>) -> Result<i32> {
    let value = value
        .filter(|v| !v.is_null())
        .ok_or_else(|| Error::Validation("page_number is required".to_string()))?;

    let parsed = match value {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    match parsed {
        Some(n) if n >= 0 && n <= i32::MAX as i64 => Ok(n as i32),
        Some(_) => Err(Error::Validation(
            "page_number must be a non-negative integer".to_string(),
        )),
        None => Err(Error::Validation(
            "page_number must be an integer".to_string(),
        )),
    }
}
