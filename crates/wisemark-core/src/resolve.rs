//! Lens and highlight colour resolution.
//!
//! ## Effective lens
//!
//! A document's effective lens is its explicitly assigned lens, or the
//! system lens whose name sorts first. [`LensCache`] is passed explicitly
//! through a resolution pass so a batch of documents resolves the default
//! once instead of once per document.
//!
//! ## Display colour
//!
//! Highlight colours resolve through two independent label layers, in order:
//!
//! 1. the legacy per-document overlay (`DocumentColor` custom names), when it
//!    holds a non-blank name for the key;
//! 2. the effective lens entry for the key.
//!
//! If the lens no longer has the key, the highlight renders with its cached
//! name plus `" (Deleted)"`. Resolution never fails.

use std::collections::HashMap;

use uuid::Uuid;

use crate::defaults::{
    legacy_hex, DEFAULT_COLOR_KEY, DELETED_SUFFIX, NEUTRAL_GRAY_HEX, UNKNOWN_COLOR_NAME,
};
use crate::models::{ColorSnapshot, DisplayColor, DocumentLabels, Lens};

/// The system lens with the lexicographically smallest name.
///
/// Ties (impossible under the unique-name constraint) break on id so the
/// choice is deterministic.
pub fn select_default_lens(system_lenses: &[Lens]) -> Option<&Lens> {
    system_lenses
        .iter()
        .filter(|l| l.is_system())
        .min_by(|a, b| (&a.name, a.id).cmp(&(&b.name, b.id)))
}

/// Per-pass memo of resolved lenses.
///
/// Create one per request (or serialization pass) and hand it to every
/// resolution call in that pass; drop it afterwards.
#[derive(Debug, Default)]
pub struct LensCache {
    default: Option<Option<Lens>>,
    explicit: HashMap<Uuid, Lens>,
}

impl LensCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` if the default lens has not been resolved yet in this pass;
    /// `Some(None)` if it was resolved and no system lens exists.
    pub fn default_lens(&self) -> Option<Option<&Lens>> {
        self.default.as_ref().map(Option::as_ref)
    }

    pub fn set_default(&mut self, lens: Option<Lens>) {
        self.default = Some(lens);
    }

    pub fn explicit(&self, id: Uuid) -> Option<&Lens> {
        self.explicit.get(&id)
    }

    pub fn insert_explicit(&mut self, lens: Lens) {
        self.explicit.insert(lens.id, lens);
    }

    /// Cached effective lens for a document's `lens_id`, or `None` on a miss.
    pub fn effective(&self, lens_id: Option<Uuid>) -> Option<Option<&Lens>> {
        match lens_id {
            Some(id) => self.explicit(id).map(Some),
            None => self.default_lens(),
        }
    }
}

impl ColorSnapshot {
    /// Capture a colour key together with its current name in `lens`.
    pub fn capture(key: &str, lens: Option<&Lens>) -> Self {
        Self {
            key: key.to_string(),
            last_known_name: lens
                .and_then(|l| l.entry(key))
                .map(|e| e.display_name.clone()),
        }
    }

    /// Render against the effective lens. Never fails.
    pub fn render(&self, lens: Option<&Lens>) -> DisplayColor {
        display_color(self, lens)
    }
}

/// Colour key a new highlight is stored with.
///
/// The requested key is kept when the effective lens has it; otherwise the
/// lens's first key, or [`DEFAULT_COLOR_KEY`] when there is no usable lens.
pub fn resolve_color_key(requested: Option<&str>, lens: Option<&Lens>) -> String {
    let requested = requested.map(str::trim).filter(|k| !k.is_empty());

    if let (Some(key), Some(lens)) = (requested, lens) {
        if lens.entry(key).is_some() {
            return key.to_string();
        }
    }

    lens.and_then(Lens::first_key)
        .unwrap_or(DEFAULT_COLOR_KEY)
        .to_string()
}

/// Name and hex for a highlight colour against its document's effective lens.
pub fn display_color(snapshot: &ColorSnapshot, lens: Option<&Lens>) -> DisplayColor {
    if let Some(entry) = lens.and_then(|l| l.entry(&snapshot.key)) {
        return DisplayColor {
            name: entry.display_name.clone(),
            hex: entry.hex.clone(),
            is_stale: false,
        };
    }

    let base = snapshot
        .last_known_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(UNKNOWN_COLOR_NAME);

    DisplayColor {
        name: format!("{}{}", base, DELETED_SUFFIX),
        hex: legacy_hex(&snapshot.key)
            .unwrap_or(NEUTRAL_GRAY_HEX)
            .to_string(),
        is_stale: true,
    }
}

/// The two label layers for one document, consulted in priority order.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelLayers<'a> {
    /// Legacy per-document custom names.
    pub overlay: Option<&'a DocumentLabels>,
    /// Effective lens of the document.
    pub lens: Option<&'a Lens>,
}

impl<'a> LabelLayers<'a> {
    pub fn new(overlay: Option<&'a DocumentLabels>, lens: Option<&'a Lens>) -> Self {
        Self { overlay, lens }
    }

    /// Resolve a highlight colour. The overlay only ever replaces the name;
    /// hex and staleness always come from the lens layer.
    pub fn resolve(&self, snapshot: &ColorSnapshot) -> DisplayColor {
        let mut color = display_color(snapshot, self.lens);
        if let Some(custom) = self
            .overlay
            .and_then(|labels| labels.get(&snapshot.key))
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
        {
            color.name = custom.to_string();
        }
        color
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaletteEntry;
    use chrono::Utc;

    fn lens(name: &str, owner_id: Option<Uuid>, entries: &[(&str, &str, &str)]) -> Lens {
        let id = Uuid::new_v4();
        Lens {
            id,
            name: name.to_string(),
            owner_id,
            entries: entries
                .iter()
                .enumerate()
                .map(|(i, (key, name, hex))| PaletteEntry {
                    id: Uuid::new_v4(),
                    lens_id: id,
                    key: key.to_string(),
                    display_name: name.to_string(),
                    hex: hex.to_string(),
                    sort_order: i as i32,
                })
                .collect(),
            created_at: Utc::now(),
        }
    }

    fn private_equity() -> Lens {
        lens(
            "Private Equity",
            None,
            &[
                ("yellow", "Key Metrics", "#FBBF24"),
                ("green", "Competitive Advantages", "#34D399"),
                ("blue", "Management Questions", "#60A5FA"),
            ],
        )
    }

    #[test]
    fn test_default_lens_is_alphabetically_first_system_lens() {
        let lenses = vec![
            lens("Public Markets", None, &[]),
            private_equity(),
            lens("Aardvark", Some(Uuid::new_v4()), &[]),
        ];
        let default = select_default_lens(&lenses).expect("a system lens exists");
        assert_eq!(default.name, "Private Equity");
    }

    #[test]
    fn test_default_lens_none_without_system_lenses() {
        let lenses = vec![lens("Mine", Some(Uuid::new_v4()), &[])];
        assert!(select_default_lens(&lenses).is_none());
        assert!(select_default_lens(&[]).is_none());
    }

    #[test]
    fn test_lens_cache_distinguishes_miss_from_absent_default() {
        let mut cache = LensCache::new();
        assert!(cache.effective(None).is_none());

        cache.set_default(None);
        assert_eq!(cache.effective(None), Some(None));

        let pe = private_equity();
        let pe_id = pe.id;
        cache.set_default(Some(pe.clone()));
        cache.insert_explicit(pe);
        assert_eq!(cache.effective(None).flatten().map(|l| l.id), Some(pe_id));
        assert_eq!(cache.effective(Some(pe_id)).flatten().map(|l| l.id), Some(pe_id));
        assert!(cache.effective(Some(Uuid::new_v4())).is_none());
    }

    #[test]
    fn test_display_color_found_in_lens() {
        let pe = private_equity();
        let snap = ColorSnapshot::capture("green", Some(&pe));
        let color = snap.render(Some(&pe));
        assert_eq!(color.name, "Competitive Advantages");
        assert_eq!(color.hex, "#34D399");
        assert!(!color.is_stale);
    }

    #[test]
    fn test_display_color_after_entry_removed() {
        let mut pe = private_equity();
        let snap = ColorSnapshot::capture("green", Some(&pe));
        pe.entries.retain(|e| e.key != "green");

        let color = snap.render(Some(&pe));
        assert_eq!(color.name, "Competitive Advantages (Deleted)");
        assert_eq!(color.hex, "#34D399");
        assert!(color.is_stale);
    }

    #[test]
    fn test_display_color_unknown_custom_key() {
        let pe = private_equity();
        let snap = ColorSnapshot {
            key: "custom_7".to_string(),
            last_known_name: None,
        };
        let color = display_color(&snap, Some(&pe));
        assert_eq!(color.name, "Unknown (Deleted)");
        assert_eq!(color.hex, NEUTRAL_GRAY_HEX);
    }

    #[test]
    fn test_display_color_without_lens() {
        let snap = ColorSnapshot {
            key: "pink".to_string(),
            last_known_name: Some("Investment Risks".to_string()),
        };
        let color = display_color(&snap, None);
        assert_eq!(color.name, "Investment Risks (Deleted)");
        assert_eq!(color.hex, "#F472B6");
    }

    #[test]
    fn test_display_color_is_idempotent() {
        let pe = private_equity();
        let snaps = [
            ColorSnapshot::capture("blue", Some(&pe)),
            ColorSnapshot {
                key: "gone".to_string(),
                last_known_name: Some("Old".to_string()),
            },
        ];
        for snap in &snaps {
            assert_eq!(display_color(snap, Some(&pe)), display_color(snap, Some(&pe)));
        }
    }

    #[test]
    fn test_resolve_color_key() {
        let pe = private_equity();
        assert_eq!(resolve_color_key(Some("blue"), Some(&pe)), "blue");
        assert_eq!(resolve_color_key(Some(" blue "), Some(&pe)), "blue");
        assert_eq!(resolve_color_key(Some("purple"), Some(&pe)), "yellow");
        assert_eq!(resolve_color_key(None, Some(&pe)), "yellow");

        let empty = lens("Empty", Some(Uuid::new_v4()), &[]);
        assert_eq!(resolve_color_key(Some("blue"), Some(&empty)), DEFAULT_COLOR_KEY);
        assert_eq!(resolve_color_key(Some("blue"), None), DEFAULT_COLOR_KEY);
    }

    #[test]
    fn test_resolve_color_key_uses_lens_order() {
        let custom = lens(
            "Credit",
            Some(Uuid::new_v4()),
            &[("red", "Covenants", "#FF0000"), ("teal", "Collateral", "#14B8A6")],
        );
        assert_eq!(resolve_color_key(Some("yellow"), Some(&custom)), "red");
    }

    #[test]
    fn test_overlay_label_takes_priority_for_name_only() {
        let pe = private_equity();
        let mut overlay = DocumentLabels::new();
        overlay.insert("yellow".to_string(), "  Legal DD ".to_string());
        overlay.insert("blue".to_string(), "   ".to_string());

        let layers = LabelLayers::new(Some(&overlay), Some(&pe));

        let yellow = layers.resolve(&ColorSnapshot::capture("yellow", Some(&pe)));
        assert_eq!(yellow.name, "Legal DD");
        assert_eq!(yellow.hex, "#FBBF24");

        let blue = layers.resolve(&ColorSnapshot::capture("blue", Some(&pe)));
        assert_eq!(blue.name, "Management Questions");
    }

    #[test]
    fn test_layers_without_overlay_match_display_color() {
        let pe = private_equity();
        let snap = ColorSnapshot::capture("green", Some(&pe));
        assert_eq!(
            LabelLayers::new(None, Some(&pe)).resolve(&snap),
            display_color(&snap, Some(&pe))
        );
    }
}
