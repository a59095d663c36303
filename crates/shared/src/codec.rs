//! String encodings of the list-valued preferences.
//!
//! Favorites: `label;package;iconName;iconTarget` entries joined by `|`.
//! The legacy two-field `label:package` form is still accepted on read.
//! Right-side shortcuts: `iconName;encodedTarget` entries joined by `|`.

use crate::{
    domain::{FavoriteEntry, ShortcutEntry, DEFAULT_ICON_NAME},
    target::ShortcutTarget,
};

const ENTRY_SEPARATOR: char = '|';
const FIELD_SEPARATOR: char = ';';
const LEGACY_SEPARATOR: char = ':';

/// Parses the favorites preference. Entries that match neither format are
/// skipped without affecting their neighbours.
pub fn parse_favorites(raw: &str) -> Vec<FavoriteEntry> {
    raw.split(ENTRY_SEPARATOR)
        .filter(|entry| !entry.trim().is_empty())
        .filter_map(parse_favorite_entry)
        .collect()
}

fn parse_favorite_entry(entry: &str) -> Option<FavoriteEntry> {
    if entry.contains(FIELD_SEPARATOR) {
        // The target is last and may itself contain separators.
        let mut fields = entry.splitn(4, FIELD_SEPARATOR);
        let label = fields.next()?.trim();
        let package = fields.next()?.trim();
        if package.is_empty() {
            return None;
        }
        let icon_name = fields
            .next()
            .map(str::trim)
            .filter(|icon| !icon.is_empty())
            .unwrap_or(DEFAULT_ICON_NAME);
        let icon_target = fields.next().map(str::trim).unwrap_or_default();
        return Some(FavoriteEntry {
            label: label.to_string(),
            package: package.to_string(),
            icon_name: icon_name.to_string(),
            icon_target: icon_target.to_string(),
        });
    }

    let (label, package) = entry.split_once(LEGACY_SEPARATOR)?;
    let package = package.trim();
    if package.is_empty() {
        return None;
    }
    Some(FavoriteEntry::new(label.trim(), package))
}

pub fn serialize_favorites(entries: &[FavoriteEntry]) -> String {
    entries
        .iter()
        .map(|entry| {
            format!(
                "{}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{}",
                sanitize(&entry.label),
                entry.package,
                entry.icon_name,
                entry.icon_target
            )
        })
        .collect::<Vec<_>>()
        .join(&ENTRY_SEPARATOR.to_string())
}

pub fn parse_shortcuts(raw: &str) -> Vec<ShortcutEntry> {
    raw.split(ENTRY_SEPARATOR)
        .filter(|entry| !entry.trim().is_empty())
        .filter_map(|entry| {
            let (icon_name, target) = entry.split_once(FIELD_SEPARATOR)?;
            let target = ShortcutTarget::decode(target)?;
            let icon_name = icon_name.trim();
            Some(ShortcutEntry {
                icon_name: if icon_name.is_empty() {
                    DEFAULT_ICON_NAME.to_string()
                } else {
                    icon_name.to_string()
                },
                target,
            })
        })
        .collect()
}

pub fn serialize_shortcuts(entries: &[ShortcutEntry]) -> String {
    entries
        .iter()
        .map(|entry| format!("{}{FIELD_SEPARATOR}{}", entry.icon_name, entry.target.encode()))
        .collect::<Vec<_>>()
        .join(&ENTRY_SEPARATOR.to_string())
}

// Labels are free text; separators inside them would corrupt the list.
fn sanitize(label: &str) -> String {
    label.replace([ENTRY_SEPARATOR, FIELD_SEPARATOR], " ")
}

#[cfg(test)]
#[path = "tests/codec_tests.rs"]
mod tests;
