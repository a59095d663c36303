use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};

const APP_PREFIX: &str = "app:";
const DEEP_LINK_PREFIX: &str = "intent:";
const LAUNCHER_PREFIX: &str = "launcher:";

/// Something a tap, swipe or shortcut can open.
///
/// The string form produced by [`ShortcutTarget::encode`] is what gets
/// persisted and what lookups compare on, so it must stay stable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShortcutTarget {
    App {
        package: String,
    },
    DeepLink {
        uri: String,
    },
    LauncherShortcut {
        package: String,
        shortcut_id: String,
    },
}

impl ShortcutTarget {
    pub fn app(package: impl Into<String>) -> Self {
        Self::App {
            package: package.into(),
        }
    }

    pub fn deep_link(uri: impl Into<String>) -> Self {
        Self::DeepLink { uri: uri.into() }
    }

    pub fn launcher_shortcut(package: impl Into<String>, shortcut_id: impl Into<String>) -> Self {
        Self::LauncherShortcut {
            package: package.into(),
            shortcut_id: shortcut_id.into(),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            Self::App { package } => format!("{APP_PREFIX}{package}"),
            Self::DeepLink { uri } => format!("{DEEP_LINK_PREFIX}{uri}"),
            Self::LauncherShortcut {
                package,
                shortcut_id,
            } => format!(
                "{LAUNCHER_PREFIX}{}:{}",
                URL_SAFE_NO_PAD.encode(package.as_bytes()),
                URL_SAFE_NO_PAD.encode(shortcut_id.as_bytes())
            ),
        }
    }

    /// Decodes a persisted target. Blank input and malformed launcher
    /// shortcuts yield `None`; unprefixed strings are legacy app targets.
    ///
    /// Text after a prefix is kept as is, so values with surrounding
    /// whitespace survive a round trip.
    pub fn decode(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            return None;
        }
        let raw = raw.trim_start();

        if let Some(package) = raw.strip_prefix(APP_PREFIX) {
            return non_blank(package).map(Self::app);
        }
        if let Some(uri) = raw.strip_prefix(DEEP_LINK_PREFIX) {
            return non_blank(uri).map(Self::deep_link);
        }
        if let Some(encoded) = raw.strip_prefix(LAUNCHER_PREFIX) {
            let (package, shortcut_id) = encoded.split_once(':')?;
            let package = decode_segment(package)?;
            let shortcut_id = decode_segment(shortcut_id)?;
            return Some(Self::launcher_shortcut(package, shortcut_id));
        }

        Some(Self::app(raw.trim_end()))
    }

    /// Package that owns the target, if any.
    pub fn package(&self) -> Option<&str> {
        match self {
            Self::App { package } | Self::LauncherShortcut { package, .. } => Some(package),
            Self::DeepLink { .. } => None,
        }
    }
}

/// Encodes an optional target; absence becomes the empty string.
pub fn encode_optional(target: Option<&ShortcutTarget>) -> String {
    target.map(ShortcutTarget::encode).unwrap_or_default()
}

impl fmt::Display for ShortcutTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

fn non_blank(value: &str) -> Option<&str> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn decode_segment(segment: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).ok()?;
    let value = String::from_utf8(bytes).ok()?;
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
#[path = "tests/target_tests.rs"]
mod tests;
