use serde::{Deserialize, Serialize};

use crate::{error::RejectedMutation, target::ShortcutTarget};

/// Chip that shows every visible app. Never stored as a definition.
pub const ALL_APPS_CATEGORY: &str = "All apps";
/// Chip that selects the private-space list. Never stored as a definition.
pub const PRIVATE_CATEGORY: &str = "Private";

pub const DEFAULT_ICON_NAME: &str = "circle";

/// Symbolic icons the home screen knows how to draw.
pub const ICON_NAMES: &[&str] = &[
    "circle", "phone", "message", "camera", "mail", "map", "music", "search", "clock",
    "calendar", "settings", "globe", "work", "wallet", "heart", "game",
];

macro_rules! handle_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }
    };
}

handle_newtype!(IconHandle);
handle_newtype!(ProfileHandle);
handle_newtype!(ActivityHandle);

pub fn is_reserved_category(name: &str) -> bool {
    let name = name.trim();
    name.eq_ignore_ascii_case(ALL_APPS_CATEGORY) || name.eq_ignore_ascii_case(PRIVATE_CATEGORY)
}

/// Trims a user supplied category name and rejects blank or reserved ones.
pub fn validate_category_name(name: &str) -> Result<String, RejectedMutation> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(RejectedMutation::BlankName);
    }
    if is_reserved_category(trimmed) {
        return Err(RejectedMutation::ReservedCategory(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}

/// One launchable unit as seen by the directory.
///
/// Records are rebuilt on every cache refresh and never patched in place;
/// overlays produce modified copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRecord {
    pub package: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<IconHandle>,
    #[serde(default)]
    pub category: String,
    /// Present only for apps that live in the private profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileHandle>,
    /// Required to launch private-profile apps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<ActivityHandle>,
}

impl AppRecord {
    pub fn new(package: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            label: label.into(),
            icon: None,
            category: String::new(),
            profile: None,
            activity: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn is_private(&self) -> bool {
        self.profile.is_some()
    }

    pub fn sort_key(&self) -> String {
        self.label.to_lowercase()
    }
}

/// Launchable activity as reported by the host, before any enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAppEntry {
    pub package: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<ActivityHandle>,
}

impl RawAppEntry {
    pub fn new(package: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            label: label.into(),
            activity: None,
        }
    }
}

/// Long-press shortcut published by an app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawShortcutEntry {
    pub id: String,
    pub short_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_label: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl RawShortcutEntry {
    pub fn display_label(&self) -> Option<&str> {
        let short = self.short_label.trim();
        if !short.is_empty() {
            return Some(short);
        }
        self.long_label
            .as_deref()
            .map(str::trim)
            .filter(|label| !label.is_empty())
    }
}

/// Row on the home screen's primary list.
///
/// The label tap opens `package`; the icon tap opens `icon_target`, which
/// falls back to `package` when blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteEntry {
    pub label: String,
    pub package: String,
    pub icon_name: String,
    pub icon_target: String,
}

impl FavoriteEntry {
    pub fn new(label: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            package: package.into(),
            icon_name: DEFAULT_ICON_NAME.to_string(),
            icon_target: String::new(),
        }
    }

    pub fn resolved_icon_target(&self) -> &str {
        if self.icon_target.trim().is_empty() {
            &self.package
        } else {
            &self.icon_target
        }
    }

    pub fn icon_action(&self) -> Option<ShortcutTarget> {
        ShortcutTarget::decode(self.resolved_icon_target())
    }
}

/// Icon-only shortcut on the right side of the home screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutEntry {
    pub icon_name: String,
    pub target: ShortcutTarget,
}

impl ShortcutEntry {
    pub fn key(&self) -> String {
        self.target.encode()
    }
}

/// One pickable action: "open app" or a published long-press shortcut.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutAction {
    pub app_label: String,
    pub action_label: String,
    pub target: ShortcutTarget,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDefinition {
    pub name: String,
    pub position: i64,
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
