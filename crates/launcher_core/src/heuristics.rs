//! Keyword heuristics. Rules are ordered; the first one with a keyword
//! contained in the lowercase haystack wins.

pub const FALLBACK_CATEGORY: &str = "Utilities";

struct KeywordRule {
    value: &'static str,
    keywords: &'static [&'static str],
}

const CATEGORY_RULES: &[KeywordRule] = &[
    KeywordRule {
        value: "Productivity",
        keywords: &[
            "docs", "office", "sheets", "slides", "notes", "calendar", "mail", "outlook",
            "drive", "task", "todo", "notion", "word", "excel", "keep",
        ],
    },
    KeywordRule {
        value: "Finance",
        keywords: &[
            "bank", "wallet", "finance", "money", "crypto", "stock", "invest", "paypal",
            "budget", "pay.",
        ],
    },
    KeywordRule {
        value: "Social",
        keywords: &[
            "social", "facebook", "instagram", "twitter", "whatsapp", "telegram", "messenger",
            "snapchat", "tiktok", "discord", "reddit", "signal", "mastodon", "chat",
        ],
    },
    KeywordRule {
        value: "Health",
        keywords: &[
            "health", "fitness", "fit.", "workout", "medical", "sleep", "meditat", "steps",
        ],
    },
    KeywordRule {
        value: "Media",
        keywords: &[
            "music", "video", "photo", "camera", "gallery", "youtube", "spotify", "netflix",
            "player", "podcast", "radio", "stream",
        ],
    },
    KeywordRule {
        value: "Games",
        keywords: &["game", "puzzle", "chess", "arcade", "solitaire"],
    },
];

const SHORTCUT_ICON_RULES: &[KeywordRule] = &[
    KeywordRule {
        value: "camera",
        keywords: &["camera", "photo", "selfie", "video"],
    },
    KeywordRule {
        value: "phone",
        keywords: &["call", "phone", "dial", "contact"],
    },
    KeywordRule {
        value: "message",
        keywords: &["message", "sms", "chat", "conversation"],
    },
    KeywordRule {
        value: "mail",
        keywords: &["mail", "inbox", "compose"],
    },
    KeywordRule {
        value: "map",
        keywords: &["map", "navigat", "direction", "route"],
    },
    KeywordRule {
        value: "music",
        keywords: &["music", "song", "playlist", "podcast"],
    },
    KeywordRule {
        value: "search",
        keywords: &["search", "find"],
    },
    KeywordRule {
        value: "clock",
        keywords: &["alarm", "timer", "clock", "stopwatch"],
    },
    KeywordRule {
        value: "calendar",
        keywords: &["calendar", "event", "agenda"],
    },
    KeywordRule {
        value: "settings",
        keywords: &["setting", "wifi", "bluetooth"],
    },
    KeywordRule {
        value: "globe",
        keywords: &["browser", "tab", "web"],
    },
];

fn first_match(rules: &[KeywordRule], haystack: &str) -> Option<&'static str> {
    rules
        .iter()
        .find(|rule| rule.keywords.iter().any(|keyword| haystack.contains(keyword)))
        .map(|rule| rule.value)
}

pub fn infer_category(package: &str, label: &str) -> &'static str {
    let haystack = format!("{package} {label}").to_lowercase();
    first_match(CATEGORY_RULES, &haystack).unwrap_or(FALLBACK_CATEGORY)
}

pub fn infer_shortcut_icon(app_label: &str, action_label: &str) -> &'static str {
    let haystack = format!("{app_label} {action_label}").to_lowercase();
    first_match(SHORTCUT_ICON_RULES, &haystack).unwrap_or(shared::DEFAULT_ICON_NAME)
}

#[cfg(test)]
#[path = "tests/heuristics_tests.rs"]
mod tests;
