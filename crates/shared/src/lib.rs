pub mod codec;
pub mod domain;
pub mod error;
pub mod target;

pub use domain::{
    AppRecord, CategoryDefinition, FavoriteEntry, RawAppEntry, RawShortcutEntry, ShortcutAction,
    ShortcutEntry, ALL_APPS_CATEGORY, DEFAULT_ICON_NAME, PRIVATE_CATEGORY,
};
pub use error::RejectedMutation;
pub use target::ShortcutTarget;
