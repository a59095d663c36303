use shared::{CategoryDefinition, RawShortcutEntry};
use storage::Storage;

use super::*;
use crate::test_support::{memory_storage, repository, FakeProvider, PRIVATE_PROFILE};

fn shortcut(
    id: &str,
    short_label: &str,
    long_label: Option<&str>,
    enabled: bool,
) -> RawShortcutEntry {
    RawShortcutEntry {
        id: id.to_string(),
        short_label: short_label.to_string(),
        long_label: long_label.map(str::to_string),
        enabled,
    }
}

fn labels(apps: &[AppRecord]) -> Vec<&str> {
    apps.iter().map(|app| app.label.as_str()).collect()
}

fn definitions(storage: &Storage) -> Vec<CategoryDefinition> {
    storage.category_definitions().borrow().as_ref().clone()
}

#[tokio::test]
async fn list_is_cached_until_invalidated() {
    let provider = FakeProvider::with_apps(&[("com.a", "Alpha")]);
    let storage = memory_storage().await;
    let directory = repository(&provider, &storage);

    let first = directory.list_apps().await;
    let second = directory.list_apps().await;
    assert_eq!(first, second);
    assert_eq!(provider.query_count(), 1);

    provider.set_apps(&[("com.a", "Alpha"), ("com.b", "Beta")]);
    directory.invalidate().await;
    let third = directory.list_apps().await;
    assert_eq!(provider.query_count(), 2);
    assert_eq!(labels(&third), ["Alpha", "Beta"]);
}

#[tokio::test]
async fn list_sorts_dedups_and_skips_own_package() {
    let provider = FakeProvider::with_apps(&[
        ("com.b", "beta"),
        ("com.example.launcher", "Launcher"),
        ("com.a", "Alpha"),
        ("com.b", "Beta duplicate"),
    ]);
    let storage = memory_storage().await;
    let apps = repository(&provider, &storage).list_apps().await;

    assert_eq!(labels(&apps), ["Alpha", "beta"]);
    assert!(apps.iter().all(|app| app.package != "com.example.launcher"));
}

#[tokio::test]
async fn categories_are_inferred_and_icon_failures_swallowed() {
    let provider =
        FakeProvider::with_apps(&[("com.bank.app", "My Bank"), ("com.foo", "Calculator")]);
    provider.fail_icon_for("com.foo");
    let storage = memory_storage().await;
    let apps = repository(&provider, &storage).list_apps().await;

    assert_eq!(apps.len(), 2);
    let calculator = &apps[0];
    assert_eq!(calculator.category, "Utilities");
    assert_eq!(calculator.icon, None);
    let bank = &apps[1];
    assert_eq!(bank.category, "Finance");
    assert_eq!(bank.icon, Some(IconHandle("icon:com.bank.app".to_string())));
}

#[tokio::test]
async fn concurrent_invalidations_converge() {
    let provider = FakeProvider::with_apps(&[("com.a", "Alpha")]);
    let storage = memory_storage().await;
    let directory = repository(&provider, &storage);
    directory.list_apps().await;

    provider.set_apps(&[("com.a", "Alpha"), ("com.c", "Gamma")]);
    let mut changes = directory.subscribe_changes();
    tokio::join!(
        directory.invalidate(),
        directory.invalidate(),
        directory.list_apps()
    );
    directory.invalidate().await;

    assert!(changes.has_changed().expect("changes"));
    assert_eq!(labels(&directory.list_apps().await), ["Alpha", "Gamma"]);
}

#[tokio::test]
async fn shortcut_actions_are_deduped_sorted_and_tolerate_failures() {
    let provider = FakeProvider::with_apps(&[("com.maps", "Maps"), ("com.cam", "Camera")]);
    provider.set_shortcuts(
        "com.maps",
        vec![
            shortcut("nav", "Navigate home", None, true),
            shortcut("nav", "Duplicate id", None, true),
            shortcut("off", "Disabled", None, false),
            shortcut("work", "  ", Some("Work route"), true),
            shortcut("blank", "", None, true),
        ],
    );
    provider.fail_shortcuts_for("com.cam");
    let storage = memory_storage().await;
    let actions = repository(&provider, &storage)
        .enumerate_shortcut_actions()
        .await;

    let summary: Vec<(&str, &str)> = actions
        .iter()
        .map(|action| (action.app_label.as_str(), action.action_label.as_str()))
        .collect();
    assert_eq!(
        summary,
        [
            ("Camera", OPEN_APP_ACTION),
            ("Maps", "Navigate home"),
            ("Maps", OPEN_APP_ACTION),
            ("Maps", "Work route"),
        ]
    );
    assert_eq!(actions[0].target, ShortcutTarget::app("com.cam"));
    assert_eq!(
        actions[1].target,
        ShortcutTarget::launcher_shortcut("com.maps", "nav")
    );
}

#[tokio::test]
async fn adding_definitions_rejects_blank_reserved_and_duplicates() {
    let provider = FakeProvider::with_apps(&[]);
    let storage = memory_storage().await;
    let directory = repository(&provider, &storage);

    assert!(directory.add_category_definition(" Work ").await.expect("add"));
    assert!(!directory.add_category_definition("work").await.expect("add"));
    assert!(!directory.add_category_definition("All apps").await.expect("add"));
    assert!(!directory.add_category_definition(" private ").await.expect("add"));
    assert!(!directory.add_category_definition("   ").await.expect("add"));
    assert!(directory.add_category_definition("Play").await.expect("add"));

    assert_eq!(
        definitions(&storage),
        [
            CategoryDefinition {
                name: "Work".into(),
                position: 0
            },
            CategoryDefinition {
                name: "Play".into(),
                position: 1
            },
        ]
    );
}

#[tokio::test]
async fn rename_migrates_effective_categories_and_keeps_position() {
    let provider = FakeProvider::with_apps(&[("com.bank", "Bank"), ("com.x", "Xylo")]);
    let storage = memory_storage().await;
    let directory = repository(&provider, &storage);
    directory.add_category_definition("Work").await.expect("add");
    directory.add_category_definition("Play").await.expect("add");
    directory.set_app_category("com.x", "Work").await.expect("assign");
    directory
        .set_app_category("com.gone", "work")
        .await
        .expect("assign");

    assert!(directory.rename_category("Work", "Office").await.expect("rename"));
    assert_eq!(
        definitions(&storage),
        [
            CategoryDefinition {
                name: "Office".into(),
                position: 0
            },
            CategoryDefinition {
                name: "Play".into(),
                position: 1
            },
        ]
    );
    let assigned = storage.app_categories().borrow().clone();
    assert_eq!(assigned.get("com.x").map(String::as_str), Some("Office"));
    assert_eq!(assigned.get("com.gone").map(String::as_str), Some("Office"));

    // Inferred only: apps move, no definition appears.
    assert!(directory.rename_category("Finance", "Money").await.expect("rename"));
    let assigned = storage.app_categories().borrow().clone();
    assert_eq!(assigned.get("com.bank").map(String::as_str), Some("Money"));
    assert_eq!(definitions(&storage).len(), 2);
}

#[tokio::test]
async fn rename_rejects_reserved_unknown_and_taken_names() {
    let provider = FakeProvider::with_apps(&[("com.x", "Xylo")]);
    let storage = memory_storage().await;
    let directory = repository(&provider, &storage);
    directory.add_category_definition("Work").await.expect("add");
    directory.add_category_definition("Play").await.expect("add");
    let before = definitions(&storage);

    assert!(!directory.rename_category("Work", "Private").await.expect("rename"));
    assert!(!directory.rename_category("All apps", "Work2").await.expect("rename"));
    assert!(!directory.rename_category("Work", "play").await.expect("rename"));
    assert!(!directory.rename_category("Nope", "Other").await.expect("rename"));
    assert!(!directory.rename_category("Work", " ").await.expect("rename"));

    assert_eq!(definitions(&storage), before);
}

#[tokio::test]
async fn delete_uncategorizes_apps_and_drops_the_definition() {
    let provider = FakeProvider::with_apps(&[("com.bank", "Bank"), ("com.x", "Xylo")]);
    let storage = memory_storage().await;
    let directory = repository(&provider, &storage);
    directory.add_category_definition("Work").await.expect("add");
    directory.set_app_category("com.x", "Work").await.expect("assign");

    assert!(!directory.delete_category("Private").await.expect("delete"));
    assert!(directory.delete_category("work").await.expect("delete"));
    assert!(definitions(&storage).is_empty());
    assert_eq!(
        storage.app_categories().borrow().get("com.x").map(String::as_str),
        Some("")
    );

    assert!(directory.delete_category("Finance").await.expect("delete"));
    assert_eq!(
        storage.app_categories().borrow().get("com.bank").map(String::as_str),
        Some("")
    );
    assert!(!directory.delete_category("Finance").await.expect("delete"));
}

#[tokio::test]
async fn reorder_keeps_unlisted_definitions_at_the_end() {
    let provider = FakeProvider::with_apps(&[]);
    let storage = memory_storage().await;
    let directory = repository(&provider, &storage);
    for name in ["A", "B", "C"] {
        directory.add_category_definition(name).await.expect("add");
    }

    let order = ["C", "a", "zzz", "C"].map(String::from);
    assert!(directory
        .reorder_category_definitions(&order)
        .await
        .expect("reorder"));
    let names: Vec<String> = definitions(&storage)
        .into_iter()
        .map(|definition| definition.name)
        .collect();
    assert_eq!(names, ["C", "A", "B"]);

    assert!(!directory
        .reorder_category_definitions(&names)
        .await
        .expect("reorder"));
}

#[tokio::test]
async fn app_category_overrides_reject_reserved_and_clear_on_blank() {
    let provider = FakeProvider::with_apps(&[("com.x", "Xylo")]);
    let storage = memory_storage().await;
    let directory = repository(&provider, &storage);

    assert!(!directory.set_app_category("com.x", "All apps").await.expect("assign"));
    assert!(storage.app_categories().borrow().is_empty());

    assert!(directory.set_app_category("com.x", " Work ").await.expect("assign"));
    assert_eq!(
        storage.app_categories().borrow().get("com.x").map(String::as_str),
        Some("Work")
    );

    assert!(directory.set_app_category("com.x", "").await.expect("clear"));
    assert!(storage.app_categories().borrow().is_empty());
}

#[tokio::test]
async fn blank_rename_clears_the_overlay() {
    let provider = FakeProvider::with_apps(&[("com.x", "Xylo")]);
    let storage = memory_storage().await;
    let directory = repository(&provider, &storage);

    directory.rename_app("com.x", " Xy ").await.expect("rename");
    assert_eq!(
        storage.renamed_apps().borrow().get("com.x").map(String::as_str),
        Some("Xy")
    );
    directory.rename_app("com.x", "  ").await.expect("clear");
    assert!(storage.renamed_apps().borrow().is_empty());
}

#[tokio::test]
async fn launch_reports_absence_as_false() {
    let provider = FakeProvider::with_apps(&[("com.a", "Alpha")]);
    let storage = memory_storage().await;
    let directory = repository(&provider, &storage);
    let options = LaunchOptions::default();

    assert!(directory.launch("com.a", &options).await);
    assert!(!directory.launch("com.missing", &options).await);
    assert_eq!(provider.launches(), ["com.a"]);
}

#[tokio::test]
async fn launch_target_dispatches_by_variant() {
    let provider = FakeProvider::with_apps(&[("com.a", "Alpha")]);
    let storage = memory_storage().await;
    let directory = repository(&provider, &storage);
    let options = LaunchOptions::default();

    assert!(directory.launch_target(&ShortcutTarget::app("com.a"), &options).await);
    assert!(directory
        .launch_target(&ShortcutTarget::deep_link("geo:0,0"), &options)
        .await);
    assert!(directory
        .launch_target(&ShortcutTarget::launcher_shortcut("com.a", "s1"), &options)
        .await);
    assert!(!directory
        .launch_target(&ShortcutTarget::deep_link("broken:link"), &options)
        .await);

    assert_eq!(
        provider.launches(),
        ["com.a", "link:geo:0,0", "shortcut:com.a/s1"]
    );
}

#[tokio::test]
async fn private_apps_carry_profile_and_launch_through_it() {
    let provider = FakeProvider::with_apps(&[("com.a", "Alpha")]);
    provider.set_private_profile(&[("com.secret", "Secret")], true);
    let storage = memory_storage().await;
    let directory = repository(&provider, &storage);

    assert!(directory.is_private_space_unlocked().await);
    let private = directory.list_private_apps().await;
    assert_eq!(private.len(), 1);
    let secret = &private[0];
    assert!(secret.is_private());
    assert_eq!(secret.profile, Some(ProfileHandle(PRIVATE_PROFILE.to_string())));

    assert!(directory.launch_record(secret, &LaunchOptions::default()).await);
    assert_eq!(
        provider.launches(),
        [format!("{PRIVATE_PROFILE}:com.secret/.Main")]
    );

    assert!(directory.set_private_space_locked(true).await);
    assert!(!directory.is_private_space_unlocked().await);
    assert!(directory.list_private_apps().await.is_empty());
}

#[tokio::test]
async fn no_private_profile_means_nothing_private() {
    let provider = FakeProvider::with_apps(&[("com.a", "Alpha")]);
    let storage = memory_storage().await;
    let directory = repository(&provider, &storage);

    assert_eq!(directory.private_profile().await, None);
    assert!(!directory.is_private_space_unlocked().await);
    assert!(!directory.set_private_space_locked(false).await);
    assert!(directory.list_private_apps().await.is_empty());
}
