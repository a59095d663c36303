use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::Result;
use async_trait::async_trait;
use launcher_core::{
    AppDirectoryProvider, Launcher, LauncherEvent, LauncherSettings, LaunchOptions,
    MissingAppDirectoryProvider, OnboardingStep,
};
use shared::{
    domain::{ActivityHandle, IconHandle, ProfileHandle},
    AppRecord, RawAppEntry, RawShortcutEntry,
};
use storage::Storage;
use tokio::{sync::watch, time::timeout};

#[derive(Default)]
struct StaticProvider {
    apps: Mutex<Vec<RawAppEntry>>,
    launches: Mutex<Vec<String>>,
}

impl StaticProvider {
    fn new(apps: &[(&str, &str)]) -> Arc<Self> {
        let provider = Self::default();
        provider.install(apps);
        Arc::new(provider)
    }

    fn install(&self, apps: &[(&str, &str)]) {
        *self.apps.lock().expect("apps") = apps
            .iter()
            .map(|(package, label)| RawAppEntry::new(*package, *label))
            .collect();
    }

    fn launches(&self) -> Vec<String> {
        self.launches.lock().expect("launches").clone()
    }
}

#[async_trait]
impl AppDirectoryProvider for StaticProvider {
    async fn query_launchable_apps(&self) -> Result<Vec<RawAppEntry>> {
        Ok(self.apps.lock().expect("apps").clone())
    }

    async fn load_icon(&self, _package: &str) -> Result<Option<IconHandle>> {
        Ok(None)
    }

    async fn resolve_shortcuts(&self, _package: &str) -> Result<Vec<RawShortcutEntry>> {
        Ok(Vec::new())
    }

    async fn private_profile(&self) -> Result<Option<ProfileHandle>> {
        Ok(None)
    }

    async fn is_private_space_unlocked(&self, _profile: &ProfileHandle) -> Result<bool> {
        Ok(false)
    }

    async fn set_private_space_locked(
        &self,
        _profile: &ProfileHandle,
        _locked: bool,
    ) -> Result<bool> {
        Ok(false)
    }

    async fn query_private_profile_apps(
        &self,
        _profile: &ProfileHandle,
    ) -> Result<Vec<RawAppEntry>> {
        Ok(Vec::new())
    }

    async fn launch(&self, package: &str, _options: &LaunchOptions) -> Result<bool> {
        self.launches.lock().expect("launches").push(package.to_string());
        Ok(true)
    }

    async fn launch_in_profile(
        &self,
        _activity: &ActivityHandle,
        _profile: &ProfileHandle,
    ) -> Result<bool> {
        Ok(false)
    }

    async fn open_deep_link(&self, _uri: &str) -> Result<bool> {
        Ok(false)
    }

    async fn start_shortcut(&self, _package: &str, _shortcut_id: &str) -> Result<bool> {
        Ok(false)
    }
}

async fn start(provider: Arc<dyn AppDirectoryProvider>) -> Launcher {
    let storage = Arc::new(Storage::new("sqlite::memory:").await.expect("storage"));
    let settings = LauncherSettings {
        own_package: Some("com.example.launcher".into()),
        ..LauncherSettings::default()
    };
    Launcher::start(provider, storage.clone(), storage, &settings)
        .await
        .expect("launcher")
}

async fn wait_for<T: Clone>(receiver: &mut watch::Receiver<T>, ready: impl FnMut(&T) -> bool) -> T {
    timeout(Duration::from_secs(5), receiver.wait_for(ready))
        .await
        .expect("timed out")
        .expect("closed")
        .clone()
}

fn packages(apps: &[AppRecord]) -> Vec<&str> {
    apps.iter().map(|app| app.package.as_str()).collect()
}

#[tokio::test]
async fn search_hide_and_reset_round_trip() {
    let provider = StaticProvider::new(&[
        ("com.example.launcher", "Launcher"),
        ("com.mail", "Mail"),
        ("com.maps", "Maps"),
        ("com.music", "Music"),
    ]);
    let launcher = start(provider.clone()).await;
    let mut events = launcher.subscribe_events();
    let drawer = launcher.drawer();

    assert_eq!(
        packages(&drawer.snapshot().all_apps),
        ["com.mail", "com.maps", "com.music"]
    );
    assert!(!drawer.set_search_query("ma").await);
    assert!(drawer.set_search_query("mu").await);
    assert_eq!(provider.launches(), ["com.music"]);
    assert_eq!(
        events.recv().await.expect("event"),
        LauncherEvent::AutoLaunched {
            package: "com.music".into(),
            private: false
        }
    );

    let settings = launcher.settings();
    settings.hide_app("com.mail").await.expect("hide");
    let mut drawer_state = drawer.subscribe();
    wait_for(&mut drawer_state, |state| state.all_apps.len() == 2).await;

    // "ma" now only matches Maps.
    assert!(drawer.set_search_query("ma").await);
    assert_eq!(provider.launches(), ["com.music", "com.maps"]);

    settings.reset_all_data().await.expect("reset");
    let state = wait_for(&mut drawer_state, |state| state.all_apps.len() == 3).await;
    assert_eq!(packages(&state.all_apps), ["com.mail", "com.maps", "com.music"]);
}

#[tokio::test]
async fn package_changes_invalidate_every_engine() {
    let provider = StaticProvider::new(&[("com.a", "Alpha")]);
    let launcher = start(provider.clone()).await;
    let mut events = launcher.subscribe_events();

    let home = launcher.home();
    home.begin_edit().await;
    home.toggle_favorite(&AppRecord::new("com.b", "Stored Beta"))
        .await;
    home.save_edit().await.expect("save");
    assert_eq!(home.snapshot().favorites[0].label, "Stored Beta");

    provider.install(&[("com.a", "Alpha"), ("com.b", "Beta")]);
    launcher.on_package_changed().await;
    assert_eq!(
        events.recv().await.expect("event"),
        LauncherEvent::DirectoryInvalidated
    );

    let mut drawer_state = launcher.drawer().subscribe();
    wait_for(&mut drawer_state, |state| state.all_apps.len() == 2).await;
    let mut home_state = home.subscribe();
    wait_for(&mut home_state, |state| {
        state.favorites.first().map(|favorite| favorite.label.as_str()) == Some("Beta")
    })
    .await;
    let mut settings_state = launcher.settings().subscribe();
    wait_for(&mut settings_state, |state| state.all_apps.len() == 2).await;
}

#[tokio::test]
async fn onboarding_progress_is_shared_with_the_launcher() {
    let launcher = start(StaticProvider::new(&[])).await;

    let mut flow = launcher.onboarding().await.expect("flow");
    assert_eq!(flow.step(), OnboardingStep::Welcome);
    flow.advance().await.expect("advance");
    flow.advance().await.expect("advance");
    flow.advance().await.expect("advance");

    let resumed = launcher.onboarding().await.expect("flow");
    assert!(resumed.is_complete());
}

#[tokio::test]
async fn without_a_host_nothing_launches() {
    let launcher = start(Arc::new(MissingAppDirectoryProvider)).await;
    let mut events = launcher.subscribe_events();

    assert!(launcher.drawer().snapshot().all_apps.is_empty());
    assert!(launcher.directory().enumerate_shortcut_actions().await.is_empty());
    assert!(!launcher.drawer().launch_app(&AppRecord::new("com.a", "Alpha")).await);
    assert!(matches!(
        events.recv().await.expect("event"),
        LauncherEvent::LaunchFailed { .. }
    ));
    launcher.on_profile_availability_changed().await;
    assert!(!launcher.drawer().snapshot().private_space_unlocked);
}
