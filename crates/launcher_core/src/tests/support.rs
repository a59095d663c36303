use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use shared::{
    domain::{ActivityHandle, IconHandle, ProfileHandle},
    RawAppEntry, RawShortcutEntry,
};
use storage::{OverlayStore, PreferenceStore, Storage};
use tokio::{net::TcpListener, sync::watch};

use crate::{
    directory::DirectoryRepository,
    provider::{AppDirectoryProvider, LaunchOptions},
};

pub(crate) const PRIVATE_PROFILE: &str = "profile-10";

#[derive(Default)]
struct PrivateProfile {
    present: bool,
    unlocked: bool,
    apps: Vec<RawAppEntry>,
}

/// Scriptable host: a fixed app list, optional failures and a log of every
/// launch request.
#[derive(Default)]
pub(crate) struct FakeProvider {
    apps: Mutex<Vec<RawAppEntry>>,
    shortcuts: Mutex<HashMap<String, Vec<RawShortcutEntry>>>,
    failing_shortcuts: Mutex<HashSet<String>>,
    failing_icons: Mutex<HashSet<String>>,
    unlaunchable: Mutex<HashSet<String>>,
    private: Mutex<PrivateProfile>,
    queries: AtomicUsize,
    launches: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub(crate) fn with_apps(apps: &[(&str, &str)]) -> Arc<Self> {
        let provider = Self::default();
        provider.set_apps(apps);
        Arc::new(provider)
    }

    pub(crate) fn set_apps(&self, apps: &[(&str, &str)]) {
        *self.apps.lock().expect("apps") = apps
            .iter()
            .map(|(package, label)| RawAppEntry::new(*package, *label))
            .collect();
    }

    pub(crate) fn set_shortcuts(&self, package: &str, shortcuts: Vec<RawShortcutEntry>) {
        self.shortcuts
            .lock()
            .expect("shortcuts")
            .insert(package.to_string(), shortcuts);
    }

    pub(crate) fn fail_shortcuts_for(&self, package: &str) {
        self.failing_shortcuts
            .lock()
            .expect("failing shortcuts")
            .insert(package.to_string());
    }

    pub(crate) fn fail_icon_for(&self, package: &str) {
        self.failing_icons
            .lock()
            .expect("failing icons")
            .insert(package.to_string());
    }

    pub(crate) fn refuse_launch_of(&self, package: &str) {
        self.unlaunchable
            .lock()
            .expect("unlaunchable")
            .insert(package.to_string());
    }

    /// Installs a private profile holding `apps`. Each app gets an activity
    /// handle named after its package.
    pub(crate) fn set_private_profile(&self, apps: &[(&str, &str)], unlocked: bool) {
        let mut private = self.private.lock().expect("private");
        private.present = true;
        private.unlocked = unlocked;
        private.apps = apps
            .iter()
            .map(|(package, label)| RawAppEntry {
                activity: Some(ActivityHandle(format!("{package}/.Main"))),
                ..RawAppEntry::new(*package, *label)
            })
            .collect();
    }

    pub(crate) fn set_private_unlocked(&self, unlocked: bool) {
        self.private.lock().expect("private").unlocked = unlocked;
    }

    pub(crate) fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub(crate) fn launches(&self) -> Vec<String> {
        self.launches.lock().expect("launches").clone()
    }

    fn record(&self, launch: String) {
        self.launches.lock().expect("launches").push(launch);
    }
}

#[async_trait]
impl AppDirectoryProvider for FakeProvider {
    async fn query_launchable_apps(&self) -> Result<Vec<RawAppEntry>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.apps.lock().expect("apps").clone())
    }

    async fn load_icon(&self, package: &str) -> Result<Option<IconHandle>> {
        if self.failing_icons.lock().expect("failing icons").contains(package) {
            return Err(anyhow!("icon decode failed for {package}"));
        }
        Ok(Some(IconHandle(format!("icon:{package}"))))
    }

    async fn resolve_shortcuts(&self, package: &str) -> Result<Vec<RawShortcutEntry>> {
        if self
            .failing_shortcuts
            .lock()
            .expect("failing shortcuts")
            .contains(package)
        {
            return Err(anyhow!("not allowed to query shortcuts of {package}"));
        }
        Ok(self
            .shortcuts
            .lock()
            .expect("shortcuts")
            .get(package)
            .cloned()
            .unwrap_or_default())
    }

    async fn private_profile(&self) -> Result<Option<ProfileHandle>> {
        let private = self.private.lock().expect("private");
        Ok(private
            .present
            .then(|| ProfileHandle(PRIVATE_PROFILE.to_string())))
    }

    async fn is_private_space_unlocked(&self, _profile: &ProfileHandle) -> Result<bool> {
        Ok(self.private.lock().expect("private").unlocked)
    }

    async fn set_private_space_locked(
        &self,
        _profile: &ProfileHandle,
        locked: bool,
    ) -> Result<bool> {
        self.private.lock().expect("private").unlocked = !locked;
        Ok(true)
    }

    async fn query_private_profile_apps(
        &self,
        _profile: &ProfileHandle,
    ) -> Result<Vec<RawAppEntry>> {
        let private = self.private.lock().expect("private");
        if !private.unlocked {
            return Ok(Vec::new());
        }
        Ok(private.apps.clone())
    }

    async fn launch(&self, package: &str, _options: &LaunchOptions) -> Result<bool> {
        if self.unlaunchable.lock().expect("unlaunchable").contains(package) {
            return Ok(false);
        }
        let installed = self
            .apps
            .lock()
            .expect("apps")
            .iter()
            .any(|app| app.package == package);
        if installed {
            self.record(package.to_string());
        }
        Ok(installed)
    }

    async fn launch_in_profile(
        &self,
        activity: &ActivityHandle,
        profile: &ProfileHandle,
    ) -> Result<bool> {
        self.record(format!("{}:{}", profile.as_str(), activity.as_str()));
        Ok(true)
    }

    async fn open_deep_link(&self, uri: &str) -> Result<bool> {
        if uri.starts_with("broken:") {
            return Err(anyhow!("no activity handles {uri}"));
        }
        self.record(format!("link:{uri}"));
        Ok(true)
    }

    async fn start_shortcut(&self, package: &str, shortcut_id: &str) -> Result<bool> {
        self.record(format!("shortcut:{package}/{shortcut_id}"));
        Ok(true)
    }
}

pub(crate) async fn memory_storage() -> Arc<Storage> {
    Arc::new(
        Storage::new("sqlite::memory:")
            .await
            .expect("in-memory storage"),
    )
}

pub(crate) fn overlay_store(storage: &Arc<Storage>) -> Arc<dyn OverlayStore> {
    storage.clone()
}

pub(crate) fn preference_store(storage: &Arc<Storage>) -> Arc<dyn PreferenceStore> {
    storage.clone()
}

pub(crate) fn repository(
    provider: &Arc<FakeProvider>,
    storage: &Arc<Storage>,
) -> Arc<DirectoryRepository> {
    Arc::new(DirectoryRepository::new(
        provider.clone(),
        overlay_store(storage),
        Some("com.example.launcher".to_string()),
    ))
}

/// Waits until `ready` holds for the latest value and returns a copy of it.
pub(crate) async fn wait_for<T, F>(receiver: &mut watch::Receiver<T>, ready: F) -> T
where
    T: Clone,
    F: FnMut(&T) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), receiver.wait_for(ready))
        .await
        .expect("timed out waiting for state")
        .expect("state channel closed")
        .clone()
}

#[derive(Clone)]
struct WeatherServerState {
    hits: Arc<AtomicUsize>,
    queries: Arc<Mutex<Vec<String>>>,
    status: StatusCode,
    body: Value,
}

async fn handle_forecast(
    State(state): State<WeatherServerState>,
    RawQuery(query): RawQuery,
) -> (StatusCode, Json<Value>) {
    state.hits.fetch_add(1, Ordering::SeqCst);
    state
        .queries
        .lock()
        .expect("queries")
        .push(query.unwrap_or_default());
    (state.status, Json(state.body.clone()))
}

pub(crate) struct WeatherServer {
    pub(crate) endpoint: String,
    hits: Arc<AtomicUsize>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl WeatherServer {
    pub(crate) fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub(crate) fn queries(&self) -> Vec<String> {
        self.queries.lock().expect("queries").clone()
    }
}

pub(crate) fn forecast_body(temperature: f64, weather_code: i64) -> Value {
    json!({
        "latitude": 52.52,
        "longitude": 13.41,
        "current": {
            "time": "2025-03-03T07:00",
            "temperature_2m": temperature,
            "weather_code": weather_code
        }
    })
}

pub(crate) async fn spawn_weather_server(status: StatusCode, body: Value) -> WeatherServer {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let state = WeatherServerState {
        hits: Arc::new(AtomicUsize::new(0)),
        queries: Arc::new(Mutex::new(Vec::new())),
        status,
        body,
    };
    let server = WeatherServer {
        endpoint: format!("http://{addr}/v1/forecast"),
        hits: Arc::clone(&state.hits),
        queries: Arc::clone(&state.queries),
    };
    let app = Router::new()
        .route("/v1/forecast", get(handle_forecast))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    server
}
