//! Reactive state core for the launcher.
//!
//! The [`DirectoryRepository`] owns the app list; the drawer, home and
//! settings engines each merge it with the preference and overlay stores
//! into one observable snapshot. [`Launcher`] wires them together and
//! routes host signals.

use std::sync::Arc;

use anyhow::Result;
use storage::{OverlayStore, PreferenceStore};
use tokio::sync::broadcast;
use tracing::info;

pub mod clock;
mod combine;
pub mod config;
pub mod directory;
pub mod drawer;
pub mod edit_buffer;
pub mod events;
pub mod heuristics;
pub mod home;
pub mod onboarding;
pub mod preferences;
pub mod provider;
pub mod settings;
pub mod ticker;
pub mod weather;

pub use clock::ClockSnapshot;
pub use config::{load_settings, LauncherSettings};
pub use directory::DirectoryRepository;
pub use drawer::{DrawerEngine, DrawerUiState};
pub use edit_buffer::{DragReorder, EditBuffer};
pub use events::LauncherEvent;
pub use home::{HomeEditState, HomeEngine, HomeUiState};
pub use onboarding::{OnboardingFlow, OnboardingStep};
pub use preferences::{Flag, LauncherPreferences, SwipeDirection};
pub use provider::{AppDirectoryProvider, LaunchOptions, LaunchSource, MissingAppDirectoryProvider};
pub use settings::{SettingsEngine, SettingsUiState};
pub use weather::{WeatherClient, WeatherLocation, WeatherSnapshot};

use events::EventSender;

/// Every engine over one shared directory.
pub struct Launcher {
    directory: Arc<DirectoryRepository>,
    drawer: Arc<DrawerEngine>,
    home: Arc<HomeEngine>,
    settings: Arc<SettingsEngine>,
    prefs: LauncherPreferences,
    events: EventSender,
}

impl Launcher {
    pub async fn start(
        provider: Arc<dyn AppDirectoryProvider>,
        preference_store: Arc<dyn PreferenceStore>,
        overlays: Arc<dyn OverlayStore>,
        settings: &LauncherSettings,
    ) -> Result<Self> {
        let directory = Arc::new(DirectoryRepository::new(
            provider,
            overlays,
            settings.own_package.clone(),
        ));
        let prefs = LauncherPreferences::new(preference_store);
        let events = events::event_channel();

        let drawer = DrawerEngine::start(Arc::clone(&directory), events.clone()).await;
        let home = HomeEngine::start(Arc::clone(&directory), prefs.clone(), events.clone()).await?;
        let settings_engine = SettingsEngine::start(Arc::clone(&directory), prefs.clone()).await?;
        info!("launcher core started");

        Ok(Self {
            directory,
            drawer,
            home,
            settings: settings_engine,
            prefs,
            events,
        })
    }

    /// Starts the clock and, when a location is configured, the weather
    /// refresh. Both stop when the launcher is dropped.
    pub async fn start_background_tasks(&self, settings: &LauncherSettings) -> Result<()> {
        self.home.start_clock(settings.clock_tick_period()).await;
        if let Some(location) = settings.weather_location() {
            let client =
                WeatherClient::new(&settings.weather_endpoint, settings.weather_cache_ttl())?;
            self.home
                .start_weather_refresh(
                    Arc::new(client),
                    location,
                    settings.weather_refresh_period(),
                )
                .await;
        }
        Ok(())
    }

    pub fn directory(&self) -> &Arc<DirectoryRepository> {
        &self.directory
    }

    pub fn drawer(&self) -> &Arc<DrawerEngine> {
        &self.drawer
    }

    pub fn home(&self) -> &Arc<HomeEngine> {
        &self.home
    }

    pub fn settings(&self) -> &Arc<SettingsEngine> {
        &self.settings
    }

    pub fn preferences(&self) -> &LauncherPreferences {
        &self.prefs
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<LauncherEvent> {
        self.events.subscribe()
    }

    pub async fn onboarding(&self) -> Result<OnboardingFlow> {
        OnboardingFlow::resume(self.prefs.clone()).await
    }

    /// Host signal: a package was installed, removed or updated.
    pub async fn on_package_changed(&self) {
        self.directory.invalidate().await;
        let _ = self.events.send(LauncherEvent::DirectoryInvalidated);
    }

    /// Host signal: the private profile became available or unavailable.
    pub async fn on_profile_availability_changed(&self) {
        self.drawer.on_profile_availability_changed().await;
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
