use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand, ValueEnum};
use launcher_core::{
    drawer::filter_apps, load_settings, AppDirectoryProvider, Launcher, LaunchOptions,
    SwipeDirection,
};
use serde::Deserialize;
use shared::{
    domain::{ActivityHandle, IconHandle, ProfileHandle},
    RawAppEntry, RawShortcutEntry, ShortcutTarget, ALL_APPS_CATEGORY,
};
use storage::Storage;
use tracing::info;

#[derive(Parser, Debug)]
struct Cli {
    /// Overrides the configured database.
    #[arg(long)]
    database_url: Option<String>,
    /// TOML list of installed apps standing in for the host.
    #[arg(long, default_value = "apps.toml")]
    manifest: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lists the drawer, overlays applied.
    Apps {
        #[arg(long, default_value = "")]
        query: String,
        #[arg(long, default_value = ALL_APPS_CATEGORY)]
        category: String,
    },
    /// Types `query` into the drawer search.
    Search { query: String },
    Hide { package: String },
    Unhide { package: String },
    Hidden,
    /// An empty label clears the rename.
    Rename { package: String, label: String },
    #[command(subcommand)]
    Category(CategoryCommand),
    #[command(subcommand)]
    Favorites(FavoritesCommand),
    /// Every pickable shortcut action.
    Actions,
    Swipe {
        direction: Direction,
        /// Encoded target; omit to clear.
        target: Option<String>,
    },
    /// Decodes a stored shortcut target.
    Target { raw: String },
    /// Clears every preference and overlay.
    Reset,
}

#[derive(Subcommand, Debug)]
enum CategoryCommand {
    List,
    Add { name: String },
    Rename { old_name: String, new_name: String },
    Delete { name: String },
    /// An empty category clears the assignment.
    Assign { package: String, category: String },
}

#[derive(Subcommand, Debug)]
enum FavoritesCommand {
    List,
    Toggle { package: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Direction {
    Left,
    Right,
}

impl From<Direction> for SwipeDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Left => SwipeDirection::Left,
            Direction::Right => SwipeDirection::Right,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    apps: Vec<ManifestApp>,
}

#[derive(Debug, Deserialize)]
struct ManifestApp {
    package: String,
    label: String,
    #[serde(default)]
    shortcuts: Vec<RawShortcutEntry>,
}

/// Host stand-in backed by a static manifest. Launches are printed.
struct ManifestProvider {
    apps: Vec<ManifestApp>,
}

impl ManifestProvider {
    fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "no app manifest, starting with an empty directory");
            return Ok(Self { apps: Vec::new() });
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        let manifest: Manifest = toml::from_str(&raw)
            .with_context(|| format!("invalid manifest {}", path.display()))?;
        Ok(Self {
            apps: manifest.apps,
        })
    }

    fn find(&self, package: &str) -> Option<&ManifestApp> {
        self.apps.iter().find(|app| app.package == package)
    }
}

#[async_trait]
impl AppDirectoryProvider for ManifestProvider {
    async fn query_launchable_apps(&self) -> Result<Vec<RawAppEntry>> {
        Ok(self
            .apps
            .iter()
            .map(|app| RawAppEntry::new(&app.package, &app.label))
            .collect())
    }

    async fn load_icon(&self, _package: &str) -> Result<Option<IconHandle>> {
        Ok(None)
    }

    async fn resolve_shortcuts(&self, package: &str) -> Result<Vec<RawShortcutEntry>> {
        Ok(self
            .find(package)
            .map(|app| app.shortcuts.clone())
            .unwrap_or_default())
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
        let Some(app) = self.find(package) else {
            return Ok(false);
        };
        println!("launch {} ({})", app.label, app.package);
        Ok(true)
    }

    async fn launch_in_profile(
        &self,
        _activity: &ActivityHandle,
        _profile: &ProfileHandle,
    ) -> Result<bool> {
        Ok(false)
    }

    async fn open_deep_link(&self, uri: &str) -> Result<bool> {
        println!("open {uri}");
        Ok(true)
    }

    async fn start_shortcut(&self, package: &str, shortcut_id: &str) -> Result<bool> {
        let known = self
            .find(package)
            .is_some_and(|app| app.shortcuts.iter().any(|shortcut| shortcut.id == shortcut_id));
        if known {
            println!("shortcut {package}/{shortcut_id}");
        }
        Ok(known)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings();
    if let Some(database_url) = cli.database_url {
        settings.database_url = database_url;
    }
    tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter.as_str())
        .with_writer(std::io::stderr)
        .init();

    if let Command::Target { raw } = &cli.command {
        match ShortcutTarget::decode(raw) {
            Some(target) => println!("{target:?}"),
            None => println!("not a shortcut target"),
        }
        return Ok(());
    }

    let provider = Arc::new(ManifestProvider::load(&cli.manifest)?);
    let storage = Arc::new(Storage::new(&settings.database_url).await?);
    let launcher = Launcher::start(provider, storage.clone(), storage, &settings).await?;

    match cli.command {
        Command::Apps { query, category } => {
            let state = launcher.drawer().snapshot();
            for app in filter_apps(&state.all_apps, &query, &category) {
                println!("{}\t{}\t{}", app.package, app.label, app.category);
            }
        }
        Command::Search { query } => {
            if !launcher.drawer().set_search_query(&query).await {
                let state = launcher.drawer().snapshot();
                for app in &state.filtered_apps {
                    println!("{}\t{}", app.package, app.label);
                }
            }
        }
        Command::Hide { package } => launcher.settings().hide_app(&package).await?,
        Command::Unhide { package } => launcher.settings().unhide_app(&package).await?,
        Command::Hidden => {
            for app in launcher.settings().snapshot().hidden_apps {
                println!("{}\t{}", app.package, app.label);
            }
        }
        Command::Rename { package, label } => {
            launcher.settings().rename_app(&package, &label).await?
        }
        Command::Category(command) => run_category(&launcher, command).await?,
        Command::Favorites(command) => run_favorites(&launcher, command).await?,
        Command::Actions => {
            for action in launcher.directory().enumerate_shortcut_actions().await {
                println!(
                    "{}\t{}\t{}",
                    action.app_label,
                    action.action_label,
                    action.target.encode()
                );
            }
        }
        Command::Swipe { direction, target } => {
            let target = match target {
                Some(raw) => Some(
                    ShortcutTarget::decode(&raw)
                        .ok_or_else(|| anyhow!("not a shortcut target: {raw}"))?,
                ),
                None => None,
            };
            launcher
                .settings()
                .set_swipe_target(direction.into(), target.as_ref())
                .await?;
        }
        Command::Target { .. } => {}
        Command::Reset => {
            launcher.settings().reset_all_data().await?;
            println!("launcher data reset");
        }
    }

    Ok(())
}

async fn run_category(launcher: &Launcher, command: CategoryCommand) -> Result<()> {
    let settings = launcher.settings();
    let changed = match command {
        CategoryCommand::List => {
            for category in launcher.drawer().snapshot().categories {
                println!("{category}");
            }
            return Ok(());
        }
        CategoryCommand::Add { name } => settings.add_category(&name).await?,
        CategoryCommand::Rename { old_name, new_name } => {
            settings.rename_category(&old_name, &new_name).await?
        }
        CategoryCommand::Delete { name } => settings.delete_category(&name).await?,
        CategoryCommand::Assign { package, category } => {
            settings.set_app_category(&package, &category).await?
        }
    };
    if !changed {
        println!("nothing changed");
    }
    Ok(())
}

async fn run_favorites(launcher: &Launcher, command: FavoritesCommand) -> Result<()> {
    let home = launcher.home();
    match command {
        FavoritesCommand::List => {
            for favorite in home.snapshot().favorites {
                println!("{}\t{}\t{}", favorite.package, favorite.label, favorite.icon_name);
            }
        }
        FavoritesCommand::Toggle { package } => {
            let apps = launcher.directory().list_apps().await;
            let app = apps
                .iter()
                .find(|app| app.package == package)
                .ok_or_else(|| anyhow!("{package} is not installed"))?;
            home.begin_edit().await;
            home.toggle_favorite(app).await;
            home.save_edit().await?;
        }
    }
    Ok(())
}
