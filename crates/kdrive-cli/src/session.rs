//! Wiring shared by every command that touches a store
//!
//! Opens the store of the selected `UserDrive`, registers it and builds the
//! sync services over the REST adapter.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use kdrive_api::{KDriveApi, KDriveClient};
use kdrive_cache::{BlobCache, SqliteFileRepository, StorePool};
use kdrive_core::config::Config;
use kdrive_core::domain::{DriveId, UserDrive, UserId};
use kdrive_core::ports::IFileRepository;
use kdrive_sync::{FileActions, FolderFilesProvider, RepositoryRegistry};
use kdrive_telemetry::TelemetryReporter;
use tracing::{info, warn};

/// Environment variable holding the API access token
pub const TOKEN_ENV: &str = "KDRIVE_TOKEN";

/// Loads the configuration file, falling back to defaults when absent
pub fn load_config(path: Option<&PathBuf>) -> Result<(PathBuf, Config)> {
    let path = path.cloned().unwrap_or_else(Config::default_path);
    let config = if path.exists() {
        Config::load(&path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?
    } else {
        Config::default()
    };
    Ok((path, config))
}

pub struct Session {
    pub user_drive: UserDrive,
    pub repo: Arc<dyn IFileRepository>,
    pub provider: FolderFilesProvider,
    pub actions: FileActions,
    pub reporter: Arc<TelemetryReporter>,
}

impl Session {
    pub async fn open(config: &Config, user_id: i64, drive_id: i64, shared: bool) -> Result<Self> {
        let errors = config.validate();
        if !errors.is_empty() {
            let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
            anyhow::bail!("Invalid configuration: {}", details.join("; "));
        }

        let mut user_drive = UserDrive::new(UserId::new(user_id), DriveId::new(drive_id));
        if shared {
            user_drive = user_drive.shared();
        }

        let data_dir = &config.cache.data_dir;
        let store = StorePool::open(data_dir, &user_drive)
            .await
            .with_context(|| format!("Failed to open store of {user_drive}"))?;
        let blobs = Arc::new(
            BlobCache::new(data_dir.join("blobs")).context("Failed to open blob cache")?,
        );
        let reporter = Arc::new(TelemetryReporter::from_config(&config.telemetry));
        let repo: Arc<dyn IFileRepository> = Arc::new(SqliteFileRepository::new(
            store.pool().clone(),
            user_drive.drive_id,
            blobs,
            reporter.clone(),
        ));

        let stores = Arc::new(RepositoryRegistry::new());
        stores.register(user_drive, Arc::clone(&repo));

        let token = std::env::var(TOKEN_ENV).unwrap_or_default();
        if token.is_empty() {
            warn!("{TOKEN_ENV} is not set, server calls will be rejected");
        }
        let client = KDriveClient::from_config(&config.api, token)?;
        let api = Arc::new(KDriveApi::new(client).with_page_size(config.cache.page_size));

        let provider =
            FolderFilesProvider::new(api.clone(), stores.clone(), reporter.clone(), &config.cache);
        let actions = FileActions::new(api, stores);

        info!(%user_drive, data_dir = %data_dir.display(), "Session opened");
        Ok(Self {
            user_drive,
            repo,
            provider,
            actions,
            reporter,
        })
    }
}
