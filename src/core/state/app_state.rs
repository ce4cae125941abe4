use std::sync::Arc;

use tracing::debug;

use crate::core::config::Config;
use crate::core::error::SyncResult;
use crate::core::registry::{ModrinthClient, RegistryClient};
use crate::core::store::{ModStore, SqliteModStore};
use crate::core::vault::FileVault;

/// Everything a command needs, wired once per process.
pub struct AppState {
    pub config: Config,
    pub registry: Arc<dyn RegistryClient>,
    pub store: Arc<dyn ModStore>,
    pub vault: FileVault,
}

impl AppState {
    /// Create the game directories, open the database and build the
    /// Modrinth client from `config`.
    pub fn new(config: Config) -> SyncResult<Self> {
        config.ensure_directories()?;
        let store = SqliteModStore::open(&config.database_path)?;
        let registry = ModrinthClient::new(&config)?;
        debug!(
            minecraft_dir = %config.minecraft_dir.display(),
            database = %config.database_path.display(),
            "Application state ready"
        );
        Ok(Self::from_parts(config, Arc::new(registry), Arc::new(store)))
    }

    pub fn from_parts(
        config: Config,
        registry: Arc<dyn RegistryClient>,
        store: Arc<dyn ModStore>,
    ) -> Self {
        let vault = FileVault::new(&config.minecraft_dir);
        Self {
            config,
            registry,
            store,
            vault,
        }
    }
}
