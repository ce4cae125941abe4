// ─── Configuration ───
// Defaults → optional JSON settings file → `.env` in the working
// directory → process environment.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::error::{SyncError, SyncResult};
use crate::core::platform::{Category, InstallationType, TargetPlatform};
use crate::core::reconcile::ConcurrencyLimit;

const APP_DIR_NAME: &str = "modsync";
const SETTINGS_FILE: &str = "config.json";
const DATABASE_FILE: &str = "mods.db";
const DOTENV_FILE: &str = ".env";

const DEFAULT_LOADER: &str = "fabric";
const DEFAULT_INSTALLATION_TYPE: &str = "server";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 120;

/// On-disk settings file. Every field is optional; environment variables
/// take precedence over whatever is set here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsFile {
    pub minecraft_dir: Option<PathBuf>,
    pub minecraft_version: Option<String>,
    pub minecraft_loader: Option<String>,
    pub installation_type: Option<String>,
    pub api_key: Option<String>,
    pub user_agent: Option<String>,
    pub keep_old_versions: Option<bool>,
    /// `0` means unbounded.
    pub concurrency: Option<usize>,
    pub request_timeout_secs: Option<u64>,
    pub download_timeout_secs: Option<u64>,
}

impl SettingsFile {
    /// Read an explicit settings file, or the per-user default if one exists.
    pub fn load(explicit: Option<&Path>) -> SyncResult<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_settings_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let raw = std::fs::read_to_string(&path).map_err(|e| SyncError::io(&path, e))?;
        let settings = serde_json::from_str(&raw)
            .map_err(|e| SyncError::Config(format!("invalid settings file {:?}: {}", path, e)))?;
        info!("Loaded settings from {:?}", path);
        Ok(settings)
    }
}

/// Fully validated configuration handed to the sync core.
#[derive(Debug, Clone)]
pub struct Config {
    pub minecraft_dir: PathBuf,
    pub database_path: PathBuf,
    pub target: TargetPlatform,
    pub api_key: Option<String>,
    pub user_agent: String,
    pub keep_old_versions: bool,
    pub concurrency: ConcurrencyLimit,
    pub request_timeout: Duration,
    pub download_timeout: Duration,
}

impl Config {
    /// Load from the settings file, `./.env` and the process environment.
    pub fn load(explicit: Option<&Path>) -> SyncResult<Self> {
        let settings = SettingsFile::load(explicit)?;
        let dotenv = load_dotenv(Path::new(DOTENV_FILE))?;
        Self::from_sources(settings, layered(|key| std::env::var(key).ok(), dotenv))
    }

    /// Merge a settings file with an environment lookup and validate.
    pub fn from_sources(
        settings: SettingsFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> SyncResult<Self> {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let minecraft_dir = env("MINECRAFT_DIR")
            .map(PathBuf::from)
            .or(settings.minecraft_dir)
            .ok_or_else(|| SyncError::Config("MINECRAFT_DIR is required".into()))?;

        let game_version = env("MINECRAFT_VERSION")
            .or(settings.minecraft_version)
            .ok_or_else(|| SyncError::Config("MINECRAFT_VERSION is required".into()))?;

        let loader = env("MINECRAFT_LOADER")
            .or(settings.minecraft_loader)
            .unwrap_or_else(|| DEFAULT_LOADER.to_string());

        let installation = InstallationType::parse(
            &env("MINECRAFT_INSTALLATION_TYPE")
                .or(settings.installation_type)
                .unwrap_or_else(|| DEFAULT_INSTALLATION_TYPE.to_string()),
        );
        if let InstallationType::Unrecognized(raw) = &installation {
            warn!(
                installation_type = %raw,
                "Unrecognized installation type; every project will be treated as compatible"
            );
        }

        let user_agent = env("USERAGENT")
            .or(settings.user_agent)
            .unwrap_or_else(|| {
                warn!("USERAGENT not set in config or environment, using default.");
                format!("{}/{} (unknown-user)", APP_DIR_NAME, env!("CARGO_PKG_VERSION"))
            });

        let keep_old_versions = match env("KEEP_OLD_VERSIONS") {
            Some(raw) => parse_bool(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "Invalid value for KEEP_OLD_VERSIONS, defaulting to false");
                false
            }),
            None => settings.keep_old_versions.unwrap_or(false),
        };

        let concurrency = match env("MODSYNC_CONCURRENCY") {
            Some(raw) => parse_concurrency(&raw)?,
            None => settings
                .concurrency
                .and_then(NonZeroUsize::new)
                .map(ConcurrencyLimit::Limited)
                .unwrap_or(ConcurrencyLimit::Unbounded),
        };

        let request_timeout = Duration::from_secs(match env("MODSYNC_REQUEST_TIMEOUT_SECS") {
            Some(raw) => parse_secs("MODSYNC_REQUEST_TIMEOUT_SECS", &raw)?,
            None => settings
                .request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        });
        let download_timeout = Duration::from_secs(match env("MODSYNC_DOWNLOAD_TIMEOUT_SECS") {
            Some(raw) => parse_secs("MODSYNC_DOWNLOAD_TIMEOUT_SECS", &raw)?,
            None => settings
                .download_timeout_secs
                .unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
        });

        Ok(Self {
            database_path: minecraft_dir.join(DATABASE_FILE),
            minecraft_dir,
            target: TargetPlatform {
                game_version,
                loader,
                installation,
            },
            api_key: env("MODRINTH_API_KEY").or(settings.api_key),
            user_agent,
            keep_old_versions,
            concurrency,
            request_timeout,
            download_timeout,
        })
    }

    /// The API key, or a configuration error for commands that need one.
    pub fn require_api_key(&self) -> SyncResult<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| SyncError::Config("MODRINTH_API_KEY must be set".into()))
    }

    /// Create the game directory and every category directory.
    pub fn ensure_directories(&self) -> SyncResult<()> {
        let dirs = std::iter::once(self.minecraft_dir.clone()).chain(
            Category::ALL
                .iter()
                .map(|c| self.minecraft_dir.join(c.dir_name())),
        );
        for dir in dirs {
            if !dir.exists() {
                info!("Creating missing directory {:?}", dir);
            }
            std::fs::create_dir_all(&dir).map_err(|e| SyncError::io(&dir, e))?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn for_tests(minecraft_dir: PathBuf) -> Self {
        Self::from_sources(
            SettingsFile {
                minecraft_dir: Some(minecraft_dir),
                minecraft_version: Some("1.20.1".into()),
                api_key: Some("test-key".into()),
                user_agent: Some("modsync-tests".into()),
                ..Default::default()
            },
            |_| None,
        )
        .expect("test config is valid")
    }
}

/// Variables from a `.env` file, or nothing when the file is absent.
/// The process environment is left untouched.
fn load_dotenv(path: &Path) -> SyncResult<HashMap<String, String>> {
    if !path.is_file() {
        return Ok(HashMap::new());
    }
    let vars = dotenvy::from_path_iter(path)
        .and_then(|iter| iter.collect::<Result<HashMap<_, _>, _>>())
        .map_err(|e| SyncError::Config(format!("invalid env file {:?}: {}", path, e)))?;
    info!(count = vars.len(), "Loaded variables from {:?}", path);
    Ok(vars)
}

/// Process environment first, `.env` values second. Blank values fall
/// through to the next layer.
fn layered(
    env: impl Fn(&str) -> Option<String>,
    dotenv: HashMap<String, String>,
) -> impl Fn(&str) -> Option<String> {
    move |key| {
        env(key)
            .filter(|v| !v.trim().is_empty())
            .or_else(|| dotenv.get(key).cloned())
    }
}

fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(SETTINGS_FILE))
}

/// Accepts the usual spellings: `1/t/true/0/f/false`, any case.
fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" => Some(true),
        "0" | "f" | "false" => Some(false),
        _ => None,
    }
}

fn parse_concurrency(raw: &str) -> SyncResult<ConcurrencyLimit> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("unbounded") {
        return Ok(ConcurrencyLimit::Unbounded);
    }
    let n: usize = raw
        .parse()
        .map_err(|_| SyncError::Config(format!("invalid MODSYNC_CONCURRENCY '{}'", raw)))?;
    Ok(NonZeroUsize::new(n)
        .map(ConcurrencyLimit::Limited)
        .unwrap_or(ConcurrencyLimit::Unbounded))
}

fn parse_secs(key: &str, raw: &str) -> SyncResult<u64> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(SyncError::Config(format!("invalid {} '{}'", key, raw))),
    }
}
