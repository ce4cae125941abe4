// ─── Target Platform ───
// Add-on categories, side support levels and the installation a sync run
// targets (game version + loader + side).

use serde::{Deserialize, Serialize};

/// Installable add-on categories. Closed set; each has its own directory.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Mod,
    Shader,
    ResourcePack,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Mod, Category::Shader, Category::ResourcePack];

    /// Map a registry `project_type` onto a category.
    ///
    /// Anything outside the three known categories (modpacks, plugins,
    /// datapacks…) yields `None` and is never installed.
    pub fn from_project_type(project_type: &str) -> Option<Self> {
        match project_type {
            "mod" => Some(Category::Mod),
            "shader" => Some(Category::Shader),
            "resourcepack" => Some(Category::ResourcePack),
            _ => None,
        }
    }

    /// Subdirectory of the game directory holding this category's files.
    pub fn dir_name(self) -> &'static str {
        match self {
            Category::Mod => "mods",
            Category::Shader => "shaderpacks",
            Category::ResourcePack => "resourcepacks",
        }
    }

    /// The registry filters versions by loader only for mods; packs are
    /// loader-agnostic and filtered by game version alone.
    pub fn filters_by_loader(self) -> bool {
        matches!(self, Category::Mod)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Mod => write!(f, "mod"),
            Category::Shader => write!(f, "shader"),
            Category::ResourcePack => write!(f, "resourcepack"),
        }
    }
}

/// How a project declares support for one side (client or server).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SideSupport {
    Required,
    Optional,
    Unsupported,
    #[default]
    #[serde(other)]
    Unknown,
}

impl SideSupport {
    pub fn is_installable(self) -> bool {
        matches!(self, SideSupport::Required | SideSupport::Optional)
    }
}

/// Which side of the game this installation serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallationType {
    Client,
    Server,
    /// Accept anything installable on either side.
    Both,
    /// A value we do not recognize. Treated as "allow everything".
    Unrecognized(String),
}

impl InstallationType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "client" => InstallationType::Client,
            "server" => InstallationType::Server,
            "both" => InstallationType::Both,
            _ => InstallationType::Unrecognized(raw.to_string()),
        }
    }

    /// Compatibility rule between a project's declared sides and this
    /// installation.
    ///
    /// Unrecognized installation types fail open: every project passes.
    pub fn accepts(&self, client_side: SideSupport, server_side: SideSupport) -> bool {
        match self {
            InstallationType::Client => client_side.is_installable(),
            InstallationType::Server => server_side.is_installable(),
            InstallationType::Both | InstallationType::Unrecognized(_) => true,
        }
    }
}

impl std::fmt::Display for InstallationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstallationType::Client => write!(f, "client"),
            InstallationType::Server => write!(f, "server"),
            InstallationType::Both => write!(f, "both"),
            InstallationType::Unrecognized(raw) => write!(f, "{}", raw),
        }
    }
}

/// The installation every sync run resolves versions against.
#[derive(Debug, Clone)]
pub struct TargetPlatform {
    pub game_version: String,
    pub loader: String,
    pub installation: InstallationType,
}
