use crate::error::{InfraError, Result};
use dirs::{config_local_dir, home_dir};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_DIR_NAME: &str = "infracli";
pub const CONFIG_FILE_NAME: &str = "infracli.json";

const DEFAULT_SERVICES_PATH: [&str; 3] = ["Development", "infrastructure", "services"];
const DEFAULT_EXCLUDED_DIRS: [&str; 3] = ["config", "scripts", "cmd"];

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Directory holding one subdirectory per service. A leading `~/` is
    /// expanded when the path is resolved.
    #[serde(rename = "servicesPath", alias = "servicesRootPath")]
    pub services_path: String,

    /// Subdirectory names that are never treated as services.
    #[serde(rename = "excludedDirs", alias = "excludedDirectoryNames", default)]
    pub excluded_dirs: BTreeSet<String>,
}

impl Settings {
    pub fn with_home(home: &Path) -> Self {
        let services_path = DEFAULT_SERVICES_PATH
            .iter()
            .fold(home.to_path_buf(), |path, part| path.join(part));

        Settings {
            services_path: services_path.display().to_string(),
            excluded_dirs: DEFAULT_EXCLUDED_DIRS.iter().map(|d| d.to_string()).collect(),
        }
    }

    pub fn for_current_user() -> Result<Self> {
        let home = home_dir().ok_or(InfraError::HomeDirUnavailable)?;
        Ok(Settings::with_home(&home))
    }

    pub fn is_excluded(&self, dir_name: &str) -> bool {
        self.excluded_dirs.contains(dir_name)
    }

    pub fn services_root(&self) -> Result<PathBuf> {
        expand_home(&self.services_path, home_dir)
    }
}

/// Expands a leading `~/` (or a lone `~`). The home lookup only runs when
/// the path actually needs it.
pub fn expand_home(path: &str, home: impl FnOnce() -> Option<PathBuf>) -> Result<PathBuf> {
    let rest = match path.strip_prefix("~/") {
        Some(rest) => rest,
        None if path == "~" => "",
        None => return Ok(PathBuf::from(path)),
    };

    let home = home().ok_or(InfraError::HomeDirUnavailable)?;
    Ok(home.join(rest))
}

/// Reads and writes the settings file.
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        SettingsStore { path: path.into() }
    }

    /// `<config dir>/infracli/infracli.json`, i.e. `~/.config/infracli/infracli.json` on Linux.
    pub fn default_location() -> Result<Self> {
        let config_dir = config_local_dir().ok_or(InfraError::HomeDirUnavailable)?;
        Ok(SettingsStore::at(config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the settings, writing `defaults()` first when the file does not exist yet.
    pub fn load_or_init(&self, defaults: impl FnOnce() -> Result<Settings>) -> Result<Settings> {
        if !self.path.exists() {
            let settings = defaults()?;
            self.save(&settings)?;
            println!("Created default configuration at: {}", self.path.display());
            return Ok(settings);
        }

        debug!(path = %self.path.display(), "reading settings");
        let raw = std::fs::read_to_string(&self.path).map_err(|source| InfraError::ConfigRead {
            path: self.path.clone(),
            source,
        })?;

        serde_json::from_str(&raw).map_err(|source| InfraError::ConfigParse {
            path: self.path.clone(),
            source,
        })
    }

    pub fn load(&self) -> Result<Settings> {
        self.load_or_init(Settings::for_current_user)
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| InfraError::ConfigWrite {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let json = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, json).map_err(|source| InfraError::ConfigWrite {
            path: self.path.clone(),
            source,
        })?;

        debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}
