use crate::error::{InfraError, Result};
use crate::settings::Settings;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Compose file names looked up in each service directory, in priority order.
pub const COMPOSE_FILE_NAMES: &[&str] = &[
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yml",
    "compose.yaml",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceDir {
    pub name: String,
    pub dir: PathBuf,
    pub compose_file: PathBuf,
}

pub fn find_compose_file(dir: &Path) -> Option<PathBuf> {
    COMPOSE_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Lists the service directories under the configured services path, sorted by name.
pub fn discover_services(settings: &Settings) -> Result<Vec<ServiceDir>> {
    let root = settings.services_root()?;
    discover_in(&root, settings)
}

pub fn discover_in(root: &Path, settings: &Settings) -> Result<Vec<ServiceDir>> {
    if !root.exists() {
        return Err(InfraError::ServicesDirNotFound(root.to_path_buf()));
    }

    let read_error = |source| InfraError::ServicesDirRead {
        path: root.to_path_buf(),
        source,
    };

    let mut services = Vec::new();
    for entry in std::fs::read_dir(root).map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        let dir = entry.path();
        if !dir.is_dir() {
            continue;
        }

        let Ok(name) = entry.file_name().into_string() else {
            warn!(dir = %dir.display(), "skipping directory with a non UTF-8 name");
            continue;
        };

        if settings.is_excluded(&name) {
            debug!(%name, "excluded");
            continue;
        }

        match find_compose_file(&dir) {
            Some(compose_file) => services.push(ServiceDir {
                name,
                dir,
                compose_file,
            }),
            None => debug!(%name, "no compose file"),
        }
    }

    services.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(services)
}

pub fn service_names(services: &[ServiceDir]) -> Vec<&str> {
    services.iter().map(|s| s.name.as_str()).collect()
}
