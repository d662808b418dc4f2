//! Invocation modes that bypass the sync pipeline: `--init` and `--list-only`.
//! `--check-tools` needs nothing beyond [`crate::sync::SyncEngine::probe`].

use crate::config::{BackupSource, MachineConfig};
use crate::executor::load_machine_config;
use crate::paths::PathConfig;
use crate::utils::{ConfigError, FatalError};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    Created(PathBuf),
    AlreadyExists(PathBuf),
}

/// Write a template configuration for `machine_name`. An existing file is
/// never touched.
pub fn init_config(paths: &PathConfig, machine_name: &str) -> Result<InitOutcome, ConfigError> {
    let path = paths.machine_config_file.clone();
    std::fs::create_dir_all(&paths.machine_configs_dir)?;

    let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Ok(InitOutcome::AlreadyExists(path));
        }
        Err(e) => return Err(e.into()),
    };

    let template = MachineConfig::template(machine_name);
    let mut content = serde_json::to_string_pretty(&template)?;
    content.push('\n');
    file.write_all(content.as_bytes())?;

    info!("Created configuration template at {}", path.display());
    Ok(InitOutcome::Created(path))
}

/// A configured source with its derived destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceListing {
    pub source: BackupSource,
    pub destination: PathBuf,
    pub source_exists: bool,
}

/// Every configured source, enabled or not, in configuration order.
pub fn list_sources(paths: &PathConfig) -> Result<Vec<SourceListing>, FatalError> {
    let config = load_machine_config(paths)?;

    Ok(config
        .sources
        .into_iter()
        .map(|source| SourceListing {
            destination: paths.destination_for(&source.name),
            source_exists: std::path::Path::new(&source.path).exists(),
            source,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_template() {
        let temp = TempDir::new().unwrap();
        let paths = PathConfig::resolve(temp.path(), "H1");

        let outcome = init_config(&paths, "H1").unwrap();
        assert_eq!(outcome, InitOutcome::Created(paths.machine_config_file.clone()));

        let config = MachineConfig::load(&paths.machine_config_file).unwrap();
        assert_eq!(config.machine_name, "H1");
        assert_eq!(config.sources.len(), 1);
        assert!(!config.sources[0].enabled);
    }

    #[test]
    fn test_init_never_overwrites() {
        let temp = TempDir::new().unwrap();
        let paths = PathConfig::resolve(temp.path(), "H1");
        std::fs::create_dir_all(&paths.machine_configs_dir).unwrap();
        std::fs::write(&paths.machine_config_file, "custom").unwrap();

        let outcome = init_config(&paths, "H1").unwrap();
        assert_eq!(outcome, InitOutcome::AlreadyExists(paths.machine_config_file.clone()));
        assert_eq!(
            std::fs::read_to_string(&paths.machine_config_file).unwrap(),
            "custom"
        );
    }

    #[test]
    fn test_list_sources() {
        let temp = TempDir::new().unwrap();
        let paths = PathConfig::resolve(temp.path(), "H1");
        std::fs::create_dir_all(&paths.machine_configs_dir).unwrap();

        let present = temp.path().join("present");
        let gone = temp.path().join("gone");
        std::fs::create_dir_all(&present).unwrap();
        let config = json!({
            "machine_name": "H1",
            "sources": [
                { "name": "a", "path": present.display().to_string(), "enabled": true },
                { "name": "b", "path": gone.display().to_string(), "enabled": false },
            ]
        });
        std::fs::write(&paths.machine_config_file, config.to_string()).unwrap();

        let listing = list_sources(&paths).unwrap();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].destination, paths.destination_for("a"));
        assert!(listing[0].source_exists);
        assert!(!listing[1].source_exists);
        assert!(!listing[1].source.enabled);
    }

    #[test]
    fn test_list_sources_without_config() {
        let temp = TempDir::new().unwrap();
        let paths = PathConfig::resolve(temp.path(), "H1");
        assert!(matches!(
            list_sources(&paths),
            Err(FatalError::ConfigNotFound(_))
        ));
    }
}
