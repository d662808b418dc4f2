//! Filesystem layout derived from the invocation root and machine identity.

use std::path::PathBuf;

/// Every location the tool touches for one machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathConfig {
    pub root: PathBuf,
    pub config_dir: PathBuf,
    pub machine_configs_dir: PathBuf,
    /// `config/machines/<machine>.json`
    pub machine_config_file: PathBuf,
    pub logs_dir: PathBuf,
    pub backups_dir: PathBuf,
    /// `backups/<machine>`
    pub machine_backups_dir: PathBuf,
    pub filters_file: PathBuf,
}

impl PathConfig {
    /// Derive the layout. Pure path arithmetic, no I/O.
    pub fn resolve(root: impl Into<PathBuf>, machine_name: &str) -> Self {
        let root = root.into();
        let config_dir = root.join("config");
        let machine_configs_dir = config_dir.join("machines");
        let backups_dir = root.join("backups");

        Self {
            machine_config_file: machine_configs_dir.join(format!("{}.json", machine_name)),
            machine_backups_dir: backups_dir.join(machine_name),
            filters_file: config_dir.join("filters.txt"),
            logs_dir: root.join("logs"),
            machine_configs_dir,
            backups_dir,
            config_dir,
            root,
        }
    }

    /// `config/settings.toml`
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.toml")
    }

    /// `backups/<machine>/<source>`
    pub fn destination_for(&self, source_name: &str) -> PathBuf {
        self.machine_backups_dir.join(source_name)
    }
}
