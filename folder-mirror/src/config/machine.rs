//! Per-machine source list.
//!
//! The file is parsed into an untyped [`serde_json::Value`] first and then
//! validated field by field, so every rejection can name the offending field
//! and source index instead of surfacing a generic deserializer message.

use crate::utils::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

/// A named folder to mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupSource {
    pub name: String,
    pub path: String,
    pub enabled: bool,
}

/// The validated configuration of one machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineConfig {
    pub machine_name: String,
    pub sources: Vec<BackupSource>,
}

impl MachineConfig {
    /// Read, parse and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)?;
        Self::from_value(&value)
    }

    /// Validate parsed JSON into a configuration.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let root = value.as_object().ok_or(ConfigError::Malformed)?;

        let machine_name = root
            .get("machine_name")
            .and_then(Value::as_str)
            .ok_or(ConfigError::MissingField("machine_name"))?;

        let entries = root
            .get("sources")
            .and_then(Value::as_array)
            .ok_or(ConfigError::MissingField("sources"))?;

        let mut sources = Vec::with_capacity(entries.len());
        let mut seen: HashMap<String, usize> = HashMap::with_capacity(entries.len());

        for (index, entry) in entries.iter().enumerate() {
            let source = parse_source(index, entry)?;
            if seen.insert(source.name.clone(), index).is_some() {
                return Err(ConfigError::DuplicateSource {
                    index,
                    name: source.name,
                });
            }
            sources.push(source);
        }

        Ok(Self {
            machine_name: machine_name.to_string(),
            sources,
        })
    }

    /// Template written by `--init`: one disabled example source.
    pub fn template(machine_name: &str) -> Self {
        Self {
            machine_name: machine_name.to_string(),
            sources: vec![BackupSource {
                name: "documents".to_string(),
                path: "/path/to/documents".to_string(),
                enabled: false,
            }],
        }
    }

    /// Enabled sources, in configuration order.
    pub fn enabled_sources(&self) -> impl Iterator<Item = &BackupSource> {
        self.sources.iter().filter(|s| s.enabled)
    }
}

fn parse_source(index: usize, entry: &Value) -> Result<BackupSource, ConfigError> {
    let invalid = |field| ConfigError::InvalidSource { index, field };
    let fields = entry.as_object().ok_or_else(|| invalid("name"))?;

    let name = trimmed_string(fields, "name").ok_or_else(|| invalid("name"))?;
    if !is_single_component(name) {
        return Err(invalid("name"));
    }

    let path = trimmed_string(fields, "path").ok_or_else(|| invalid("path"))?;

    let enabled = fields
        .get("enabled")
        .and_then(Value::as_bool)
        .ok_or_else(|| invalid("enabled"))?;

    Ok(BackupSource {
        name: name.to_string(),
        path: path.to_string(),
        enabled,
    })
}

fn trimmed_string<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// The name becomes a directory under the machine's backup folder.
fn is_single_component(name: &str) -> bool {
    name != "." && name != ".." && !name.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn source(name: Value, path: Value, enabled: Value) -> Value {
        json!({ "name": name, "path": path, "enabled": enabled })
    }

    fn config_with(sources: Value) -> Value {
        json!({ "machine_name": "H1", "sources": sources })
    }

    #[test]
    fn test_valid_config() {
        let value = config_with(json!([
            { "name": "docs", "path": "/home/u/docs", "enabled": true },
            { "name": "pics", "path": "/home/u/pics", "enabled": false },
        ]));

        let config = MachineConfig::from_value(&value).unwrap();
        assert_eq!(config.machine_name, "H1");
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[1].name, "pics");
        assert!(!config.sources[1].enabled);
    }

    #[test]
    fn test_empty_sources_is_valid() {
        let config = MachineConfig::from_value(&config_with(json!([]))).unwrap();
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_root_must_be_object() {
        for value in [json!([]), json!("H1"), json!(null), json!(3)] {
            assert!(matches!(
                MachineConfig::from_value(&value),
                Err(ConfigError::Malformed)
            ));
        }
    }

    #[test]
    fn test_machine_name_required() {
        let missing = json!({ "sources": [] });
        let wrong_type = json!({ "machine_name": 5, "sources": [] });
        for value in [missing, wrong_type] {
            assert!(matches!(
                MachineConfig::from_value(&value),
                Err(ConfigError::MissingField("machine_name"))
            ));
        }
    }

    #[test]
    fn test_sources_must_be_array() {
        let missing = json!({ "machine_name": "H1" });
        let wrong_type = json!({ "machine_name": "H1", "sources": {} });
        for value in [missing, wrong_type] {
            assert!(matches!(
                MachineConfig::from_value(&value),
                Err(ConfigError::MissingField("sources"))
            ));
        }
    }

    #[test]
    fn test_invalid_source_fields() {
        let cases = [
            (source(json!("   "), json!("/a"), json!(true)), "name"),
            (source(json!(1), json!("/a"), json!(true)), "name"),
            (json!({ "path": "/a", "enabled": true }), "name"),
            (json!("docs"), "name"),
            (source(json!("a"), json!(""), json!(true)), "path"),
            (source(json!("a"), json!(null), json!(true)), "path"),
            (source(json!("a"), json!("/a"), json!("yes")), "enabled"),
            (json!({ "name": "a", "path": "/a" }), "enabled"),
        ];

        for (entry, expected) in cases {
            let value = config_with(json!([
                { "name": "ok", "path": "/ok", "enabled": true },
                entry,
            ]));
            match MachineConfig::from_value(&value) {
                Err(ConfigError::InvalidSource { index, field }) => {
                    assert_eq!(index, 1);
                    assert_eq!(field, expected);
                }
                other => panic!("expected InvalidSource for {}, got {:?}", expected, other),
            }
        }
    }

    #[test]
    fn test_name_must_be_single_component() {
        for name in ["..", ".", "a/b", "a\\b"] {
            let value = config_with(json!([source(json!(name), json!("/a"), json!(true))]));
            assert!(matches!(
                MachineConfig::from_value(&value),
                Err(ConfigError::InvalidSource { index: 0, field: "name" })
            ));
        }
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let value = config_with(json!([
            { "name": "docs", "path": "/a", "enabled": true },
            { "name": "other", "path": "/b", "enabled": true },
            { "name": " docs ", "path": "/c", "enabled": false },
        ]));
        match MachineConfig::from_value(&value) {
            Err(ConfigError::DuplicateSource { index, name }) => {
                assert_eq!(index, 2);
                assert_eq!(name, "docs");
            }
            other => panic!("expected DuplicateSource, got {:?}", other),
        }
    }

    #[test]
    fn test_trimming_is_idempotent() {
        let clean = config_with(json!([
            { "name": "docs", "path": "/home/u/docs", "enabled": true }
        ]));
        let padded = config_with(json!([
            { "name": "\t docs ", "path": " /home/u/docs\n", "enabled": true }
        ]));

        let a = MachineConfig::from_value(&clean).unwrap();
        let b = MachineConfig::from_value(&padded).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_input_is_not_mutated() {
        let padded = config_with(json!([{ "name": " docs ", "path": " /x ", "enabled": true }]));
        let before = padded.clone();
        MachineConfig::from_value(&padded).unwrap();
        assert_eq!(padded, before);
    }

    #[test]
    fn test_enabled_sources_keeps_order() {
        let value = config_with(json!([
            { "name": "a", "path": "/a", "enabled": true },
            { "name": "b", "path": "/b", "enabled": false },
            { "name": "c", "path": "/c", "enabled": true },
        ]));
        let config = MachineConfig::from_value(&value).unwrap();
        let names: Vec<_> = config.enabled_sources().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("H1.json");

        assert!(matches!(MachineConfig::load(&path), Err(ConfigError::Io(_))));

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(MachineConfig::load(&path), Err(ConfigError::Parse(_))));

        let template = MachineConfig::template("H1");
        std::fs::write(&path, serde_json::to_string_pretty(&template).unwrap()).unwrap();
        let loaded = MachineConfig::load(&path).unwrap();
        assert_eq!(loaded, template);
        assert_eq!(loaded.enabled_sources().count(), 0);
    }
}
