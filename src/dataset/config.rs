//! The `data.yaml` document the training framework reads.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::registry::ClassRegistry;
use super::Split;
use crate::error::EndoYoloError;

pub const CONFIG_FILE_NAME: &str = "data.yaml";

/// Dataset description consumed by the trainer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DatasetConfig {
    /// Absolute dataset root.
    pub path: String,
    pub train: String,
    pub val: String,
    pub nc: usize,
    pub names: BTreeMap<u64, String>,
}

impl DatasetConfig {
    /// Builds the config for a dataset rooted at `root` from the final registry.
    pub fn from_registry(root: &Path, registry: &ClassRegistry) -> Result<Self, EndoYoloError> {
        let root = std::path::absolute(root).map_err(EndoYoloError::Io)?;
        Ok(Self {
            path: root.to_string_lossy().into_owned(),
            train: Split::Train.images_subdir().to_string(),
            val: Split::Val.images_subdir().to_string(),
            nc: registry.len(),
            names: registry.id_to_name(),
        })
    }

    pub fn to_yaml(&self, path: &Path) -> Result<String, EndoYoloError> {
        serde_yaml::to_string(self).map_err(|source| EndoYoloError::DataConfigWrite {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn write(&self, path: &Path) -> Result<(), EndoYoloError> {
        let yaml = self.to_yaml(path)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| EndoYoloError::OutputWrite {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, yaml).map_err(|source| EndoYoloError::OutputWrite {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Writes `<output_root>/data.yaml` for the given registry.
///
/// Re-running with the same registry and root rewrites identical bytes.
pub fn emit_config(
    registry: &ClassRegistry,
    output_root: &Path,
) -> Result<DatasetConfig, EndoYoloError> {
    let config = DatasetConfig::from_registry(output_root, registry)?;
    config.write(&output_root.join(CONFIG_FILE_NAME))?;
    Ok(config)
}

/// A `data.yaml` as read back by the setup checker.
///
/// Files written by hand or by other tools may list `names` as a sequence
/// and may omit `nc`, so reading is looser than writing.
#[derive(Clone, Debug, Deserialize)]
pub struct LoadedConfig {
    pub path: PathBuf,
    pub train: String,
    pub val: String,
    #[serde(default)]
    pub nc: Option<usize>,
    pub names: ConfigNames,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum ConfigNames {
    Sequence(Vec<String>),
    Mapping(BTreeMap<u64, String>),
}

impl ConfigNames {
    pub fn len(&self) -> usize {
        match self {
            ConfigNames::Sequence(names) => names.len(),
            ConfigNames::Mapping(mapping) => mapping.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names in id order.
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            ConfigNames::Sequence(names) => names.clone(),
            ConfigNames::Mapping(mapping) => mapping.values().cloned().collect(),
        }
    }
}

impl LoadedConfig {
    /// Class count, preferring the explicit `nc` key.
    pub fn class_count(&self) -> usize {
        self.nc.unwrap_or_else(|| self.names.len())
    }
}

pub fn read_config(path: &Path) -> Result<LoadedConfig, EndoYoloError> {
    if !path.is_file() {
        return Err(EndoYoloError::DataConfigNotFound {
            path: path.to_path_buf(),
        });
    }

    let data = fs::read_to_string(path).map_err(EndoYoloError::Io)?;
    serde_yaml::from_str(&data).map_err(|source| EndoYoloError::DataConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_of(names: &[&str]) -> ClassRegistry {
        let mut registry = ClassRegistry::new();
        for name in names {
            registry.resolve(name);
        }
        registry
    }

    #[test]
    fn config_lists_first_seen_classes() {
        let registry = registry_of(&["polyp", "normal", "polyp"]);
        let config = DatasetConfig::from_registry(Path::new("/data/out"), &registry)
            .expect("build config");

        assert_eq!(config.path, "/data/out");
        assert_eq!(config.train, "images/train");
        assert_eq!(config.val, "images/val");
        assert_eq!(config.nc, 2);
        assert_eq!(config.names[&0], "polyp");
        assert_eq!(config.names[&1], "normal");
    }

    #[test]
    fn yaml_uses_integer_keyed_names() {
        let registry = registry_of(&["polyp"]);
        let config = DatasetConfig::from_registry(Path::new("/data/out"), &registry)
            .expect("build config");
        let yaml = config.to_yaml(Path::new("data.yaml")).expect("serialize");

        assert_eq!(
            yaml,
            "path: /data/out\ntrain: images/train\nval: images/val\nnc: 1\nnames:\n  0: polyp\n"
        );
    }

    #[test]
    fn emit_config_is_idempotent() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let registry = registry_of(&["polyp", "normal"]);

        emit_config(&registry, temp.path()).expect("first emit");
        let first = fs::read(temp.path().join(CONFIG_FILE_NAME)).expect("read first");
        emit_config(&registry, temp.path()).expect("second emit");
        let second = fs::read(temp.path().join(CONFIG_FILE_NAME)).expect("read second");

        assert_eq!(first, second);
    }

    #[test]
    fn read_config_accepts_emitted_document() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let registry = registry_of(&["polyp", "normal"]);
        emit_config(&registry, temp.path()).expect("emit");

        let loaded = read_config(&temp.path().join(CONFIG_FILE_NAME)).expect("read back");
        assert_eq!(loaded.class_count(), 2);
        assert_eq!(loaded.names.to_vec(), vec!["polyp", "normal"]);
        assert_eq!(loaded.train, "images/train");
    }

    #[test]
    fn read_config_accepts_sequence_names_without_nc() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("custom.yaml");
        fs::write(
            &path,
            "path: ../datasets/polyps\ntrain: images/train\nval: images/val\nnames:\n  - polyp\n",
        )
        .expect("write yaml");

        let loaded = read_config(&path).expect("read config");
        assert_eq!(loaded.class_count(), 1);
        assert_eq!(loaded.path, PathBuf::from("../datasets/polyps"));
    }

    #[test]
    fn read_config_reports_missing_file() {
        let err = read_config(Path::new("definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, EndoYoloError::DataConfigNotFound { .. }));
    }
}
