// ============================================================
// Layer 2 — Model Configuration
// ============================================================
// One JSON document holding the constructor parameters of every
// model the CLI can build. Every field is optional in the file;
// anything left out takes the default below.
//
//   {
//     "image_shape": [3, 32, 32],
//     "tree":       { "backbone": { "kind": "resnet", "blocks": [1,1,1,1] },
//                     "one_hot_feature": true },
//     "joint_tree": { "pretrained": false }
//   }
//
// Reference: serde_json documentation

use std::{fmt, fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::ml::joint::{Cifar10JointNodesConfig, Cifar10JointTreeConfig};
use crate::ml::tree::Cifar10TreeConfig;

/// Which of the three models a command operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Tree,
    JointNodes,
    JointTree,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Tree       => "Cifar10Tree",
            Self::JointNodes => "Cifar10JointNodes",
            Self::JointTree  => "Cifar10JointTree",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// [channels, height, width] of the images fed to every model
    pub image_shape: [usize; 3],
    pub tree:        Cifar10TreeConfig,
    pub joint_nodes: Cifar10JointNodesConfig,
    pub joint_tree:  Cifar10JointTreeConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            image_shape: [3, 32, 32],
            tree:        Cifar10TreeConfig::default(),
            joint_nodes: Cifar10JointNodesConfig::default(),
            joint_tree:  Cifar10JointTreeConfig::default(),
        }
    }
}

impl ModelConfig {
    /// Read a JSON config, or fall back to defaults when `path` is None.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None       => Ok(Self::default()),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read model config '{}'", path.display()))?;
        let config = serde_json::from_str(&json)
            .with_context(|| format!("Invalid model config '{}'", path.display()))?;
        tracing::debug!("Loaded model config from '{}'", path.display());
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Cannot write model config '{}'", path.display()))?;
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::backbone::BackboneConfig;

    #[test]
    fn test_defaults_match_constructors() {
        let config = ModelConfig::default();
        assert_eq!(config.image_shape, [3, 32, 32]);
        assert!(config.tree.pretrained);
        assert!(!config.tree.one_hot_feature);
        assert_eq!(config.tree.num_classes, 10);
        assert!(config.joint_tree.pretrained);
        assert_eq!(config.tree.backbone.name(), "ResNet10");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::write(
            &path,
            r#"{
                "tree": { "one_hot_feature": true,
                          "backbone": { "kind": "linear_probe", "input_features": 3072 } },
                "joint_tree": { "pretrained": false }
            }"#,
        )
        .unwrap();

        let config = ModelConfig::load(&path).unwrap();
        assert!(config.tree.one_hot_feature);
        assert!(config.tree.pretrained);
        assert!(matches!(config.tree.backbone, BackboneConfig::LinearProbe(_)));
        assert!(!config.joint_tree.pretrained);
        assert_eq!(config.joint_tree.num_classes, 10);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let mut config = ModelConfig::default();
        config.image_shape = [1, 28, 28];
        config.save(&path).unwrap();

        let loaded = ModelConfig::load(&path).unwrap();
        assert_eq!(loaded.image_shape, [1, 28, 28]);
        assert_eq!(loaded.tree.checkpoints, config.tree.checkpoints);
    }

    #[test]
    fn test_bad_json_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let err = ModelConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_model_kind_display() {
        assert_eq!(ModelKind::JointNodes.to_string(), "Cifar10JointNodes");
    }
}
