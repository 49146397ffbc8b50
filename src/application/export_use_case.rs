// ============================================================
// Layer 2 — ExportUseCase
// ============================================================
// Writes freshly initialised checkpoints at the conventional
// paths, so a model can later be built with `pretrained = true`
// and every file is found:
//
//   tree        → one ckpt-CIFAR10Node-{backbone}-{wnid} per node
//   joint-nodes → ckpt-CIFAR10JointNodes-CIFAR10JointNodes
//
// Cifar10JointTree has no file of its own; it reads the
// joint-nodes checkpoint.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use burn::prelude::*;

use crate::application::config::{ModelConfig, ModelKind};
use crate::infra::checkpoint::{save_checkpoint, CheckpointMeta};

pub struct ExportUseCase {
    config: ModelConfig,
    model:  ModelKind,
}

impl ExportUseCase {
    pub fn new(config: ModelConfig, model: ModelKind) -> Self {
        Self { config, model }
    }

    /// Returns the written paths in node order.
    pub fn execute<B: Backend>(&self, device: &B::Device) -> Result<Vec<PathBuf>> {
        let written = match self.model {
            ModelKind::Tree => {
                let cfg = &self.config.tree;
                let nodes = cfg.hierarchy.load()?;
                let name = cfg.backbone.name();

                let mut written = Vec::with_capacity(nodes.len());
                for node in &nodes {
                    let net = cfg.backbone.init::<B>(node.num_classes(), device);
                    let path = cfg.checkpoints.node(&name, &node.wnid);
                    save_checkpoint(&net, &path, CheckpointMeta::default())
                        .with_context(|| format!("Cannot export node '{}'", node.wnid))?;
                    written.push(path);
                }
                written
            }
            ModelKind::JointNodes => {
                let model = self
                    .config
                    .joint_nodes
                    .init::<B>(device)
                    .context("Cannot build Cifar10JointNodes")?;
                // written where Cifar10JointTree looks for it
                let path = self.config.joint_tree.checkpoints.joint_nodes();
                save_checkpoint(&model, &path, CheckpointMeta::default()).context("Cannot export Cifar10JointNodes")?;
                vec![path]
            }
            ModelKind::JointTree => {
                bail!("Cifar10JointTree has no checkpoint of its own; export joint-nodes instead")
            }
        };

        tracing::info!("Exported {} checkpoint(s) for {}", written.len(), self.model);
        Ok(written)
    }
}
