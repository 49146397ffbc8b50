// ============================================================
// Layer 2 — SummaryUseCase
// ============================================================
// Builds one model from a ModelConfig and pushes a zero batch
// through it:
//
//   Step 1: Build the model (hierarchy, backbones, checkpoints)
//   Step 2: Log every checkpoint outcome
//   Step 3: Forward a [batch, c, h, w] zero tensor
//   Step 4: Record the output shape(s)
//
// The use case is generic over the backend; the CLI runs it on
// Wgpu, tests on NdArray.

use anyhow::{Context, Result};
use burn::prelude::*;
use serde::Serialize;

use crate::application::config::{ModelConfig, ModelKind};
use crate::infra::checkpoint::{CheckpointReport, LoadOutcome};

/// What a built model looks like from the outside.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub model:         ModelKind,
    pub nodes:         usize,
    pub feature_dim:   usize,
    pub checkpoints:   CheckpointReport,
    /// One shape per output tensor ([batch, width])
    pub output_shapes: Vec<[usize; 2]>,
}

pub struct SummaryUseCase {
    config:     ModelConfig,
    model:      ModelKind,
    batch_size: usize,
}

impl SummaryUseCase {
    pub fn new(config: ModelConfig, model: ModelKind, batch_size: usize) -> Self {
        Self { config, model, batch_size }
    }

    pub fn execute<B: Backend>(&self, device: &B::Device) -> Result<ModelSummary> {
        let [channels, height, width] = self.config.image_shape;
        let images = Tensor::<B, 4>::zeros([self.batch_size, channels, height, width], device);

        // ── Step 1: Build ────────────────────────────────────────────────────
        tracing::info!("Building {}", self.model);
        let summary = match self.model {
            ModelKind::Tree => {
                let (model, report) = self
                    .config
                    .tree
                    .init_with_report::<B>(device)
                    .context("Cannot build Cifar10Tree")?;
                let features = model.features(images.clone()).dims()[1];
                ModelSummary {
                    model:         self.model,
                    nodes:         model.nodes().len(),
                    feature_dim:   features,
                    checkpoints:   report,
                    output_shapes: vec![model.forward(images).dims()],
                }
            }
            ModelKind::JointNodes => {
                let model = self
                    .config
                    .joint_nodes
                    .init::<B>(device)
                    .context("Cannot build Cifar10JointNodes")?;
                let outputs = model.forward(images)?;
                let shapes: Vec<[usize; 2]> = outputs.iter().map(|output| output.dims()).collect();
                ModelSummary {
                    model:         self.model,
                    nodes:         model.nodes().len(),
                    feature_dim:   shapes.iter().map(|shape| shape[1]).sum(),
                    checkpoints:   CheckpointReport::default(),
                    output_shapes: shapes,
                }
            }
            ModelKind::JointTree => {
                let (model, report) = self
                    .config
                    .joint_tree
                    .init_with_report::<B>(device)
                    .context("Cannot build Cifar10JointTree")?;
                let features = model.features(images.clone())?.dims()[1];
                ModelSummary {
                    model:         self.model,
                    nodes:         model.joint.nodes().len(),
                    feature_dim:   features,
                    checkpoints:   report,
                    output_shapes: vec![model.forward(images)?.dims()],
                }
            }
        };

        // ── Step 2: Checkpoint outcomes ──────────────────────────────────────
        for (path, outcome) in &summary.checkpoints.entries {
            match outcome {
                LoadOutcome::Loaded         => tracing::info!("Loaded   {}", path.display()),
                LoadOutcome::SkippedMissing => tracing::warn!("Skipped  {} (not found)", path.display()),
            }
        }
        tracing::info!(
            "{}: {} nodes, {} features, outputs {:?}",
            summary.model,
            summary.nodes,
            summary.feature_dim,
            summary.output_shapes
        );

        Ok(summary)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::{fs, path::Path};

    use burn::backend::NdArray;

    use crate::data::hierarchy::HierarchyPaths;
    use crate::infra::checkpoint::CheckpointPaths;
    use crate::ml::backbone::{BackboneConfig, LinearProbeConfig};
    use crate::ml::resnet::ResNetConfig;

    type TestBackend = NdArray;

    const TREE: &str = r#"
        <tree>
          <synset wnid="root">
            <synset wnid="vehicle">
              <synset wnid="airplane"/>
              <synset wnid="ship"/>
              <synset wnid="truck"/>
            </synset>
            <synset wnid="animal">
              <synset wnid="cat"/>
              <synset wnid="dog"/>
            </synset>
          </synset>
        </tree>"#;

    /// Small config over a 3-node, 5-leaf hierarchy written into `dir`.
    pub(crate) fn small_config(dir: &Path) -> ModelConfig {
        let tree_path  = dir.join("tree.xml");
        let wnids_path = dir.join("wnids.txt");
        fs::write(&tree_path, TREE).unwrap();
        fs::write(&wnids_path, "airplane\ncat\ndog\nship\ntruck\n").unwrap();

        let hierarchy   = HierarchyPaths::new(tree_path, wnids_path);
        let checkpoints = CheckpointPaths::new(dir.join("checkpoint"));
        let resnet      = BackboneConfig::ResNet(ResNetConfig::resnet10().with_base_width(2));

        let mut config = ModelConfig { image_shape: [3, 8, 8], ..Default::default() };
        config.tree.hierarchy = hierarchy.clone();
        config.tree.checkpoints = checkpoints.clone();
        config.tree.backbone = BackboneConfig::LinearProbe(LinearProbeConfig::new(3 * 8 * 8));
        config.joint_nodes.hierarchy = hierarchy.clone();
        config.joint_nodes.backbone = resnet.clone();
        config.joint_tree.hierarchy = hierarchy;
        config.joint_tree.checkpoints = checkpoints;
        config.joint_tree.backbone = resnet;
        config
    }

    #[test]
    fn test_tree_summary_without_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let use_case = SummaryUseCase::new(small_config(dir.path()), ModelKind::Tree, 4);

        let summary = use_case.execute::<TestBackend>(&Default::default()).unwrap();
        assert_eq!(summary.nodes, 3);
        assert_eq!(summary.feature_dim, 7);
        assert_eq!(summary.output_shapes, vec![[4, 10]]);
        assert_eq!(summary.checkpoints.skipped(), 3);
    }

    #[test]
    fn test_joint_nodes_summary_lists_every_head() {
        let dir = tempfile::tempdir().unwrap();
        let use_case = SummaryUseCase::new(small_config(dir.path()), ModelKind::JointNodes, 2);

        let summary = use_case.execute::<TestBackend>(&Default::default()).unwrap();
        assert_eq!(summary.output_shapes, vec![[2, 2], [2, 3], [2, 2]]);
        assert_eq!(summary.feature_dim, 7);
        assert!(summary.checkpoints.entries.is_empty());
    }

    #[test]
    fn test_joint_tree_summary() {
        let dir = tempfile::tempdir().unwrap();
        let use_case = SummaryUseCase::new(small_config(dir.path()), ModelKind::JointTree, 3);

        let summary = use_case.execute::<TestBackend>(&Default::default()).unwrap();
        assert_eq!(summary.output_shapes, vec![[3, 10]]);
        assert_eq!(summary.checkpoints.skipped(), 1);
    }

    #[test]
    fn test_missing_hierarchy_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = small_config(dir.path());
        config.tree.hierarchy = HierarchyPaths::new(dir.path().join("nope.xml"), dir.path().join("wnids.txt"));

        let err = SummaryUseCase::new(config, ModelKind::Tree, 1)
            .execute::<TestBackend>(&Default::default())
            .unwrap_err();
        assert!(format!("{err:#}").contains("nope.xml"));
    }
}
