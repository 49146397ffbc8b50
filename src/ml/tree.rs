// ============================================================
// Layer 5 — Per-Node Ensemble (Cifar10Tree)
// ============================================================
// One independent backbone per hierarchy node, each trained on
// its own node's problem and frozen here. Their score vectors are
// concatenated (node order) and a single trainable linear layer
// maps the result to the final classes.
//
//   images ─┬─ net[0] ─ scores [n, c0] ─┐
//           ├─ net[1] ─ scores [n, c1] ─┼─ cat ─ [n, Σc] ─ linear ─ [n, classes]
//           └─ net[k] ─ scores [n, ck] ─┘
//
// With `one_hot_feature` each node's scores are replaced by a hard
// indicator of its row-wise maximum before concatenation.

use burn::{
    module::Ignored,
    nn::{Linear, LinearConfig},
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::data::hierarchy::{self, HierarchyPaths};
use crate::domain::node::Node;
use crate::infra::checkpoint::{load_checkpoint, CheckpointPaths, CheckpointReport};
use crate::ml::backbone::{Backbone, BackboneConfig};
use crate::ml::error::ModelError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Cifar10TreeConfig {
    pub hierarchy:       HierarchyPaths,
    pub backbone:        BackboneConfig,
    pub checkpoints:     CheckpointPaths,
    pub pretrained:      bool,
    pub num_classes:     usize,
    pub one_hot_feature: bool,
}

impl Default for Cifar10TreeConfig {
    fn default() -> Self {
        Self {
            hierarchy:       HierarchyPaths::default(),
            backbone:        BackboneConfig::default(),
            checkpoints:     CheckpointPaths::default(),
            pretrained:      true,
            num_classes:     10,
            one_hot_feature: false,
        }
    }
}

impl Cifar10TreeConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Cifar10Tree<B>, ModelError> {
        self.init_with_report(device).map(|(model, _)| model)
    }

    /// Build the model and report which node checkpoints were loaded.
    pub fn init_with_report<B: Backend>(
        &self,
        device: &B::Device,
    ) -> Result<(Cifar10Tree<B>, CheckpointReport), ModelError> {
        let nodes = self.hierarchy.load()?;
        self.init_from_nodes(nodes, device)
    }

    /// Build the model over an already-loaded node list.
    pub fn init_from_nodes<B: Backend>(
        &self,
        nodes:  Vec<Node>,
        device: &B::Device,
    ) -> Result<(Cifar10Tree<B>, CheckpointReport), ModelError> {
        if nodes.is_empty() {
            return Err(hierarchy::HierarchyError::Empty.into());
        }

        let backbone_name = self.backbone.name();
        let mut report = CheckpointReport::default();
        let mut nets = Vec::with_capacity(nodes.len());

        for node in &nodes {
            let net = self.backbone.init::<B>(node.num_classes(), device);
            let net = if self.pretrained {
                let path = self.checkpoints.node(&backbone_name, &node.wnid);
                let (net, outcome) = load_checkpoint(net, &path)?;
                report.push(path, outcome);
                net
            } else {
                net
            };
            tracing::debug!("Node {}: {} classes", node.wnid, node.num_classes());
            nets.push(net.no_grad());
        }

        let input_dim = hierarchy::dim(&nodes);
        let produced: usize = nets.iter().map(Backbone::num_classes).sum();
        if produced != input_dim {
            return Err(ModelError::DimensionMismatch { expected: input_dim, actual: produced });
        }

        tracing::info!(
            "Cifar10Tree ready: {} x {} nodes, {} features → {} classes",
            backbone_name,
            nodes.len(),
            input_dim,
            self.num_classes
        );

        let linear = LinearConfig::new(input_dim, self.num_classes).init(device);
        let model = Cifar10Tree {
            nets,
            linear,
            one_hot_feature: self.one_hot_feature,
            nodes: Ignored(nodes),
        };
        Ok((model, report))
    }
}

#[derive(Module, Debug)]
pub struct Cifar10Tree<B: Backend> {
    /// Frozen per-node classifiers, in node order
    pub nets:            Vec<Backbone<B>>,
    /// The only trainable layer
    pub linear:          Linear<B>,
    pub one_hot_feature: bool,
    nodes:               Ignored<Vec<Node>>,
}

impl<B: Backend> Cifar10Tree<B> {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes.0
    }

    /// images: [batch, c, h, w] → concatenated node scores: [batch, Σ node classes]
    pub fn features(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let features: Vec<Tensor<B, 2>> = self
            .nets
            .iter()
            .map(|net| {
                let scores = net.forward(images.clone()).detach();
                if self.one_hot_feature { one_hot_max(scores) } else { scores }
            })
            .collect();
        Tensor::cat(features, 1)
    }

    /// images: [batch, c, h, w] → scores: [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        self.linear.forward(self.features(images))
    }
}

/// 1.0 wherever a row reaches its maximum, 0.0 elsewhere. Ties all get 1.0.
pub fn one_hot_max<B: Backend>(scores: Tensor<B, 2>) -> Tensor<B, 2> {
    let [batch, width] = scores.dims();
    let maximum = scores.clone().max_dim(1).expand([batch, width]);
    scores.equal(maximum).float()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    use crate::infra::checkpoint::{save_checkpoint, tensor_values, CheckpointMeta, LoadOutcome};
    use crate::ml::backbone::LinearProbeConfig;
    use crate::ml::resnet::ResNetConfig;

    type TestBackend = NdArray;

    /// Two nodes with 3 and 4 classes over 7 leaves.
    fn nodes() -> Vec<Node> {
        vec![
            Node::new("n1", vec!["a".into(), "b".into(), "c".into()], vec![vec![0], vec![1], vec![2]]),
            Node::new(
                "n2",
                vec!["d".into(), "e".into(), "f".into(), "g".into()],
                vec![vec![3], vec![4], vec![5], vec![6]],
            ),
        ]
    }

    fn probe_config() -> Cifar10TreeConfig {
        Cifar10TreeConfig {
            backbone: BackboneConfig::LinearProbe(LinearProbeConfig::new(3 * 4 * 4)),
            pretrained: false,
            ..Default::default()
        }
    }

    fn to_vec(tensor: Tensor<TestBackend, 2>) -> Vec<f32> {
        tensor.into_data().convert::<f32>().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_one_hot_marks_every_maximum() {
        let device = Default::default();
        let scores = Tensor::<TestBackend, 2>::from_floats([[0.2, 0.9, 0.9], [0.5, 0.1, 0.3]], &device);
        assert_eq!(to_vec(one_hot_max(scores)), vec![0.0, 1.0, 1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_untrained_tree_outputs_num_classes() {
        let device = Default::default();
        let (model, report) = probe_config().init_from_nodes::<TestBackend>(nodes(), &device).unwrap();
        let images = Tensor::<TestBackend, 4>::ones([5, 3, 4, 4], &device);

        assert_eq!(model.forward(images).dims(), [5, 10]);
        assert!(report.entries.is_empty());
    }

    #[test]
    fn test_feature_width_is_hierarchy_dim() {
        let device = Default::default();
        let (model, _) = probe_config().init_from_nodes::<TestBackend>(nodes(), &device).unwrap();
        let images = Tensor::<TestBackend, 4>::ones([2, 3, 4, 4], &device);

        assert_eq!(model.features(images).dims(), [2, hierarchy::dim(&nodes())]);
        assert_eq!(model.nodes().len(), 2);
    }

    #[test]
    fn test_one_hot_features_are_indicators() {
        let device = Default::default();
        let config = Cifar10TreeConfig { one_hot_feature: true, ..probe_config() };
        let (model, _) = config.init_from_nodes::<TestBackend>(nodes(), &device).unwrap();
        let images = Tensor::<TestBackend, 4>::random(
            [3, 3, 4, 4],
            burn::tensor::Distribution::Default,
            &device,
        );

        let features = to_vec(model.features(images));
        assert!(features.iter().all(|&v| v == 0.0 || v == 1.0));
        // every sample marks at least one class in each of the two nodes
        for row in features.chunks(7) {
            assert!(row[..3].iter().sum::<f32>() >= 1.0);
            assert!(row[3..].iter().sum::<f32>() >= 1.0);
        }
    }

    #[test]
    fn test_pretrained_without_files_still_builds() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let config = Cifar10TreeConfig {
            pretrained:  true,
            checkpoints: CheckpointPaths::new(dir.path()),
            ..probe_config()
        };

        let (_, report) = config.init_from_nodes::<TestBackend>(nodes(), &device).unwrap();
        assert_eq!(report.skipped(), 2);
        assert_eq!(report.loaded(), 0);
    }

    #[test]
    fn test_node_checkpoint_is_loaded_by_wnid() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let config = Cifar10TreeConfig {
            pretrained:  true,
            checkpoints: CheckpointPaths::new(dir.path()),
            ..probe_config()
        };

        let trained: Backbone<TestBackend> = config.backbone.init(4, &device);
        let path = config.checkpoints.node("LinearProbe", "n2");
        save_checkpoint(&trained, &path, CheckpointMeta::default()).unwrap();

        let (model, report) = config.init_from_nodes::<TestBackend>(nodes(), &device).unwrap();
        assert_eq!(report.entries[1], (path, LoadOutcome::Loaded));
        assert_eq!(report.entries[0].1, LoadOutcome::SkippedMissing);
        assert_eq!(tensor_values(&model.nets[1]), tensor_values(&trained));
    }

    #[test]
    fn test_resnet_nodes_forward() {
        let device = Default::default();
        let config = Cifar10TreeConfig {
            backbone: BackboneConfig::ResNet(ResNetConfig::resnet10().with_base_width(2)),
            pretrained: false,
            num_classes: 7,
            ..Default::default()
        };
        let (model, _) = config.init_from_nodes::<TestBackend>(nodes(), &device).unwrap();
        let images = Tensor::<TestBackend, 4>::zeros([2, 3, 8, 8], &device);

        assert_eq!(model.forward(images).dims(), [2, 7]);
    }
}
