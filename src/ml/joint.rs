// ============================================================
// Layer 5 — Shared-Backbone Models (JointNodes, JointTree)
// ============================================================
// Cifar10JointNodes trains one backbone for the whole hierarchy.
// The backbone's embedding is computed once and fed to a small
// linear head per node:
//
//   images ─ net.featurize ─ [n, e] ─┬─ heads[0] ─ [n, c0]
//                                    ├─ heads[1] ─ [n, c1]
//                                    └─ heads[k] ─ [n, ck]
//
// Head i is trained against column i of the target matrix, which
// holds each sample's child index at node i.
//
// Cifar10JointTree freezes a (usually pretrained) JointNodes and
// learns one linear layer over its concatenated head outputs,
// the same way Cifar10Tree does over independent nets.

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

/// Output width of the shared backbone's own classifier. Only its
/// embedding is used, but the classifier is part of the checkpoint.
pub const BACKBONE_CLASSES: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Cifar10JointNodesConfig {
    pub hierarchy:   HierarchyPaths,
    pub backbone:    BackboneConfig,
    /// Unused; heads are sized from the nodes.
    pub num_classes: usize,
}

impl Default for Cifar10JointNodesConfig {
    fn default() -> Self {
        Self {
            hierarchy:   HierarchyPaths::default(),
            backbone:    BackboneConfig::default(),
            num_classes: 10,
        }
    }
}

impl Cifar10JointNodesConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Cifar10JointNodes<B>, ModelError> {
        let nodes = self.hierarchy.load()?;
        self.init_from_nodes(nodes, device)
    }

    pub fn init_from_nodes<B: Backend>(
        &self,
        nodes:  Vec<Node>,
        device: &B::Device,
    ) -> Result<Cifar10JointNodes<B>, ModelError> {
        if nodes.is_empty() {
            return Err(hierarchy::HierarchyError::Empty.into());
        }

        let net = self.backbone.init::<B>(BACKBONE_CLASSES, device);
        let embedding_dim = net
            .featurizer()
            .map(|featurizer| featurizer.embedding_dim())
            .ok_or_else(|| ModelError::MissingFeaturize(self.backbone.name()))?;

        let heads: Vec<Linear<B>> = nodes
            .iter()
            .map(|node| LinearConfig::new(embedding_dim, node.num_classes()).init(device))
            .collect();

        tracing::info!(
            "Cifar10JointNodes ready: {} trunk ({} features), {} heads",
            self.backbone.name(),
            embedding_dim,
            heads.len()
        );

        Ok(Cifar10JointNodes { net, heads, nodes: Ignored(nodes) })
    }
}

#[derive(Module, Debug)]
pub struct Cifar10JointNodes<B: Backend> {
    /// Shared trunk
    pub net:   Backbone<B>,
    /// One head per node, in node order
    pub heads: Vec<Linear<B>>,
    nodes:     Ignored<Vec<Node>>,
}

impl<B: Backend> Cifar10JointNodes<B> {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes.0
    }

    /// images: [batch, c, h, w] → one [batch, node classes] tensor per head
    pub fn forward(&self, images: Tensor<B, 4>) -> Result<Vec<Tensor<B, 2>>, ModelError> {
        let featurizer = self
            .net
            .featurizer()
            .ok_or_else(|| ModelError::MissingFeaturize(self.net.kind().to_string()))?;

        let features = featurizer.featurize(images);
        Ok(self
            .heads
            .iter()
            .map(|head| head.forward(features.clone()))
            .collect())
    }

    /// Sum over heads of `criterion(outputs[i], targets[:, i])`.
    ///
    /// targets: [batch, heads], the child index of every sample at every node.
    /// A column count other than `outputs.len()` is `ModelError::TargetMismatch`.
    pub fn custom_loss<F>(
        &self,
        criterion: F,
        outputs:   Vec<Tensor<B, 2>>,
        targets:   Tensor<B, 2, Int>,
    ) -> Result<Tensor<B, 1>, ModelError>
    where
        F: Fn(Tensor<B, 2>, Tensor<B, 1, Int>) -> Tensor<B, 1>,
    {
        let [batch, columns] = targets.dims();
        if columns != outputs.len() {
            return Err(ModelError::TargetMismatch { heads: outputs.len(), columns });
        }

        let mut loss = Tensor::<B, 1>::zeros([1], &targets.device());
        for (i, output) in outputs.into_iter().enumerate() {
            let column = targets.clone().slice([0..batch, i..i + 1]).reshape([batch]);
            loss = loss + criterion(output, column);
        }
        Ok(loss)
    }

    /// Per-head arg-max: [batch, heads].
    pub fn custom_prediction(&self, outputs: &[Tensor<B, 2>]) -> Tensor<B, 2, Int> {
        let predictions = outputs.iter().map(|output| output.clone().argmax(1)).collect();
        Tensor::cat(predictions, 1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Cifar10JointTreeConfig {
    pub hierarchy:   HierarchyPaths,
    pub backbone:    BackboneConfig,
    pub checkpoints: CheckpointPaths,
    pub num_classes: usize,
    pub pretrained:  bool,
}

impl Default for Cifar10JointTreeConfig {
    fn default() -> Self {
        Self {
            hierarchy:   HierarchyPaths::default(),
            backbone:    BackboneConfig::default(),
            checkpoints: CheckpointPaths::default(),
            num_classes: 10,
            pretrained:  true,
        }
    }
}

impl Cifar10JointTreeConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Cifar10JointTree<B>, ModelError> {
        self.init_with_report(device).map(|(model, _)| model)
    }

    pub fn init_with_report<B: Backend>(
        &self,
        device: &B::Device,
    ) -> Result<(Cifar10JointTree<B>, CheckpointReport), ModelError> {
        let nodes = self.hierarchy.load()?;
        self.init_from_nodes(nodes, device)
    }

    pub fn init_from_nodes<B: Backend>(
        &self,
        nodes:  Vec<Node>,
        device: &B::Device,
    ) -> Result<(Cifar10JointTree<B>, CheckpointReport), ModelError> {
        let joint_config = Cifar10JointNodesConfig {
            hierarchy:   self.hierarchy.clone(),
            backbone:    self.backbone.clone(),
            num_classes: self.num_classes,
        };
        let joint = joint_config.init_from_nodes::<B>(nodes, device)?;

        let mut report = CheckpointReport::default();
        let joint = if self.pretrained {
            let path = self.checkpoints.joint_nodes();
            let (joint, outcome) = load_checkpoint(joint, &path)?;
            report.push(path, outcome);
            joint
        } else {
            joint
        };
        let joint = joint.no_grad();

        let input_dim = hierarchy::dim(joint.nodes());
        let produced: usize = joint.heads.iter().map(|head| head.weight.val().dims()[1]).sum();
        if produced != input_dim {
            return Err(ModelError::DimensionMismatch { expected: input_dim, actual: produced });
        }

        tracing::info!("Cifar10JointTree ready: {} features → {} classes", input_dim, self.num_classes);

        let linear = LinearConfig::new(input_dim, self.num_classes).init(device);
        Ok((Cifar10JointTree { joint, linear }, report))
    }
}

#[derive(Module, Debug)]
pub struct Cifar10JointTree<B: Backend> {
    /// Frozen multi-head model
    pub joint:  Cifar10JointNodes<B>,
    /// The only trainable layer
    pub linear: Linear<B>,
}

impl<B: Backend> Cifar10JointTree<B> {
    /// images: [batch, c, h, w] → concatenated head outputs: [batch, Σ node classes]
    pub fn features(&self, images: Tensor<B, 4>) -> Result<Tensor<B, 2>, ModelError> {
        let outputs = self
            .joint
            .forward(images)?
            .into_iter()
            .map(|output| output.detach())
            .collect();
        Ok(Tensor::cat(outputs, 1))
    }

    /// images: [batch, c, h, w] → scores: [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Result<Tensor<B, 2>, ModelError> {
        Ok(self.linear.forward(self.features(images)?))
    }
}
