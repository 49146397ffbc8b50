// ============================================================
// Layer 5 — Backbones
// ============================================================
// The networks every tree model is assembled from.
//
//   BackboneConfig  — serialisable factory: which architecture,
//                     and the name used in checkpoint file names
//   Backbone<B>     — the runtime network, one variant per
//                     architecture
//   Featurize<B>    — capability: return the penultimate
//                     embedding instead of class scores
//
// Only some architectures can featurize. Models that need an
// embedding ask `Backbone::featurizer()` once at construction
// and refuse backbones that answer None.

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::ml::resnet::{ResNet, ResNetConfig};

/// A backbone that can produce an intermediate embedding.
pub trait Featurize<B: Backend> {
    /// images: [batch, channels, height, width] → embedding: [batch, embedding_dim]
    fn featurize(&self, images: Tensor<B, 4>) -> Tensor<B, 2>;

    fn embedding_dim(&self) -> usize;
}

/// Flattens the image and applies one linear layer. Has no
/// intermediate embedding, so it cannot featurize.
#[derive(Config, Debug)]
pub struct LinearProbeConfig {
    /// channels * height * width of the expected input
    pub input_features: usize,
}

impl LinearProbeConfig {
    pub fn init<B: Backend>(&self, num_classes: usize, device: &B::Device) -> LinearProbe<B> {
        LinearProbe { linear: LinearConfig::new(self.input_features, num_classes).init(device) }
    }
}

#[derive(Module, Debug)]
pub struct LinearProbe<B: Backend> {
    pub linear: Linear<B>,
}

impl<B: Backend> LinearProbe<B> {
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        self.linear.forward(images.flatten::<2>(1, 3))
    }
}

/// Which backbone to build for each node (or for the shared trunk).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackboneConfig {
    #[serde(rename = "resnet")]
    ResNet(ResNetConfig),
    LinearProbe(LinearProbeConfig),
}

impl Default for BackboneConfig {
    fn default() -> Self {
        Self::ResNet(ResNetConfig::resnet10())
    }
}

impl BackboneConfig {
    /// Name used in checkpoint file names, e.g. "ResNet10".
    pub fn name(&self) -> String {
        match self {
            Self::ResNet(cfg)    => cfg.name(),
            Self::LinearProbe(_) => "LinearProbe".to_string(),
        }
    }

    pub fn supports_featurize(&self) -> bool {
        matches!(self, Self::ResNet(_))
    }

    pub fn init<B: Backend>(&self, num_classes: usize, device: &B::Device) -> Backbone<B> {
        match self {
            Self::ResNet(cfg)      => Backbone::ResNet(cfg.init(num_classes, device)),
            Self::LinearProbe(cfg) => Backbone::LinearProbe(cfg.init(num_classes, device)),
        }
    }
}

#[derive(Module, Debug)]
pub enum Backbone<B: Backend> {
    ResNet(ResNet<B>),
    LinearProbe(LinearProbe<B>),
}

impl<B: Backend> Backbone<B> {
    /// images: [batch, channels, height, width] → scores: [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        match self {
            Self::ResNet(net)      => net.forward(images),
            Self::LinearProbe(net) => net.forward(images),
        }
    }

    /// Architecture family, for messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ResNet(_)      => "ResNet",
            Self::LinearProbe(_) => "LinearProbe",
        }
    }

    /// Width of the class-score output.
    pub fn num_classes(&self) -> usize {
        match self {
            Self::ResNet(net)      => net.num_classes(),
            Self::LinearProbe(net) => net.linear.weight.val().dims()[1],
        }
    }

    /// The featurize capability, if this architecture has one.
    pub fn featurizer(&self) -> Option<&dyn Featurize<B>> {
        match self {
            Self::ResNet(net)    => Some(net as &dyn Featurize<B>),
            Self::LinearProbe(_) => None,
        }
    }
}
