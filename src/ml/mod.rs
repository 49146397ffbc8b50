// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All network definitions live here.
//
//   resnet.rs   — CIFAR-style residual network, the default
//                 backbone; can featurize
//
//   backbone.rs — BackboneConfig / Backbone enum over the
//                 supported architectures, and the Featurize
//                 capability trait
//
//   tree.rs     — Cifar10Tree: frozen per-node nets, concatenated
//                 scores, one trainable linear layer
//
//   joint.rs    — Cifar10JointNodes: shared trunk with one head
//                 per node; Cifar10JointTree: frozen JointNodes
//                 plus one trainable linear layer
//
//   error.rs    — ModelError
//
// Reference: Burn Book §3 (Building Blocks)
//            He et al. (2016) Deep Residual Learning

/// Residual network backbone
pub mod resnet;

/// Backbone factory, runtime enum and featurize capability
pub mod backbone;

/// Independent per-node ensemble
pub mod tree;

/// Shared-backbone multi-head models
pub mod joint;

pub mod error;

pub use error::ModelError;
