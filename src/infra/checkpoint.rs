// ============================================================
// Layer 6 — Checkpoint Loader
// ============================================================
// Loads and saves network weights at conventional paths using
// burn-store's Burnpack format.
//
// What gets saved per checkpoint:
//   1. <name>.bpk  — every tensor of the module, keyed by its
//                    dotted module path ("heads.0.weight")
//   2. <name>.json — optional metadata: { "acc": 93.1, "epoch": 120 }
//
// Checkpoints written from a replicated (data-parallel) network
// carry a leading "module." on every tensor path; the store's
// key remapper strips it while loading.
//
// File naming convention:
//   checkpoint/
//     ckpt-CIFAR10Node-ResNet10-<wnid>.bpk             ← one per node
//     ckpt-CIFAR10JointNodes-CIFAR10JointNodes.bpk     ← joint model
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use std::{fs, path::{Path, PathBuf}};

use burn::prelude::*;
use burn_store::{ApplyError, BurnpackStore, ModuleSnapshot};
use serde::{Deserialize, Serialize};

/// Tensor-path pattern added by replicated training wrappers.
pub const WRAPPED_PREFIX_PATTERN: &str = r"^module\.";

/// Failures while reading, writing or applying a checkpoint.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("cannot access checkpoint '{path}': {source}")]
    Io {
        path:   PathBuf,
        source: std::io::Error,
    },

    #[error("unusable checkpoint '{path}': {reason}")]
    Store {
        path:   PathBuf,
        reason: String,
    },

    #[error("malformed checkpoint metadata '{path}': {source}")]
    Metadata {
        path:   PathBuf,
        source: serde_json::Error,
    },

    #[error("checkpoint lacks tensors: {0:?}")]
    MissingKeys(Vec<String>),

    #[error("checkpoint has unexpected tensors: {0:?}")]
    UnexpectedKeys(Vec<String>),

    #[error("tensor '{key}' has shape {found:?}, network expects {expected:?}")]
    ShapeMismatch {
        key:      String,
        expected: Vec<usize>,
        found:    Vec<usize>,
    },

    #[error("tensor '{key}' is unusable: {reason}")]
    Tensor {
        key:    String,
        reason: String,
    },
}

impl From<ApplyError> for CheckpointError {
    fn from(error: ApplyError) -> Self {
        match error {
            ApplyError::ShapeMismatch { path, expected, found } => {
                Self::ShapeMismatch { key: path, expected, found }
            }
            ApplyError::DTypeMismatch { ref path, .. }
            | ApplyError::AdapterError { ref path, .. }
            | ApplyError::LoadError { ref path, .. } => {
                Self::Tensor { key: path.clone(), reason: error.to_string() }
            }
        }
    }
}

/// What `load_checkpoint` did with the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadOutcome {
    /// Every tensor was replaced by the checkpoint's value
    Loaded,
    /// No file at the path; the network keeps its initial parameters
    SkippedMissing,
}

/// Outcome of every checkpoint a model tried to load while being built.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CheckpointReport {
    pub entries: Vec<(PathBuf, LoadOutcome)>,
}

impl CheckpointReport {
    pub fn push(&mut self, path: PathBuf, outcome: LoadOutcome) {
        self.entries.push((path, outcome));
    }

    pub fn loaded(&self) -> usize {
        self.count(LoadOutcome::Loaded)
    }

    pub fn skipped(&self) -> usize {
        self.count(LoadOutcome::SkippedMissing)
    }

    fn count(&self, outcome: LoadOutcome) -> usize {
        self.entries.iter().filter(|(_, o)| *o == outcome).count()
    }
}

/// Training metadata stored next to the weights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMeta {
    #[serde(default)]
    pub acc: Option<f64>,

    #[serde(default)]
    pub epoch: Option<usize>,
}

/// Where checkpoints live and how their file names are built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointPaths {
    pub dir:       PathBuf,
    pub extension: String,
}

impl Default for CheckpointPaths {
    fn default() -> Self {
        Self {
            dir:       PathBuf::from("./checkpoint"),
            extension: "bpk".to_string(),
        }
    }
}

impl CheckpointPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), ..Self::default() }
    }

    /// `{dir}/ckpt-CIFAR10Node-{backbone}-{wnid}.{ext}`
    pub fn node(&self, backbone: &str, wnid: &str) -> PathBuf {
        self.dir
            .join(format!("ckpt-CIFAR10Node-{backbone}-{wnid}.{}", self.extension))
    }

    /// `{dir}/ckpt-CIFAR10JointNodes-CIFAR10JointNodes.{ext}`
    pub fn joint_nodes(&self) -> PathBuf {
        self.dir
            .join(format!("ckpt-CIFAR10JointNodes-CIFAR10JointNodes.{}", self.extension))
    }
}

/// Metadata file for the checkpoint at `path`.
pub fn meta_path(path: impl AsRef<Path>) -> PathBuf {
    path.as_ref().with_extension("json")
}

/// Load weights from `path` into `net`.
///
/// A missing file is not an error: the network is handed back untouched
/// with `LoadOutcome::SkippedMissing`. Anything wrong with an existing
/// file (bad encoding, missing or extra tensors, shape mismatch) is.
pub fn load_checkpoint<B: Backend, M: Module<B>>(
    net:  M,
    path: impl AsRef<Path>,
) -> Result<(M, LoadOutcome), CheckpointError> {
    let path = path.as_ref();
    if !path.is_file() {
        tracing::warn!(" * Failed to load model. No such path found: {}", path.display());
        return Ok((net, LoadOutcome::SkippedMissing));
    }

    // Partial and invalid applies are reported through ApplyResult below.
    let mut store = BurnpackStore::from_file(path)
        .auto_extension(false)
        .with_remap_pattern(WRAPPED_PREFIX_PATTERN, "")
        .allow_partial(true)
        .validate(false);

    let mut net = net;
    let result = net.load_from(&mut store).map_err(|e| CheckpointError::Store {
        path:   path.to_path_buf(),
        reason: e.to_string(),
    })?;

    if let Some(error) = result.errors.into_iter().next() {
        return Err(error.into());
    }
    if !result.missing.is_empty() {
        return Err(CheckpointError::MissingKeys(
            result.missing.into_iter().map(|(key, _)| key).collect(),
        ));
    }
    if !result.unused.is_empty() {
        return Err(CheckpointError::UnexpectedKeys(result.unused));
    }

    tracing::info!("Loaded checkpoint '{}' ({} tensors)", path.display(), result.applied.len());
    Ok((net, LoadOutcome::Loaded))
}

/// Write `net`'s tensors to `path`, creating parent directories, and its
/// metadata next to it when there is any.
pub fn save_checkpoint<B: Backend, M: Module<B>>(
    net:  &M,
    path: impl AsRef<Path>,
    meta: CheckpointMeta,
) -> Result<(), CheckpointError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| CheckpointError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let mut store = BurnpackStore::from_file(path)
        .auto_extension(false)
        .overwrite(true);
    net.save_into(&mut store).map_err(|e| CheckpointError::Store {
        path:   path.to_path_buf(),
        reason: e.to_string(),
    })?;

    if meta != CheckpointMeta::default() {
        let meta_path = meta_path(path);
        let json = serde_json::to_string_pretty(&meta).map_err(|source| CheckpointError::Metadata {
            path: meta_path.clone(),
            source,
        })?;
        fs::write(&meta_path, json).map_err(|source| CheckpointError::Io { path: meta_path, source })?;
    }

    tracing::debug!("Saved checkpoint '{}'", path.display());
    Ok(())
}

/// Metadata saved with the checkpoint at `path`; defaults when there is none.
pub fn read_meta(path: impl AsRef<Path>) -> Result<CheckpointMeta, CheckpointError> {
    let meta_path = meta_path(path);
    if !meta_path.is_file() {
        return Ok(CheckpointMeta::default());
    }

    let json = fs::read_to_string(&meta_path).map_err(|source| CheckpointError::Io {
        path: meta_path.clone(),
        source,
    })?;
    serde_json::from_str(&json).map_err(|source| CheckpointError::Metadata { path: meta_path, source })
}

/// Every float tensor of `module` by path, flattened. Used to compare networks.
#[cfg(test)]
pub(crate) fn tensor_values<B: Backend, M: Module<B>>(
    module: &M,
) -> std::collections::BTreeMap<String, Vec<f32>> {
    module
        .collect(None, None, false)
        .into_iter()
        .map(|snapshot| {
            let values = snapshot
                .to_data()
                .unwrap()
                .convert::<f32>()
                .to_vec::<f32>()
                .unwrap();
            (snapshot.full_path(), values)
        })
        .collect()
}
