// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Three subcommands:
//   nodes   — list the hierarchy's internal nodes
//   summary — build a model and report its shape and checkpoints
//   export  — write freshly initialised checkpoints
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::application::config::ModelKind;
use crate::data::hierarchy::HierarchyPaths;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print every internal node of the hierarchy
    Nodes(NodesArgs),

    /// Build a model and run a zero batch through it
    Summary(SummaryArgs),

    /// Write freshly initialised checkpoints at the conventional paths
    Export(ExportArgs),
}

#[derive(Args, Debug)]
pub struct NodesArgs {
    /// Nested hierarchy XML
    #[arg(long, default_value = "./data/cifar10/tree.xml")]
    pub tree: PathBuf,

    /// Leaf wnids, one per line, in label order
    #[arg(long, default_value = "./data/cifar10/wnids.txt")]
    pub wnids: PathBuf,
}

impl From<NodesArgs> for HierarchyPaths {
    fn from(a: NodesArgs) -> Self {
        HierarchyPaths::new(a.tree, a.wnids)
    }
}

#[derive(Args, Debug)]
pub struct SummaryArgs {
    /// JSON model config; defaults are used when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ModelArg::Tree)]
    pub model: ModelArg,

    #[arg(long, default_value_t = 2)]
    pub batch_size: usize,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// JSON model config; defaults are used when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// tree or joint-nodes
    #[arg(long, value_enum, default_value_t = ModelArg::Tree)]
    pub model: ModelArg,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelArg {
    Tree,
    JointNodes,
    JointTree,
}

impl From<ModelArg> for ModelKind {
    fn from(a: ModelArg) -> Self {
        match a {
            ModelArg::Tree       => ModelKind::Tree,
            ModelArg::JointNodes => ModelKind::JointNodes,
            ModelArg::JointTree  => ModelKind::JointTree,
        }
    }
}
