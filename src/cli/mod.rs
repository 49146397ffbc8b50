// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap, hands the work to Layer 2 and
// prints the result. Models run on the Wgpu backend.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::{Context, Result};
use burn::backend::{wgpu::WgpuDevice, Wgpu};
use clap::Parser;
use commands::{Commands, ExportArgs, NodesArgs, SummaryArgs};

use crate::application::{
    config::ModelConfig,
    export_use_case::ExportUseCase,
    summary_use_case::SummaryUseCase,
};
use crate::data::hierarchy::{self, HierarchyPaths};

#[derive(Parser, Debug)]
#[command(
    name = "hierarchy-tree",
    version = "0.1.0",
    about = "Hierarchical CIFAR classifiers built from per-node networks."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Nodes(args)   => run_nodes(args),
            Commands::Summary(args) => run_summary(args),
            Commands::Export(args)  => run_export(args),
        }
    }
}

fn run_nodes(args: NodesArgs) -> Result<()> {
    let paths: HierarchyPaths = args.into();
    let nodes = paths
        .load()
        .with_context(|| format!("Cannot load hierarchy '{}'", paths.tree.display()))?;

    for node in &nodes {
        println!(
            "{:<12} {:>3} classes {:>3} leaves  {:?}",
            node.wnid,
            node.num_classes(),
            node.leaves().len(),
            node.children
        );
    }
    println!("\n{} nodes, dim = {}", nodes.len(), hierarchy::dim(&nodes));
    Ok(())
}

fn run_summary(args: SummaryArgs) -> Result<()> {
    let config = ModelConfig::load_or_default(args.config.as_deref())?;
    let device = WgpuDevice::default();

    let summary = SummaryUseCase::new(config, args.model.into(), args.batch_size).execute::<Wgpu>(&device)?;

    println!("{}", summary.model);
    println!("  nodes:       {}", summary.nodes);
    println!("  features:    {}", summary.feature_dim);
    println!(
        "  checkpoints: {} loaded, {} missing",
        summary.checkpoints.loaded(),
        summary.checkpoints.skipped()
    );
    for shape in &summary.output_shapes {
        println!("  output:      {:?}", shape);
    }
    Ok(())
}

fn run_export(args: ExportArgs) -> Result<()> {
    let config = ModelConfig::load_or_default(args.config.as_deref())?;
    let device = WgpuDevice::default();

    let written = ExportUseCase::new(config, args.model.into()).execute::<Wgpu>(&device)?;
    for path in &written {
        println!("{}", path.display());
    }
    Ok(())
}
