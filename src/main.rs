use anyhow::Result;
use clap::Parser;
use hierarchy_tree::cli::Cli;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();
    cli.run()
}
