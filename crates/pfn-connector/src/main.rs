//! pfn-node: run one processor node of the student pipeline.
//!
//! ```text
//! pfn-node --role merge --config merge.toml
//! ```
//!
//! The node is driven from stdin; type `help` for the commands.

mod console;
mod roles;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{stdin, BufReader};

use pfn_node::{Node, NodeOptions};

use crate::console::{Console, ConsoleObserver};
use crate::roles::Role;

#[derive(Parser, Debug)]
#[command(name = "pfn-node")]
#[command(about = "Run a processor node of the student record pipeline")]
struct Cli {
    /// Which node of the pipeline to run
    #[arg(long, value_enum)]
    role: Role,

    /// Configuration file (default: ~/.pfn/<role>.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Grader for the grading role: usual or cruel (default: random)
    #[arg(long)]
    grader: Option<String>,

    /// Start the node right after configuring it
    #[arg(long)]
    autostart: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = match cli.config {
        Some(path) => path,
        None => cli.role.default_config_path()?,
    };

    let node = Node::with_options(
        cli.role.as_str(),
        NodeOptions {
            observer: Arc::new(ConsoleObserver),
            ..NodeOptions::default()
        },
    );
    cli.role.assemble(&node, cli.grader.as_deref())?;
    tracing::info!(role = cli.role.as_str(), handlers = ?node.handler_names(), "Node assembled");

    if let Err(e) = node.configure(&config_path) {
        tracing::error!(path = %config_path.display(), error = %e, "Node not configured; fix the file and restart");
    } else if cli.autostart {
        node.start().await?;
    }

    Console::new(&node)
        .run(BufReader::new(stdin()))
        .await?;

    node.stop().await;
    Ok(())
}
