use clap::{Parser, Subcommand};
use std::path::PathBuf;
use anyhow::Result;

use readorder::core::Engine;

#[derive(Parser)]
#[command(name = "readorder")]
#[command(about = "Put functions in the order you read them: callers first")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Report scopes whose functions are not in readable order
    Check {
        /// Files or directories (defaults to the configured source dirs)
        paths: Vec<PathBuf>,

        /// Output format (text, json)
        #[arg(long)]
        format: Option<String>,
    },

    /// Reorder functions in place
    Fix {
        /// Files or directories (defaults to the configured source dirs)
        paths: Vec<PathBuf>,

        /// Dry run - show which files would be rewritten
        #[arg(long)]
        dry_run: bool,
    },

    /// Show units, calls, cycles and the readable order of one file
    Order {
        file: PathBuf,

        /// Output format (text, json)
        #[arg(long)]
        format: Option<String>,
    },

    /// Write a default configuration file
    Init {
        /// Target directory (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
}

impl Cli {
    pub async fn execute(self, mut engine: Engine) -> Result<()> {
        match self.command {
            Commands::Check { paths, format } => {
                engine.check(paths, format).await
            }
            Commands::Fix { paths, dry_run } => {
                engine.fix(paths, dry_run).await.map(|_| ())
            }
            Commands::Order { file, format } => {
                engine.order(file, format).await
            }
            Commands::Init { path } => {
                engine.init(path).await
            }
        }
    }
}
