//! QMS Metrics CLI Module
//! Command-line interface for MongoDB health reporting

pub mod formatter;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "qms-metrics")]
#[command(author = "QMS Platform Team")]
#[command(version)]
#[command(about = "MongoDB operational health reporting for the QMS admin dashboard", long_about = None)]
pub struct Cli {
    /// Config file (defaults to ./qms-metrics.config.json, then the user config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (json for scripting)
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the metrics API server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
    },

    /// Full health summary (score, status, recommendations)
    Health,

    /// Database and server statistics
    Stats,

    /// Slow operations from the profiler log
    SlowQueries {
        /// Maximum entries to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Missing-index recommendations
    Indexes,

    /// Per-collection read latency
    Latency,

    /// Server-side profiler control
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Configuration file management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProfileAction {
    /// Show the current profiling level
    Status,

    /// Enable slow-operation profiling, restoring the previous level on exit
    Enable {
        /// Operations slower than this are recorded
        #[arg(long)]
        slow_ms: Option<u64>,

        /// Seconds to keep profiling on (default: until Ctrl+C)
        #[arg(short, long)]
        duration: Option<u64>,
    },

    /// Turn profiling off
    Disable,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a config file with the default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

impl Cli {
    /// Where `config init` writes when no `--config` is given
    pub fn config_target(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from(crate::engine::config::CONFIG_FILE_NAME))
    }
}
