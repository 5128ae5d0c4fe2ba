//! Command-line interface definition for cachetrigger
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for running the consumer, provisioning the topic,
//! and writing the credential descriptor.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/cachetrigger.yaml";

/// cachetrigger - refresh a cache when a trigger message arrives on Kafka
///
/// Provisions the topic through the admin API, consumes it over SASL_SSL,
/// and calls the cache refresh endpoint for every trigger message.
#[derive(Parser, Debug, Clone)]
#[command(name = "cachetrigger")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "CACHETRIGGER_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for cachetrigger
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Bootstrap and consume trigger messages until stopped
    Run {
        /// Log trigger messages without refreshing the cache
        #[arg(long)]
        dry_run: bool,
    },

    /// Ensure the topic exists, then exit
    Provision,

    /// Write the Kafka credential descriptor, then exit
    Credentials {
        /// Print the descriptor location on stdout
        #[arg(long)]
        print_path: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: PathBuf::from(DEFAULT_CONFIG_PATH),
            verbose: false,
            command: Commands::Run { dry_run: false },
        }
    }
}
