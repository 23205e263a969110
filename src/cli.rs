//! CLI definitions for Testbed.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Testbed CLI.
#[derive(Parser)]
#[command(name = "testbed")]
#[command(about = "Declare, configure and realize test suites")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (defaults to ~/.testbed/config.toml when present)
    #[arg(short, long, global = true, env = "TESTBED_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// List declared suites without realizing them
    List {
        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Realize one suite and print it
    Show {
        /// Suite name
        name: String,

        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Realize every suite and report failures
    Realize {
        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Validate the configuration only
    Check,
}
