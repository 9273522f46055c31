//! CLI argument definitions using clap
//!
//! Commands:
//! - flexindex reconcile --config <path>
//! - flexindex list --config <path> [--key-field <field>] [--order-by <field[:dir]>]...
//! - flexindex call <operation> --config <path> [--args <json>] [--session <id>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// flexindex - indexed collection cache for flat-file object stores
#[derive(Parser, Debug)]
#[command(name = "flexindex")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Bring the index file up to date with storage
    Reconcile {
        /// Path to configuration file
        #[arg(long, default_value = "./flex.json")]
        config: PathBuf,
    },

    /// Print the index, optionally re-keyed and sorted
    List {
        /// Path to configuration file
        #[arg(long, default_value = "./flex.json")]
        config: PathBuf,

        /// Key the listing by this field
        #[arg(long)]
        key_field: Option<String>,

        /// Sort key as `field` or `field:desc`; repeatable, first wins ties
        #[arg(long = "order-by")]
        order_by: Vec<String>,

        /// Session id for session-scoped caching
        #[arg(long)]
        session: Option<String>,
    },

    /// Run a registered operation through the method cache
    Call {
        /// Operation name
        operation: String,

        /// Path to configuration file
        #[arg(long, default_value = "./flex.json")]
        config: PathBuf,

        /// Arguments as a JSON array
        #[arg(long, default_value = "[]")]
        args: String,

        /// Key the index by this field before calling
        #[arg(long)]
        key_field: Option<String>,

        /// Session id for session-scoped caching
        #[arg(long)]
        session: Option<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
