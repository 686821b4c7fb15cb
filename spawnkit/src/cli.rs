//! CLI argument definitions using clap derive macros.

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Agent fleet telemetry CLI
#[derive(Parser, Debug)]
#[command(name = "spawnkit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub provider: ProviderFlags,

    #[command(subcommand)]
    pub command: Commands,
}

/// Provider selection; overrides the config file and environment.
#[derive(Args, Debug, Default)]
pub struct ProviderFlags {
    /// Where telemetry comes from
    #[arg(long, global = true, value_enum)]
    pub provider: Option<ProviderKind>,

    /// OpenClaw state directory (local provider)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Relay base URL (relay provider)
    #[arg(long, global = true)]
    pub relay_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Read the state directory on this machine
    #[default]
    Local,
    /// Query a relay over HTTP
    Relay,
    /// Synthetic fleet, no backend needed
    Demo,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start live updates and print every event until Ctrl-C
    Watch {
        /// One JSON object per line
        #[arg(short, long)]
        json: bool,
    },

    /// Refresh once and print the snapshot as JSON
    Snapshot {
        /// Single-line JSON
        #[arg(short, long)]
        compact: bool,
    },

    /// Refresh once and show a fleet dashboard
    Status {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Structured sub-task names
    Name(NameCommand),

    /// Show version
    Version,
}

// ─────────────────────────────────────────────────────────────────────────────
// Name Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct NameCommand {
    #[command(subcommand)]
    pub action: NameAction,
}

#[derive(Subcommand, Debug)]
pub enum NameAction {
    /// Allocate the next free name for a parent and role
    Allocate {
        /// Parent agent key (main, forge, atlas, hunter, echo, sentinel)
        parent: String,

        /// Role name, e.g. CodeBuilder
        role: String,

        /// Skip the refresh that collects names already in use
        #[arg(long)]
        offline: bool,
    },

    /// Parse a structured name such as Forge.CodeBuilder-01
    Parse {
        name: String,
    },

    /// Infer a structured name from a free-text label
    Migrate {
        label: String,

        /// Parent agent key
        #[arg(short, long)]
        parent: String,
    },

    /// List roles, optionally only those allowed under a parent
    Roles {
        #[arg(short, long)]
        parent: Option<String>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}
