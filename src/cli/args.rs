//! CLI argument definitions using clap
//!
//! Commands:
//! - geoserve serve --config <path>
//! - geoserve check <query>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// geoserve - a read-only spatial entity query server
#[derive(Parser, Debug)]
#[command(name = "geoserve")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the query server
    Serve {
        /// Path to a JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Host to bind to (overrides the config file)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides the config file)
        #[arg(long)]
        port: Option<u16>,

        /// Maximum total bounding-box area in square degrees
        #[arg(long)]
        max_bbox_area: Option<f64>,

        /// JSON fixture file to preload into the datastore
        #[arg(long)]
        fixture: Option<PathBuf>,
    },

    /// Parse a query and report the outcome, then exit
    Check {
        /// The query text, e.g. "node[amenity=pub][bbox=-1,50,1,52]"
        query: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
