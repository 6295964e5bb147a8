use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::{Config, DEFAULT_CONFIG_FILE};
use crate::fetch::Endpoint;

#[derive(Parser, Debug)]
#[command(name = "nse-snapshot")]
#[command(about = "Keeps local JSON snapshots of NSE index, quote and option-chain data")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// Directory holding the snapshot files
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    #[arg(long)]
    pub cookie_file: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll the given indices (or every listed index) until Ctrl-C
    Poll {
        names: Vec<String>,

        /// Also track every index in the exchange listing
        #[arg(long)]
        all_indices: bool,

        /// Track option chains instead of index constituents
        #[arg(long)]
        option_chain: bool,

        /// Seconds between refreshes of one target
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Refresh one snapshot now
    Fetch {
        name: String,

        #[arg(long, value_enum, default_value_t = EndpointKind::Index)]
        kind: EndpointKind,
    },

    /// List index names from the exchange
    Indices,

    /// Print the stored snapshot of an index
    Show {
        name: String,

        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Inspect the stored session cookie
    Cookie {
        /// Force a fresh handshake
        #[arg(long)]
        renew: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    Index,
    Quote,
    OcIndex,
    OcEquity,
}

impl EndpointKind {
    pub fn endpoint(self, name: impl Into<String>) -> Endpoint {
        let name = name.into();
        match self {
            EndpointKind::Index => Endpoint::IndexConstituents(name),
            EndpointKind::Quote => Endpoint::EquityQuote(name),
            EndpointKind::OcIndex => Endpoint::OptionChainIndex(name),
            EndpointKind::OcEquity => Endpoint::OptionChainEquity(name),
        }
    }
}

impl Cli {
    /// Command-line flags take precedence over the config file.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(dir) = &self.data_dir {
            config.storage.snapshot_dir = dir.clone();
        }
        if let Some(path) = &self.cookie_file {
            config.storage.cookie_file = path.clone();
        }
        if let Commands::Poll {
            interval: Some(secs),
            ..
        } = &self.command
        {
            config.poll.interval_secs = *secs;
        }
    }
}
