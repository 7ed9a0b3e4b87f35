use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "fex", about = concat!("fex v", env!("CARGO_PKG_VERSION"), " - label JSONL datasets from the terminal"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file (default: ./fex.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend URL, overriding server.url
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Serve items from a local JSONL file instead of a server
    #[arg(long, global = true, conflicts_with = "server")]
    pub data: Option<PathBuf>,

    /// Log granularity
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    /// Where logs go while the TUI owns the terminal
    #[arg(long, global = true, default_value = "fex.log")]
    pub log_file: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the labeling form (the default)
    Label,
    /// Write a default fex.toml in the current directory
    Init(InitArgs),
    /// Update settings in fex.toml (`--server URL` sets server.url)
    Config(ConfigArgs),
    /// Print the annotation schema
    Schema,
    /// Print the number of items
    Count,
    /// Print one item
    Get(GetArgs),
    /// Print the indices of matching items
    Search(SearchArgs),
    /// Write every item's rendered HTML into a directory
    Export(ExportArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Args)]
pub struct InitArgs {
    /// Overwrite an existing fex.toml
    #[arg(long)]
    pub force: bool,
}

/// `fex config --server URL` stores the global `--server` flag as server.url
#[derive(Args)]
pub struct ConfigArgs {
    /// Set server.timeout_secs
    #[arg(long)]
    pub timeout: Option<u64>,
    /// Set ui.inbox
    #[arg(long)]
    pub inbox: Option<String>,
}

#[derive(Args)]
pub struct GetArgs {
    /// Zero-based item index
    pub index: usize,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Query, e.g. `shoes intent:buy !label:*`
    pub query: String,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Output directory
    #[arg(short, long)]
    pub output: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_label() {
        let cli = Cli::try_parse_from(["fex"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, LogLevel::Warn);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["fex", "get", "3", "--json", "--data", "items.jsonl"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.data, Some(PathBuf::from("items.jsonl")));
        assert!(matches!(cli.command, Some(Commands::Get(GetArgs { index: 3 }))));
    }

    #[test]
    fn data_and_server_conflict() {
        assert!(Cli::try_parse_from(["fex", "--data", "a.jsonl", "--server", "http://x"]).is_err());
    }
}
