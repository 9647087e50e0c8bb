//! Command-line surface.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "scout", version, about = "Offline-first book scouting engine")]
pub struct Cli {
    /// Path to scout.toml (defaults to the platform config dir).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Skip the reachability probe and act as if offline.
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve a price quote without recording anything.
    Price(BookArgs),

    /// Record a scan: price it, store it and submit or queue it.
    Scan(BookArgs),

    /// Set what you paid for a scanned book.
    Cost {
        isbn: String,
        /// Amount in dollars, e.g. 4.50
        amount: f64,
    },

    /// List recently scanned books.
    Books {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },

    /// Inspect or clear the pending scan queue.
    #[command(subcommand)]
    Queue(QueueCommand),

    /// Drain the queue and reconcile with the server now.
    Sync,

    /// Poll server status merged with the local queue.
    Status,

    /// Per-collection storage counts.
    Stats,

    /// Delete price and image cache entries past retention.
    Sweep,

    /// Wipe cached prices, images and scanned books (the queue is kept).
    Clear,

    /// Run the background sync orchestrator until Ctrl+C.
    Agent,

    /// Show or initialize the config file.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Args)]
pub struct BookArgs {
    pub isbn: String,
    #[arg(long, default_value = "")]
    pub title: String,
    #[arg(long, default_value = "")]
    pub author: String,
    /// Only used for pricing lookups.
    #[arg(long)]
    pub publisher: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum QueueCommand {
    /// Pending scans, oldest first.
    List,
    Count,
    /// Scans abandoned at the retry ceiling.
    Quarantined {
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Drop every pending and abandoned scan.
    Clear,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    Show,
    /// Write the effective config to disk.
    Init {
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_scan() {
        let cli = Cli::parse_from([
            "scout",
            "scan",
            "9780140449136",
            "--title",
            "The Odyssey",
            "--offline",
        ]);
        assert!(cli.offline);
        match cli.command {
            Command::Scan(args) => {
                assert_eq!(args.isbn, "9780140449136");
                assert_eq!(args.title, "The Odyssey");
                assert!(args.author.is_empty());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_queue_quarantined() {
        let cli = Cli::parse_from(["scout", "queue", "quarantined", "--limit", "5"]);
        assert!(matches!(
            cli.command,
            Command::Queue(QueueCommand::Quarantined { limit: Some(5) })
        ));
    }
}
