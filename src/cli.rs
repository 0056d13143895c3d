//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Fetch media through relay endpoints with metered usage.
///
/// Each download is checked against your usage quota first and only counted
/// once the media has actually been received.
#[derive(Parser, Debug)]
#[command(name = "media-acquire")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file path (defaults to ~/.config/media-acquire/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the fingerprint and session files
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download every media item found on one or more pages
    Download(DownloadArgs),

    /// Download every media item found on the pages into one zip archive
    Archive(ArchiveArgs),

    /// Sign in with an access token from the auth provider
    Login {
        /// Access token (read from stdin when omitted)
        #[arg(long)]
        token: Option<String>,
    },

    /// Sign out and revert to the guest identity
    Logout,

    /// Show the current identity and usage snapshot
    Quota,
}

/// Network options shared by the acquisition subcommands.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct NetworkArgs {
    /// Relay base URL; repeat to set the priority order (overrides config)
    #[arg(long = "relay", value_name = "URL")]
    pub relays: Vec<String>,

    /// Connect timeout per relay in seconds (1-3600)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout: Option<u64>,

    /// Time allowed until a relay sends response headers, in seconds (1-3600)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub response_timeout: Option<u64>,

    /// Idle time allowed between body reads, in seconds (1-3600)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub read_timeout: Option<u64>,
}

/// Arguments for `download`.
#[derive(clap::Args, Debug)]
pub struct DownloadArgs {
    /// Page URLs to parse for media
    #[arg(required = true, value_name = "PAGE_URL")]
    pub pages: Vec<String>,

    /// Output directory (overrides config; defaults to the current directory)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    #[command(flatten)]
    pub network: NetworkArgs,
}

/// Arguments for `archive`.
#[derive(clap::Args, Debug)]
pub struct ArchiveArgs {
    /// Page URLs to parse for media
    #[arg(required = true, value_name = "PAGE_URL")]
    pub pages: Vec<String>,

    /// Output directory (overrides config; defaults to the current directory)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Archive file name
    #[arg(long, default_value = media_acquire::batch::DEFAULT_ARCHIVE_NAME)]
    pub name: String,

    #[command(flatten)]
    pub network: NetworkArgs,
}
