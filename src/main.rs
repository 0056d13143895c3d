//! CLI entry point for media-acquire.

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

mod app;
mod app_config;
mod cli;
mod commands;

use app::runtime::RuntimeSettings;
use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Config is needed before tracing to honour its verbosity setting
    let loaded = app_config::load_config(args.config.as_deref())?;

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config verbosity > info
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => loaded
                .config
                .verbosity
                .map_or("info", app_config::VerbositySetting::log_level),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, config_path = ?loaded.path, "CLI arguments parsed");
    info!("media-acquire starting");

    let show_progress = !args.quiet;
    match args.command {
        Command::Download(download) => {
            let settings = RuntimeSettings::resolve(
                &loaded.config,
                Some(&download.network),
                download.output_dir,
                args.state_dir,
            );
            commands::run_download_command(&settings, &download.pages, show_progress).await
        }
        Command::Archive(archive) => {
            let settings = RuntimeSettings::resolve(
                &loaded.config,
                Some(&archive.network),
                archive.output_dir,
                args.state_dir,
            );
            commands::run_archive_command(&settings, &archive.pages, &archive.name, show_progress)
                .await
        }
        Command::Login { token } => {
            let settings = RuntimeSettings::resolve(&loaded.config, None, None, args.state_dir);
            commands::run_login_command(&settings, token).await
        }
        Command::Logout => {
            let settings = RuntimeSettings::resolve(&loaded.config, None, None, args.state_dir);
            commands::run_logout_command(&settings).await
        }
        Command::Quota => {
            let settings = RuntimeSettings::resolve(&loaded.config, None, None, args.state_dir);
            commands::run_quota_command(&settings).await
        }
    }
}
