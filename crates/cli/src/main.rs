//! inboxproxy CLI
//!
//! Stores the attachments of raw MIME messages in a chunked local object
//! store, running one job per attachment on a bounded worker pool.

mod config;
mod ingest;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::InboxConfig;

/// inboxproxy: chunked attachment storage.
#[derive(Parser, Debug)]
#[command(name = "inboxproxy", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(
        short,
        long,
        env = "INBOXPROXY_CONFIG",
        default_value = "inboxproxy.toml",
        global = true
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store the attachments of one or more raw message files.
    Ingest {
        /// Message files (RFC 5322, multipart).
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Also write the metadata JSON to this path.
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
    /// Print the effective configuration.
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = InboxConfig::load(&cli.config)?;

    match cli.command {
        Command::Ingest { files, manifest } => {
            let report = ingest::run(&config, &files, manifest.as_deref()).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&report.stored).context("failed to encode metadata")?
            );
            if !report.failed.is_empty() {
                anyhow::bail!(
                    "{} of {} message file(s) failed",
                    report.failed.len(),
                    files.len()
                );
            }
            Ok(())
        }
        Command::Config => {
            print!(
                "{}",
                toml::to_string_pretty(&config).context("failed to render config")?
            );
            Ok(())
        }
    }
}
