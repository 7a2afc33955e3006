//! agusage - Check Antigravity AI model quota from the terminal

mod auth;
mod cache;
mod config;
mod discovery;
mod error;
mod orchestrator;
mod sources;
#[cfg(test)]
mod test_utils;
mod types;
mod utils;

use auth::Credentials;
use cache::SnapshotCache;
use clap::Parser;
use colored::Colorize;
use config::Settings;
use discovery::ProcessLocator;
use error::{AuthError, DiscoveryError};
use orchestrator::{local_source, remote_source, Retriever};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use types::{OutputFormat, ProcessInfo};
use utils::format::{format_json, format_table, print_banner};

#[derive(Parser)]
#[command(name = "agusage")]
#[command(author, about = "Check Antigravity AI model quota from the terminal")]
#[command(disable_version_flag = true)]
struct Cli {
    /// Print version
    #[arg(short = 'v', long)]
    version: bool,

    /// Output as JSON
    #[arg(short, long)]
    json: bool,

    /// Show debug logging on stderr
    #[arg(long)]
    verbose: bool,

    /// Skip the Cloud Code API and query the local language server directly
    #[arg(long)]
    no_remote: bool,

    /// Only show the last cached snapshot
    #[arg(long, conflicts_with = "no_remote")]
    offline: bool,
}

impl Cli {
    fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Table
        }
    }
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "agusage=debug" } else { "agusage=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version {
        println!("agusage {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    setup_logging(cli.verbose);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", "Error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut settings = Settings::from_env();
    settings.no_remote |= cli.no_remote;
    settings.offline |= cli.offline;

    let format = cli.output_format();
    let show_progress = format == OutputFormat::Table;
    if show_progress {
        print_banner();
    }

    let credentials = auth::load_credentials(settings.credentials_path.as_deref());
    if show_progress && !settings.no_remote && !settings.offline {
        report_credentials(&credentials);
    }

    let discovery = if settings.offline {
        Err(DiscoveryError::NotFound("offline mode".to_string()))
    } else {
        if show_progress {
            println!("{}", "Scanning for Antigravity server...".dimmed());
        }
        ProcessLocator::new(&settings).discover().await
    };
    if show_progress && !settings.offline {
        report_discovery(&discovery);
    }

    let retrieval = Retriever::new(SnapshotCache::new(settings.cache_path.clone()))
        .with_remote(remote_source(credentials, &settings))
        .with_local(local_source(discovery, &settings))
        .retrieve()
        .await?;
    debug!(tier = %retrieval.tier, live = retrieval.tier.is_live(), "Retrieved usage");

    let output = match format {
        OutputFormat::Table => format_table(&retrieval.data, retrieval.tier),
        OutputFormat::Json => format_json(&retrieval.data, retrieval.tier),
    };
    println!("{}", output);

    Ok(())
}

fn report_credentials(credentials: &Result<Credentials, AuthError>) {
    match credentials {
        Ok(c) if c.is_expired() => println!(
            "{}",
            format!("Credentials expired {} min ago", -c.expires_in_minutes()).yellow()
        ),
        Ok(c) => println!(
            "{}",
            format!("Credentials loaded (expires in {} min)", c.expires_in_minutes()).green()
        ),
        Err(AuthError::NoHome | AuthError::Unreadable { .. }) => {
            println!("{}", "No Cloud Code credentials found".dimmed())
        }
        Err(err) => println!("{}", format!("Credentials unusable: {}", err).yellow()),
    }
}

fn report_discovery(discovery: &Result<ProcessInfo, DiscoveryError>) {
    match discovery {
        Ok(info) => println!(
            "{}",
            format!("Found language server (pid {}, port {})", info.pid, info.connect_port).green()
        ),
        Err(err) => println!("{}", format!("Language server unavailable: {}", err).dimmed()),
    }
}
