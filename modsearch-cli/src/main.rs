//! modsearch - federated search over remote module catalogs
//!
//! Serves the search endpoint over HTTP, or runs a single search from the
//! command line for scripting and troubleshooting.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use modsearch_core::config::parse_group_list;
use modsearch_core::{SearchConfig, SearchService};

mod search_cli;

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "modsearch",
    about = "Federated search over remote module catalogs",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// YAML configuration file (overridden by environment and flags)
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// Catalog document URL (overrides CATALOG_URL)
    #[clap(long, global = true)]
    catalog_url: Option<String>,

    /// Comma-separated group ids to serve (overrides MODULES_GROUPS)
    #[clap(long, global = true)]
    groups: Option<String>,

    /// Per-fetch timeout in milliseconds (overrides CATALOG_TIMEOUT_MS)
    #[clap(long, global = true)]
    timeout_ms: Option<u64>,

    /// Add the owning group id to each result
    #[clap(long, global = true)]
    annotate_group: bool,

    /// Set log level
    #[clap(long, default_value = "info", global = true)]
    log_level: LogLevel,

    /// Emit logs as JSON lines
    #[clap(long, global = true)]
    log_json: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Serve /api/search, /api/debug and /health
    Serve {
        /// Address to listen on
        #[clap(long, default_value = "127.0.0.1:3000")]
        listen: SocketAddr,
    },

    /// Run one search and print the results
    Search {
        /// Search query (matches id, name, tags)
        query: Option<String>,

        /// Maximum number of results (1-50, default 20)
        #[clap(long)]
        limit: Option<String>,

        /// Output results as JSON
        #[clap(long)]
        json: bool,

        /// Cache-bust token to reuse for every fetch
        #[clap(long)]
        ts: Option<String>,
    },

    /// Fetch the catalog and every group, and report what loaded
    Debug,
}

impl Cli {
    /// Resolve configuration: file, then environment, then flags
    fn search_config(&self) -> Result<SearchConfig> {
        let mut config = SearchConfig::load(self.config.as_deref())?;

        if let Some(url) = &self.catalog_url {
            config.catalog_url = Some(url.clone());
        }
        if let Some(groups) = &self.groups {
            config.allowed_groups = parse_group_list(groups);
        }
        if let Some(ms) = self.timeout_ms {
            config.timeout_ms = ms;
        }
        if self.annotate_group {
            config.annotate_group = true;
        }

        Ok(config.normalized())
    }
}

/// Initialize tracing with CLI flags
///
/// `RUST_LOG` directives are layered on top of `--log-level`.
fn initialize_tracing(log_level: &LogLevel, json: bool) {
    let mut filter = EnvFilter::new(log_level.to_filter_directive());

    if let Ok(extra) = std::env::var("RUST_LOG") {
        for directive in extra.split(',').filter(|d| !d.trim().is_empty()) {
            if let Ok(parsed) = directive.trim().parse() {
                filter = filter.add_directive(parsed);
            }
        }
    }

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_tracing(&cli.log_level, cli.log_json);

    let config = cli.search_config()?;
    let service = SearchService::new(config)?;

    match cli.command {
        Command::Serve { listen } => serve_command(service, listen).await,
        Command::Search {
            query,
            limit,
            json,
            ts,
        } => search_cli::execute_search(&service, query, limit, ts, json).await,
        Command::Debug => search_cli::execute_debug(&service).await,
    }
}

async fn serve_command(service: SearchService, listen: SocketAddr) -> Result<()> {
    match service.config().catalog_url.as_deref() {
        Some(url) => info!("Serving catalog {}", url),
        None => tracing::warn!("CATALOG_URL not set; /api/search will answer 500"),
    }

    let app = modsearch_core::server::router(Arc::new(service));

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("Failed to bind {listen}"))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("HTTP server failed")?;

    Ok(())
}
