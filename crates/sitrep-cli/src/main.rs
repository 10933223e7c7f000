//! sitrep - one status report across stacks, pull requests and issues.
//!
//! Reads `sitrep.toml` (or `--config`), gathers every configured source
//! concurrently and prints the report to stdout. Logs go to stderr.

mod config;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use sitrep_core::{
    compile_id_pattern, generate_report, render_json, render_markdown, ReportLimits, RunOptions,
    DEFAULT_SOURCE_TIMEOUT,
};
use tracing::{info, warn, Level};

use crate::config::SitrepConfig;

const DEFAULT_WINDOW: &str = "24h";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Markdown,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "sitrep")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Aggregated status report across stacks, pull requests and issues", long_about = None)]
struct Cli {
    /// Time window, e.g. 24h, 3d, 2w
    #[arg(short, long)]
    window: Option<String>,

    /// Per-source timeout in seconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Markdown)]
    format: Format,

    /// Configuration file (default: ./sitrep.toml when present)
    #[arg(short, long, env = "SITREP_CONFIG")]
    config: Option<PathBuf>,

    /// Maximum attention items shown
    #[arg(long)]
    max_attention: Option<usize>,

    /// Maximum records shown per source section
    #[arg(long)]
    max_per_section: Option<usize>,

    /// Identifier pattern used to link records across sources
    #[arg(long)]
    id_pattern: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    /// Flags override the file; the file overrides built-in defaults.
    fn run_options(&self, config: &SitrepConfig) -> Result<(String, RunOptions)> {
        let window = self
            .window
            .clone()
            .or_else(|| config.window.clone())
            .unwrap_or_else(|| DEFAULT_WINDOW.to_string());

        let defaults = ReportLimits::default();
        let limits = ReportLimits {
            max_attention: self
                .max_attention
                .or(config.limits.max_attention)
                .unwrap_or(defaults.max_attention),
            max_per_section: self
                .max_per_section
                .or(config.limits.max_per_section)
                .unwrap_or(defaults.max_per_section),
        };

        let per_source_timeout = self
            .timeout
            .or(config.timeout_secs)
            .map_or(DEFAULT_SOURCE_TIMEOUT, Duration::from_secs);

        let id_pattern = self
            .id_pattern
            .as_deref()
            .or(config.id_pattern.as_deref())
            .map(|p| compile_id_pattern(p).with_context(|| format!("invalid id pattern '{p}'")))
            .transpose()?;

        Ok((
            window,
            RunOptions {
                limits,
                per_source_timeout,
                id_pattern,
                ..Default::default()
            },
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    sitrep_core::init_tracing(cli.json_logs, level);

    let config = config::load(cli.config.as_deref())?;
    let (window, options) = cli.run_options(&config)?;
    let sources = config.build_sources(|var| std::env::var(var).ok())?;

    let cancel = options.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling in-flight sources");
            cancel.cancel();
        }
    });

    info!(sources = sources.len(), window = %window, "generating report");
    let report = generate_report(&sources, &window, &options)
        .await
        .context("failed to generate report")?;

    let rendered = match cli.format {
        Format::Markdown => render_markdown(&report),
        Format::Json => render_json(&report).context("failed to serialize report")?,
    };
    println!("{rendered}");

    Ok(())
}
