//! marquee — query director tallies from the command line.
//!
//! Runs every threshold through one shared
//! [`DirectorService`](marquee::DirectorService), so the rate gate and
//! the result cache behave exactly as they would inside a server.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use marquee::{Config, MarqueeError};

/// Directors with more movies than a threshold.
#[derive(Parser)]
#[command(name = "marquee")]
#[command(version)]
#[command(about = "List directors who directed more movies than a threshold")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Upstream movie listing URL (overrides config and MARQUEE_MOVIES_URL).
    #[arg(long)]
    url: Option<String>,

    /// Concurrent page fetches per aggregation.
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Thresholds to query, in order.
    #[arg(required = true, allow_negative_numbers = true)]
    thresholds: Vec<i64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("marquee=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("marquee: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> marquee::Result<ExitCode> {
    let mut config = Config::load_or_default(args.config.as_deref())?;
    if let Some(url) = args.url {
        config.upstream.movies_url = Some(url);
    }
    if let Some(n) = args.max_concurrent {
        config.upstream.max_concurrent_requests = n;
    }

    let service = config.service_builder()?.build()?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        thresholds = args.thresholds.len(),
        "marquee starting"
    );

    let mut rate_limited = false;
    let mut failed = false;
    for threshold in args.thresholds {
        let line = match service.get_directors_by_threshold(threshold).await {
            Ok(result) => json!({ "threshold": threshold, "directors": result.directors }),
            Err(MarqueeError::RateLimitExceeded { retry_after }) => {
                rate_limited = true;
                json!({
                    "threshold": threshold,
                    "error": "rate_limit_exceeded",
                    "message": "Rate limit exceeded. Try again later",
                    "retry_after_secs": retry_after.as_secs_f64(),
                })
            }
            Err(e) => {
                failed = true;
                let kind = if e.page().is_some() { "upstream_fetch" } else { "internal" };
                json!({
                    "threshold": threshold,
                    "error": kind,
                    "page": e.page(),
                    "message": e.to_string(),
                })
            }
        };
        println!("{line}");
    }

    Ok(if rate_limited {
        ExitCode::from(2)
    } else if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
