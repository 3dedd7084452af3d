use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use epitrend_core::ingest::provider::HttpJsonDataProvider;
use epitrend_core::pipeline::forecast::check_horizon;
use epitrend_core::refresh::{RefreshOptions, Refresher};

#[derive(Debug, Parser)]
#[command(name = "epitrend_worker")]
struct Args {
    /// Country name or ISO code as the statistics provider knows it.
    #[arg(long)]
    country: String,

    /// Forecast steps to append. Defaults to FORECAST_HORIZON or 14.
    #[arg(long)]
    horizon: Option<usize>,

    /// Days of history to request. Defaults to HISTORY_LAST_DAYS or 90.
    #[arg(long)]
    last_days: Option<u32>,

    /// Print only the combined history + forecast timeline.
    #[arg(long)]
    timeline_only: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = epitrend_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    // stdout carries the JSON result.
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let mut opts = RefreshOptions::from_settings(&settings);
    if let Some(h) = args.horizon {
        opts.horizon = check_horizon(h).context("invalid --horizon")?;
    }
    if let Some(d) = args.last_days {
        anyhow::ensure!(d >= 1, "--last-days must be >= 1 (got {d})");
        opts.last_days = d;
    }

    let provider = HttpJsonDataProvider::from_settings(&settings)?;
    let refresher = Refresher::new(Arc::new(provider), opts);

    let snapshot = match refresher.refresh_country(&args.country).await {
        Ok(s) => s,
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(country = %args.country, error = %format!("{err:#}"), "refresh failed");
            return Err(err);
        }
    };

    tracing::info!(
        country = %snapshot.country,
        refresh_id = %snapshot.refresh_id,
        aligned_len = snapshot.view.aligned.len(),
        forecast_len = snapshot.view.forecast.len(),
        "refresh complete"
    );
    if snapshot.view.forecast.is_empty() {
        tracing::warn!(
            country = %snapshot.country,
            min_history = epitrend_core::pipeline::forecast::MIN_HISTORY,
            "not enough history for a forecast"
        );
    }

    let out = if args.timeline_only {
        serde_json::to_string_pretty(&snapshot.view.timeline)?
    } else {
        serde_json::to_string_pretty(&snapshot)?
    };
    println!("{out}");

    Ok(())
}

fn init_sentry(settings: &epitrend_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
