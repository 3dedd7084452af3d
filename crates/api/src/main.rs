use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use epitrend_core::domain::series::{ForecastRecord, TimelinePoint};
use epitrend_core::ingest::provider::HttpJsonDataProvider;
use epitrend_core::refresh::{CountrySnapshot, Dashboard, RefreshOptions, Refresher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = epitrend_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let provider = match HttpJsonDataProvider::from_settings(&settings) {
        Ok(p) => p,
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            return Err(e);
        }
    };
    let refresher = Refresher::new(Arc::new(provider), RefreshOptions::from_settings(&settings));

    let (tx, rx) = watch::channel(Dashboard::default());
    let countries = settings.dashboard_countries.clone();
    tracing::info!(?countries, interval = ?settings.refresh_interval, "starting refresh loop");

    let refresh_task = tokio::spawn(async move {
        if let Err(e) = refresher.run(countries, tx, shutdown_signal()).await {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "refresh loop exited with error");
        }
    });

    let state = AppState { dashboard: rx };
    let app = router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    refresh_task.abort();
    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/countries", get(list_countries))
        .route("/countries/:country", get(get_country))
        .route("/countries/:country/timeline", get(get_timeline))
        .route("/countries/:country/forecast", get(get_forecast))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Clone)]
struct AppState {
    dashboard: watch::Receiver<Dashboard>,
}

impl AppState {
    fn snapshot(&self, country: &str) -> Result<Arc<CountrySnapshot>, StatusCode> {
        self.dashboard
            .borrow()
            .get(country)
            .cloned()
            .ok_or(StatusCode::NOT_FOUND)
    }
}

#[derive(Debug, Serialize)]
struct ApiCountrySummary {
    country: String,
    generated_at: DateTime<Utc>,
    first_date: Option<NaiveDate>,
    last_date: Option<NaiveDate>,
    latest_cases: Option<u64>,
    forecast_len: usize,
}

#[derive(Debug, Serialize)]
struct ApiCountryList {
    updated_at: Option<DateTime<Utc>>,
    countries: Vec<ApiCountrySummary>,
}

async fn list_countries(State(state): State<AppState>) -> Json<ApiCountryList> {
    let dashboard = state.dashboard.borrow();
    let countries = dashboard
        .countries
        .values()
        .map(|snap| {
            let aligned = &snap.view.aligned;
            ApiCountrySummary {
                country: snap.country.clone(),
                generated_at: snap.generated_at,
                first_date: aligned.first().map(|r| r.date),
                last_date: aligned.last().map(|r| r.date),
                latest_cases: aligned.last().map(|r| r.cases),
                forecast_len: snap.view.forecast.len(),
            }
        })
        .collect();

    Json(ApiCountryList {
        updated_at: dashboard.updated_at,
        countries,
    })
}

async fn get_country(
    State(state): State<AppState>,
    Path(country): Path<String>,
) -> Result<Json<CountrySnapshot>, StatusCode> {
    let snap = state.snapshot(&country)?;
    Ok(Json(CountrySnapshot::clone(&snap)))
}

async fn get_timeline(
    State(state): State<AppState>,
    Path(country): Path<String>,
) -> Result<Json<Vec<TimelinePoint>>, StatusCode> {
    let snap = state.snapshot(&country)?;
    Ok(Json(snap.view.timeline.clone()))
}

async fn get_forecast(
    State(state): State<AppState>,
    Path(country): Path<String>,
) -> Result<Json<Vec<ForecastRecord>>, StatusCode> {
    let snap = state.snapshot(&country)?;
    Ok(Json(snap.view.forecast.clone()))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
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
