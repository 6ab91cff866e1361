use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use postcode_picker::{
    DisplayOption, GeoNamesClient, PluginConfiguration, PostalRecord, ResultCache, SettingsForm,
    decode, encode, group_for_display, is_searchable, search, selection_for_display,
};

/// Server configuration
struct ServerConfig {
    port: u16,
}

impl ServerConfig {
    fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
        }
    }
}

/// Application state shared across all requests
#[derive(Clone)]
struct AppState {
    client: Arc<GeoNamesClient>,
    cache: ResultCache,
    settings: Arc<RwLock<PluginConfiguration>>,
    metrics: Arc<Metrics>,
}

/// Server metrics
struct Metrics {
    total_requests: AtomicU64,
    requests_in_flight: AtomicU64,
    cache_misses: AtomicU64,
    start_time: Instant,
}

/// RAII guard for tracking in-flight requests
struct RequestGuard<'a>(&'a AtomicU64);

impl<'a> Drop for RequestGuard<'a> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

impl Metrics {
    fn begin(&self) -> RequestGuard<'_> {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.requests_in_flight.fetch_add(1, Ordering::Relaxed);
        RequestGuard(&self.requests_in_flight)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "postcode_picker=info,server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    let settings = PluginConfiguration::from_env().normalized();
    tracing::info!(
        "Searching in {} as {} (grouping: {})",
        settings.country(),
        settings.username(),
        settings.group_cities_by_postcode()
    );

    let client = Arc::new(GeoNamesClient::new().context("Failed to initialize GeoNames client")?);

    let app = build_app(client, settings);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Build the Axum application with routes and middleware
fn build_app(client: Arc<GeoNamesClient>, settings: PluginConfiguration) -> Router {
    let metrics = Arc::new(Metrics {
        total_requests: AtomicU64::new(0),
        requests_in_flight: AtomicU64::new(0),
        cache_misses: AtomicU64::new(0),
        start_time: Instant::now(),
    });

    let state = AppState {
        client,
        cache: ResultCache::global().clone(),
        settings: Arc::new(RwLock::new(settings)),
        metrics,
    };

    Router::new()
        .route("/health", get(health_check))
        .route("/api/postcodes", get(search_postcodes))
        .route("/api/field/decode", post(decode_field))
        .route("/api/field/encode", post(encode_field))
        .route("/api/settings", get(get_settings).put(update_settings))
        .route("/api/metrics", get(get_metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

#[derive(Serialize)]
struct OptionsResponse {
    success: bool,
    data: Vec<DisplayOption>,
}

/// Search options for the current input
async fn search_postcodes(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<OptionsResponse> {
    let _guard = state.metrics.begin();
    let settings = state.settings.read().await.clone();
    let country = settings.country();

    if is_searchable(&params.q) && state.cache.get(&params.q).await.is_none() {
        state.metrics.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    tracing::info!("Searching {:?} in {}", params.q, country);
    let records = search(
        state.client.as_ref(),
        &state.cache,
        &params.q,
        settings.username(),
        &country,
    )
    .await;

    Json(OptionsResponse {
        success: true,
        data: group_for_display(&records, settings.group_cities_by_postcode()),
    })
}

/// Options for a stored field value, whatever shape it is in
async fn decode_field(
    State(state): State<AppState>,
    Json(raw): Json<Value>,
) -> Json<OptionsResponse> {
    let _guard = state.metrics.begin();
    let group = state.settings.read().await.group_cities_by_postcode();

    Json(OptionsResponse {
        success: true,
        data: selection_for_display(&decode(&raw), group),
    })
}

#[derive(Serialize)]
struct EncodeResponse {
    success: bool,
    value: String,
}

/// Canonical stored form of a selection
async fn encode_field(
    State(state): State<AppState>,
    Json(records): Json<Vec<PostalRecord>>,
) -> Json<EncodeResponse> {
    let _guard = state.metrics.begin();

    Json(EncodeResponse {
        success: true,
        value: encode(&records),
    })
}

async fn get_settings(State(state): State<AppState>) -> Json<PluginConfiguration> {
    Json(state.settings.read().await.clone())
}

/// The two inputs of the settings screen
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsUpdate {
    #[serde(default)]
    geonames_username: String,
    #[serde(default)]
    country: String,
}

async fn update_settings(
    State(state): State<AppState>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<PluginConfiguration>, ApiError> {
    let _guard = state.metrics.begin();
    let mut settings = state.settings.write().await;

    let mut form = SettingsForm::load(&settings);
    form.set_username(update.geonames_username);
    form.set_country(&update.country);

    if !form.can_save() {
        return Err(ApiError::BadRequest("No changes to save".to_string()));
    }

    *settings = form.to_parameters().normalized();
    tracing::info!("Settings saved: country {}", settings.country());

    Ok(Json(settings.clone()))
}

async fn get_metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        total_requests: state.metrics.total_requests.load(Ordering::Relaxed),
        requests_in_flight: state.metrics.requests_in_flight.load(Ordering::Relaxed),
        cache_misses: state.metrics.cache_misses.load(Ordering::Relaxed),
        cached_queries: state.cache.len().await,
        uptime_seconds: state.metrics.start_time.elapsed().as_secs(),
    })
}

#[derive(Serialize)]
struct MetricsResponse {
    total_requests: u64,
    requests_in_flight: u64,
    cache_misses: u64,
    cached_queries: usize,
    uptime_seconds: u64,
}

/// API error types
enum ApiError {
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(serde_json::json!({
            "success": false,
            "error": message
        }));

        (status, body).into_response()
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down gracefully...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}
