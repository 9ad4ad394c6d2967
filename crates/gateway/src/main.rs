//! Swai API Gateway
//!
//! HTTP surface over the catalog aggregator.
//! Handles:
//! - Request routing
//! - Question answering passthrough
//! - Observability (logging, metrics)

mod handlers;
mod middleware;

use axum::{http::StatusCode, routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::Arc;
use swai_common::{
    aggregator::{Aggregator, OperationObserver, Outcome, TracingObserver},
    assistant::{create_assistant, Assistant},
    cache::ResolutionCache,
    catalog::create_catalog,
    config::{AppConfig, ObservabilityConfig},
    metrics::{self, MetricsObserver, LATENCY_BUCKETS},
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub aggregator: Arc<Aggregator>,
    pub assistant: Arc<dyn Assistant>,
    pub metrics: Option<PrometheusHandle>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Arc::new(AppConfig::load()?);

    // Initialize tracing
    init_tracing(&config.observability);

    info!(
        service = %config.observability.service_name,
        "Starting Swai API Gateway v{}",
        swai_common::VERSION
    );

    // Initialize metrics
    let handle = PrometheusBuilder::new()
        .set_buckets(LATENCY_BUCKETS)?
        .install_recorder()?;
    metrics::register_metrics();

    // Wire the catalog, cache and aggregator
    let catalog = create_catalog(&config.catalog)?;
    info!(
        provider = catalog.provider(),
        base_url = %config.catalog.base_url,
        "Catalog client ready"
    );

    let aggregator = Arc::new(
        Aggregator::new(catalog, Arc::new(ResolutionCache::new()))
            .with_observer(Arc::new(Observers))
            .with_call_timeout(config.catalog.timeout()),
    );

    let assistant = create_assistant(&config.assistant, aggregator.clone())?;

    // Create app state
    let state = AppState {
        config: config.clone(),
        aggregator,
        assistant,
        metrics: Some(handle),
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                stop_rx.await.ok();
            })
            .await
    });

    shutdown_signal().await;
    stop_tx.send(()).ok();

    match tokio::time::timeout(config.shutdown_timeout(), server).await {
        Ok(joined) => joined??,
        Err(_) => warn!(
            timeout_secs = config.server.shutdown_timeout_secs,
            "Shutdown timed out, dropping open connections"
        ),
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Metrics and tracing observers combined
struct Observers;

impl OperationObserver for Observers {
    fn on_start(&self, operation: &'static str, argument: Option<&str>) {
        TracingObserver.on_start(operation, argument);
        MetricsObserver.on_start(operation, argument);
    }

    fn on_complete(
        &self,
        operation: &'static str,
        argument: Option<&str>,
        elapsed: std::time::Duration,
        outcome: Outcome,
    ) {
        TracingObserver.on_complete(operation, argument, elapsed, outcome);
        MetricsObserver.on_complete(operation, argument, elapsed, outcome);
    }
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let timeout =
        TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, state.config.request_timeout());

    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/metrics", get(handlers::metrics::render))

        // Catalog endpoints
        .route("/films", get(handlers::catalog::films))
        .route("/films/{id}/planets", get(handlers::catalog::planets_by_film))
        .route("/films/{id}/characters", get(handlers::catalog::characters_by_film))
        .route("/planets", get(handlers::catalog::planets))
        .route("/planets/{id}/residents", get(handlers::catalog::residents_by_planet))
        .route("/characters", get(handlers::catalog::characters_by_name))

        // Question answering
        .route("/ai", get(handlers::assistant::ask))

        .route_layer(axum::middleware::from_fn(
            middleware::request_metrics::track_requests,
        ))
        .layer(timeout)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use async_trait::async_trait;
    use serde_json::Value;
    use swai_common::{
        assistant::ChatAssistant,
        catalog::{CatalogClient, FixtureCatalog, Listing, RawFilm, RawPerson, RawPlanet},
        config::AssistantConfig,
        models::ResourceId,
    };
    use tower::ServiceExt;

    /// Catalog whose calls never complete
    struct StalledCatalog;

    #[async_trait]
    impl CatalogClient for StalledCatalog {
        async fn find_all_films(&self) -> swai_common::Result<Listing<RawFilm>> {
            std::future::pending().await
        }

        async fn find_all_planets(&self) -> swai_common::Result<Listing<RawPlanet>> {
            std::future::pending().await
        }

        async fn find_film_by_id(&self, _id: ResourceId) -> swai_common::Result<Option<RawFilm>> {
            std::future::pending().await
        }

        async fn find_planet_by_id(
            &self,
            _id: ResourceId,
        ) -> swai_common::Result<Option<RawPlanet>> {
            std::future::pending().await
        }

        async fn find_person_by_id(
            &self,
            _id: ResourceId,
        ) -> swai_common::Result<Option<RawPerson>> {
            std::future::pending().await
        }

        async fn search_people(&self, _name: &str) -> swai_common::Result<Listing<RawPerson>> {
            std::future::pending().await
        }

        fn provider(&self) -> &str {
            "stalled"
        }
    }

    fn app() -> Router {
        app_with(Arc::new(FixtureCatalog::new()), AppConfig::default())
    }

    fn app_with(catalog: Arc<dyn CatalogClient>, config: AppConfig) -> Router {
        let aggregator = Aggregator::new(catalog, Arc::new(ResolutionCache::new()));
        let state = AppState {
            config: Arc::new(config),
            aggregator: Arc::new(aggregator),
            assistant: Arc::new(ChatAssistant::new(AssistantConfig::default()).unwrap()),
            metrics: None,
        };
        create_router(state)
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Option<String>, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8(body.to_vec()).unwrap())
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let (status, _, body) = get(app, uri).await;
        (status, serde_json::from_str(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json(app(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_films_render_camel_case() {
        let (status, body) = get_json(app(), "/films").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["id"], 1);
        assert_eq!(body[0]["title"], "Here we go again");
        assert_eq!(body[0]["releaseDate"], "2020-03-01");
        assert_eq!(body[1]["episode"], 2);
    }

    #[tokio::test]
    async fn test_characters_by_film_embed_homeworld() {
        let (status, body) = get_json(app(), "/films/2/characters").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[1]["name"], "Elsa Organa");
        assert_eq!(body[1]["homeworld"]["name"], "Frozen");
        assert_eq!(body[1]["homeworld"]["population"], "12,000");
    }

    #[tokio::test]
    async fn test_planets_and_residents() {
        let (status, body) = get_json(app(), "/films/1/planets").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["name"], "Sandtopia");

        let (status, body) = get_json(app(), "/planets/2/residents").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["name"], "Elsa Organa");

        let (status, body) = get_json(app(), "/planets").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_film_is_not_found() {
        let (status, body) = get_json(app(), "/films/99/characters").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_character_search() {
        let (status, body) = get_json(app(), "/characters?name=hutt").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["name"], "Java The Hutt");
        assert_eq!(body[0]["homeworld"]["id"], 1);
    }

    #[tokio::test]
    async fn test_blank_character_name_is_rejected() {
        let (status, body) = get_json(app(), "/characters?name=%20%20").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_ai_answers_in_plain_text() {
        let (status, content_type, body) = get(app(), "/ai?q=Who%20is%20Elsa%3F").await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.unwrap().starts_with("text/plain"));
        assert!(body.contains("Who is Elsa?"));
    }

    #[tokio::test]
    async fn test_ready_reports_cache() {
        let app = app();
        let (status, _) = get_json(app.clone(), "/films").await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = get_json(app, "/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["catalog"], "fixture");
        let films = body["cache"]
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["namespace"] == "films")
            .unwrap();
        assert_eq!(films["entries"], 1);
    }

    #[tokio::test]
    async fn test_request_id_is_propagated() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_malformed_path_id_renders_error_body() {
        for uri in ["/films/abc/planets", "/films/-1/characters", "/planets/x/residents"] {
            let (status, body) = get_json(app(), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn test_missing_query_renders_error_body() {
        let (status, body) = get_json(app(), "/characters").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (status, body) = get_json(app(), "/ai").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_slow_request_times_out() {
        let mut config = AppConfig::default();
        config.server.request_timeout_secs = 1;
        let app = app_with(Arc::new(StalledCatalog), config);

        let (status, _, _) = get(app, "/films").await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    }
}
