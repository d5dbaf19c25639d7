//! PaperScout API Gateway
//!
//! HTTP entry point for the research service.
//! Handles:
//! - Authentication
//! - Rate limiting
//! - Request routing
//! - Observability (logging, metrics)

mod handlers;
mod middleware;

use anyhow::Context;
use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use paperscout_common::{
    auth::JwtManager,
    config::AppConfig,
    db::{DbPool, Repository},
    feed::ArxivClient,
    generation::create_generator,
    history::{ChatHistorySink, InMemoryChatHistory},
    metrics,
    pipeline::ResearchService,
    store::{InMemoryPaperStore, PaperStore},
};
use std::net::SocketAddr;
use std::sync::Arc;
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
    /// None when running on in-memory stores
    pub db: Option<DbPool>,
    pub research: Arc<ResearchService>,
    pub jwt: Arc<JwtManager>,
}

impl FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config);

    info!("Starting PaperScout API Gateway v{}", paperscout_common::VERSION);

    let config = Arc::new(config);

    // Initialize metrics
    if config.observability.metrics_port > 0 {
        PrometheusBuilder::new()
            .with_http_listener(SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port)))
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!(port = config.observability.metrics_port, "Prometheus exporter listening");
    }
    metrics::register_metrics();

    let (db, store, history): (Option<DbPool>, Arc<dyn PaperStore>, Arc<dyn ChatHistorySink>) =
        if config.database.is_configured() {
            let pool = DbPool::connect(&config.database).await?;
            if config.database.run_migrations {
                pool.ensure_schema().await?;
            }
            let repo = Arc::new(Repository::new(pool.clone()));
            let store: Arc<dyn PaperStore> = repo.clone();
            let history: Arc<dyn ChatHistorySink> = repo;
            (Some(pool), store, history)
        } else {
            warn!("No database configured, papers and chat history are kept in memory");
            let store: Arc<dyn PaperStore> = Arc::new(InMemoryPaperStore::new());
            let history: Arc<dyn ChatHistorySink> = Arc::new(InMemoryChatHistory::new());
            (None, store, history)
        };

    let feed = Arc::new(ArxivClient::new(&config.feed)?);
    let generator = create_generator(&config.generation)?;
    info!(model = generator.model_name(), "Generator ready");

    let research = Arc::new(ResearchService::new(feed, store, generator, history, &config));

    let secret = config
        .auth
        .jwt_secret
        .as_deref()
        .filter(|secret| !secret.is_empty())
        .context("auth.jwt_secret must be set")?;
    let jwt = Arc::new(JwtManager::new(secret, config.auth.jwt_expiration_secs));

    let state = AppState {
        config: config.clone(),
        db,
        research,
        jwt,
    };

    // Build the router
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.observability.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    if config.observability.json_logging {
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

    let rate_limit = &state.config.rate_limit;
    let requests_per_second = rate_limit.requests_per_second;
    let limiter = rate_limit.enabled.then(|| {
        middleware::rate_limit::create_rate_limiter(requests_per_second, rate_limit.burst)
    });

    let api_routes = Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))

        // Paper endpoints
        .route("/papers/fetch", get(handlers::papers::fetch_papers))
        .route("/papers/search", post(handlers::papers::search_papers))
        .route("/papers/compare", post(handlers::papers::compare_papers))
        .route("/papers/{id}", get(handlers::papers::get_paper))
        .route("/papers/{id}/ask", post(handlers::papers::ask_paper))
        .route_layer(axum::middleware::from_fn(middleware::metrics::track_metrics));

    let api_routes = match limiter {
        Some(limiter) => api_routes.layer(axum::middleware::from_fn(move |req, next| {
            middleware::rate_limit::rate_limit_middleware(req, next, limiter.clone(), requests_per_second)
        })),
        None => api_routes,
    };

    // Compose the app
    Router::new()
        .nest("/api", api_routes)
        .layer(TimeoutLayer::new(state.config.request_timeout()))
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
            Ok(mut sig) => {
                sig.recv().await;
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
