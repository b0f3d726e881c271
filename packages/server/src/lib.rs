#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the SpotOn carpark finder.
//!
//! Exposes the carpark ranking pipeline to the browser client. The server
//! holds a single [`CarparkRanker`] shared by every worker, so the limit on
//! concurrent OneMap lookups applies across all requests. No per-user
//! state is kept.

mod handlers;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use spot_on_availability::HttpAvailabilityFeed;
use spot_on_onemap::OneMapClient;
use spot_on_ranking::{CarparkRanker, RankingOptions};
use spot_on_registry::{DEFAULT_REGISTRY_PATH, InMemoryRegistry};

/// Timeout for availability feed requests.
const AVAILABILITY_TIMEOUT: Duration = Duration::from_secs(15);

/// Shared application state.
pub struct AppState {
    /// The ranking pipeline and its collaborators.
    pub ranker: Arc<CarparkRanker>,
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/carparks", web::post().to(handlers::carparks))
            .route("/token", web::get().to(handlers::token)),
    );
}

/// Builds a ranker from the environment.
///
/// Loads the registry snapshot from `SPOT_ON_REGISTRY_PATH` (default
/// [`DEFAULT_REGISTRY_PATH`]), reads OneMap credentials from
/// `ONEMAP_EMAIL`/`ONEMAP_PASSWORD` and ranking options from the
/// `SPOT_ON_*` variables.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the registry snapshot cannot be
/// loaded or an HTTP client cannot be built.
pub async fn ranker_from_env() -> std::io::Result<CarparkRanker> {
    let registry_path = std::env::var("SPOT_ON_REGISTRY_PATH")
        .ok()
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| DEFAULT_REGISTRY_PATH.to_string());

    log::info!("Loading carpark registry from {registry_path}...");
    let registry = InMemoryRegistry::load_json(Path::new(&registry_path))
        .await
        .map_err(std::io::Error::other)?;
    if registry.is_empty() {
        log::warn!("Carpark registry at {registry_path} is empty");
    }

    let http = reqwest::Client::builder()
        .timeout(AVAILABILITY_TIMEOUT)
        .build()
        .map_err(std::io::Error::other)?;
    let availability = HttpAvailabilityFeed::from_env(http);
    let routing = OneMapClient::from_env().map_err(std::io::Error::other)?;

    let options = RankingOptions::from_env();
    log::info!(
        "Ranking with threshold {}, top {}, {} concurrent resolutions, {:?} timeout",
        options.similarity_threshold,
        options.top_k,
        options.max_concurrent_resolutions,
        options.resolve_timeout
    );

    Ok(CarparkRanker::new(
        Arc::new(registry),
        Arc::new(availability),
        Arc::new(routing),
        options,
    ))
}

/// Starts the SpotOn API server.
///
/// Builds the ranker via [`ranker_from_env`] and serves on `BIND_ADDR`
/// (default `127.0.0.1`) and `PORT` (default `5000`). The caller provides
/// the async runtime and initialises logging.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the ranker cannot be built or the
/// HTTP server fails to bind or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    let ranker = ranker_from_env().await?;

    let state = web::Data::new(AppState {
        ranker: Arc::new(ranker),
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(5000);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
