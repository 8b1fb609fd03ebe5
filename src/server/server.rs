use anyhow::{bail, Context, Result};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::{error, info};

use axum::{extract::State, middleware, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use super::auth_routes::auth_routes;
use super::catalog_routes::{album_routes, artist_routes, track_routes};
use super::favorites_routes::favorites_routes;
use super::metrics::{init_metrics, metrics_handler, refresh_catalog_metrics};
use super::user_routes::user_routes;
use super::{log_requests, state::*, ServerConfig};
use crate::catalog_store::CatalogStore;
use crate::server::session::Session;
use crate::user::{Authenticator, FavoritesLedger, TokenIssuer, UserManager, UserStore};

pub const API_PREFIX: &str = "/api/v1";

#[derive(Serialize)]
struct ServerStats {
    pub message: &'static str,
    pub uptime: String,
    pub user_id: Option<String>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(session: Option<Session>, State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        message: "Welcome to Music API",
        uptime: format_uptime(state.start_time.elapsed()),
        user_id: session.map(|s| s.user.id),
    };
    Json(stats)
}

impl ServerState {
    fn new(
        config: ServerConfig,
        catalog_store: GuardedCatalogStore,
        user_store: Arc<dyn UserStore>,
    ) -> ServerState {
        let tokens = TokenIssuer::new(&config.jwt_secret, config.token_ttl_hours);
        ServerState {
            config,
            start_time: Instant::now(),
            catalog_store: catalog_store.clone(),
            user_manager: Arc::new(UserManager::new(user_store.clone())),
            authenticator: Arc::new(Authenticator::new(user_store.clone(), tokens)),
            favorites: Arc::new(FavoritesLedger::new(catalog_store, user_store)),
        }
    }
}

pub fn make_app(
    config: ServerConfig,
    catalog_store: Arc<dyn CatalogStore>,
    user_store: Arc<dyn UserStore>,
) -> Result<Router> {
    if config.jwt_secret.is_empty() {
        bail!("Refusing to start without a token signing secret");
    }
    let state = ServerState::new(config, catalog_store, user_store);

    let api_routes: Router<ServerState> = Router::new()
        .merge(auth_routes())
        .nest("/artists", artist_routes())
        .nest("/albums", album_routes())
        .nest("/tracks", track_routes())
        .nest("/favorites", favorites_routes())
        .nest("/users", user_routes());

    let app: Router = Router::new()
        .route("/", get(home))
        .nest(API_PREFIX, api_routes)
        .layer(middleware::from_fn_with_state(state.clone(), log_requests))
        .with_state(state);

    Ok(app)
}

fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

pub async fn run_server(
    config: ServerConfig,
    catalog_store: Arc<dyn CatalogStore>,
    user_store: Arc<dyn UserStore>,
) -> Result<()> {
    init_metrics();
    refresh_catalog_metrics(catalog_store.as_ref());

    let port = config.port;
    let metrics_port = config.metrics_port;
    let app = make_app(config, catalog_store, user_store)?;

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Could not bind to port {}", port))?;
    let metrics_listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", metrics_port))
        .await
        .with_context(|| format!("Could not bind metrics to port {}", metrics_port))?;

    info!("Ready to serve at port {}!", port);
    info!("Metrics available at port {}!", metrics_port);

    tokio::select! {
        result = axum::serve(listener, app) => {
            info!("HTTP server stopped: {:?}", result);
            Ok(result?)
        }
        result = axum::serve(metrics_listener, make_metrics_app()) => {
            error!("Metrics server stopped: {:?}", result);
            Ok(result?)
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
            Ok(())
        }
    }
}
