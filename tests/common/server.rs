//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own catalog and user databases.

use super::constants::*;
use super::fixtures::{seed_catalog, seed_users, CatalogIds};
use music_catalog_server::catalog_store::SqliteCatalogStore;
use music_catalog_server::server::{server::make_app, RequestsLoggingLevel, ServerConfig};
use music_catalog_server::user::{SqliteUserStore, UserManager};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with isolated databases
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
#[allow(dead_code)]
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Ids of the seeded catalog, all empty for [`TestServer::spawn_empty`]
    pub catalog: CatalogIds,

    /// Stores for direct database access in tests
    pub catalog_store: Arc<SqliteCatalogStore>,
    pub user_store: Arc<SqliteUserStore>,

    // Private fields - keep resources alive until drop
    _temp_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a server with one user per role and the test catalog.
    ///
    /// # Panics
    ///
    /// Panics if seeding fails, the port can't be bound or the server
    /// doesn't become ready within the timeout.
    pub async fn spawn() -> Self {
        Self::start(true).await
    }

    /// Spawns a server with no users and an empty catalog.
    #[allow(dead_code)]
    pub async fn spawn_empty() -> Self {
        Self::start(false).await
    }

    async fn start(seeded: bool) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let catalog_store = Arc::new(
            SqliteCatalogStore::new(
                temp_dir.path().join("catalog.db"),
                2,
                Duration::from_secs(5),
            )
            .expect("Failed to open catalog store"),
        );
        let user_store = Arc::new(
            SqliteUserStore::new(temp_dir.path().join("user.db"), Duration::from_secs(5))
                .expect("Failed to open user store"),
        );

        let catalog = if seeded {
            seed_users(&UserManager::new(user_store.clone())).expect("Failed to seed users");
            seed_catalog(catalog_store.as_ref()).expect("Failed to seed catalog")
        } else {
            CatalogIds::default()
        };

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            jwt_secret: TEST_JWT_SECRET.to_string(),
            ..ServerConfig::default()
        };

        let app = make_app(config, catalog_store.clone(), user_store.clone())
            .expect("Failed to build app");

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            catalog,
            catalog_store,
            user_store,
            _temp_dir: temp_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
