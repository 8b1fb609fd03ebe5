use axum::extract::FromRef;

use crate::catalog_store::CatalogStore;
use crate::user::{Authenticator, FavoritesLedger, UserManager};
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedCatalogStore = Arc<dyn CatalogStore>;
pub type GuardedUserManager = Arc<UserManager>;
pub type GuardedAuthenticator = Arc<Authenticator>;
pub type GuardedFavoritesLedger = Arc<FavoritesLedger>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub catalog_store: GuardedCatalogStore,
    pub user_manager: GuardedUserManager,
    pub authenticator: GuardedAuthenticator,
    pub favorites: GuardedFavoritesLedger,
}

impl FromRef<ServerState> for GuardedCatalogStore {
    fn from_ref(input: &ServerState) -> Self {
        input.catalog_store.clone()
    }
}

impl FromRef<ServerState> for GuardedUserManager {
    fn from_ref(input: &ServerState) -> Self {
        input.user_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedAuthenticator {
    fn from_ref(input: &ServerState) -> Self {
        input.authenticator.clone()
    }
}

impl FromRef<ServerState> for GuardedFavoritesLedger {
    fn from_ref(input: &ServerState) -> Self {
        input.favorites.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
