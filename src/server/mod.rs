pub mod api;
mod auth_routes;
mod catalog_routes;
pub mod config;
mod favorites_routes;
mod http_layers;
pub mod metrics;
pub mod server;
pub(self) mod session;
pub mod state;
mod user_routes;

pub use api::{ApiError, ApiResponse};
pub use config::ServerConfig;
pub use http_layers::*;
#[allow(unused_imports)] // Used by main.rs
pub use server::run_server;
