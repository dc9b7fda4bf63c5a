//! Sicbo Server - Feed bootstrap and read-only snapshot endpoint

pub mod config;
pub mod http;
mod state;

pub use config::ServerConfig;
pub use http::build_router;
pub use state::AppState;
