// Library exports for testing and potential reuse

pub mod backend;
pub mod config;
pub mod controllers;
pub mod error;
pub mod middleware;
pub mod routing;
pub mod server;

// Re-export commonly used types
pub use backend::{Backend, BackendBody, BackendRequest, BackendResponse, HttpBackend};
pub use config::AppConfig;
pub use error::GatewayError;
pub use server::{create_app, AppState};
