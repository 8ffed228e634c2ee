pub mod auth;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod state;
pub mod websocket;

pub use auth::{IdentityVerifier, JwtIdentityVerifier};
pub use config::Config;
pub use dispatcher::EventDispatcher;
pub use error::{AppError, Result};
pub use models::Identity;
pub use state::AppState;
pub use websocket::{ConnectionHandle, ConnectionRegistry, Event};
