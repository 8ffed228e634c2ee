use std::sync::Arc;

use crate::auth::{IdentityVerifier, JwtIdentityVerifier};
use crate::config::Config;
use crate::dispatcher::EventDispatcher;
use crate::error::ConfigError;
use crate::websocket::ConnectionRegistry;

/// Shared application state handed to every worker
///
/// One registry per process. Workers share it through clones of this struct.
#[derive(Clone)]
pub struct AppState {
    pub registry: ConnectionRegistry,
    pub dispatcher: EventDispatcher,
    pub verifier: Arc<dyn IdentityVerifier>,
}

impl AppState {
    pub fn new(registry: ConnectionRegistry, verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self {
            dispatcher: EventDispatcher::new(registry.clone()),
            registry,
            verifier,
        }
    }

    /// Build state with a JWT verifier keyed by `config.jwt_secret`
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let verifier = JwtIdentityVerifier::from_secret(&config.jwt_secret)
            .map_err(|e| ConfigError::Jwt(e.to_string()))?;
        Ok(Self::new(ConnectionRegistry::new(), Arc::new(verifier)))
    }
}
