use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::models::Identity;

pub type Result<T> = std::result::Result<T, AppError>;

/// Errors surfaced on the HTTP side of the gateway
#[derive(Debug, Error)]
pub enum AppError {
    #[error("upgrade required")]
    UpgradeRequired,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("websocket handshake failed: {0}")]
    Handshake(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::UpgradeRequired => StatusCode::UPGRADE_REQUIRED,
            AppError::BadRequest(_) | AppError::Handshake(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

impl From<actix_web::Error> for AppError {
    fn from(e: actix_web::Error) -> Self {
        AppError::Handshake(e.to_string())
    }
}

/// Why an event did not reach a connection
///
/// Every variant is non-fatal. `NoRecipient` is the normal outcome for offline users.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("no live connection for user {0}")]
    NoRecipient(Identity),

    #[error("connection for user {0} is closed")]
    Closed(Identity),

    #[error("failed to serialize event: {0}")]
    Serialization(String),
}

impl DeliveryError {
    /// Offline recipients are expected and need no attention
    pub fn is_benign(&self) -> bool {
        matches!(self, DeliveryError::NoRecipient(_))
    }

    /// Metric label for this outcome
    pub fn outcome(&self) -> &'static str {
        match self {
            DeliveryError::NoRecipient(_) => "no_recipient",
            DeliveryError::Closed(_) => "closed",
            DeliveryError::Serialization(_) => "serialization",
        }
    }
}

/// Failure at the identity verifier boundary
///
/// The detail is for server logs only; clients see a uniform unauthorized close.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("credential rejected: {0}")]
pub struct VerifyError(pub String);

/// Reasons an inbound connection is refused admission
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("missing authorization header")]
    MissingCredential,

    #[error("authorization header is not a bearer credential")]
    InvalidScheme,

    #[error(transparent)]
    Verification(#[from] VerifyError),
}

impl AdmissionError {
    /// Metric label for this rejection
    pub fn reason(&self) -> &'static str {
        match self {
            AdmissionError::MissingCredential => "missing_credential",
            AdmissionError::InvalidScheme => "invalid_scheme",
            AdmissionError::Verification(_) => "verification_failed",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid environment: {0}")]
    Env(#[from] envy::Error),

    #[error("JWT_SECRET must be set")]
    MissingJwtSecret,

    #[error("HTTP_WORKERS must be at least 1")]
    InvalidWorkers,

    #[error("invalid JWT configuration: {0}")]
    Jwt(String),
}
