/// Admission handshake for inbound WebSocket connections
///
/// Upgrade check -> credential extract -> credential verify -> admitted | rejected.
/// Only admitted connections are registered and reach the lifecycle loop.
use actix_web::http::{header, Method};
use actix_web::HttpRequest;
use actix_ws::{CloseCode, CloseReason, MessageStream, Session};
use std::sync::Arc;

use super::lifecycle::{self, LiveConnection};
use super::registry::{ConnectionHandle, ConnectionRegistry};
use crate::auth::IdentityVerifier;
use crate::error::AdmissionError;
use crate::metrics;
use crate::models::Identity;

/// Close code sent when admission fails
///
/// Normal closure rather than policy violation, matching what existing clients expect.
pub const UNAUTHORIZED_CLOSE_CODE: CloseCode = CloseCode::Normal;

/// Close reason sent when admission fails
pub const UNAUTHORIZED_REASON: &str = "Unauthorized";

const BEARER_PREFIX: &str = "Bearer ";

/// Whether `req` asks to switch to the WebSocket protocol
pub fn is_websocket_upgrade(req: &HttpRequest) -> bool {
    let headers = req.headers();

    let upgrade = headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("websocket"));

    let connection = headers
        .get(header::CONNECTION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| {
            v.split(',')
                .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
        });

    req.method() == Method::GET && upgrade && connection
}

/// Raw `Authorization` header, if present
pub fn authorization_header(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
}

/// Pull the bearer credential out of an `Authorization` header value
pub fn bearer_credential(authorization: Option<&str>) -> Result<&str, AdmissionError> {
    let value = authorization
        .filter(|v| !v.is_empty())
        .ok_or(AdmissionError::MissingCredential)?;

    value
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AdmissionError::InvalidScheme)
}

/// Resolve the identity behind an `Authorization` header
///
/// The verifier is only consulted once a bearer credential has been extracted.
pub async fn authenticate(
    authorization: Option<&str>,
    verifier: &dyn IdentityVerifier,
) -> Result<Identity, AdmissionError> {
    let credential = bearer_credential(authorization)?;
    Ok(verifier.verify(credential).await?)
}

/// Close frame sent to rejected connections
pub fn unauthorized_close() -> CloseReason {
    CloseReason {
        code: UNAUTHORIZED_CLOSE_CODE,
        description: Some(UNAUTHORIZED_REASON.to_string()),
    }
}

/// Run admission on an upgraded connection
///
/// Rejected connections receive the unauthorized close frame and never touch the registry.
/// Admitted connections are registered and then served until the transport ends.
pub async fn admit(
    registry: ConnectionRegistry,
    verifier: Arc<dyn IdentityVerifier>,
    authorization: Option<String>,
    session: Session,
    inbound: MessageStream,
) {
    let identity = match authenticate(authorization.as_deref(), verifier.as_ref()).await {
        Ok(identity) => identity,
        Err(e) => {
            tracing::warn!(reason = e.reason(), error = %e, "WebSocket connection rejected");
            metrics::record_admission("rejected");

            if let Err(e) = session.close(Some(unauthorized_close())).await {
                tracing::debug!(error = ?e, "Rejected connection already closed");
            }
            return;
        }
    };

    tracing::info!(user_id = %identity, "WebSocket user connected");
    metrics::record_admission("admitted");

    let (handle, outbound) = ConnectionHandle::new();
    let connection = LiveConnection::new(registry.clone(), identity.clone(), handle.id());
    registry.add(identity, handle).await;

    lifecycle::run(connection, session, inbound, outbound).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VerifyError;
    use actix_web::test::TestRequest;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Accepts exactly one token and counts every call
    #[derive(Default)]
    struct CountingVerifier {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl IdentityVerifier for CountingVerifier {
        async fn verify(&self, credential: &str) -> Result<Identity, VerifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match credential {
                "good-token" => Ok(Identity::new("42")),
                _ => Err(VerifyError("token expired".to_string())),
            }
        }
    }

    #[test]
    fn test_bearer_credential_extraction() {
        assert_eq!(bearer_credential(Some("Bearer abc.def")), Ok("abc.def"));
        assert_eq!(
            bearer_credential(None),
            Err(AdmissionError::MissingCredential)
        );
        assert_eq!(
            bearer_credential(Some("")),
            Err(AdmissionError::MissingCredential)
        );
        assert_eq!(
            bearer_credential(Some("Basic dXNlcjpwYXNz")),
            Err(AdmissionError::InvalidScheme)
        );
        // Scheme match is case-sensitive
        assert_eq!(
            bearer_credential(Some("bearer abc")),
            Err(AdmissionError::InvalidScheme)
        );
    }

    #[tokio::test]
    async fn test_missing_header_never_calls_verifier() {
        let verifier = CountingVerifier::default();

        let result = authenticate(None, &verifier).await;

        assert_eq!(result, Err(AdmissionError::MissingCredential));
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_wrong_scheme_never_calls_verifier() {
        let verifier = CountingVerifier::default();

        let result = authenticate(Some("Token good-token"), &verifier).await;

        assert_eq!(result, Err(AdmissionError::InvalidScheme));
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_verified_credential_admitted() {
        let verifier = CountingVerifier::default();

        let result = authenticate(Some("Bearer good-token"), &verifier).await;

        assert_eq!(result, Ok(Identity::new("42")));
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_verification_failure_rejected() {
        let verifier = CountingVerifier::default();

        let result = authenticate(Some("Bearer stale-token"), &verifier).await;

        assert!(matches!(result, Err(AdmissionError::Verification(_))));
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_upgrade_detection() {
        let upgrade = TestRequest::get()
            .insert_header((header::UPGRADE, "websocket"))
            .insert_header((header::CONNECTION, "keep-alive, Upgrade"))
            .to_http_request();
        assert!(is_websocket_upgrade(&upgrade));

        let plain = TestRequest::get().to_http_request();
        assert!(!is_websocket_upgrade(&plain));

        let no_connection = TestRequest::get()
            .insert_header((header::UPGRADE, "websocket"))
            .to_http_request();
        assert!(!is_websocket_upgrade(&no_connection));

        let wrong_protocol = TestRequest::get()
            .insert_header((header::UPGRADE, "h2c"))
            .insert_header((header::CONNECTION, "Upgrade"))
            .to_http_request();
        assert!(!is_websocket_upgrade(&wrong_protocol));
    }

    #[test]
    fn test_authorization_header_read() {
        let req = TestRequest::get()
            .insert_header((header::AUTHORIZATION, "Bearer xyz"))
            .to_http_request();
        assert_eq!(authorization_header(&req).as_deref(), Some("Bearer xyz"));

        let req = TestRequest::get().to_http_request();
        assert_eq!(authorization_header(&req), None);
    }

    #[test]
    fn test_unauthorized_close_frame() {
        let reason = unauthorized_close();
        assert_eq!(reason.code, CloseCode::Normal);
        assert_eq!(reason.description.as_deref(), Some("Unauthorized"));
    }
}
