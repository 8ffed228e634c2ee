/// Identity verification for inbound connections
///
/// The gateway never issues or hashes credentials. It only turns a bearer token into an
/// `Identity` through an `IdentityVerifier`, called once per connection attempt.
use async_trait::async_trait;
use crypto_core::jwt::HmacJwt;

use crate::error::VerifyError;
use crate::models::Identity;

/// Verify a bearer credential and return the identity it belongs to
///
/// Failure reasons (malformed, expired, wrong algorithm, bad signature) are folded into a
/// single `VerifyError`.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<Identity, VerifyError>;
}

/// Verifier backed by HMAC-signed JWTs
#[derive(Debug, Clone)]
pub struct JwtIdentityVerifier {
    jwt: HmacJwt,
}

impl JwtIdentityVerifier {
    pub fn new(jwt: HmacJwt) -> Self {
        Self { jwt }
    }

    pub fn from_secret(secret: &str) -> anyhow::Result<Self> {
        Ok(Self::new(HmacJwt::new(secret)?))
    }
}

#[async_trait]
impl IdentityVerifier for JwtIdentityVerifier {
    async fn verify(&self, credential: &str) -> Result<Identity, VerifyError> {
        self.jwt
            .subject(credential)
            .map(Identity::from)
            .map_err(|e| VerifyError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const SECRET: &str = "test-secret-key-12345";

    #[tokio::test]
    async fn test_valid_token_yields_identity() {
        let jwt = HmacJwt::new(SECRET).unwrap();
        let token = jwt.issue(123i64, Some("testuser"), Duration::hours(72)).unwrap();
        let verifier = JwtIdentityVerifier::new(jwt);

        assert_eq!(verifier.verify(&token).await.unwrap(), Identity::new("123"));
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let jwt = HmacJwt::new(SECRET).unwrap();
        let token = jwt.issue(123i64, None, Duration::hours(-1)).unwrap();
        let verifier = JwtIdentityVerifier::new(jwt);

        assert!(verifier.verify(&token).await.is_err());
    }

    #[tokio::test]
    async fn test_garbage_rejected() {
        let verifier = JwtIdentityVerifier::from_secret(SECRET).unwrap();
        assert!(verifier.verify("not-a-jwt").await.is_err());
    }

    #[test]
    fn test_empty_secret_refused() {
        assert!(JwtIdentityVerifier::from_secret("").is_err());
    }
}
