/// Shared JWT validation for the push gateway
///
/// Bearer credentials are HMAC-signed JWTs (HS256, HS384 or HS512) sharing one secret with
/// the service that issues them. Any other algorithm family is rejected outright.
///
/// ## Security Design
///
/// - **HMAC family only**: RSA/EC/`none` headers never reach signature verification
/// - **Time claims**: `exp` and `nbf` are enforced when present, with no leeway. A token
///   without `exp` never expires.
/// - **Explicit keys**: a `HmacJwt` value is built at startup and handed to whoever needs it
///
/// ## Usage
///
/// ```rust,ignore
/// use crypto_core::jwt::HmacJwt;
///
/// let jwt = HmacJwt::new(&std::env::var("JWT_SECRET")?)?;
/// let subject = jwt.subject("eyJhbGciOi...")?;
/// ```
use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Constants
// ============================================================================

/// Algorithms accepted on validation. Every entry shares the HMAC key family.
pub const ACCEPTED_ALGORITHMS: [Algorithm; 3] =
    [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Algorithm used when issuing tokens
const ISSUE_ALGORITHM: Algorithm = Algorithm::HS256;

// ============================================================================
// Data Structures
// ============================================================================

/// Subject claim as found on the wire
///
/// Issuers put either a numeric user id or a string in `sub`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Subject {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Integer(id) => write!(f, "{id}"),
            // Fractional ids are truncated toward zero
            Subject::Float(id) => write!(f, "{}", id.trunc() as i64),
            Subject::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for Subject {
    fn from(id: i64) -> Self {
        Subject::Integer(id)
    }
}

impl From<&str> for Subject {
    fn from(id: &str) -> Self {
        Subject::Text(id.to_string())
    }
}

/// JWT claims consumed by the gateway
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user id, numeric or string)
    pub sub: Subject,
    /// Expiration time (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Not valid before (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    /// Issued at (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Username, when the issuer includes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

// ============================================================================
// Keys
// ============================================================================

/// HMAC signing/verification keys plus the validation rules applied to every token
#[derive(Clone)]
pub struct HmacJwt {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for HmacJwt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacJwt")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

impl HmacJwt {
    /// Build keys from a shared secret
    ///
    /// ## Errors
    ///
    /// Returns error if the secret is empty.
    pub fn new(secret: &str) -> Result<Self> {
        if secret.is_empty() {
            return Err(anyhow!("JWT secret must not be empty"));
        }

        let mut validation = Validation::new(ISSUE_ALGORITHM);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.required_spec_claims.clear();
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    // ========================================================================
    // Token Validation
    // ========================================================================

    /// Validate and decode a JWT token (without the "Bearer " prefix)
    ///
    /// ## Errors
    ///
    /// Returns error if:
    /// - Token format is malformed
    /// - Header names an algorithm outside the HMAC family
    /// - Signature does not match the secret
    /// - Token is expired, or its `nbf` is still in the future
    pub fn validate(&self, token: &str) -> Result<TokenData<Claims>> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| anyhow!("Token validation failed: {e}"))
    }

    /// Validate a token and return its subject rendered as a string
    pub fn subject(&self, token: &str) -> Result<String> {
        let token_data = self.validate(token)?;
        let subject = token_data.claims.sub.to_string();
        if subject.is_empty() {
            return Err(anyhow!("Token subject is empty"));
        }
        Ok(subject)
    }

    // ========================================================================
    // Token Generation
    // ========================================================================

    /// Issue an HS256 token for `subject` that expires after `ttl`
    pub fn issue(
        &self,
        subject: impl Into<Subject>,
        username: Option<&str>,
        ttl: Duration,
    ) -> Result<String> {
        self.issue_with_algorithm(ISSUE_ALGORITHM, subject, username, ttl)
    }

    /// Issue a token with an explicit HMAC algorithm
    ///
    /// A negative `ttl` yields an already-expired token.
    pub fn issue_with_algorithm(
        &self,
        algorithm: Algorithm,
        subject: impl Into<Subject>,
        username: Option<&str>,
        ttl: Duration,
    ) -> Result<String> {
        if !ACCEPTED_ALGORITHMS.contains(&algorithm) {
            return Err(anyhow!("Unsupported signing algorithm: {algorithm:?}"));
        }

        let now = Utc::now();
        let claims = Claims {
            sub: subject.into(),
            exp: Some((now + ttl).timestamp()),
            nbf: None,
            iat: Some(now.timestamp()),
            username: username.map(str::to_string),
        };

        encode(&Header::new(algorithm), &claims, &self.encoding_key)
            .map_err(|e| anyhow!("Failed to issue token: {e}"))
    }
}

// ============================================================================
// Tests
// ============================================================================
