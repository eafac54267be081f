//! JWT service for access token generation and validation
//!
//! Tokens are HS256-signed with a shared secret and carry the user id and
//! username. They are stateless: a token is valid while its signature
//! checks out and `exp` is in the future.

use anyhow::Result;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::UserResponse;

/// Minimum secret length accepted for HS256 signing
pub const MIN_SECRET_LEN: usize = 32;

/// JWT configuration
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// Shared signing secret
    pub secret: String,
    /// Access token lifetime in seconds (default: 1 hour)
    #[serde(default = "default_expiry_seconds")]
    pub expiry_seconds: u64,
}

fn default_expiry_seconds() -> u64 {
    3600
}

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: i64,
    /// Username at issue time
    pub username: String,
    /// Issued at time
    pub iat: i64,
    /// Expiration time
    pub exp: i64,
    /// Unique token id
    pub jti: Uuid,
}

/// Issued access token, as returned by the login endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiry_seconds: u64,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: &JwtConfig) -> Result<Self> {
        if config.secret.len() < MIN_SECRET_LEN {
            anyhow::bail!(
                "JWT secret must be at least {} bytes, got {}",
                MIN_SECRET_LEN,
                config.secret.len()
            );
        }
        if config.expiry_seconds == 0 {
            anyhow::bail!("JWT expiry must be greater than zero");
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(JwtService {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            expiry_seconds: config.expiry_seconds,
        })
    }

    /// Generate an access token for a user
    pub fn generate_access_token(&self, user: &UserResponse) -> Result<AccessToken> {
        let now = Utc::now().timestamp();
        let expiry = i64::try_from(self.expiry_seconds)
            .map_err(|_| anyhow::anyhow!("JWT expiry does not fit a timestamp"))?;

        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            iat: now,
            exp: now + expiry,
            jti: Uuid::new_v4(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;

        Ok(AccessToken {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in: self.expiry_seconds,
        })
    }

    /// Validate a token and return the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }
}
