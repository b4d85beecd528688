//! Bearer token verification
//!
//! Tokens are issued by the external identity service and signed with a
//! shared HS256 secret. This module only verifies them and turns the claims
//! into a [`Principal`]. [`JwtService::issue`] exists for tests and tooling.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HS256 secret shared with the identity service
    pub secret: String,
    /// Expected `iss` claim
    pub issuer: String,
    /// Lifetime of tokens produced by [`JwtService::issue`]
    pub expiration_minutes: i64,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: issuer.into(),
            expiration_minutes: 60,
        }
    }
}

/// Claims carried by marketplace bearer tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id (decimal string)
    pub sub: String,
    /// `buyer`, `vendor` or `system`
    pub role: String,
    /// Business owned by a vendor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_id: Option<i64>,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    ExpiredToken,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Malformed claims: {0}")]
    MalformedClaims(String),

    #[error("Token generation failed: {0}")]
    GenerationFailed(String),
}

/// Role of an authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Buyer,
    Vendor { business_id: i64 },
    /// Internal services (schedulers, payment/delivery callbacks)
    System,
}

/// Authenticated caller attached to each request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub role: Role,
}

impl Principal {
    pub fn buyer(user_id: i64) -> Self {
        Self {
            user_id,
            role: Role::Buyer,
        }
    }

    pub fn vendor(user_id: i64, business_id: i64) -> Self {
        Self {
            user_id,
            role: Role::Vendor { business_id },
        }
    }

    pub fn system(user_id: i64) -> Self {
        Self {
            user_id,
            role: Role::System,
        }
    }

    pub fn business_id(&self) -> Option<i64> {
        match self.role {
            Role::Vendor { business_id } => Some(business_id),
            _ => None,
        }
    }

    pub fn is_buyer(&self) -> bool {
        self.role == Role::Buyer
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }

    pub fn role_name(&self) -> &'static str {
        match self.role {
            Role::Buyer => "buyer",
            Role::Vendor { .. } => "vendor",
            Role::System => "system",
        }
    }
}

impl TryFrom<Claims> for Principal {
    type Error = JwtError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let user_id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| JwtError::MalformedClaims(format!("sub is not an id: {}", claims.sub)))?;

        let role = match (claims.role.as_str(), claims.business_id) {
            ("buyer", _) => Role::Buyer,
            ("vendor", Some(business_id)) => Role::Vendor { business_id },
            ("vendor", None) => {
                return Err(JwtError::MalformedClaims(
                    "vendor token without business_id".to_string(),
                ));
            }
            ("system", _) => Role::System,
            (other, _) => return Err(JwtError::MalformedClaims(format!("unknown role: {other}"))),
        };

        Ok(Self { user_id, role })
    }
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    pub config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn with_config(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Sign a token for `principal`
    pub fn issue(&self, principal: &Principal) -> Result<String, JwtError> {
        let now = Utc::now();
        let expiration = now + Duration::minutes(self.config.expiration_minutes);

        let claims = Claims {
            sub: principal.user_id.to_string(),
            role: principal.role_name().to_string(),
            business_id: principal.business_id(),
            iss: self.config.issuer.clone(),
            exp: expiration.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::GenerationFailed(e.to_string()))
    }

    /// Verify signature, expiry and issuer
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iss"]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
                ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                _ => JwtError::InvalidToken(e.to_string()),
            }
        })?;

        Ok(token_data.claims)
    }

    /// Verify a token and build its principal
    pub fn authenticate(&self, token: &str) -> Result<Principal, JwtError> {
        self.validate_token(token).and_then(Principal::try_from)
    }

    /// Strip the `Bearer ` prefix
    pub fn extract_from_header(header: &str) -> Option<&str> {
        header.strip_prefix("Bearer ")
    }
}
