//! Principal extractor
//!
//! Handlers that take a [`Principal`] argument are authenticated: the bearer
//! token is verified and the principal cached in the request extensions.

use axum::{extract::FromRequestParts, http::request::Parts};
use shared::error::AppError;

use crate::auth::{JwtError, JwtService, Principal};
use crate::core::ServerState;
use crate::security_log;

impl FromRequestParts<ServerState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(principal) = parts.extensions.get::<Principal>() {
            return Ok(*principal);
        }

        let auth_header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let token = match auth_header {
            Some(header) => JwtService::extract_from_header(header)
                .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?,
            None => {
                security_log!(WARN, "auth_missing", uri = %parts.uri);
                return Err(AppError::not_authenticated());
            }
        };

        match state.jwt.authenticate(token) {
            Ok(principal) => {
                parts.extensions.insert(principal);
                Ok(principal)
            }
            Err(e) => {
                security_log!(WARN, "auth_failed", error = %e, uri = %parts.uri);
                match e {
                    JwtError::ExpiredToken => Err(AppError::invalid_token("Token expired")),
                    JwtError::MalformedClaims(msg) => Err(AppError::invalid_token(msg)),
                    _ => Err(AppError::invalid_token("Invalid token")),
                }
            }
        }
    }
}
