use super::token::AccessToken;
use crate::renewing_source::RenewingSource;
use log::info;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use thiserror::Error;

/// No access token was available to authorize an outgoing request.
///
/// Raised instead of letting a request leave unauthenticated; the caller
/// decides whether to fail or retry the operation.
#[derive(Debug, Error)]
#[error("client credentials token request failed; no token available")]
pub struct TokenUnavailable;

/// Attaches the current access token to outgoing requests.
///
/// Requests that already carry an `Authorization` header are passed through
/// untouched.
#[derive(Debug)]
pub struct BearerAuth {
    source: RenewingSource<AccessToken>,
}

impl BearerAuth {
    /// Creates the helper around a token source.
    pub fn new(source: RenewingSource<AccessToken>) -> Self {
        Self { source }
    }

    /// Returns the current `Authorization` header value.
    ///
    /// # Errors
    ///
    /// Returns [`TokenUnavailable`] when no token is currently cached (and
    /// the bounded immediate fetch did not produce one).
    pub async fn header_value(&self) -> Result<HeaderValue, TokenUnavailable> {
        let resource = self.source.get().await.ok_or(TokenUnavailable)?;

        let mut value = HeaderValue::from_str(&format!("Bearer {}", resource.value().as_str()))
            .map_err(|_| TokenUnavailable)?;
        value.set_sensitive(true);
        Ok(value)
    }

    /// Authorizes `request` with the current token.
    ///
    /// # Errors
    ///
    /// Returns [`TokenUnavailable`] when the request needs a token and none
    /// is available; the request is left unmodified in that case.
    pub async fn authorize(&self, request: &mut reqwest::Request) -> Result<(), TokenUnavailable> {
        if request.headers().contains_key(AUTHORIZATION) {
            info!("Authorization header already set on request; leaving it untouched");
            return Ok(());
        }

        let value = self.header_value().await?;
        request.headers_mut().insert(AUTHORIZATION, value);
        Ok(())
    }

    /// Returns the underlying token source.
    pub fn source(&self) -> &RenewingSource<AccessToken> {
        &self.source
    }
}
