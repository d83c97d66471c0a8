use super::assertion::{AssertionError, ClientAssertionSigner};
use super::token::{resolve_expiry, AccessToken, TokenResponse};
use crate::clock::Clock;
use crate::renewing_source::Fetcher;
use crate::resource::ExpiringResource;
use log::{debug, info};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Errors from one token request round-trip.
#[derive(Debug, Error)]
pub enum TokenRequestError {
    /// Assertion generation failed.
    #[error(transparent)]
    Assertion(#[from] AssertionError),

    /// Transport-level failure reaching the token endpoint (including
    /// undecodable response bodies).
    #[error("token request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The token endpoint answered with a non-success status.
    #[error("token endpoint returned status {0}")]
    Status(reqwest::StatusCode),
}

/// Fetches access tokens with the OAuth2 client-credentials grant,
/// authenticating through a signed JWT client assertion.
///
/// One instance performs one-shot requests; adapt it with
/// [`ClientCredentialsFetcher::into_fetcher`] to drive a
/// [`RenewingSource`](crate::RenewingSource).
pub struct ClientCredentialsFetcher {
    http: reqwest::Client,
    signer: ClientAssertionSigner,
    clock: Arc<dyn Clock>,
}

impl ClientCredentialsFetcher {
    /// Creates a fetcher from an HTTP client, an assertion signer, and a
    /// clock.
    pub fn new(http: reqwest::Client, signer: ClientAssertionSigner, clock: Arc<dyn Clock>) -> Self {
        Self {
            http,
            signer,
            clock,
        }
    }

    /// Performs one token request.
    ///
    /// `Ok(None)` means the endpoint answered successfully but without a
    /// usable access token.
    ///
    /// # Errors
    ///
    /// Returns a [`TokenRequestError`] when the assertion cannot be signed,
    /// the endpoint cannot be reached, it answers with a non-success status,
    /// or the response body does not decode.
    pub async fn fetch_token(
        &self,
    ) -> Result<Option<ExpiringResource<AccessToken>>, TokenRequestError> {
        let assertion = self.signer.assertion()?;
        let config = self.signer.config();

        debug!("Requesting client credentials token");
        let response = self
            .http
            .post(&config.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", config.client_id.as_str()),
                ("client_assertion_type", CLIENT_ASSERTION_TYPE),
                ("client_assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TokenRequestError::Status(status));
        }

        let body: TokenResponse = response.json().await?;
        let Some(token) = body.access_token.filter(|token| !token.is_empty()) else {
            info!("Token endpoint answered without an access token");
            return Ok(None);
        };

        let expires_at = resolve_expiry(&token, body.expires_in, self.clock.now());
        Ok(Some(ExpiringResource::new(
            AccessToken::new(token),
            expires_at,
        )))
    }

    /// Adapts this fetcher into the delegate shape
    /// [`RenewingSource`](crate::RenewingSource) consumes.
    pub fn into_fetcher(self) -> Fetcher<AccessToken> {
        let requestor = Arc::new(self);
        let fetcher: Fetcher<AccessToken> = Arc::new(move || {
            let requestor = Arc::clone(&requestor);
            Box::pin(async move { requestor.fetch_token().await.map_err(Into::into) })
        });
        fetcher
    }
}

impl fmt::Debug for ClientCredentialsFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentialsFetcher")
            .field("http", &"<reqwest::Client>")
            .field("signer", &self.signer)
            .field("clock", &"<Clock>")
            .finish()
    }
}
