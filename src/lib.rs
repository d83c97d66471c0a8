#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

//! Background-renewed OAuth2 client-credentials access tokens.
//!
//! This crate keeps a single short-lived credential fresh for you: a
//! [`RenewingSource`] fetches a value with a known expiration from a
//! pluggable delegate, serves it to many concurrent readers, renews it in
//! the background, and proactively retires it a safety margin before it
//! truly expires. Callers that arrive before the first fetch completes wait
//! (bounded) for its result instead of seeing an empty cache.
//!
//! The renewal core is generic over the cached value. The `oauth2` feature
//! (default) supplies the concrete delegate for the OAuth2 client-credentials
//! grant with a signed JWT client assertion, plus a helper for attaching the
//! cached token to outgoing requests.
//!
//! ## Renewing a token in the background
//!
//! ```no_run
//! use oauth2_token_source::oauth2::{
//!     AssertionConfig, AssertionKey, BearerAuth, ClientAssertionSigner,
//!     ClientCredentialsFetcher,
//! };
//! use oauth2_token_source::{RenewingSourceBuilder, SystemClock};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let clock = Arc::new(SystemClock);
//!
//! let pem = std::fs::read("assertion-key.pem")?;
//! let key = AssertionKey::from_rsa_pem(&pem)?;
//! let config = AssertionConfig {
//!     client_id: "my-client".to_string(),
//!     token_url: "https://auth.example.org/oauth2/token".to_string(),
//!     assertion_lifetime: std::time::Duration::from_secs(3600),
//! };
//!
//! let signer = ClientAssertionSigner::new(config, key, clock.clone());
//! let fetcher = ClientCredentialsFetcher::new(reqwest::Client::new(), signer, clock.clone());
//!
//! let source = RenewingSourceBuilder::new()
//!     .fetcher(fetcher.into_fetcher())
//!     .clock(clock)
//!     .build()
//!     .await?;
//!
//! // Attach the current token to an outgoing request.
//! let auth = BearerAuth::new(source);
//! let mut request = reqwest::Request::new(
//!     reqwest::Method::GET,
//!     "https://api.example.org/v1/things".parse()?,
//! );
//! auth.authorize(&mut request).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Bring your own delegate
//!
//! Any async closure producing an [`ExpiringResource`] can drive the cache:
//!
//! ```no_run
//! use oauth2_token_source::{ExpiringResource, RenewingSourceBuilder};
//! use std::time::Duration;
//! use time::OffsetDateTime;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = RenewingSourceBuilder::new()
//!     .fetch_with(|| async {
//!         let expires_at = OffsetDateTime::now_utc() + Duration::from_secs(300);
//!         Ok(Some(ExpiringResource::new("credential".to_string(), expires_at)))
//!     })
//!     .build()
//!     .await?;
//!
//! let value = source.get().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **`oauth2`** (default): the client-credentials delegate
//!   (assertion signing, token requests, bearer injection).

pub mod clock;

pub mod resource;

pub mod renewing_source;

#[cfg(feature = "oauth2")]
pub mod oauth2;

// -----------------------
// Re-exports
// -----------------------

pub use crate::clock::{Clock, SystemClock};

pub use crate::renewing_source::{
    FetchError, FetchFuture, Fetcher, MetricsErrorKind, MetricsRecorder, RenewalConfig,
    RenewingSource, RenewingSourceBuilder, RenewingSourceError,
};

pub use crate::resource::ExpiringResource;

#[cfg(feature = "oauth2")]
pub use crate::oauth2::{AccessToken, BearerAuth, ClientCredentialsFetcher};
