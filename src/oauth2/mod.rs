//! OAuth2 client-credentials delegate.
//!
//! Everything needed to drive a
//! [`RenewingSource`](crate::RenewingSource) from an OAuth2 token endpoint:
//! RS256 client-assertion signing ([`ClientAssertionSigner`]), the token
//! request itself ([`ClientCredentialsFetcher`]), expiry resolution from the
//! issued token, and bearer-header injection for outgoing requests
//! ([`BearerAuth`]).
//!
//! Available with the `oauth2` feature (default).
//!
//! The flow: the fetcher signs a short-lived JWT assertion
//! (`iss`/`sub` = client id, `aud` = token URL), posts the
//! `client_credentials` grant to the token endpoint, and turns the response
//! into an [`ExpiringResource`](crate::ExpiringResource) whose expiration
//! comes from the access token's own `exp` claim when it is a JWT, or from
//! the response's `expires_in` otherwise.
//!
//! Primary types are re-exported at the crate root.

mod assertion;
mod fetcher;
mod interceptor;
mod key;
mod token;

pub use assertion::{AssertionConfig, AssertionError, ClientAssertionSigner};
pub use fetcher::{ClientCredentialsFetcher, TokenRequestError};
pub use interceptor::{BearerAuth, TokenUnavailable};
pub use key::{AssertionKey, AssertionKeyError};
pub use token::{AccessToken, TokenResponse};
