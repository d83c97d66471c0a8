use super::key::AssertionKey;
use crate::clock::Clock;
use jsonwebtoken::{encode, Algorithm, Header};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Client identity and token-endpoint coordinates for assertion generation.
#[derive(Debug, Clone, Deserialize)]
pub struct AssertionConfig {
    /// OAuth2 client id; used as both the assertion's issuer and subject.
    pub client_id: String,
    /// Token endpoint URL; used as the assertion's audience and as the
    /// request target.
    pub token_url: String,
    /// Assertion validity window.
    #[serde(default = "default_assertion_lifetime")]
    pub assertion_lifetime: Duration,
}

fn default_assertion_lifetime() -> Duration {
    // By default, assertions are good for an hour.
    Duration::from_secs(60 * 60)
}

/// Errors producing a signed client assertion.
#[derive(Debug, Error)]
pub enum AssertionError {
    /// Signing the assertion failed.
    #[error("cannot sign client assertion: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    aud: &'a str,
    exp: i64,
}

/// Produces RS256-signed JWT client assertions (RFC 7523) for the token
/// request.
pub struct ClientAssertionSigner {
    config: AssertionConfig,
    key: AssertionKey,
    clock: Arc<dyn Clock>,
}

impl ClientAssertionSigner {
    /// Creates a signer from the client configuration and signing key.
    pub fn new(config: AssertionConfig, key: AssertionKey, clock: Arc<dyn Clock>) -> Self {
        Self { config, key, clock }
    }

    /// Builds and signs one assertion token.
    ///
    /// # Errors
    ///
    /// Returns [`AssertionError::Signing`] when the key cannot produce a
    /// signature.
    pub fn assertion(&self) -> Result<String, AssertionError> {
        debug!("Generating oauth2 client assertion");

        let expiration = self.clock.now() + self.config.assertion_lifetime;
        let claims = AssertionClaims {
            iss: &self.config.client_id,
            sub: &self.config.client_id,
            aud: &self.config.token_url,
            exp: expiration.unix_timestamp(),
        };

        Ok(encode(
            &Header::new(Algorithm::RS256),
            &claims,
            self.key.encoding_key(),
        )?)
    }

    pub(super) fn config(&self) -> &AssertionConfig {
        &self.config
    }
}

impl fmt::Debug for ClientAssertionSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientAssertionSigner")
            .field("config", &self.config)
            .field("key", &self.key)
            .field("clock", &"<Clock>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    const KEY_PEM: &[u8] = include_bytes!("../../tests/testdata/assertion-key.pem");
    const PUB_PEM: &[u8] = include_bytes!("../../tests/testdata/assertion-key.pub.pem");

    #[derive(Debug, serde::Deserialize)]
    struct DecodedClaims {
        iss: String,
        sub: String,
        aud: String,
        exp: i64,
    }

    fn signer(lifetime: Duration) -> ClientAssertionSigner {
        ClientAssertionSigner::new(
            AssertionConfig {
                client_id: "my-client".to_string(),
                token_url: "https://auth.example.org/oauth2/token".to_string(),
                assertion_lifetime: lifetime,
            },
            AssertionKey::from_rsa_pem(KEY_PEM).expect("test key"),
            Arc::new(SystemClock),
        )
    }

    #[test]
    fn assertion_carries_client_identity_and_bounded_expiry() {
        let before = SystemClock.now().unix_timestamp();
        let token = signer(Duration::from_secs(600)).assertion().expect("signed");

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&["https://auth.example.org/oauth2/token"]);

        let decoded = decode::<DecodedClaims>(
            &token,
            &DecodingKey::from_rsa_pem(PUB_PEM).expect("public key"),
            &validation,
        )
        .expect("assertion verifies against the public key");

        assert_eq!(decoded.claims.iss, "my-client");
        assert_eq!(decoded.claims.sub, "my-client");
        assert_eq!(decoded.claims.aud, "https://auth.example.org/oauth2/token");

        let after = SystemClock.now().unix_timestamp();
        assert!(decoded.claims.exp >= before + 600);
        assert!(decoded.claims.exp <= after + 600);
    }

    #[test]
    fn default_lifetime_is_one_hour() {
        let config: AssertionConfig = serde_json::from_str(
            r#"{"client_id":"c","token_url":"https://t"}"#,
        )
        .expect("config with defaults");
        assert_eq!(config.assertion_lifetime, Duration::from_secs(3600));
    }
}
