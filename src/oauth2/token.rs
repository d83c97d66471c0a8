use log::debug;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use time::OffsetDateTime;
use zeroize::Zeroize;

/// A bearer access token.
///
/// The serialized token is zeroized on drop and redacted from `Debug`
/// output.
#[derive(Clone, Eq, PartialEq, Zeroize)]
#[zeroize(drop)]
pub struct AccessToken {
    inner: String,
}

impl AccessToken {
    /// Wraps a serialized token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            inner: token.into(),
        }
    }

    /// Returns the serialized token.
    pub fn as_str(&self) -> &str {
        &self.inner
    }
}

impl AsRef<str> for AccessToken {
    fn as_ref(&self) -> &str {
        &self.inner
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Token endpoint response (RFC 6749 §5.1), reduced to the fields this crate
/// consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// The issued access token, when the endpoint produced one.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Token type (expected: `Bearer`).
    #[serde(default)]
    pub token_type: Option<String>,
    /// Token lifetime in seconds, when the endpoint provides one.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

// Claim subset used for expiry extraction.
#[derive(Debug, Deserialize)]
struct ExpClaim {
    exp: i64,
}

/// Resolves the instant after which `token` must not be used.
///
/// If possible, base it on the token itself (the `exp` claim of a
/// structurally valid JWT), or base it on the response's `expires_in`, or
/// consider it already expired. An epoch expiry never survives the
/// preemptive-expiry evaluation, so such a token is never served.
pub(super) fn resolve_expiry(
    token: &str,
    expires_in: Option<u64>,
    now: OffsetDateTime,
) -> OffsetDateTime {
    if let Some(expiry) = jwt_expiry(token) {
        return expiry;
    }
    debug!("Token has no usable 'exp' claim; basing expiry on response metadata");

    match expires_in {
        Some(secs) => now + Duration::from_secs(secs),
        None => OffsetDateTime::UNIX_EPOCH,
    }
}

// Maximum size for the claims segment after base64url decoding. Caps
// allocations when handed adversarial or malformed tokens.
const MAX_JWT_SEGMENT_SIZE: usize = 64 * 1024;

fn jwt_expiry(token: &str) -> Option<OffsetDateTime> {
    let mut it = token.split('.');
    let _header_b64 = it.next()?;
    let claims_b64 = it.next()?;
    let _sig_b64 = it.next()?;
    if it.next().is_some() {
        return None;
    }

    let claims_json = decode_b64url_to_vec(claims_b64)?;
    let claims: ExpClaim = serde_json::from_slice(&claims_json).ok()?;
    OffsetDateTime::from_unix_timestamp(claims.exp).ok()
}

// Decode base64url (no padding) into bytes, bounded by MAX_JWT_SEGMENT_SIZE.
fn decode_b64url_to_vec(input: &str) -> Option<Vec<u8>> {
    use base64ct::{Base64UrlUnpadded, Encoding as _};

    if input.len() > MAX_JWT_SEGMENT_SIZE * 4 / 3 {
        return None;
    }

    let mut buf = vec![0u8; input.len()];
    let len = Base64UrlUnpadded::decode(input, &mut buf).ok()?.len();
    buf.truncate(len);
    Some(buf)
}
