use jsonwebtoken::EncodingKey;
use std::fmt;
use thiserror::Error;

/// Errors loading an assertion signing key.
#[derive(Debug, Error)]
pub enum AssertionKeyError {
    /// Key material is not valid base64.
    #[error("invalid base64 key material")]
    InvalidBase64,

    /// Key material is not an RSA private key in the expected encoding.
    #[error("invalid rsa private key: {0}")]
    InvalidKey(#[from] jsonwebtoken::errors::Error),
}

/// RS256 signing key for client assertions.
///
/// Deployment configuration usually carries the key either as a PEM document
/// or as base64-encoded DER; both are accepted.
pub struct AssertionKey {
    key: EncodingKey,
}

impl AssertionKey {
    /// Loads a key from an RSA private key PEM document (PKCS#1 or PKCS#8).
    ///
    /// # Errors
    ///
    /// Returns [`AssertionKeyError::InvalidKey`] when the document does not
    /// contain an RSA private key.
    pub fn from_rsa_pem(pem: &[u8]) -> Result<Self, AssertionKeyError> {
        Ok(Self {
            key: EncodingKey::from_rsa_pem(pem)?,
        })
    }

    /// Loads a key from PKCS#1 DER bytes.
    pub fn from_rsa_der(der: &[u8]) -> Self {
        Self {
            key: EncodingKey::from_rsa_der(der),
        }
    }

    /// Loads a key from base64-encoded (standard alphabet, padded) PKCS#1
    /// DER bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AssertionKeyError::InvalidBase64`] when the material does
    /// not decode.
    pub fn from_base64_der(encoded: &str) -> Result<Self, AssertionKeyError> {
        use base64ct::{Base64, Encoding as _};

        let der =
            Base64::decode_vec(encoded.trim()).map_err(|_| AssertionKeyError::InvalidBase64)?;
        Ok(Self::from_rsa_der(&der))
    }

    pub(super) fn encoding_key(&self) -> &EncodingKey {
        &self.key
    }
}

impl fmt::Debug for AssertionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AssertionKey(<EncodingKey>)")
    }
}
