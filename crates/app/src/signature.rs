use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Signature verification failures. Both variants are reported to the
/// sender as an authentication failure; the distinction only matters for
/// logs.
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("signature header is not valid base64")]
    InvalidEncoding,
    #[error("failed to initialize signature verifier")]
    Key,
    #[error("signature mismatch")]
    Mismatch,
}

/// Verifies an `x-line-signature` value: `base64(HMAC-SHA256(secret, body))`.
///
/// `raw_body` must be the exact bytes received on the wire, before any
/// parsing. Hashing a re-serialized body produces false negatives whenever
/// key order or whitespace differs from the sender's encoding.
pub fn verify(secret: &[u8], raw_body: &[u8], claimed: &str) -> Result<(), SignatureError> {
    let provided = BASE64
        .decode(claimed)
        .map_err(|_| SignatureError::InvalidEncoding)?;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret).map_err(|_| SignatureError::Key)?;
    mac.update(raw_body);
    let expected = mac.finalize().into_bytes();
    let expected_bytes: &[u8] = expected.as_ref();

    if expected_bytes.ct_eq(provided.as_slice()).into() {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}
