//! Webhook signature verification
//!
//! Deliveries carry `X-Hub-Signature: sha1=<hex>`, the lowercase hex HMAC-SHA1
//! of the raw request body keyed with the shared secret.

use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use subtle::ConstantTimeEq;

type HmacSha1 = Hmac<Sha1>;

/// Header carrying the delivery signature
pub const SIGNATURE_HEADER: &str = "x-hub-signature";

const SIGNATURE_PREFIX: &str = "sha1=";

/// Why a delivery was not acted upon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingSignature,
    BadSignature,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingSignature => write!(f, "missing {SIGNATURE_HEADER} header"),
            Self::BadSignature => write!(f, "signature mismatch"),
        }
    }
}

/// Keyed verifier, built once from the configured secret
#[derive(Clone)]
pub struct SignatureVerifier {
    mac: HmacSha1,
}

impl SignatureVerifier {
    pub fn new(secret: &str) -> Result<Self, InvalidLength> {
        Ok(Self {
            mac: HmacSha1::new_from_slice(secret.as_bytes())?,
        })
    }

    /// Signature the sender is expected to attach to `body`
    pub fn expected(&self, body: &[u8]) -> String {
        let mut mac = self.mac.clone();
        mac.update(body);
        format!("{SIGNATURE_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
    }

    /// Check a received header value, as raw bytes, against the body.
    ///
    /// The comparison runs in constant time with respect to the content of
    /// both values; only a length difference is observable.
    pub fn verify(&self, body: &[u8], received: Option<&[u8]>) -> Result<(), Rejection> {
        let received = received.ok_or(Rejection::MissingSignature)?;
        let expected = self.expected(body);

        if bool::from(expected.as_bytes().ct_eq(received)) {
            Ok(())
        } else {
            Err(Rejection::BadSignature)
        }
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"ref":"refs/heads/main"}"#;

    #[test]
    fn test_known_vector() {
        // RFC 2202 test case 2
        let verifier = SignatureVerifier::new("Jefe").unwrap();
        assert_eq!(
            verifier.expected(b"what do ya want for nothing?"),
            "sha1=effcdf6ae5eb2fa2d27416d5f184df9c259a7c79"
        );
    }

    #[test]
    fn test_accepts_expected_signature() {
        let verifier = SignatureVerifier::new("s3cret").unwrap();
        let signature = verifier.expected(BODY);
        assert!(signature.starts_with("sha1="));
        assert_eq!(signature.len(), 5 + 40);
        assert_eq!(verifier.verify(BODY, Some(signature.as_bytes())), Ok(()));
    }

    #[test]
    fn test_missing_header() {
        let verifier = SignatureVerifier::new("s3cret").unwrap();
        assert_eq!(
            verifier.verify(BODY, None),
            Err(Rejection::MissingSignature)
        );
    }

    #[test]
    fn test_rejects_mutated_body() {
        let verifier = SignatureVerifier::new("s3cret").unwrap();
        let signature = verifier.expected(BODY);
        for i in 0..BODY.len() {
            let mut mutated = BODY.to_vec();
            mutated[i] ^= 0x01;
            assert_eq!(
                verifier.verify(&mutated, Some(signature.as_bytes())),
                Err(Rejection::BadSignature),
                "mutation at byte {i} was accepted"
            );
        }
    }

    #[test]
    fn test_rejects_mutated_secret() {
        let signature = SignatureVerifier::new("s3cret").unwrap().expected(BODY);
        let other = SignatureVerifier::new("s3cres").unwrap();
        assert_eq!(
            other.verify(BODY, Some(signature.as_bytes())),
            Err(Rejection::BadSignature)
        );
    }

    #[test]
    fn test_rejects_malformed_headers() {
        let verifier = SignatureVerifier::new("s3cret").unwrap();
        let signature = verifier.expected(BODY);
        let upper = signature.to_uppercase();
        let bare = signature.trim_start_matches("sha1=");
        let sha256 = signature.replace("sha1=", "sha256=");
        for header in ["sha1=deadbeef", "", bare, upper.as_str(), sha256.as_str()] {
            assert_eq!(
                verifier.verify(BODY, Some(header.as_bytes())),
                Err(Rejection::BadSignature),
                "accepted {header:?}"
            );
        }
    }

    #[test]
    fn test_rejects_non_ascii_header() {
        let verifier = SignatureVerifier::new("s3cret").unwrap();
        let mut header = verifier.expected(BODY).into_bytes();
        header[10] = 0xff;
        assert_eq!(
            verifier.verify(BODY, Some(&header)),
            Err(Rejection::BadSignature)
        );
    }
}
