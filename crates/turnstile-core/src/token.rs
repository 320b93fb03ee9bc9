use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Any verification failure collapses to this one opaque error. The
/// kiosk never learns whether a token was forged, malformed, or merely
/// expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("invalid or expired code, rescan")]
    Invalid,
}

/// Issues and verifies the self-describing kiosk access token.
///
/// The token is a capability: possession alone authorizes check-in
/// actions for the embedded tenant until expiry. There is no revocation;
/// rotating the secret invalidates every outstanding token at once.
///
/// Format: `base64url(tenant_id|expiry_millis) . base64url(hmac_sha256)`.
pub struct TokenCodec {
    mac: HmacSha256,
    ttl: Duration,
}

impl TokenCodec {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
        Self { mac, ttl }
    }

    /// Issue a token valid for the configured TTL from now.
    pub fn issue(&self, tenant_id: &str) -> String {
        self.issue_at(tenant_id, Utc::now())
    }

    /// Issue a token valid for the configured TTL from `now`.
    pub fn issue_at(&self, tenant_id: &str, now: DateTime<Utc>) -> String {
        let expiry = (now + self.ttl).timestamp_millis();
        let payload = format!("{tenant_id}|{expiry}");
        let sig = self.sign(payload.as_bytes());
        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(payload),
            URL_SAFE_NO_PAD.encode(sig)
        )
    }

    /// Verify a token against the current clock, returning the tenant id.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token against an injected clock, returning the tenant id.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        // Split on the last dot so a tenant id containing '.' in some
        // future format revision cannot confuse the signature segment.
        let (payload_b64, sig_b64) = token.rsplit_once('.').ok_or(TokenError::Invalid)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::Invalid)?;
        let sig = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| TokenError::Invalid)?;

        let expected = self.sign(&payload);
        if expected.ct_eq(&sig).unwrap_u8() == 0 {
            return Err(TokenError::Invalid);
        }

        // Signature is good; the payload is ours. Parse tenant|expiry.
        let payload = std::str::from_utf8(&payload).map_err(|_| TokenError::Invalid)?;
        let (tenant_id, expiry) = payload.rsplit_once('|').ok_or(TokenError::Invalid)?;
        let expiry: i64 = expiry.parse().map_err(|_| TokenError::Invalid)?;

        if tenant_id.is_empty() || now.timestamp_millis() > expiry {
            return Err(TokenError::Invalid);
        }

        Ok(tenant_id.to_string())
    }

    fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new(b"test-secret", Duration::hours(24))
    }

    #[test]
    fn test_round_trip() {
        let c = codec();
        let now = Utc::now();
        let token = c.issue_at("gym-42", now);
        assert_eq!(c.verify_at(&token, now), Ok("gym-42".to_string()));
    }

    #[test]
    fn test_expired_token_rejected() {
        let c = codec();
        let now = Utc::now();
        let token = c.issue_at("gym-42", now);
        // Valid right up to the embedded expiry, invalid after it.
        assert!(c.verify_at(&token, now + Duration::hours(24)).is_ok());
        let late = now + Duration::hours(24) + Duration::seconds(1);
        assert_eq!(c.verify_at(&token, late), Err(TokenError::Invalid));
    }

    #[test]
    fn test_signature_bit_flip_rejected() {
        let c = codec();
        let now = Utc::now();
        let token = c.issue_at("gym-42", now);
        let (payload, sig) = token.rsplit_once('.').unwrap();

        let mut sig_bytes = URL_SAFE_NO_PAD.decode(sig).unwrap();
        for i in 0..sig_bytes.len() {
            sig_bytes[i] ^= 0x01;
            let forged = format!("{payload}.{}", URL_SAFE_NO_PAD.encode(&sig_bytes));
            assert_eq!(c.verify_at(&forged, now), Err(TokenError::Invalid));
            sig_bytes[i] ^= 0x01;
        }
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let now = Utc::now();
        let token = codec().issue_at("gym-42", now);
        let other = TokenCodec::new(b"rotated-secret", Duration::hours(24));
        assert_eq!(other.verify_at(&token, now), Err(TokenError::Invalid));
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let c = codec();
        let now = Utc::now();
        for junk in ["", "no-dot", ".", "only.", ".only", "a.b.c", "!!!.???"] {
            assert_eq!(c.verify_at(junk, now), Err(TokenError::Invalid), "{junk:?}");
        }
    }

    #[test]
    fn test_payload_tamper_rejected() {
        let c = codec();
        let now = Utc::now();
        let token = c.issue_at("gym-42", now);
        let (_, sig) = token.rsplit_once('.').unwrap();
        // Re-point the signed payload at another tenant.
        let forged = format!("{}.{sig}", URL_SAFE_NO_PAD.encode("gym-43|9999999999999"));
        assert_eq!(c.verify_at(&forged, now), Err(TokenError::Invalid));
    }

    #[test]
    fn test_reissue_does_not_invalidate_prior() {
        let c = codec();
        let now = Utc::now();
        let first = c.issue_at("gym-42", now);
        let second = c.issue_at("gym-42", now + Duration::minutes(5));
        assert!(c.verify_at(&first, now + Duration::minutes(10)).is_ok());
        assert!(c.verify_at(&second, now + Duration::minutes(10)).is_ok());
    }
}
