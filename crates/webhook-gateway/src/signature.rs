//! HMAC-SHA256 verification for inbound provider webhooks (§4.7 step 1).
//! Comparison is constant-time via `subtle` so a timing side-channel can't
//! be used to recover a module's secret byte-by-byte.
use {
    base64::Engine,
    hmac::{Hmac, Mac},
    sha2::Sha256,
    subtle::ConstantTimeEq,
};

type HmacSha256 = Hmac<Sha256>;

fn compute(secret: &[u8], message: &[u8]) -> Option<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(message);
    Some(mac.finalize().into_bytes().to_vec())
}

pub fn verify_hex(secret: &[u8], message: &[u8], signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    matches(secret, message, &expected)
}

pub fn verify_base64(secret: &[u8], message: &[u8], signature_b64: &str) -> bool {
    let Ok(expected) = base64::engine::general_purpose::STANDARD.decode(signature_b64.trim()) else {
        return false;
    };
    matches(secret, message, &expected)
}

fn matches(secret: &[u8], message: &[u8], expected: &[u8]) -> bool {
    match compute(secret, message) {
        Some(computed) => computed.ct_eq(expected).into(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip_verifies() {
        let secret = b"module-secret";
        let message = b"{\"event\":\"delivered\"}";
        let signature = hex::encode(compute(secret, message).unwrap());
        assert!(verify_hex(secret, message, &signature));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let message = b"body";
        let signature = hex::encode(compute(b"correct", message).unwrap());
        assert!(!verify_hex(b"wrong", message, &signature));
    }

    #[test]
    fn base64_roundtrip_verifies() {
        let secret = b"svix-secret";
        let message = b"1700000000.{}";
        let signature =
            base64::engine::general_purpose::STANDARD.encode(compute(secret, message).unwrap());
        assert!(verify_base64(secret, message, &signature));
    }

    #[test]
    fn malformed_signature_is_rejected_not_panicking() {
        assert!(!verify_hex(b"secret", b"body", "not-hex!!"));
        assert!(!verify_base64(b"secret", b"body", "not-base64!!!"));
    }
}
