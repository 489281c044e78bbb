//! HMAC-SHA-256 request signing and constant-time verification (spec.md
//! §4.4 "Signing", §4.5 step 3/6).

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Computes hex-encoded HMAC-SHA-256 of `body` under `key`, the value
/// attached as the `HashSHA256` field/metadata.
pub fn sign_hex(key: &[u8], body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a hex-encoded HMAC-SHA-256 in constant time. Returns `false` on
/// malformed hex as well as a genuine mismatch — both are "reject" per
/// spec.md §4.5 step 3.
pub fn verify_hex(key: &[u8], body: &[u8], hex_mac: &str) -> bool {
    let Ok(expected_bytes) = hex::decode(hex_mac) else {
        return false;
    };
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(body);
    mac.verify_slice(&expected_bytes).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let key = b"secret";
        let body = b"{\"type\":\"gauge\",\"id\":\"Alloc\",\"value\":1.0}";
        let sig = sign_hex(key, body);
        assert!(verify_hex(key, body, &sig));
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let body = b"payload";
        let sig = sign_hex(b"secret", body);
        assert!(!verify_hex(b"other", body, &sig));
    }

    #[test]
    fn verify_rejects_tampered_body() {
        let key = b"secret";
        let sig = sign_hex(key, b"payload");
        assert!(!verify_hex(key, b"payload!", &sig));
    }

    #[test]
    fn verify_rejects_malformed_hex() {
        assert!(!verify_hex(b"secret", b"payload", "not-hex"));
    }
}
