//! The five/six pipeline stages from spec.md §4.5, shared verbatim between
//! the HTTP middleware stack and the RPC service entry point so the two
//! transports can never semantically diverge (§9 REDESIGN FLAG: middleware
//! as function composition). Each function is pure over its inputs; callers
//! own how the bytes/metadata were obtained for their transport.

use std::net::IpAddr;

use ipnet::IpNet;
use thiserror::Error;

use crate::crypto;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("bad request: {0}")]
    BadRequest(String),
}

/// Step 2: trusted subnet. Rejects when `real_ip` is absent, malformed, or
/// not contained in `subnet` (spec.md §4.5 step 2).
pub fn check_trusted_subnet(
    subnet: Option<&IpNet>,
    real_ip: Option<&str>,
) -> Result<(), PipelineError> {
    let Some(subnet) = subnet else {
        return Ok(());
    };
    let Some(real_ip) = real_ip else {
        return Err(PipelineError::Forbidden("missing X-Real-IP".into()));
    };
    let ip: IpAddr = real_ip
        .parse()
        .map_err(|_| PipelineError::Forbidden(format!("malformed X-Real-IP {real_ip:?}")))?;
    if subnet.contains(&ip) {
        Ok(())
    } else {
        Err(PipelineError::Forbidden(format!(
            "{ip} is not in the trusted subnet"
        )))
    }
}

/// Step 3: hash verify. No-op when no secret is configured, or no hash was
/// presented (spec.md §4.5 step 3: the check only fires when *both* a secret
/// is configured *and* a `HashSHA256` value is present).
pub fn verify_request_hash(
    key: Option<&[u8]>,
    body: &[u8],
    provided_hash: Option<&str>,
) -> Result<(), PipelineError> {
    let (Some(key), Some(provided_hash)) = (key, provided_hash) else {
        return Ok(());
    };
    if crypto::verify_hex(key, body, provided_hash) {
        Ok(())
    } else {
        Err(PipelineError::BadRequest("hash mismatch".into()))
    }
}

/// Step 4: decrypt. No-op when no private key is configured. Errors at any
/// stage map to bad-request (spec.md §4.5 step 4).
pub fn decrypt_request_body(
    private_key: Option<&crypto::PrivateKey>,
    body: Vec<u8>,
) -> Result<Vec<u8>, PipelineError> {
    let Some(private_key) = private_key else {
        return Ok(body);
    };
    crypto::decrypt_body(private_key, &body)
        .map_err(|e| PipelineError::BadRequest(format!("decrypt failed: {e}")))
}

/// Step 6: response signing. Returns the hex HMAC to attach as `HashSHA256`,
/// or `None` when no secret is configured.
pub fn sign_response_body(key: Option<&[u8]>, body: &[u8]) -> Option<String> {
    key.map(|k| crypto::sign_hex(k, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subnet_allows_contained_ip() {
        let subnet: IpNet = "10.0.0.0/8".parse().unwrap();
        assert!(check_trusted_subnet(Some(&subnet), Some("10.1.2.3")).is_ok());
    }

    #[test]
    fn subnet_rejects_ip_outside_range() {
        let subnet: IpNet = "10.0.0.0/8".parse().unwrap();
        assert!(check_trusted_subnet(Some(&subnet), Some("192.168.0.1")).is_err());
    }

    #[test]
    fn subnet_rejects_missing_header() {
        let subnet: IpNet = "10.0.0.0/8".parse().unwrap();
        assert!(check_trusted_subnet(Some(&subnet), None).is_err());
    }

    #[test]
    fn subnet_unconfigured_allows_anything() {
        assert!(check_trusted_subnet(None, None).is_ok());
    }

    #[test]
    fn hash_verify_noop_without_secret() {
        assert!(verify_request_hash(None, b"body", Some("deadbeef")).is_ok());
    }

    #[test]
    fn hash_verify_noop_without_header() {
        assert!(verify_request_hash(Some(b"secret"), b"body", None).is_ok());
    }

    #[test]
    fn hash_verify_accepts_matching_signature() {
        let sig = crypto::sign_hex(b"secret", b"body");
        assert!(verify_request_hash(Some(b"secret"), b"body", Some(&sig)).is_ok());
    }

    #[test]
    fn hash_verify_rejects_mismatch() {
        assert!(verify_request_hash(Some(b"secret"), b"body", Some("00")).is_err());
    }

    #[test]
    fn decrypt_noop_without_key() {
        let body = b"plain".to_vec();
        assert_eq!(decrypt_request_body(None, body.clone()).unwrap(), body);
    }
}
