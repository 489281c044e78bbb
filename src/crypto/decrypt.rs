//! Server-side RSA decryption (spec.md §4.5 step 4): load and validate the
//! RSA private key once per server instance (not per-request, per the
//! REDESIGN FLAG in spec.md §9), split the body into `keySize`-byte blocks,
//! PKCS#1 v1.5-decrypt each, and concatenate.

use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecryptError {
    #[error("io error reading private key: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse private key PEM: {0}")]
    Parse(String),
    #[error("RSA decryption failed: {0}")]
    Decrypt(String),
    #[error("ciphertext length {0} is not a multiple of the key size {1}")]
    Misaligned(usize, usize),
}

pub struct PrivateKey {
    key: RsaPrivateKey,
}

impl PrivateKey {
    pub fn key_size(&self) -> usize {
        self.key.size()
    }
}

/// Loads and parses the RSA private key once; idempotent to call more than
/// once (spec.md §5 "the read/parse must be idempotent").
pub async fn load_private_key(path: &std::path::Path) -> Result<PrivateKey, DecryptError> {
    let pem_bytes = tokio::fs::read_to_string(path).await?;
    let key = RsaPrivateKey::from_pkcs1_pem(&pem_bytes)
        .map_err(|e| DecryptError::Parse(e.to_string()))?;
    Ok(PrivateKey { key })
}

/// Splits `body` into `key.key_size()`-byte blocks and decrypts each,
/// concatenating the plaintext blocks as the replacement request body
/// (spec.md §4.5 step 4).
pub fn decrypt_body(key: &PrivateKey, body: &[u8]) -> Result<Vec<u8>, DecryptError> {
    let block_size = key.key_size();
    if block_size == 0 || body.len() % block_size != 0 {
        return Err(DecryptError::Misaligned(body.len(), block_size));
    }
    let mut out = Vec::new();
    for chunk in body.chunks(block_size) {
        let plain = key
            .key
            .decrypt(Pkcs1v15Encrypt, chunk)
            .map_err(|e| DecryptError::Decrypt(e.to_string()))?;
        out.extend_from_slice(&plain);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn decrypt_rejects_misaligned_body() {
        let priv_key = RsaPrivateKey::new(&mut rand::thread_rng(), 512).unwrap();
        let key = PrivateKey { key: priv_key };
        let err = decrypt_body(&key, b"short").unwrap_err();
        assert!(matches!(err, DecryptError::Misaligned(_, _)));
    }

    #[test]
    fn encrypt_then_decrypt_round_trips_single_block() {
        let priv_key = RsaPrivateKey::new(&mut rand::thread_rng(), 512).unwrap();
        let pub_key = rsa::RsaPublicKey::from(&priv_key);
        let plaintext = b"PollCount";
        let ciphertext = pub_key
            .encrypt(&mut rand::thread_rng(), Pkcs1v15Encrypt, plaintext)
            .unwrap();
        let key = PrivateKey { key: priv_key };
        let decrypted = decrypt_body(&key, &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }
}
