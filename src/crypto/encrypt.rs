//! Client-side RSA encryption (spec.md §4.4 "Encryption"): parse a
//! certificate PEM, check non-expiry, extract the RSA public key, and
//! PKCS#1 v1.5-encrypt the payload in fixed-size blocks.

use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};
use spki::DecodePublicKey;
use thiserror::Error;
use x509_cert::der::Decode;
use x509_cert::time::Validity;
use x509_cert::Certificate;

#[derive(Debug, Error)]
pub enum EncryptError {
    #[error("io error reading certificate: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse certificate PEM: {0}")]
    Parse(String),
    #[error("certificate has expired")]
    Expired,
    #[error("failed to extract RSA public key: {0}")]
    Key(String),
    #[error("RSA encryption failed: {0}")]
    Encrypt(String),
}

pub struct PublicKey {
    key: RsaPublicKey,
}

impl PublicKey {
    /// `keySize` in spec.md terms: the RSA modulus size in bytes, which
    /// bounds the PKCS#1 v1.5 plaintext block size to `keySize - 11`.
    pub fn key_size(&self) -> usize {
        self.key.size()
    }

    pub fn block_size(&self) -> usize {
        self.key_size() - 11
    }
}

/// Reads `path`, parses it as a PEM-encoded X.509 certificate, checks
/// non-expiry against the current time, and extracts the RSA public key.
pub async fn load_public_key(path: &std::path::Path) -> Result<PublicKey, EncryptError> {
    let pem_bytes = tokio::fs::read(path).await?;
    let pem = pem::parse(&pem_bytes).map_err(|e| EncryptError::Parse(e.to_string()))?;
    let cert =
        Certificate::from_der(pem.contents()).map_err(|e| EncryptError::Parse(e.to_string()))?;

    check_not_expired(&cert.tbs_certificate.validity)?;

    let spki = &cert.tbs_certificate.subject_public_key_info;
    let der = spki
        .to_der()
        .map_err(|e| EncryptError::Key(e.to_string()))?;
    let key = RsaPublicKey::from_public_key_der(&der).map_err(|e| EncryptError::Key(e.to_string()))?;

    Ok(PublicKey { key })
}

fn check_not_expired(validity: &Validity) -> Result<(), EncryptError> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    let not_after = validity.not_after.to_date_time().unix_duration();
    if not_after < now {
        return Err(EncryptError::Expired);
    }
    Ok(())
}

/// Encrypts `payload` in fixed-size blocks of `key.block_size()` bytes with
/// PKCS#1 v1.5; the ciphertext is the concatenation of encrypted blocks, in
/// order (spec.md §4.4).
pub fn encrypt_body(key: &PublicKey, payload: &[u8]) -> Result<Vec<u8>, EncryptError> {
    let mut rng = rand::thread_rng();
    let mut out = Vec::new();
    for chunk in payload.chunks(key.block_size()) {
        let block = key
            .key
            .encrypt(&mut rng, Pkcs1v15Encrypt, chunk)
            .map_err(|e| EncryptError::Encrypt(e.to_string()))?;
        out.extend_from_slice(&block);
    }
    Ok(out)
}
