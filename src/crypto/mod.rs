//! Compression-adjacent cryptography: hash signing/verification (C5/C6) and
//! RSA encryption/decryption of request bodies (C5/C6).

mod decrypt;
mod encrypt;
mod sign;

pub use decrypt::{decrypt_body, load_private_key, DecryptError, PrivateKey};
pub use encrypt::{encrypt_body, load_public_key, EncryptError, PublicKey};
pub use sign::{sign_hex, verify_hex};
