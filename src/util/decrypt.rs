//! Client-side decryption of the backend's encrypted email field.
//!
//! WIRE FORMAT
//! ===========
//! `{iv, encryptedData}` hex strings, AES-256-CBC with PKCS#7 padding.
//! The key is the configured secret right-padded with spaces to 32 bytes
//! and truncated to exactly 32 bytes. This pad-and-truncate schedule is
//! NOT a key derivation function — it is reproduced byte-for-byte because
//! the backend encrypts with exactly this schedule, and it must not be
//! mistaken for a secure baseline.
//!
//! Decryption failure is an expected state: callers fall back to the raw
//! field value and the failure is logged, never raised to the user.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, KeyIvInit};

use crate::net::types::{Email, EncryptedField};

type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum DecryptError {
    #[error("invalid hex in {field}: {source}")]
    Hex {
        field: &'static str,
        source: hex::FromHexError,
    },
    #[error("iv must be 16 bytes, got {0}")]
    IvLength(usize),
    #[error("ciphertext failed block decryption or padding check")]
    Unpad,
    #[error("plaintext is not valid utf-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Fixed-width key schedule: right-pad the secret with spaces to 32 bytes,
/// truncate anything beyond.
#[must_use]
pub fn derive_key(secret: &str) -> [u8; KEY_LEN] {
    let mut key = [b' '; KEY_LEN];
    let bytes = secret.as_bytes();
    let take = bytes.len().min(KEY_LEN);
    key[..take].copy_from_slice(&bytes[..take]);
    key
}

/// Decrypt one encrypted field to plaintext.
pub fn decrypt_field(secret: &str, field: &EncryptedField) -> Result<String, DecryptError> {
    let key = derive_key(secret);

    let iv_bytes = hex::decode(&field.iv).map_err(|source| DecryptError::Hex { field: "iv", source })?;
    let iv: [u8; IV_LEN] = iv_bytes
        .as_slice()
        .try_into()
        .map_err(|_| DecryptError::IvLength(iv_bytes.len()))?;

    let mut buf = hex::decode(&field.encrypted_data).map_err(|source| DecryptError::Hex {
        field: "encryptedData",
        source,
    })?;

    let plaintext = Aes256CbcDec::new(&key.into(), &iv.into())
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(|_| DecryptError::Unpad)?;

    Ok(String::from_utf8(plaintext.to_vec())?)
}

/// Resolve an email field to its plaintext form.
///
/// Plain values pass through untouched. Encrypted values become the
/// decrypted plaintext, or the raw ciphertext hex when decryption fails.
/// Malformed shapes are returned unchanged.
#[must_use]
pub fn resolve_email(secret: &str, email: Email) -> Email {
    match email {
        Email::Plain(value) => Email::Plain(value),
        Email::Encrypted(field) => match decrypt_field(secret, &field) {
            Ok(plaintext) => Email::Plain(plaintext),
            Err(e) => {
                tracing::warn!(error = %e, "email decryption failed, keeping raw ciphertext");
                Email::Plain(field.encrypted_data)
            }
        },
        Email::Other(value) => Email::Other(value),
    }
}


#[cfg(test)]
#[path = "decrypt_test.rs"]
mod tests;
