//! Wire types shared across the request layer and the session machine.

use serde::{Deserialize, Serialize};

/// An encrypted value as delivered by the backend: hex IV plus hex
/// AES-CBC ciphertext.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedField {
    pub iv: String,
    #[serde(rename = "encryptedData")]
    pub encrypted_data: String,
}

/// The email field arrives either as plaintext or as an encrypted field.
/// Anything else (e.g. an object missing `encryptedData`) is carried
/// through untouched so a malformed payload never breaks deserialization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Email {
    Plain(String),
    Encrypted(EncryptedField),
    Other(serde_json::Value),
}

impl Email {
    /// The plaintext value, if this email has been (or arrived) resolved.
    #[must_use]
    pub fn as_plain(&self) -> Option<&str> {
        match self {
            Self::Plain(value) => Some(value),
            _ => None,
        }
    }
}

/// A user as returned by the auth endpoints. Unknown backend fields are
/// retained in `extra` rather than dropped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default, alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Response body of `/auth/register`, `/auth/login`, and `/auth/me`.
/// All fields default so any JSON object parses; an unexpected shape
/// reads as `success: false`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AuthEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<UserRecord>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
