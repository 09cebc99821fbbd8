//! At-rest encryption envelope for the `raw_json` column.
//!
//! Ported from the original collector's Fernet-based envelope, but keyed
//! on AES-256-GCM since that is the authenticated-encryption crate the
//! rest of the workspace already depends on.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, Nonce};
use collector_domain::{Error, Result};
use sha2::{Digest, Sha256};

const ENC_ALG: &str = "aes256gcm";
const ENC_VERSION: u32 = 1;

/// Load the encryption key from an environment variable, falling back to a
/// key file on disk. Returns `None` if neither source yields a usable key.
pub fn load_key(key_env: &str, key_path: &str) -> Option<[u8; 32]> {
    let raw = std::env::var(key_env)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| {
            if key_path.is_empty() {
                None
            } else {
                std::fs::read_to_string(key_path)
                    .ok()
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
            }
        })?;

    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    let digest = hasher.finalize();
    let mut buf = [0u8; 32];
    buf.copy_from_slice(&digest);
    Some(buf)
}

/// Encrypt `plain_text` with AES-256-GCM and wrap it in the envelope JSON
/// object stored in place of a plaintext `raw_json` value.
pub fn encrypt_text(plain_text: &str, key: &[u8; 32]) -> Result<String> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plain_text.as_bytes())
        .map_err(|e| Error::Encryption(format!("encrypting raw_json: {e}")))?;

    let mut combined = Vec::with_capacity(nonce.len() + ciphertext.len());
    combined.extend_from_slice(&nonce);
    combined.extend_from_slice(&ciphertext);
    let token = hex::encode(combined);

    Ok(wrap_encrypted(&token))
}

/// Reverse of [`encrypt_text`]: unwrap the envelope and decrypt the token.
pub fn decrypt_text(envelope_json: &str, key: &[u8; 32]) -> Result<String> {
    let value: serde_json::Value = serde_json::from_str(envelope_json)?;
    let token = value
        .get("__enc__")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::Encryption("malformed envelope: missing __enc__".into()))?;

    let combined = hex::decode(token)
        .map_err(|e| Error::Encryption(format!("decoding envelope token: {e}")))?;
    if combined.len() < 12 {
        return Err(Error::Encryption("envelope token too short".into()));
    }
    let (nonce_bytes, ciphertext) = combined.split_at(12);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let plain = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| Error::Encryption(format!("decrypting raw_json: {e}")))?;

    String::from_utf8(plain).map_err(|e| Error::Encryption(format!("non-utf8 plaintext: {e}")))
}

fn wrap_encrypted(token: &str) -> String {
    format!(r#"{{"__enc__":"{token}","__alg__":"{ENC_ALG}","__v__":{ENC_VERSION}}}"#)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_the_envelope() {
        let key = [7u8; 32];
        let envelope = encrypt_text(r#"{"hello":"world"}"#, &key).unwrap();
        assert!(envelope.contains("__enc__"));
        assert!(envelope.contains("aes256gcm"));
        let plain = decrypt_text(&envelope, &key).unwrap();
        assert_eq!(plain, r#"{"hello":"world"}"#);
    }

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let key = [1u8; 32];
        let other = [2u8; 32];
        let envelope = encrypt_text("secret", &key).unwrap();
        assert!(decrypt_text(&envelope, &other).is_err());
    }
}
