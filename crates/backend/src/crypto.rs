//! Optional at-rest encryption for sensitive values.
//!
//! AES-256-GCM with a per-record random nonce stored alongside the
//! ciphertext: `enc:v1:<nonce-hex>:<ciphertext-hex>`.  With no key
//! configured the encryptor passes values through untouched, so the same
//! read/write paths serve both modes.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, Nonce};

use masc_domain::{Error, Result};

const ENVELOPE_PREFIX: &str = "enc:v1:";

#[derive(Clone, Default)]
pub struct Encryptor {
    cipher: Option<Aes256Gcm>,
}

impl Encryptor {
    /// Build from a 32-byte hex key, or pass-through when `key_hex` is
    /// `None`.
    pub fn from_hex_key(key_hex: Option<&str>) -> Result<Self> {
        let Some(key_hex) = key_hex else {
            return Ok(Self { cipher: None });
        };
        let bytes = hex::decode(key_hex)
            .map_err(|_| Error::InvalidArgument("MASC_ENCRYPTION_KEY is not valid hex".into()))?;
        if bytes.len() != 32 {
            return Err(Error::InvalidArgument(
                "MASC_ENCRYPTION_KEY must be 32 bytes".into(),
            ));
        }
        let key = Key::<Aes256Gcm>::from_slice(&bytes);
        Ok(Self {
            cipher: Some(Aes256Gcm::new(key)),
        })
    }

    pub fn enabled(&self) -> bool {
        self.cipher.is_some()
    }

    /// Seal a plaintext value.  Pass-through when encryption is off.
    pub fn seal(&self, plaintext: &str) -> Result<String> {
        let Some(cipher) = &self.cipher else {
            return Ok(plaintext.to_owned());
        };
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| Error::Internal("encryption failed".into()))?;
        Ok(format!(
            "{ENVELOPE_PREFIX}{}:{}",
            hex::encode(nonce),
            hex::encode(ciphertext)
        ))
    }

    /// Open a sealed value.  Plain values pass through so existing rooms
    /// survive turning encryption on.
    pub fn open(&self, stored: &str) -> Result<String> {
        let Some(rest) = stored.strip_prefix(ENVELOPE_PREFIX) else {
            return Ok(stored.to_owned());
        };
        let Some(cipher) = &self.cipher else {
            return Err(Error::Forbidden(
                "encrypted value present but no MASC_ENCRYPTION_KEY configured".into(),
            ));
        };
        let (nonce_hex, ct_hex) = rest
            .split_once(':')
            .ok_or_else(|| Error::Internal("malformed encryption envelope".into()))?;
        let nonce_bytes = hex::decode(nonce_hex)
            .map_err(|_| Error::Internal("malformed encryption nonce".into()))?;
        let ciphertext =
            hex::decode(ct_hex).map_err(|_| Error::Internal("malformed ciphertext".into()))?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|_| Error::Forbidden("decryption failed: wrong key or corrupt data".into()))?;
        String::from_utf8(plaintext).map_err(|_| Error::Internal("decrypted non-utf8".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> String {
        "ab".repeat(32)
    }

    #[test]
    fn seal_open_roundtrip() {
        let enc = Encryptor::from_hex_key(Some(&key())).unwrap();
        let sealed = enc.seal("secret capsule").unwrap();
        assert!(sealed.starts_with(ENVELOPE_PREFIX));
        assert_eq!(enc.open(&sealed).unwrap(), "secret capsule");
    }

    #[test]
    fn nonces_differ_per_record() {
        let enc = Encryptor::from_hex_key(Some(&key())).unwrap();
        let a = enc.seal("same").unwrap();
        let b = enc.seal("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn passthrough_without_key() {
        let enc = Encryptor::from_hex_key(None).unwrap();
        assert!(!enc.enabled());
        assert_eq!(enc.seal("x").unwrap(), "x");
        assert_eq!(enc.open("x").unwrap(), "x");
    }

    #[test]
    fn plain_values_survive_enabling_encryption() {
        let enc = Encryptor::from_hex_key(Some(&key())).unwrap();
        assert_eq!(enc.open("legacy plain value").unwrap(), "legacy plain value");
    }

    #[test]
    fn wrong_key_fails_closed() {
        let enc_a = Encryptor::from_hex_key(Some(&key())).unwrap();
        let enc_b = Encryptor::from_hex_key(Some(&"cd".repeat(32))).unwrap();
        let sealed = enc_a.seal("secret").unwrap();
        assert!(enc_b.open(&sealed).is_err());
    }

    #[test]
    fn short_key_rejected() {
        assert!(Encryptor::from_hex_key(Some("abcd")).is_err());
        assert!(Encryptor::from_hex_key(Some("zz".repeat(32).as_str())).is_err());
    }
}
