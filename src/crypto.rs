//! Symmetric message encryption keyed by a shared passphrase.
//!
//! The passphrase is hashed with SHA-256 into an AES-256-GCM key. Encrypted messages are the
//! URL-safe base64 encoding of `nonce || ciphertext || tag`, with a fresh random nonce per
//! message.

// crates.io
use aes_gcm::{
	Aes256Gcm, Key, Nonce,
	aead::{Aead, AeadCore, KeyInit, OsRng},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, error::ConfigError};

/// Environment variable read by [`MessageCipher::from_env`].
pub const MESSAGE_KEY_ENV: &str = "MESSAGE_KEY";

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
/// Shortest decodable payload: a nonce plus the authentication tag of an empty message.
pub const MIN_PAYLOAD_LEN: usize = NONCE_LEN + TAG_LEN;

/// Failures raised while encrypting or decrypting messages.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum CryptoError {
	/// Payload is not URL-safe base64.
	#[error("cipher text is not valid base64: {0}")]
	Encoding(#[from] base64::DecodeError),
	/// Payload cannot hold a nonce and an authentication tag.
	#[error("cipher text is too short. minimum length is {min}; got {got}")]
	TooShort {
		/// Minimum decoded length.
		min: usize,
		/// Decoded length received.
		got: usize,
	},
	/// Encryption failed.
	#[error("message could not be encrypted")]
	Encrypt,
	/// Wrong key or tampered payload.
	#[error("message authentication failed")]
	Decrypt,
	/// Decrypted bytes are not UTF-8.
	#[error("decrypted message is not valid UTF-8")]
	Utf8,
}

/// AES-256-GCM cipher derived from a passphrase.
#[derive(Clone)]
pub struct MessageCipher {
	cipher: Aes256Gcm,
}
impl MessageCipher {
	/// Derives the cipher key from `passphrase`.
	pub fn new(passphrase: impl AsRef<[u8]>) -> Self {
		let digest = Sha256::digest(passphrase.as_ref());
		let key = Key::<Aes256Gcm>::from_slice(&digest);

		Self { cipher: Aes256Gcm::new(key) }
	}

	/// Derives the cipher key from the `MESSAGE_KEY` environment variable.
	pub fn from_env() -> Result<Self> {
		let passphrase = std::env::var(MESSAGE_KEY_ENV)
			.map_err(|_| ConfigError::MissingEnvVar { name: MESSAGE_KEY_ENV })?;

		Ok(Self::new(passphrase))
	}

	/// Encrypts `plain_text` under a fresh nonce.
	pub fn encrypt(&self, plain_text: &str) -> Result<String, CryptoError> {
		let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
		let sealed =
			self.cipher.encrypt(&nonce, plain_text.as_bytes()).map_err(|_| CryptoError::Encrypt)?;
		let mut payload = Vec::with_capacity(NONCE_LEN + sealed.len());

		payload.extend_from_slice(&nonce);
		payload.extend_from_slice(&sealed);

		Ok(URL_SAFE.encode(payload))
	}

	/// Decrypts a payload produced by [`MessageCipher::encrypt`] under the same passphrase.
	pub fn decrypt(&self, cipher_text: &str) -> Result<String, CryptoError> {
		let payload = URL_SAFE.decode(cipher_text)?;

		if payload.len() < MIN_PAYLOAD_LEN {
			return Err(CryptoError::TooShort { min: MIN_PAYLOAD_LEN, got: payload.len() });
		}

		let (nonce, sealed) = payload.split_at(NONCE_LEN);
		let plain =
			self.cipher.decrypt(Nonce::from_slice(nonce), sealed).map_err(|_| CryptoError::Decrypt)?;

		String::from_utf8(plain).map_err(|_| CryptoError::Utf8)
	}
}
impl Debug for MessageCipher {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("MessageCipher(<redacted>)")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn messages_survive_encryption() {
		let cipher = MessageCipher::new("a shared passphrase");
		let sealed = cipher.encrypt("this is a secret message").expect("Encryption should work.");

		assert_ne!(sealed, "this is a secret message");
		assert_eq!(
			cipher.decrypt(&sealed).expect("Decryption should work."),
			"this is a secret message"
		);
	}

	#[test]
	fn each_encryption_uses_a_fresh_nonce() {
		let cipher = MessageCipher::new("a shared passphrase");
		let first = cipher.encrypt("same text").expect("Encryption should work.");
		let second = cipher.encrypt("same text").expect("Encryption should work.");

		assert_ne!(first, second);
	}

	#[test]
	fn short_payloads_report_the_minimum_length() {
		let cipher = MessageCipher::new("a shared passphrase");
		let err = cipher.decrypt(&URL_SAFE.encode([0_u8; 5])).expect_err("Payload is too short.");

		assert_eq!(err.to_string(), "cipher text is too short. minimum length is 28; got 5");
	}

	#[test]
	fn tampered_payloads_and_wrong_keys_are_rejected() {
		let cipher = MessageCipher::new("a shared passphrase");
		let sealed = cipher.encrypt("integrity matters").expect("Encryption should work.");
		let mut bytes = URL_SAFE.decode(&sealed).expect("Sealed payload is base64.");
		let last = bytes.len() - 1;

		bytes[last] ^= 0x01;

		assert_eq!(cipher.decrypt(&URL_SAFE.encode(&bytes)), Err(CryptoError::Decrypt));
		assert_eq!(
			MessageCipher::new("another passphrase").decrypt(&sealed),
			Err(CryptoError::Decrypt)
		);
	}

	#[test]
	fn invalid_base64_is_an_encoding_error() {
		let err = MessageCipher::new("key").decrypt("not base64!").expect_err("Invalid input.");

		assert!(matches!(err, CryptoError::Encoding(_)));
	}
}
