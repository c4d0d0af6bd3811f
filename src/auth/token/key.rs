//! Symmetric signing key wrapper that redacts sensitive material.

// crates.io
use jsonwebtoken::{DecodingKey, EncodingKey};
// self
use crate::_prelude::*;

/// Redacted HS256 signing key loaded once at startup and read-only thereafter.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SigningKey(String);
impl SigningKey {
	/// Wraps a new key string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns `true` when no key material is configured.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub(crate) fn encoding_key(&self) -> EncodingKey {
		EncodingKey::from_secret(self.0.as_bytes())
	}

	pub(crate) fn decoding_key(&self) -> DecodingKey {
		DecodingKey::from_secret(self.0.as_bytes())
	}
}
impl Debug for SigningKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("SigningKey").field(&"<redacted>").finish()
	}
}
impl Display for SigningKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
