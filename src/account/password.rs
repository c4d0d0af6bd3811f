//! Argon2id password hashes stored as PHC strings.

// crates.io
use argon2::{
	Argon2,
	password_hash::{self, PasswordHasher, PasswordVerifier, SaltString},
};
use rand::Rng;
// self
use crate::_prelude::*;

const SALT_LEN: usize = 16;
// Well-formed hash with default Argon2id parameters that no password produces. Verifying against
// it costs the same as verifying a real record.
const PLACEHOLDER_PHC: &str = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Argon2id hash of a password in PHC string form; the plaintext is never stored.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);
impl PasswordHash {
	/// Hashes `password` with a freshly generated salt.
	pub fn generate(password: &str) -> Result<Self> {
		let mut salt = [0_u8; SALT_LEN];

		rand::rng().fill(&mut salt);

		let salt = SaltString::encode_b64(&salt).map_err(hash_error)?;
		let hash = Argon2::default().hash_password(password.as_bytes(), &salt).map_err(hash_error)?;

		Ok(Self(hash.to_string()))
	}

	/// Returns `true` when `password` matches the stored hash.
	pub fn verify(&self, password: &str) -> Result<bool> {
		verify_phc(&self.0, password)
	}

	/// Spends the same work as [`PasswordHash::verify`] without a stored record, so a lookup miss
	/// is not distinguishable by timing.
	pub fn verify_placeholder(password: &str) -> Result<()> {
		verify_phc(PLACEHOLDER_PHC, password).map(|_| ())
	}

	/// PHC string, suitable for persistence.
	pub fn as_phc(&self) -> &str {
		&self.0
	}
}
impl Debug for PasswordHash {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("PasswordHash").field(&"<redacted>").finish()
	}
}

fn verify_phc(phc: &str, password: &str) -> Result<bool> {
	let parsed = password_hash::PasswordHash::new(phc).map_err(hash_error)?;

	Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

fn hash_error(e: password_hash::Error) -> Error {
	Error::internal(format!("password hashing failed: {e}"))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn hash(password: &str) -> PasswordHash {
		PasswordHash::generate(password).expect("Hashing should succeed.")
	}

	#[test]
	fn verify_accepts_only_the_original_password() {
		let hash = hash("pass");

		assert!(hash.verify("pass").expect("Stored hash should parse."));
		assert!(!hash.verify("Pass").expect("Stored hash should parse."));
		assert!(!hash.verify("").expect("Stored hash should parse."));
	}

	#[test]
	fn hashes_are_salted_argon2id_phc_strings() {
		let (a, b) = (hash("pass"), hash("pass"));

		assert_ne!(a, b);
		assert!(a.as_phc().starts_with("$argon2id$"));
	}

	#[test]
	fn placeholder_is_a_parseable_hash_that_matches_nothing() {
		PasswordHash::verify_placeholder("pass").expect("Placeholder hash should parse.");

		assert!(!verify_phc(PLACEHOLDER_PHC, "").expect("Placeholder hash should parse."));
	}

	#[test]
	fn corrupt_record_is_an_internal_error() {
		let corrupt: PasswordHash =
			serde_json::from_str("\"not-a-phc-string\"").expect("Any string deserializes.");

		assert!(matches!(corrupt.verify("pass"), Err(Error::Internal { .. })));
	}

	#[test]
	fn debug_redacts() {
		assert_eq!(format!("{:?}", hash("pass")), "PasswordHash(\"<redacted>\")");
	}
}
