//! Signed credential issuance and verification (compact HS256 JWTs).
//!
//! Credentials are standard three-segment JWTs signed with HS256 under the configured
//! [`SigningKey`]. Signature and structure checks are delegated to `jsonwebtoken`; expiry is
//! checked against the caller-supplied instant so verification stays pure given the key and the
//! clock.

pub mod claims;
pub mod key;

// crates.io
use jsonwebtoken::{Algorithm, Header, Validation, errors::ErrorKind as JwtErrorKind};
// self
use crate::{
	_prelude::*,
	auth::{Identity, UserId},
};
use claims::Claims;
use key::SigningKey;

/// Credential value accepted by a verifier configured with the test bypass.
pub const BYPASS_CREDENTIAL: &str = "TEST";
/// Identifier of the fixed identity resolved by the test bypass.
pub const BYPASS_USER_ID: &str = "testuser";
/// Display name of the fixed identity resolved by the test bypass.
pub const BYPASS_USER_NAME: &str = "Tester";

const BEARER_SCHEME: &str = "bearer";

/// Reasons a credential was refused. Callers only ever see a uniform unauthenticated outcome.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum AuthError {
	/// No credential was presented.
	#[error("Credential is missing.")]
	Missing,
	/// The credential could not be parsed.
	#[error("Credential is malformed.")]
	Malformed,
	/// The signature does not match the configured key.
	#[error("Credential signature is invalid.")]
	BadSignature,
	/// The embedded expiry is at or before the current instant.
	#[error("Credential has expired.")]
	Expired,
	/// Username/password login did not match a stored user.
	#[error("Username or password is incorrect.")]
	InvalidCredentials,
}
impl From<jsonwebtoken::errors::Error> for AuthError {
	fn from(e: jsonwebtoken::errors::Error) -> Self {
		match e.kind() {
			JwtErrorKind::ExpiredSignature => AuthError::Expired,
			JwtErrorKind::InvalidSignature => AuthError::BadSignature,
			_ => AuthError::Malformed,
		}
	}
}

/// Validates signed credentials and extracts the identity they carry.
#[derive(Clone, Debug)]
pub struct TokenVerifier {
	key: SigningKey,
	validation: Validation,
	bypass: Option<String>,
}
impl TokenVerifier {
	/// Creates a verifier for the given signing key.
	pub fn new(key: SigningKey) -> Self {
		let mut validation = Validation::new(Algorithm::HS256);

		validation.leeway = 0;
		// `exp` is compared against the instant handed to `verify_at`, not the system clock.
		validation.validate_exp = false;

		Self { key, validation, bypass: None }
	}

	/// Accepts `credential` as the fixed test identity without signature verification.
	///
	/// Only test harnesses should configure this; production configurations leave it unset.
	pub fn with_test_bypass(mut self, credential: impl Into<String>) -> Self {
		self.bypass = Some(credential.into());

		self
	}

	/// Returns `true` when a test bypass credential is configured.
	pub fn has_test_bypass(&self) -> bool {
		self.bypass.is_some()
	}

	/// Verifies the `Authorization` header value of a request against the current instant.
	pub fn verify_header(&self, headers: &http::HeaderMap) -> Result<Identity> {
		self.verify_header_at(headers, OffsetDateTime::now_utc())
	}

	/// Verifies the `Authorization` header value of a request at the provided instant.
	pub fn verify_header_at(
		&self,
		headers: &http::HeaderMap,
		now: OffsetDateTime,
	) -> Result<Identity> {
		let raw = credential_from_headers(headers)?;

		self.verify_at(raw, now)
	}

	/// Verifies a raw credential against the current instant.
	pub fn verify(&self, raw: &str) -> Result<Identity> {
		self.verify_at(raw, OffsetDateTime::now_utc())
	}

	/// Verifies a raw credential at the provided instant.
	pub fn verify_at(&self, raw: &str, now: OffsetDateTime) -> Result<Identity> {
		let raw = strip_bearer(raw.trim());

		if raw.is_empty() {
			return Err(AuthError::Missing.into());
		}
		if self.bypass.as_deref() == Some(raw) {
			return bypass_identity();
		}

		let claims =
			jsonwebtoken::decode::<Claims>(raw, &self.key.decoding_key(), &self.validation)
				.map_err(AuthError::from)?
				.claims;

		if claims.is_expired_at(now)? {
			return Err(AuthError::Expired.into());
		}

		Ok(claims.into_identity()?)
	}
}

/// Signs credentials for identities with a fixed validity window.
#[derive(Clone, Debug)]
pub struct TokenIssuer {
	key: SigningKey,
	validity: Duration,
}
impl TokenIssuer {
	/// Creates an issuer whose credentials expire `validity` after issuance.
	pub fn new(key: SigningKey, validity: Duration) -> Self {
		Self { key, validity }
	}

	/// Configured validity window.
	pub fn validity(&self) -> Duration {
		self.validity
	}

	/// Issues a credential for the user, valid from now.
	pub fn issue(&self, id: &UserId, name: &str) -> Result<String> {
		self.issue_at(id, name, OffsetDateTime::now_utc())
	}

	/// Issues a credential for the user, valid from `now`.
	pub fn issue_at(&self, id: &UserId, name: &str, now: OffsetDateTime) -> Result<String> {
		let expires_at = now.checked_add(self.validity).ok_or_else(|| {
			Error::internal(format!("credential expiry overflows for validity {}", self.validity))
		})?;

		self.sign(&Claims::new(id, name, expires_at))
	}

	/// Signs an arbitrary claim set.
	pub fn sign(&self, claims: &Claims) -> Result<String> {
		jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.key.encoding_key())
			.map_err(|e| Error::internal(format!("failed to sign credential: {e}")))
	}
}

/// Extracts the raw credential from the `Authorization` header.
pub fn credential_from_headers(headers: &http::HeaderMap) -> Result<&str, AuthError> {
	let value = headers.get(http::header::AUTHORIZATION).ok_or(AuthError::Missing)?;
	let raw = value.to_str().map_err(|_| AuthError::Malformed)?.trim();

	if raw.is_empty() { Err(AuthError::Missing) } else { Ok(raw) }
}

fn strip_bearer(raw: &str) -> &str {
	if raw.eq_ignore_ascii_case(BEARER_SCHEME) {
		return "";
	}

	match raw.split_once(' ') {
		Some((scheme, rest)) if scheme.eq_ignore_ascii_case(BEARER_SCHEME) => rest.trim(),
		_ => raw,
	}
}

fn bypass_identity() -> Result<Identity> {
	Ok(Identity::new(UserId::new(BYPASS_USER_ID)?, BYPASS_USER_NAME))
}
