//! Admission-level error types shared across the verifier, limiter, chain, and account service.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical admission error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Credential was missing, malformed, badly signed, or expired.
	#[error("Request is not authenticated.")]
	Unauthenticated(
		#[from]
		#[source]
		crate::auth::AuthError,
	),
	/// The identity's token bucket is empty.
	#[error("Too many requests.")]
	RateLimited,
	/// Request input failed validation downstream of admission.
	#[error("Request validation failed: {reason}.")]
	Validation {
		/// Human-readable reason; never echoed to the caller.
		reason: String,
	},
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Identifier validation failure.
	#[error(transparent)]
	InvalidIdentifier(#[from] crate::auth::IdentifierError),
	/// User directory failure.
	#[error("{0}")]
	Directory(
		#[from]
		#[source]
		crate::account::DirectoryError,
	),
	/// Unexpected failure in admission plumbing.
	#[error("Internal failure: {message}.")]
	Internal {
		/// Diagnostic message; logged, never returned to the caller.
		message: String,
	},
}
impl Error {
	/// Collapses the error into its externally visible kind.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Error::Unauthenticated(_) => ErrorKind::Unauthenticated,
			Error::RateLimited => ErrorKind::RateLimited,
			Error::Validation { .. } => ErrorKind::ValidationFailed,
			Error::Config(_)
			| Error::InvalidIdentifier(_)
			| Error::Directory(_)
			| Error::Internal { .. } => ErrorKind::Internal,
		}
	}

	/// Builds an [`Error::Validation`] from any displayable reason.
	pub fn validation(reason: impl Into<String>) -> Self {
		Self::Validation { reason: reason.into() }
	}

	/// Builds an [`Error::Internal`] from any displayable message.
	pub fn internal(message: impl Into<String>) -> Self {
		Self::Internal { message: message.into() }
	}
}

/// Externally visible error taxonomy; every kind is terminal for the current request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// Missing/malformed/bad-signature/expired credential.
	Unauthenticated,
	/// Token bucket empty.
	RateLimited,
	/// Malformed request body, reported by the downstream collaborator.
	ValidationFailed,
	/// Unexpected failure; details are logged, not disclosed.
	Internal,
}
impl ErrorKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ErrorKind::Unauthenticated => "unauthenticated",
			ErrorKind::RateLimited => "rate_limited",
			ErrorKind::ValidationFailed => "validation_failed",
			ErrorKind::Internal => "internal",
		}
	}

	/// HTTP status reported to the caller for this kind.
	pub fn status(self) -> http::StatusCode {
		match self {
			ErrorKind::Unauthenticated => http::StatusCode::UNAUTHORIZED,
			ErrorKind::RateLimited => http::StatusCode::TOO_MANY_REQUESTS,
			ErrorKind::ValidationFailed => http::StatusCode::BAD_REQUEST,
			ErrorKind::Internal => http::StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Configuration and validation failures raised at startup.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Configuration document could not be parsed.
	#[error("Configuration is invalid at `{path}`.")]
	Parse {
		/// Path of the offending field.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: serde_json::Error,
	},
	/// Signing key is empty.
	#[error("Signing key must not be empty.")]
	EmptySigningKey,
	/// Token validity window is zero.
	#[error("Token validity must be at least one hour.")]
	ZeroTokenValidity,
	/// Token validity window exceeds the supported maximum.
	#[error("Token validity must not exceed {max} hours.")]
	TokenValidityTooLong {
		/// Largest accepted validity in hours.
		max: u32,
	},
	/// Bucket capacity is zero.
	#[error("Rate limit capacity must be positive.")]
	ZeroCapacity,
	/// Refill interval is zero or negative.
	#[error("Rate limit refill interval must be positive.")]
	NonPositiveRefillInterval,
	/// Eviction TTL is zero or negative.
	#[error("Idle eviction TTL must be positive.")]
	NonPositiveIdleTtl,
	/// Test bypass credential is empty.
	#[error("Test bypass credential must not be empty.")]
	EmptyBypassCredential,
}
impl From<serde_path_to_error::Error<serde_json::Error>> for ConfigError {
	fn from(e: serde_path_to_error::Error<serde_json::Error>) -> Self {
		let path = e.path().to_string();

		Self::Parse { path, source: e.into_inner() }
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;
	use crate::auth::AuthError;

	#[test]
	fn auth_errors_collapse_to_unauthenticated() {
		for source in
			[AuthError::Missing, AuthError::Malformed, AuthError::BadSignature, AuthError::Expired]
		{
			let error: Error = source.clone().into();

			assert_eq!(error.kind(), ErrorKind::Unauthenticated);
			assert_eq!(error.to_string(), "Request is not authenticated.");

			let inner = StdError::source(&error)
				.expect("Unauthenticated error should expose the verifier failure as its source.");

			assert_eq!(inner.to_string(), source.to_string());
		}
	}

	#[test]
	fn kinds_map_to_statuses() {
		assert_eq!(ErrorKind::Unauthenticated.status(), http::StatusCode::UNAUTHORIZED);
		assert_eq!(ErrorKind::RateLimited.status(), http::StatusCode::TOO_MANY_REQUESTS);
		assert_eq!(ErrorKind::ValidationFailed.status(), http::StatusCode::BAD_REQUEST);
		assert_eq!(
			Error::internal("boom").kind().status(),
			http::StatusCode::INTERNAL_SERVER_ERROR
		);
		assert_eq!(Error::from(ConfigError::ZeroCapacity).kind(), ErrorKind::Internal);
	}
}
