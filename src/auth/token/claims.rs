//! Claim set embedded in signed credentials.

// self
use crate::{
	_prelude::*,
	auth::{AuthError, Identity, UserId},
};

/// Structured payload of a signed credential.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
	/// User identifier.
	pub id: String,
	/// Display name.
	pub name: String,
	/// Expiry as Unix seconds.
	pub exp: i64,
}
impl Claims {
	/// Builds claims for the given user expiring at `expires_at`.
	pub fn new(id: &UserId, name: impl Into<String>, expires_at: OffsetDateTime) -> Self {
		Self { id: id.to_string(), name: name.into(), exp: expires_at.unix_timestamp() }
	}

	/// Absolute expiry instant; out-of-range values are treated as malformed.
	pub fn expires_at(&self) -> Result<OffsetDateTime, AuthError> {
		OffsetDateTime::from_unix_timestamp(self.exp).map_err(|_| AuthError::Malformed)
	}

	/// Returns `true` if the claims are expired at `now` (expiry at or before `now`).
	pub fn is_expired_at(&self, now: OffsetDateTime) -> Result<bool, AuthError> {
		Ok(self.expires_at()? <= now)
	}

	pub(crate) fn into_identity(self) -> Result<Identity, AuthError> {
		let id = UserId::new(self.id).map_err(|_| AuthError::Malformed)?;

		Ok(Identity::new(id, self.name))
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn expiry_boundary_is_exclusive() {
		let now = macros::datetime!(2025-11-10 12:00 UTC);
		let user = UserId::new("u1").expect("User fixture should be valid.");
		let claims = Claims::new(&user, "User One", now);

		assert_eq!(claims.is_expired_at(now), Ok(true));
		assert_eq!(claims.is_expired_at(now - Duration::seconds(1)), Ok(false));
	}

	#[test]
	fn only_an_empty_id_claim_is_malformed() {
		let claims = Claims { id: String::new(), name: "x".into(), exp: 0 };

		assert_eq!(claims.into_identity(), Err(AuthError::Malformed));

		let claims = Claims { id: "John Doe".into(), name: "John".into(), exp: 0 };
		let identity = claims.into_identity().expect("Spaced identifier should be accepted.");

		assert_eq!(identity.id().as_ref(), "John Doe");
	}

	#[test]
	fn missing_name_claim_fails_to_deserialize() {
		assert!(serde_json::from_str::<Claims>(r#"{"id":"u1","exp":1}"#).is_err());
	}
}
