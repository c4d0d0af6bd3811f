//! Identity key carried by credentials: the rate-limit key and the `user_id` scope value.
//!
//! Any non-empty `id` claim is a valid key. The verifier only vouches that the issuer signed it,
//! so no further shape rules are imposed here.

// self
use crate::_prelude::*;

/// Identifier of an authenticated user, taken verbatim from the `id` claim.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);
impl UserId {
	/// Wraps `value`, rejecting only the empty string.
	pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
		Self::try_from(value.into())
	}
}
impl TryFrom<String> for UserId {
	type Error = IdentifierError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		if value.is_empty() { Err(IdentifierError::Empty) } else { Ok(Self(value)) }
	}
}
impl From<UserId> for String {
	fn from(value: UserId) -> Self {
		value.0
	}
}
impl AsRef<str> for UserId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Debug for UserId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "User({})", self.0)
	}
}
impl Display for UserId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Error returned when an identity key cannot be built.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("User identifier cannot be empty.")]
	Empty,
}
