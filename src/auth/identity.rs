//! Resolved identity carried through a request after authentication.

// self
use crate::{_prelude::*, auth::UserId};

/// Authenticated user identity; immutable once constructed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
	id: UserId,
	display_name: String,
}
impl Identity {
	pub(crate) fn new(id: UserId, display_name: impl Into<String>) -> Self {
		Self { id, display_name: display_name.into() }
	}

	/// Identifier used as the rate-limit key.
	pub fn id(&self) -> &UserId {
		&self.id
	}

	/// Human-readable display name taken from the `name` claim.
	pub fn display_name(&self) -> &str {
		&self.display_name
	}
}
