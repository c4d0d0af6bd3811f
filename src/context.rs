//! Strongly typed request scope that carries the authenticated identity downstream.
//!
//! A [`RequestScope`] is a value, not a shared slot: [`RequestScope::attach`] derives a new scope
//! and leaves the original untouched, so concurrent handlers never race on identity storage. The
//! admission chain inserts the admitted scope into the request extensions, where downstream
//! handlers read it through [`ScopeExt`].

// self
use crate::{
	_prelude::*,
	auth::{AuthError, Identity, UserId},
};

/// Request-processing scope holding an optional authenticated identity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestScope {
	identity: Option<Arc<Identity>>,
}
impl RequestScope {
	/// Creates an empty scope with no identity attached.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns a derived scope carrying `identity`; `self` is left unmodified.
	pub fn attach(&self, identity: Identity) -> Self {
		Self { identity: Some(Arc::new(identity)) }
	}

	/// Returns the attached identity, if any.
	pub fn current_identity(&self) -> Option<&Identity> {
		self.identity.as_deref()
	}

	/// Returns the attached identity or an unauthenticated error when absent.
	pub fn require_identity(&self) -> Result<&Identity> {
		self.current_identity().ok_or_else(|| Error::Unauthenticated(AuthError::Missing))
	}

	/// Identifier of the attached identity (the `user_id` scope key).
	pub fn user_id(&self) -> Option<&UserId> {
		self.current_identity().map(Identity::id)
	}

	/// Display name of the attached identity (the `username` scope key).
	pub fn username(&self) -> Option<&str> {
		self.current_identity().map(Identity::display_name)
	}
}

/// Read access to the [`RequestScope`] stored on an admitted request.
pub trait ScopeExt {
	/// Returns the scope attached by the admission chain, if any.
	fn scope(&self) -> Option<&RequestScope>;

	/// Returns the authenticated identity attached by the admission chain, if any.
	fn current_identity(&self) -> Option<&Identity> {
		self.scope().and_then(RequestScope::current_identity)
	}
}
impl<B> ScopeExt for http::Request<B> {
	fn scope(&self) -> Option<&RequestScope> {
		self.extensions().get::<RequestScope>()
	}
}
impl ScopeExt for http::request::Parts {
	fn scope(&self) -> Option<&RequestScope> {
		self.extensions.get::<RequestScope>()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn identity() -> Identity {
		Identity::new(UserId::new("u1").expect("User fixture should be valid."), "User One")
	}

	#[test]
	fn attach_derives_without_mutating() {
		let base = RequestScope::new();
		let scoped = base.attach(identity());

		assert!(base.current_identity().is_none());
		assert_eq!(scoped.user_id().map(ToString::to_string), Some("u1".to_owned()));
		assert_eq!(scoped.username(), Some("User One"));
	}

	#[test]
	fn absent_identity_is_an_authorization_failure() {
		let scope = RequestScope::new();

		assert!(scope.user_id().is_none());
		assert!(matches!(
			scope.require_identity(),
			Err(Error::Unauthenticated(AuthError::Missing))
		));
	}

	#[test]
	fn request_without_scope_reports_absent() {
		let request = http::Request::new(());

		assert!(request.scope().is_none());
		assert!(ScopeExt::current_identity(&request).is_none());

		let mut request = request;

		request.extensions_mut().insert(RequestScope::new().attach(identity()));

		assert_eq!(
			ScopeExt::current_identity(&request).map(|identity| identity.display_name()),
			Some("User One")
		);
	}
}
