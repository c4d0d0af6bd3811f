//! Username/password accounts that mint credentials for the admission chain.
//!
//! The [`AccountService`] looks users up through a pluggable [`UserDirectory`] and signs
//! credentials with the same key the chain verifies against. Record persistence belongs to the
//! directory implementation; [`MemoryDirectory`] keeps everything in-process.

pub mod memory;
pub mod password;

pub use memory::MemoryDirectory;
pub use password::PasswordHash;

// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{
	_prelude::*,
	auth::{AuthError, SigningKey, TokenIssuer, UserId},
};

const GENERATED_ID_LEN: usize = 20;

/// Boxed future returned by [`UserDirectory`] operations.
pub type DirectoryFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, DirectoryError>> + 'a + Send>>;

/// Storage contract for user records.
pub trait UserDirectory
where
	Self: Send + Sync,
{
	/// Fetches the user registered under `name`, if present.
	fn find_by_name<'a>(&'a self, name: &'a str) -> DirectoryFuture<'a, Option<StoredUser>>;

	/// Inserts `user` unless its name is already registered.
	fn insert(&self, user: StoredUser) -> DirectoryFuture<'_, InsertOutcome>;
}

/// Result of a [`UserDirectory::insert`] attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsertOutcome {
	/// The record was stored.
	Inserted,
	/// Another user already holds the name; nothing was stored.
	NameTaken,
}

/// Error type produced by [`UserDirectory`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum DirectoryError {
	/// Backend-level failure for the storage engine.
	#[error("Directory backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Persisted user record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredUser {
	/// Generated identifier; becomes the credential's `id` claim.
	pub id: UserId,
	/// Unique login name; becomes the credential's `name` claim.
	pub name: String,
	/// Argon2id password hash.
	pub password: PasswordHash,
	/// Creation instant.
	pub created_at: OffsetDateTime,
	/// Last update instant.
	pub updated_at: OffsetDateTime,
}

/// Login and signup over a [`UserDirectory`].
#[derive(Clone)]
pub struct AccountService {
	directory: Arc<dyn UserDirectory>,
	issuer: TokenIssuer,
}
impl AccountService {
	/// Creates a service that signs credentials with `issuer`.
	pub fn new(directory: Arc<dyn UserDirectory>, issuer: TokenIssuer) -> Self {
		Self { directory, issuer }
	}

	/// Creates a service signing with `key` for `validity`.
	pub fn with_key(
		directory: Arc<dyn UserDirectory>,
		key: SigningKey,
		validity: Duration,
	) -> Self {
		Self::new(directory, TokenIssuer::new(key, validity))
	}

	/// Issuer used for every minted credential.
	pub fn issuer(&self) -> &TokenIssuer {
		&self.issuer
	}

	/// Authenticates `username`/`password` and returns a signed credential.
	///
	/// Unknown names still pay for one hash verification.
	pub async fn login(&self, username: &str, password: &str) -> Result<String> {
		let user = <dyn UserDirectory>::find_by_name(self.directory.as_ref(), username).await?;
		let user = match user {
			Some(user) if user.name == username => user.password.verify(password)?.then_some(user),
			_ => {
				PasswordHash::verify_placeholder(password)?;

				None
			},
		};

		match user {
			Some(user) => {
				#[cfg(feature = "tracing")]
				tracing::debug!(user = %user.id, "authentication successful");

				self.issuer.issue(&user.id, &user.name)
			},
			None => {
				#[cfg(feature = "tracing")]
				tracing::debug!(user = username, "authentication failed");

				Err(AuthError::InvalidCredentials.into())
			},
		}
	}

	/// Registers a new user and returns a signed credential for it.
	pub async fn signup(&self, username: &str, password: &str) -> Result<String> {
		if username.is_empty() || password.is_empty() {
			return Err(Error::validation("username and password cannot be empty"));
		}

		let now = OffsetDateTime::now_utc();
		let user = StoredUser {
			id: UserId::new(random_string(GENERATED_ID_LEN))?,
			name: username.to_owned(),
			password: PasswordHash::generate(password)?,
			created_at: now,
			updated_at: now,
		};
		let (id, name) = (user.id.clone(), user.name.clone());

		match <dyn UserDirectory>::insert(self.directory.as_ref(), user).await? {
			InsertOutcome::Inserted => self.issuer.issue_at(&id, &name, now),
			InsertOutcome::NameTaken => Err(Error::validation("user already exists")),
		}
	}
}
impl Debug for AccountService {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccountService").field("issuer", &self.issuer).finish()
	}
}

pub(crate) fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}
