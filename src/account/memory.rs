//! Thread-safe in-memory [`UserDirectory`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	account::{DirectoryFuture, InsertOutcome, StoredUser, UserDirectory},
};

type UserMap = Arc<RwLock<HashMap<String, StoredUser>>>;

/// User directory that keeps records in-process, keyed by login name.
#[derive(Clone, Debug, Default)]
pub struct MemoryDirectory(UserMap);
impl MemoryDirectory {
	/// Number of registered users.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when no user is registered.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn insert_now(map: UserMap, user: StoredUser) -> InsertOutcome {
		let mut guard = map.write();

		if guard.contains_key(&user.name) {
			return InsertOutcome::NameTaken;
		}

		guard.insert(user.name.clone(), user);

		InsertOutcome::Inserted
	}
}
impl UserDirectory for MemoryDirectory {
	fn find_by_name<'a>(&'a self, name: &'a str) -> DirectoryFuture<'a, Option<StoredUser>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(name).cloned()) })
	}

	fn insert(&self, user: StoredUser) -> DirectoryFuture<'_, InsertOutcome> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::insert_now(map, user)) })
	}
}
