//! Thread-safe in-memory [`IdentityStore`] implementation for local development and tests.

// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{
	_prelude::*,
	identity::{ExternalId, NewUser, UserId, UserRecord},
	store::{CreateOutcome, IdentityStore, StoreError, StoreFuture},
};

type Rows = Arc<RwLock<State>>;

#[derive(Debug, Default)]
struct State {
	rows: HashMap<UserId, UserRecord>,
	by_external: HashMap<ExternalId, UserId>,
}

/// In-process storage backend that keeps user rows in memory for tests and demos.
///
/// External-id uniqueness is enforced under a single write lock, matching the uniqueness
/// constraint a relational backend would place on the column: a losing create observes the
/// winner's row and resolves to [`CreateOutcome::Existing`].
#[derive(Clone, Debug, Default)]
pub struct MemoryIdentityStore(Rows);
impl MemoryIdentityStore {
	const ID_LEN: usize = 24;

	/// Number of rows currently stored.
	pub fn len(&self) -> usize {
		self.0.read().rows.len()
	}

	/// Whether the store holds no rows.
	pub fn is_empty(&self) -> bool {
		self.0.read().rows.is_empty()
	}

	fn find_by_external_now(rows: Rows, id: ExternalId) -> Option<UserRecord> {
		let state = rows.read();

		state.by_external.get(&id).and_then(|user_id| state.rows.get(user_id)).cloned()
	}

	fn find_by_internal_now(rows: Rows, id: UserId) -> Option<UserRecord> {
		rows.read().rows.get(&id).cloned()
	}

	fn create_now(rows: Rows, user: NewUser) -> Result<CreateOutcome, StoreError> {
		let mut state = rows.write();

		if let Some(external) = user.external_id.as_ref() {
			let winner = state
				.by_external
				.get(external)
				.and_then(|user_id| state.rows.get(user_id))
				.cloned();

			if let Some(winner) = winner {
				return Ok(CreateOutcome::Existing(winner));
			}
		}

		let id = Self::allocate_id(&state)?;
		let record = UserRecord {
			id: id.clone(),
			external_id: user.external_id,
			display_name: user.display_name,
			email: user.email,
			role: user.role,
		};

		if let Some(external) = record.external_id.clone() {
			state.by_external.insert(external, id.clone());
		}

		state.rows.insert(id, record.clone());

		Ok(CreateOutcome::Created(record))
	}

	fn allocate_id(state: &State) -> Result<UserId, StoreError> {
		loop {
			let raw: String =
				rand::rng().sample_iter(Alphanumeric).take(Self::ID_LEN).map(char::from).collect();
			let id =
				UserId::new(raw).map_err(|e| StoreError::Backend { message: e.to_string() })?;

			if !state.rows.contains_key(&id) {
				return Ok(id);
			}
		}
	}
}
#[cfg(test)]
impl MemoryIdentityStore {
	pub(crate) fn replace_for_test(&self, record: UserRecord) {
		self.0.write().rows.insert(record.id.clone(), record);
	}
}
impl IdentityStore for MemoryIdentityStore {
	fn find_by_external_id<'a>(
		&'a self,
		id: &'a ExternalId,
	) -> StoreFuture<'a, Option<UserRecord>> {
		let rows = self.0.clone();
		let id = id.to_owned();

		Box::pin(async move { Ok(Self::find_by_external_now(rows, id)) })
	}

	fn find_by_internal_id<'a>(&'a self, id: &'a UserId) -> StoreFuture<'a, Option<UserRecord>> {
		let rows = self.0.clone();
		let id = id.to_owned();

		Box::pin(async move { Ok(Self::find_by_internal_now(rows, id)) })
	}

	fn create(&self, user: NewUser) -> StoreFuture<'_, CreateOutcome> {
		let rows = self.0.clone();

		Box::pin(async move { Self::create_now(rows, user) })
	}
}
