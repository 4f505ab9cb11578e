//! Storage contract and built-in implementation for user identity rows.

pub mod memory;

pub use memory::MemoryIdentityStore;

// self
use crate::{
	_prelude::*,
	identity::{ExternalId, NewUser, UserId, UserRecord},
};

/// Future type returned by identity store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Data-access contract consumed by federation and session resolution.
///
/// Every operation is a single-row read or write; no transactions are required. Implementations
/// must serialize concurrent creates for the same external id at the storage layer (uniqueness
/// constraint) so that at most one row survives a first-login race; the loser's create resolves
/// to [`CreateOutcome::Existing`] carrying the winner's row.
pub trait IdentityStore
where
	Self: Send + Sync,
{
	/// Looks up a user by the provider-assigned external identifier.
	fn find_by_external_id<'a>(&'a self, id: &'a ExternalId)
	-> StoreFuture<'a, Option<UserRecord>>;

	/// Looks up a user by the internal identifier.
	fn find_by_internal_id<'a>(&'a self, id: &'a UserId) -> StoreFuture<'a, Option<UserRecord>>;

	/// Inserts a new user row, resolving external-id conflicts to the surviving row.
	fn create(&self, user: NewUser) -> StoreFuture<'_, CreateOutcome>;
}

/// Result of an identity create attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreateOutcome {
	/// A fresh row was inserted.
	Created(UserRecord),
	/// Another create won the uniqueness race; the surviving row is returned.
	Existing(UserRecord),
}
impl CreateOutcome {
	/// Unwraps the stored row regardless of which create won.
	pub fn into_record(self) -> UserRecord {
		match self {
			Self::Created(record) | Self::Existing(record) => record,
		}
	}

	/// Whether this call inserted the row.
	pub fn is_created(&self) -> bool {
		matches!(self, Self::Created(_))
	}
}

/// Error type produced by [`IdentityStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Backend-level failure (connection, query, deadline).
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
}
