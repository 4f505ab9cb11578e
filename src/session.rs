//! Session identity resolution bridging transport-level sessions to user rows.

// self
use crate::{
	_prelude::*,
	identity::{UserId, UserRecord},
	store::IdentityStore,
};

/// Opaque key a client presents on each request to have its identity re-resolved.
///
/// The key is the user's internal id; the transport layer owns its persistence (cookie,
/// header) and its invalidation at logout. A stale or malformed key downgrades to anonymity
/// on the next resolution.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey(String);
impl SessionKey {
	/// Returns the raw key material.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl From<&UserRecord> for SessionKey {
	fn from(user: &UserRecord) -> Self {
		Self(user.id.as_ref().to_owned())
	}
}
impl From<String> for SessionKey {
	fn from(value: String) -> Self {
		Self(value)
	}
}
impl Display for SessionKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Outcome of resolving a session key against the identity store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionIdentity {
	/// The key resolved to a live user row.
	Authenticated(UserRecord),
	/// The key was absent, malformed, or no longer resolves to a row.
	///
	/// Route protection treats this identically to "never logged in".
	Anonymous,
}
impl SessionIdentity {
	/// Whether the caller carries no resolved identity.
	pub fn is_anonymous(&self) -> bool {
		matches!(self, Self::Anonymous)
	}

	/// Returns the resolved user row, if any.
	pub fn user(&self) -> Option<&UserRecord> {
		match self {
			Self::Authenticated(user) => Some(user),
			Self::Anonymous => None,
		}
	}

	/// Admin gate evaluated at route boundaries; anonymous callers always fail it.
	pub fn can_administer(&self) -> bool {
		matches!(self, Self::Authenticated(user) if user.is_admin())
	}
}

/// Per-request resolver turning stored session keys back into user records.
///
/// The resolver holds no cache: every resolution is a fresh store lookup, so a role change
/// is observed on the next request at the latest.
#[derive(Clone)]
pub struct SessionResolver {
	store: Arc<dyn IdentityStore>,
}
impl SessionResolver {
	/// Creates a resolver over the provided identity store.
	pub fn new(store: Arc<dyn IdentityStore>) -> Self {
		Self { store }
	}

	/// Serializes a user into its session key. Pure and total.
	pub fn serialize(user: &UserRecord) -> SessionKey {
		SessionKey::from(user)
	}

	/// Resolves a stored key back into an identity.
	///
	/// A key that no longer resolves (user deleted since the session was created) downgrades
	/// to [`SessionIdentity::Anonymous`]; only store failures propagate, as
	/// [`Error::Storage`](crate::error::Error::Storage).
	pub async fn resolve(&self, key: &SessionKey) -> Result<SessionIdentity> {
		let Ok(id) = UserId::new(key.as_str()) else {
			return Ok(SessionIdentity::Anonymous);
		};

		match self.store.find_by_internal_id(&id).await? {
			Some(user) => Ok(SessionIdentity::Authenticated(user)),
			None => Ok(SessionIdentity::Anonymous),
		}
	}
}
impl Debug for SessionResolver {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("SessionResolver(..)")
	}
}
