//! User records, roles, and the creation payload shared with the identity store.

// self
use crate::{
	_prelude::*,
	identity::{ExternalId, UserId},
};

/// Closed set of access tiers evaluated at route boundaries.
///
/// Role-gated behavior is expressed through explicit capability checks on this enum, never
/// through downcasting or inheritance-style dispatch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
	/// Least-privileged tier assigned to every federated first login.
	#[default]
	Client,
	/// Operators allowed into the admin console (species, users, classifications).
	Admin,
}
impl Role {
	/// Returns the canonical storage label for the role.
	pub fn as_str(self) -> &'static str {
		match self {
			Role::Client => "CLIENT",
			Role::Admin => "ADMIN",
		}
	}

	/// Whether the role may enter admin-gated routes.
	pub fn can_administer(self) -> bool {
		matches!(self, Role::Admin)
	}
}
impl Display for Role {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Durable user row owned by the identity store.
///
/// The row is created on the first successful handshake for a never-seen external id and is
/// never deleted by this crate. Components hold a record no longer than a single request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
	/// Opaque, stable internal identifier.
	pub id: UserId,
	/// Provider-assigned identifier; unique across all users when present.
	pub external_id: Option<ExternalId>,
	/// Display name recorded from the provider profile.
	pub display_name: String,
	/// Preferred email address, when the provider shared one.
	pub email: Option<String>,
	/// Access tier evaluated at each route boundary.
	pub role: Role,
}
impl UserRecord {
	/// Whether the row may enter admin-gated routes.
	pub fn is_admin(&self) -> bool {
		self.role.can_administer()
	}
}

/// Field set handed to [`IdentityStore::create`](crate::store::IdentityStore::create) when a
/// first login materializes a row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewUser {
	/// Provider-assigned identifier the row will be keyed by.
	pub external_id: Option<ExternalId>,
	/// Display name recorded from the provider profile.
	pub display_name: String,
	/// First available email address; absence is stored, not an error.
	pub email: Option<String>,
	/// Access tier; federated first logins always start at [`Role::Client`].
	pub role: Role,
}
