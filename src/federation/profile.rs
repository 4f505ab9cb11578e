//! Provider profile payload parsing and normalization.

// self
use crate::{
	_prelude::*,
	error::FederationError,
	identity::{ExternalId, NewUser, Role},
};

/// Raw profile document returned by the provider's userinfo endpoint.
///
/// Field names follow the OpenID Connect userinfo shape; `id` is accepted as a legacy alias
/// for `sub` since some providers still return it. Every field is optional at the wire
/// level; normalization decides what is actually required.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePayload {
	/// Stable provider-assigned subject identifier.
	#[serde(default)]
	pub sub: Option<String>,
	/// Legacy alias for the subject identifier.
	#[serde(default)]
	pub id: Option<String>,
	/// Display name asserted by the provider.
	#[serde(default)]
	pub name: Option<String>,
	/// Primary email address, when shared.
	#[serde(default)]
	pub email: Option<String>,
	/// Additional addresses some providers return instead of `email`.
	#[serde(default)]
	pub emails: Vec<String>,
}
impl ProfilePayload {
	/// Parses a userinfo body, keeping the JSON path of any failure.
	pub fn parse(body: &str) -> Result<Self, FederationError> {
		let mut deserializer = serde_json::Deserializer::from_str(body);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| FederationError::ProfileParse { source })
	}

	/// Normalizes the payload into a validated provider profile.
	///
	/// A payload without a stable subject identifier cannot establish an identity and fails
	/// federation; a payload without any email address normalizes with `email: None`.
	pub fn normalize(self) -> Result<ProviderProfile, FederationError> {
		let raw_subject = self.sub.or(self.id).ok_or(FederationError::MissingSubject)?;
		let subject = ExternalId::new(&raw_subject)
			.map_err(|source| FederationError::InvalidSubject { source })?;
		let email = self.email.or_else(|| self.emails.into_iter().next());
		let display_name = self.name.unwrap_or(raw_subject);

		Ok(ProviderProfile { subject, display_name, email })
	}
}

/// Normalized identity assertion produced by a completed handshake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderProfile {
	/// Stable provider-assigned identifier; the federation join key.
	pub subject: ExternalId,
	/// Display name recorded on first login.
	pub display_name: String,
	/// First available email address, if any.
	pub email: Option<String>,
}
impl ProviderProfile {
	/// Builds the least-privileged user row created on a first login.
	pub fn into_new_user(self) -> NewUser {
		NewUser {
			external_id: Some(self.subject),
			display_name: self.display_name,
			email: self.email,
			role: Role::Client,
		}
	}
}
