//! Self-contained signed tokens authorizing one action on one resource.
//!
//! A token binds a resource id, an action name, and an expiry under a single HMAC-signed
//! envelope; the token itself is the entire state, so issuing one writes nothing and
//! verifying one reads nothing. The flip side is that nothing distinguishes "already
//! consumed" from "never consumed": every handler built on top of this component must make
//! its own state transition idempotent (confirming an already-confirmed booking is a no-op,
//! not an error). That is the component's documented contract with its callers.
//!
//! The signing key is process-wide configuration loaded once at startup; rotating it
//! invalidates all outstanding tokens.

// crates.io
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	identity::{ActionName, ResourceId},
};

/// Verification failures, surfaced distinctly so the consuming handler can render an
/// accurate message ("link expired" vs "link invalid").
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ActionTokenError {
	/// Signature does not verify against the current signing key, or the token is
	/// structurally malformed.
	#[error("Action token signature is invalid.")]
	InvalidSignature,
	/// Embedded expiry has passed.
	#[error("Action token has expired.")]
	Expired,
	/// Embedded action name does not match what the consuming handler expects.
	#[error("Action token was issued for {issued}, not {expected}.")]
	ActionMismatch {
		/// Action the token was minted for.
		issued: ActionName,
		/// Action the consuming handler expected.
		expected: ActionName,
	},
}

#[derive(Debug, Serialize, Deserialize)]
struct ActionClaims {
	sub: String,
	act: String,
	iat: i64,
	exp: i64,
}

/// Compact signed token authorizing a single action on a single resource.
///
/// The wrapper redacts itself in formatted output: until it expires, the string is a
/// bearer capability for the action it names.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionToken(String);
impl ActionToken {
	/// Wraps a token received from a confirmation link.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the compact encoding. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for ActionToken {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for ActionToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ActionToken").field(&"<redacted>").finish()
	}
}
impl Display for ActionToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Issues and verifies action tokens with process-wide keys loaded once at startup.
pub struct ActionTokenIssuer {
	encoding_key: EncodingKey,
	decoding_key: DecodingKey,
	default_ttl: Duration,
}
impl ActionTokenIssuer {
	/// Default token lifetime applied by [`issue_with_default_ttl`](Self::issue_with_default_ttl).
	pub const DEFAULT_TTL: Duration = Duration::days(7);

	/// Builds an issuer from the shared signing secret.
	pub fn new(secret: impl AsRef<[u8]>) -> Self {
		Self::with_default_ttl(secret, Self::DEFAULT_TTL)
	}

	/// Builds an issuer with a custom default lifetime.
	pub fn with_default_ttl(secret: impl AsRef<[u8]>, default_ttl: Duration) -> Self {
		Self {
			encoding_key: EncodingKey::from_secret(secret.as_ref()),
			decoding_key: DecodingKey::from_secret(secret.as_ref()),
			default_ttl,
		}
	}

	/// Issues a token whose signature covers the resource id, the action name, and an
	/// expiry computed as issuance time plus `ttl`. No external state is written.
	pub fn issue(
		&self,
		resource: &ResourceId,
		action: &ActionName,
		ttl: Duration,
	) -> Result<ActionToken> {
		let issued_at = OffsetDateTime::now_utc();
		let claims = ActionClaims {
			sub: resource.as_ref().to_owned(),
			act: action.as_ref().to_owned(),
			iat: issued_at.unix_timestamp(),
			exp: (issued_at + ttl).unix_timestamp(),
		};
		let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
			.map_err(|source| ConfigError::TokenEncode { source })?;

		Ok(ActionToken(token))
	}

	/// Issues a token using the configured default lifetime.
	pub fn issue_with_default_ttl(
		&self,
		resource: &ResourceId,
		action: &ActionName,
	) -> Result<ActionToken> {
		self.issue(resource, action, self.default_ttl)
	}

	/// Verifies a token and returns the resource id it authorizes.
	///
	/// Checks run in a fixed order: signature against the current key, then embedded
	/// expiry (zero leeway), then action name against `expected_action`. The action check
	/// prevents a token minted for one action from being replayed against a different
	/// handler even when otherwise well-formed.
	pub fn verify(
		&self,
		token: &ActionToken,
		expected_action: &ActionName,
	) -> Result<ResourceId, ActionTokenError> {
		let mut validation = Validation::new(Algorithm::HS256);

		// Zero leeway so a zero ttl expires within the second.
		validation.leeway = 0;

		let claims =
			jsonwebtoken::decode::<ActionClaims>(token.expose(), &self.decoding_key, &validation)
				.map_err(|err| match err.kind() {
					ErrorKind::ExpiredSignature => ActionTokenError::Expired,
					_ => ActionTokenError::InvalidSignature,
				})?
				.claims;
		let issued =
			ActionName::new(claims.act).map_err(|_| ActionTokenError::InvalidSignature)?;

		if issued != *expected_action {
			return Err(ActionTokenError::ActionMismatch {
				issued,
				expected: expected_action.clone(),
			});
		}

		ResourceId::new(claims.sub).map_err(|_| ActionTokenError::InvalidSignature)
	}
}
impl Debug for ActionTokenIssuer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ActionTokenIssuer").field("default_ttl", &self.default_ttl).finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn issuer() -> ActionTokenIssuer {
		ActionTokenIssuer::new("test-signing-secret")
	}

	fn resource() -> ResourceId {
		ResourceId::new("booking-77").expect("Resource fixture should be valid.")
	}

	fn confirm() -> ActionName {
		ActionName::new("confirm-booking").expect("Action fixture should be valid.")
	}

	#[test]
	fn issue_then_verify_returns_the_resource() {
		let issuer = issuer();
		let token = issuer
			.issue(&resource(), &confirm(), Duration::days(7))
			.expect("Token issuance should succeed.");
		let verified = issuer
			.verify(&token, &confirm())
			.expect("Freshly issued token should verify.");

		assert_eq!(verified, resource());
	}

	#[test]
	fn default_ttl_round_trips() {
		let issuer = issuer();
		let token = issuer
			.issue_with_default_ttl(&resource(), &confirm())
			.expect("Token issuance should succeed.");

		assert_eq!(
			issuer.verify(&token, &confirm()).expect("Default-ttl token should verify."),
			resource()
		);
	}

	#[test]
	fn action_mismatch_never_yields_a_resource() {
		let issuer = issuer();
		let token = issuer
			.issue(&resource(), &confirm(), Duration::days(7))
			.expect("Token issuance should succeed.");
		let cancel = ActionName::new("cancel-booking").expect("Action fixture should be valid.");
		let err = issuer
			.verify(&token, &cancel)
			.expect_err("Mismatched action must be rejected.");

		assert!(matches!(err, ActionTokenError::ActionMismatch { .. }));
	}

	#[test]
	fn elapsed_ttl_yields_expired() {
		let issuer = issuer();
		let token = issuer
			.issue(&resource(), &confirm(), Duration::seconds(-1))
			.expect("Token issuance should succeed.");
		let err = issuer
			.verify(&token, &confirm())
			.expect_err("Elapsed token must be rejected.");

		assert_eq!(err, ActionTokenError::Expired);
	}

	#[test]
	fn flipped_signature_bit_yields_invalid_signature() {
		let issuer = issuer();
		let token = issuer
			.issue(&resource(), &confirm(), Duration::days(7))
			.expect("Token issuance should succeed.");
		let mut segments: Vec<String> =
			token.expose().split('.').map(ToOwned::to_owned).collect();

		assert_eq!(segments.len(), 3, "Compact encoding should have three segments.");

		// Flip the leading character of the signature segment; its top bits always land in
		// the decoded signature bytes.
		let flipped = if segments[2].starts_with('A') { 'B' } else { 'A' };
		let tail: String = segments[2].chars().skip(1).collect();

		segments[2] = format!("{flipped}{tail}");

		let err = issuer
			.verify(&ActionToken::new(segments.join(".")), &confirm())
			.expect_err("Tampered signature must be rejected.");

		assert_eq!(err, ActionTokenError::InvalidSignature);
	}

	#[test]
	fn tampered_payload_yields_invalid_signature() {
		let issuer = issuer();
		let token = issuer
			.issue(&resource(), &confirm(), Duration::days(7))
			.expect("Token issuance should succeed.");
		let mut segments: Vec<String> =
			token.expose().split('.').map(ToOwned::to_owned).collect();

		assert_eq!(segments.len(), 3, "Compact encoding should have three segments.");

		segments[1] = segments[1].chars().rev().collect();

		let err = issuer
			.verify(&ActionToken::new(segments.join(".")), &confirm())
			.expect_err("Tampered payload must be rejected.");

		assert_eq!(err, ActionTokenError::InvalidSignature);
	}

	#[test]
	fn foreign_key_yields_invalid_signature() {
		let token = issuer()
			.issue(&resource(), &confirm(), Duration::days(7))
			.expect("Token issuance should succeed.");
		let other = ActionTokenIssuer::new("some-other-secret");
		let err = other
			.verify(&token, &confirm())
			.expect_err("Token signed with a different key must be rejected.");

		assert_eq!(err, ActionTokenError::InvalidSignature);
	}

	#[test]
	fn formatted_output_is_redacted() {
		let token = issuer()
			.issue(&resource(), &confirm(), Duration::days(7))
			.expect("Token issuance should succeed.");

		assert_eq!(format!("{token:?}"), "ActionToken(\"<redacted>\")");
		assert_eq!(format!("{token}"), "<redacted>");
	}
}
