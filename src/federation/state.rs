//! Login state round-tripped through the OAuth `state` parameter.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, FederationError},
};

const NONCE_LEN: usize = 32;

/// Payload packed into the `state` query parameter.
///
/// The nonce guards the callback against CSRF; the redirect target survives the provider
/// round trip so the application can route the user after login. Both travel as URL-safe
/// base64 JSON and are treated as untrusted on return.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginState {
	/// Random nonce compared against the returned state.
	pub nonce: String,
	/// Post-login redirect target requested before the handshake.
	pub redirect_to: Option<String>,
}
impl LoginState {
	/// Generates a fresh state with a random alphanumeric nonce.
	pub fn generate(redirect_to: Option<String>) -> Self {
		Self { nonce: super::random_string(NONCE_LEN), redirect_to }
	}

	/// Encodes the state as URL-safe base64 JSON for the authorize URL.
	pub fn encode(&self) -> Result<String, ConfigError> {
		let json = serde_json::to_vec(self).map_err(|source| ConfigError::StateEncode { source })?;

		Ok(URL_SAFE_NO_PAD.encode(json))
	}

	/// Decodes a returned `state` parameter.
	///
	/// Any structural damage (bad base64, bad JSON) is reported as a state mismatch; a
	/// tampered state never distinguishes itself from a missing one.
	pub fn decode(raw: &str) -> Result<Self, FederationError> {
		let bytes = URL_SAFE_NO_PAD.decode(raw).map_err(|_| FederationError::StateMismatch)?;

		serde_json::from_slice(&bytes).map_err(|_| FederationError::StateMismatch)
	}

	/// Validates a returned `state` against the one minted at login start, returning the
	/// parsed payload on success.
	pub fn validate(&self, returned: &str) -> Result<LoginState, FederationError> {
		let parsed = Self::decode(returned)?;

		if parsed.nonce == self.nonce { Ok(parsed) } else { Err(FederationError::StateMismatch) }
	}
}
