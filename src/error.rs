//! Crate-level error types shared across federation, sessions, storage, and tokens.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Identity-store failure; callers should surface "temporarily unavailable".
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Federated login failed; callers should re-prompt for authentication.
	#[error(transparent)]
	Federation(#[from] FederationError),
	/// Action-token verification failed.
	#[error(transparent)]
	ActionToken(#[from] crate::action::ActionTokenError),
}
impl Error {
	/// Whether the failure should be presented as a plain authentication failure
	/// (re-prompt for login) rather than a fault of the service itself.
	pub fn is_authentication_failure(&self) -> bool {
		matches!(self, Self::Federation(_))
	}
}

/// Configuration and validation failures raised by the crate.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Provider configuration contains an invalid URL.
	#[error("Provider configuration contains an invalid URL.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A domain identifier failed validation.
	#[error("Identifier is invalid.")]
	InvalidIdentifier(#[from] crate::identity::IdentifierError),
	/// Login state could not be serialized for the authorize URL.
	#[error("Login state could not be encoded.")]
	StateEncode {
		/// Underlying serialization failure.
		#[source]
		source: serde_json::Error,
	},
	/// Action token claims could not be signed.
	#[error("Action token could not be encoded.")]
	TokenEncode {
		/// Underlying signing failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// Public base URL cannot be extended with the confirmation path.
	#[error("Public base URL cannot be extended with the confirmation path.")]
	UnusableBaseUrl,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for ConfigError {
	fn from(e: reqwest::Error) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the provider.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the provider.")]
	Io(#[from] std::io::Error),
	/// The provider did not answer within the configured deadline.
	#[error("Provider call exceeded the configured timeout.")]
	Timeout,
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout } else { Self::network(e) }
	}
}

/// Failures raised while establishing a federated identity.
///
/// Every variant surfaces to the session layer as "authentication failed"; none of them
/// crashes the request pipeline, and none of them leaves a partially created identity behind.
#[derive(Debug, ThisError)]
pub enum FederationError {
	/// Provider rejected the authorization code.
	#[error("Provider rejected the authorization code: {reason}.")]
	AccessDenied {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Returned `state` does not match the one minted at login start.
	#[error("Authorization state mismatch.")]
	StateMismatch,
	/// Token endpoint responded with malformed JSON.
	#[error("Token endpoint returned malformed JSON.")]
	MalformedTokenResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Profile endpoint answered with a non-success status.
	#[error("Profile endpoint returned HTTP status {status}.")]
	ProfileStatus {
		/// HTTP status code returned by the endpoint.
		status: u16,
	},
	/// Profile payload could not be parsed.
	#[error("Profile payload could not be parsed.")]
	ProfileParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Profile payload carries no stable subject identifier.
	#[error("Profile payload is missing a subject identifier.")]
	MissingSubject,
	/// Profile subject identifier failed local validation.
	#[error("Profile subject identifier is not usable.")]
	InvalidSubject {
		/// Underlying identifier validation failure.
		#[source]
		source: crate::identity::IdentifierError,
	},
}
