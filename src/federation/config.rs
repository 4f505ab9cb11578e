//! Provider configuration validated once at startup.

// std
use std::time::Duration as StdDuration;
// self
use crate::_prelude::*;

/// Preferred client authentication modes for token endpoint calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
	/// Public clients that prove possession via PKCE.
	NoneWithPkce,
}

/// Endpoint set required to complete a federated login.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Authorization endpoint the end-user is redirected to.
	pub authorization: Url,
	/// Token endpoint used for the authorization-code exchange.
	pub token: Url,
	/// Userinfo endpoint queried for the profile payload.
	pub userinfo: Url,
}

/// Immutable provider configuration consumed by [`Federation`](crate::federation::Federation).
///
/// Client id, secret, and callback URL come from the deployment environment at startup;
/// none of them is ever derived from request data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// Client secret for confidential authentication methods.
	pub client_secret: Option<String>,
	/// Callback URL registered with the provider.
	pub redirect_uri: Url,
	/// Endpoint definitions exposed by the provider.
	pub endpoints: ProviderEndpoints,
	/// Scopes requested during the handshake.
	pub scopes: Vec<String>,
	/// Preferred client authentication mechanism.
	pub client_auth_method: ClientAuthMethod,
	/// Bound applied to every provider round trip.
	pub timeout: StdDuration,
}
impl ProviderConfig {
	/// Default bound applied to provider round trips.
	pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(10);

	/// Creates a new builder for the provided client identifier.
	pub fn builder(client_id: impl Into<String>) -> ProviderConfigBuilder {
		ProviderConfigBuilder::new(client_id)
	}

	/// Ready-made configuration for Google's OAuth 2.0 endpoints.
	pub fn google(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		redirect_uri: Url,
	) -> Result<Self, ProviderConfigError> {
		let parse = |raw: &str| {
			Url::parse(raw).map_err(|source| ProviderConfigError::InvalidUrl { source })
		};

		Self::builder(client_id)
			.client_secret(client_secret)
			.authorization_endpoint(parse("https://accounts.google.com/o/oauth2/v2/auth")?)
			.token_endpoint(parse("https://oauth2.googleapis.com/token")?)
			.userinfo_endpoint(parse("https://openidconnect.googleapis.com/v1/userinfo")?)
			.redirect_uri(redirect_uri)
			.scope("profile")
			.scope("email")
			.build()
	}
}

/// Errors raised while constructing or validating provider configuration.
#[derive(Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum ProviderConfigError {
	/// Authorization endpoint is required.
	#[error("Missing authorization endpoint.")]
	MissingAuthorizationEndpoint,
	/// Token endpoint is required.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// Userinfo endpoint is required.
	#[error("Missing userinfo endpoint.")]
	MissingUserinfoEndpoint,
	/// Redirect URI is required.
	#[error("Missing redirect URI.")]
	MissingRedirectUri,
	/// Provider endpoints must use HTTPS.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Confidential client authentication requires a secret.
	#[error("A confidential client authentication method requires a client secret.")]
	MissingClientSecret,
	/// Endpoint URL could not be parsed.
	#[error("Endpoint URL is invalid.")]
	InvalidUrl {
		/// Underlying parsing failure.
		#[source]
		#[serde(skip)]
		source: url::ParseError,
	},
}

/// Builder for [`ProviderConfig`] values.
#[derive(Debug)]
pub struct ProviderConfigBuilder {
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// Optional client secret.
	pub client_secret: Option<String>,
	/// Callback URL registered with the provider.
	pub redirect_uri: Option<Url>,
	/// Optional authorization endpoint.
	pub authorization_endpoint: Option<Url>,
	/// Optional token endpoint.
	pub token_endpoint: Option<Url>,
	/// Optional userinfo endpoint.
	pub userinfo_endpoint: Option<Url>,
	/// Scopes requested during the handshake.
	pub scopes: Vec<String>,
	/// Preferred client authentication method.
	pub client_auth_method: ClientAuthMethod,
	/// Bound applied to provider round trips.
	pub timeout: StdDuration,
}
impl ProviderConfigBuilder {
	/// Creates a new builder seeded with the provided client identifier.
	pub fn new(client_id: impl Into<String>) -> Self {
		Self {
			client_id: client_id.into(),
			client_secret: None,
			redirect_uri: None,
			authorization_endpoint: None,
			token_endpoint: None,
			userinfo_endpoint: None,
			scopes: Vec::new(),
			client_auth_method: ClientAuthMethod::default(),
			timeout: ProviderConfig::DEFAULT_TIMEOUT,
		}
	}

	/// Sets the client secret.
	pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(secret.into());

		self
	}

	/// Sets the callback URL.
	pub fn redirect_uri(mut self, url: Url) -> Self {
		self.redirect_uri = Some(url);

		self
	}

	/// Sets the authorization endpoint.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.authorization_endpoint = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the userinfo endpoint.
	pub fn userinfo_endpoint(mut self, url: Url) -> Self {
		self.userinfo_endpoint = Some(url);

		self
	}

	/// Adds a single requested scope.
	pub fn scope(mut self, scope: impl Into<String>) -> Self {
		self.scopes.push(scope.into());

		self
	}

	/// Overrides the preferred client authentication method.
	pub fn client_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth_method = method;

		self
	}

	/// Overrides the provider round-trip timeout.
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ProviderConfig, ProviderConfigError> {
		let authorization = self
			.authorization_endpoint
			.ok_or(ProviderConfigError::MissingAuthorizationEndpoint)?;
		let token = self.token_endpoint.ok_or(ProviderConfigError::MissingTokenEndpoint)?;
		let userinfo =
			self.userinfo_endpoint.ok_or(ProviderConfigError::MissingUserinfoEndpoint)?;
		let redirect_uri = self.redirect_uri.ok_or(ProviderConfigError::MissingRedirectUri)?;
		let config = ProviderConfig {
			client_id: self.client_id,
			client_secret: self.client_secret,
			redirect_uri,
			endpoints: ProviderEndpoints { authorization, token, userinfo },
			scopes: self.scopes,
			client_auth_method: self.client_auth_method,
			timeout: self.timeout,
		};

		config.validate()?;

		Ok(config)
	}
}

impl ProviderConfig {
	/// Validates invariants for the configuration.
	fn validate(&self) -> Result<(), ProviderConfigError> {
		validate_endpoint("authorization", &self.endpoints.authorization)?;
		validate_endpoint("token", &self.endpoints.token)?;
		validate_endpoint("userinfo", &self.endpoints.userinfo)?;

		if !matches!(self.client_auth_method, ClientAuthMethod::NoneWithPkce)
			&& self.client_secret.is_none()
		{
			return Err(ProviderConfigError::MissingClientSecret);
		}

		Ok(())
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ProviderConfigError> {
	if url.scheme() != "https" {
		Err(ProviderConfigError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	} else {
		Ok(())
	}
}
