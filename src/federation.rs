//! Federated login orchestration: handshake, profile normalization, and find-or-create
//! identity resolution.

pub mod config;
pub mod profile;
pub mod state;

pub use config::*;
pub use profile::*;
pub use state::*;

// std
use std::borrow::Cow;
// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use oauth2::{
	AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
	HttpClientError, PkceCodeVerifier, RedirectUrl, RequestTokenError, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicRequestTokenError},
};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, FederationError, TransportError},
	http::FederationHttpClient,
	identity::{ExternalId, UserRecord},
	store::IdentityStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

type ConfiguredBasicClient =
	BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

const PKCE_VERIFIER_LEN: usize = 64;

#[cfg(feature = "reqwest")]
/// Federation specialized for the crate's default reqwest transport.
pub type ReqwestFederation = Federation<ReqwestHttpClient>;

/// Coordinates the external-provider handshake and local identity resolution.
///
/// The federation owns the provider configuration, the HTTP transport, and a reference to
/// the identity store so callers only ever see [`start_login`](Self::start_login) and
/// [`complete_login`](Self::complete_login). Concurrent first logins for one external id
/// are funneled through a per-id guard; the store-level uniqueness check remains the
/// authoritative resolution of the find-or-create race.
#[derive(Clone)]
pub struct Federation<C>
where
	C: ?Sized + FederationHttpClient,
{
	/// HTTP transport used for every outbound provider request.
	pub http_client: Arc<C>,
	/// Identity store consulted and written during logins.
	pub store: Arc<dyn IdentityStore>,
	/// Validated provider configuration.
	pub config: ProviderConfig,
	login_guards: Arc<Mutex<HashMap<ExternalId, Arc<AsyncMutex<()>>>>>,
}
impl<C> Federation<C>
where
	C: ?Sized + FederationHttpClient,
{
	/// Creates a federation that reuses the caller-provided transport.
	pub fn with_http_client(
		store: Arc<dyn IdentityStore>,
		config: ProviderConfig,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			store,
			config,
			login_guards: Default::default(),
		}
	}

	/// Starts a login: mints fresh state plus a PKCE pair and builds the authorize URL to
	/// send the end-user to.
	pub fn start_login(&self, redirect_to: Option<String>) -> Result<LoginSession> {
		let state = LoginState::generate(redirect_to);
		let encoded_state = state.encode()?;
		let pkce = PkcePair::generate();
		let authorize_url = self.build_authorize_url(&encoded_state, &pkce);

		Ok(LoginSession { state, authorize_url, pkce })
	}

	/// Completes a login: validates the returned state, exchanges the authorization code,
	/// fetches and normalizes the profile, and resolves the local identity.
	///
	/// Exactly one store write happens on a first login; repeated logins with the same
	/// external id perform zero writes and return the same row. Any provider failure
	/// surfaces as an authentication failure and leaves no identity behind.
	pub async fn complete_login(
		&self,
		session: LoginSession,
		returned_state: &str,
		code: &str,
	) -> Result<CompletedLogin> {
		let state = session.state.validate(returned_state)?;
		let access_token = self.exchange_authorization_code(&session.pkce, code).await?;
		let response = self
			.http_client
			.fetch_profile(&self.config.endpoints.userinfo, &access_token)
			.await?;

		if !(200..300).contains(&response.status) {
			return Err(FederationError::ProfileStatus { status: response.status }.into());
		}

		let profile = ProfilePayload::parse(&response.body)?.normalize()?;
		let user = self.resolve_identity(profile).await?;

		Ok(CompletedLogin { user, redirect_to: state.redirect_to })
	}

	async fn exchange_authorization_code(&self, pkce: &PkcePair, code: &str) -> Result<String> {
		let oauth_client = self.oauth_client()?;
		let handle = self.http_client.token_handle();
		let redirect_url = RedirectUrl::new(self.config.redirect_uri.to_string())
			.map_err(|source| ConfigError::InvalidEndpoint { source })?;
		let response = oauth_client
			.exchange_code(AuthorizationCode::new(code.to_owned()))
			.set_pkce_verifier(PkceCodeVerifier::new(pkce.verifier.clone()))
			.set_redirect_uri(Cow::Owned(redirect_url))
			.request_async(&handle)
			.await
			.map_err(map_exchange_error)?;

		Ok(response.access_token().secret().to_owned())
	}

	async fn resolve_identity(&self, profile: ProviderProfile) -> Result<UserRecord> {
		let external_id = profile.subject.clone();
		let guard = self.login_guard(&external_id);
		let _held = guard.lock().await;

		if let Some(existing) = self.store.find_by_external_id(&external_id).await? {
			return Ok(existing);
		}

		let outcome = self.store.create(profile.into_new_user()).await?;

		if outcome.is_created() {
			tracing::info!(subject = %external_id, "created user on first federated login");
		}

		Ok(outcome.into_record())
	}

	/// Returns (and creates on demand) the singleflight guard for an external id.
	fn login_guard(&self, id: &ExternalId) -> Arc<AsyncMutex<()>> {
		let mut guards = self.login_guards.lock();

		guards.entry(id.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}

	fn oauth_client(&self) -> Result<ConfiguredBasicClient> {
		let auth_url = AuthUrl::new(self.config.endpoints.authorization.to_string())
			.map_err(|source| ConfigError::InvalidEndpoint { source })?;
		let token_url = TokenUrl::new(self.config.endpoints.token.to_string())
			.map_err(|source| ConfigError::InvalidEndpoint { source })?;
		let secret =
			if matches!(self.config.client_auth_method, ClientAuthMethod::NoneWithPkce) {
				None
			} else {
				self.config.client_secret.as_ref().map(|value| ClientSecret::new(value.clone()))
			};
		let mut oauth_client = BasicClient::new(ClientId::new(self.config.client_id.clone()))
			.set_auth_uri(auth_url)
			.set_token_uri(token_url);

		if let Some(secret) = secret {
			oauth_client = oauth_client.set_client_secret(secret);
		}
		if matches!(self.config.client_auth_method, ClientAuthMethod::ClientSecretPost) {
			oauth_client = oauth_client.set_auth_type(AuthType::RequestBody);
		}

		Ok(oauth_client)
	}

	fn build_authorize_url(&self, state: &str, pkce: &PkcePair) -> Url {
		let mut url = self.config.endpoints.authorization.clone();

		{
			let mut pairs = url.query_pairs_mut();

			pairs.append_pair("response_type", "code");
			pairs.append_pair("client_id", &self.config.client_id);
			pairs.append_pair("redirect_uri", self.config.redirect_uri.as_str());

			if !self.config.scopes.is_empty() {
				pairs.append_pair("scope", &self.config.scopes.join(" "));
			}

			pairs.append_pair("state", state);
			pairs.append_pair("code_challenge", &pkce.challenge);
			pairs.append_pair("code_challenge_method", pkce.method.as_str());
		}

		url
	}
}
#[cfg(feature = "reqwest")]
impl Federation<ReqwestHttpClient> {
	/// Creates a federation that provisions its own reqwest transport bounded by the
	/// configured timeout.
	pub fn new(store: Arc<dyn IdentityStore>, config: ProviderConfig) -> Result<Self> {
		let http_client = ReqwestHttpClient::with_timeout(config.timeout)?;

		Ok(Self::with_http_client(store, config, http_client))
	}
}
impl<C> Debug for Federation<C>
where
	C: ?Sized + FederationHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Federation")
			.field("client_id", &self.config.client_id)
			.field("client_secret_set", &self.config.client_secret.is_some())
			.finish()
	}
}

/// Supported PKCE challenge methods surfaced via [`LoginSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PkceCodeChallengeMethod {
	/// SHA-256 based PKCE (RFC 7636 S256).
	S256,
}
impl PkceCodeChallengeMethod {
	/// Returns the RFC 7636 identifier for the challenge method.
	pub fn as_str(self) -> &'static str {
		match self {
			PkceCodeChallengeMethod::S256 => "S256",
		}
	}
}

/// Handshake metadata returned by [`Federation::start_login`].
///
/// The caller must round-trip this session between the redirect and the callback
/// (server-side, keyed however the transport layer prefers); the PKCE verifier never
/// travels through the browser.
#[derive(Clone)]
pub struct LoginSession {
	/// State payload minted for this login.
	pub state: LoginState,
	/// Fully-formed authorize URL the end-user should be sent to.
	pub authorize_url: Url,
	pkce: PkcePair,
}
impl LoginSession {
	/// PKCE code challenge derived from the secret verifier.
	pub fn code_challenge(&self) -> &str {
		&self.pkce.challenge
	}

	/// PKCE challenge method (currently always `S256`).
	pub fn code_challenge_method(&self) -> PkceCodeChallengeMethod {
		self.pkce.method
	}
}
impl Debug for LoginSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginSession")
			.field("state", &self.state)
			.field("authorize_url", &self.authorize_url)
			.field("code_challenge", &self.pkce.challenge)
			.field("code_challenge_method", &self.pkce.method)
			.finish()
	}
}

/// Outcome of a completed login.
#[derive(Clone, Debug)]
pub struct CompletedLogin {
	/// Local identity resolved or created for the external subject.
	pub user: UserRecord,
	/// Redirect target carried through the state parameter.
	pub redirect_to: Option<String>,
}

#[derive(Clone)]
struct PkcePair {
	verifier: String,
	challenge: String,
	method: PkceCodeChallengeMethod,
}
impl PkcePair {
	fn generate() -> Self {
		let verifier = random_string(PKCE_VERIFIER_LEN);
		let challenge = compute_pkce_challenge(&verifier);

		Self { verifier, challenge, method: PkceCodeChallengeMethod::S256 }
	}
}

pub(crate) fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

fn compute_pkce_challenge(verifier: &str) -> String {
	let mut hasher = Sha256::new();

	hasher.update(verifier.as_bytes());

	let digest = hasher.finalize();

	URL_SAFE_NO_PAD.encode(digest)
}

fn map_exchange_error<E>(err: BasicRequestTokenError<HttpClientError<E>>) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	match err {
		RequestTokenError::ServerResponse(response) => {
			let reason = response
				.error_description()
				.cloned()
				.unwrap_or_else(|| response.error().as_ref().to_owned());

			FederationError::AccessDenied { reason }.into()
		},
		RequestTokenError::Request(error) => TransportError::network(error).into(),
		RequestTokenError::Parse(source, _body) =>
			FederationError::MalformedTokenResponse { source }.into(),
		RequestTokenError::Other(message) => FederationError::AccessDenied { reason: message }.into(),
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;
	use crate::store::MemoryIdentityStore;

	fn https(raw: &str) -> Url {
		Url::parse(raw).expect("URL fixture should parse successfully.")
	}

	fn test_federation() -> ReqwestFederation {
		let config = ProviderConfig::builder("client-id")
			.client_secret("secret")
			.authorization_endpoint(https("https://id.example.com/authorize"))
			.token_endpoint(https("https://id.example.com/token"))
			.userinfo_endpoint(https("https://id.example.com/userinfo"))
			.redirect_uri(https("https://app.example.com/callback"))
			.scope("profile")
			.scope("email")
			.build()
			.expect("Provider configuration should build successfully.");

		Federation::with_http_client(
			Arc::new(MemoryIdentityStore::default()),
			config,
			ReqwestHttpClient::default(),
		)
	}

	#[test]
	fn start_login_builds_a_complete_authorize_url() {
		let federation = test_federation();
		let session = federation
			.start_login(Some("/upload".into()))
			.expect("Login session should start successfully.");
		let pairs: HashMap<_, _> = session.authorize_url.query_pairs().into_owned().collect();

		assert_eq!(pairs.get("response_type"), Some(&"code".into()));
		assert_eq!(pairs.get("client_id"), Some(&"client-id".into()));
		assert_eq!(
			pairs.get("redirect_uri"),
			Some(&"https://app.example.com/callback".into())
		);
		assert_eq!(pairs.get("scope"), Some(&"profile email".into()));
		assert_eq!(pairs.get("code_challenge_method"), Some(&"S256".into()));
		assert!(pairs.contains_key("code_challenge"));
		assert_eq!(session.code_challenge_method(), PkceCodeChallengeMethod::S256);

		let returned = pairs.get("state").expect("Authorize URL must carry a state parameter.");
		let parsed = session
			.state
			.validate(returned)
			.expect("State embedded in the authorize URL should validate.");

		assert_eq!(parsed.redirect_to.as_deref(), Some("/upload"));
	}

	#[test]
	fn pkce_challenge_is_the_encoded_digest_of_the_verifier() {
		let pair = PkcePair::generate();

		assert_eq!(pair.verifier.len(), PKCE_VERIFIER_LEN);
		assert_eq!(pair.challenge, compute_pkce_challenge(&pair.verifier));
		assert_ne!(pair.challenge, PkcePair::generate().challenge);
	}

	#[tokio::test]
	async fn mismatched_state_fails_before_any_exchange() {
		let federation = test_federation();
		let session = federation
			.start_login(None)
			.expect("Login session should start successfully.");
		let foreign = LoginState::generate(None)
			.encode()
			.expect("Foreign state should encode successfully.");
		let err = federation
			.complete_login(session, &foreign, "any-code")
			.await
			.expect_err("Foreign state must be rejected.");

		assert!(matches!(err, Error::Federation(FederationError::StateMismatch)));
		assert!(err.is_authentication_failure());
	}
}
