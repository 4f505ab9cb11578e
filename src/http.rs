//! Transport seam for provider token exchanges and profile fetches.
//!
//! The module exposes [`FederationHttpClient`], the crate's only dependency on an HTTP
//! stack: the token handle feeds the `oauth2` code exchange and [`fetch_profile`]
//! retrieves the userinfo document with the caller's bearer token. Implementations must
//! bound both with a request timeout so a stalled provider surfaces as a transport error
//! instead of hanging the request.
//!
//! [`fetch_profile`]: FederationHttpClient::fetch_profile

// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
// self
use crate::{_prelude::*, error::TransportError};
#[cfg(feature = "reqwest")] use crate::error::ConfigError;

/// Future type returned by profile fetches.
pub type ProfileFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ProfileResponse, TransportError>> + 'a + Send>>;

/// Raw response captured from the provider's profile endpoint.
#[derive(Clone, Debug)]
pub struct ProfileResponse {
	/// HTTP status code returned by the endpoint.
	pub status: u16,
	/// Response body, expected to be a JSON document.
	pub body: String,
}

/// Abstraction over HTTP transports used by the federation component.
///
/// Callers provide an implementation (typically behind `Arc<T>`) and the federation
/// requests short-lived [`AsyncHttpClient`] handles for each token exchange. Handles must
/// own whatever state they need so their request futures remain `Send` for the lifetime of
/// the in-flight operation.
pub trait FederationHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle used for the authorization-code exchange.
	type TokenHandle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds a handle for one token-endpoint exchange.
	fn token_handle(&self) -> Self::TokenHandle;

	/// Fetches the profile document with the provided bearer token.
	fn fetch_profile<'a>(&'a self, endpoint: &'a Url, access_token: &'a str)
	-> ProfileFuture<'a>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
/// Token requests never follow redirects, matching OAuth 2.0 guidance that token endpoints
/// return results directly instead of delegating to another URI.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	///
	/// Configure the client to disable redirect following and to carry a request timeout;
	/// [`ReqwestHttpClient::with_timeout`] does both.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client with redirects disabled and the provided request timeout.
	pub fn with_timeout(timeout: std::time::Duration) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.redirect(reqwest::redirect::Policy::none())
			.timeout(timeout)
			.build()?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}

/// Handle bridging reqwest into the `oauth2` exchange machinery.
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct ReqwestTokenHandle(ReqwestClient);
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for ReqwestTokenHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = self.0.clone();

		Box::pin(async move {
			let response = client
				.execute(request.try_into().map_err(Box::new)?)
				.await
				.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut mapped = HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*mapped.status_mut() = status;
			*mapped.headers_mut() = headers;

			Ok(mapped)
		})
	}
}
#[cfg(feature = "reqwest")]
impl FederationHttpClient for ReqwestHttpClient {
	type TokenHandle = ReqwestTokenHandle;
	type TransportError = ReqwestError;

	fn token_handle(&self) -> Self::TokenHandle {
		ReqwestTokenHandle(self.0.clone())
	}

	fn fetch_profile<'a>(
		&'a self,
		endpoint: &'a Url,
		access_token: &'a str,
	) -> ProfileFuture<'a> {
		let client = self.0.clone();
		let endpoint = endpoint.clone();
		let token = access_token.to_owned();

		Box::pin(async move {
			let response = client
				.get(endpoint)
				.bearer_auth(token)
				.send()
				.await
				.map_err(TransportError::from)?;
			let status = response.status().as_u16();
			let body = response.text().await.map_err(TransportError::from)?;

			Ok(ProfileResponse { status, body })
		})
	}
}
