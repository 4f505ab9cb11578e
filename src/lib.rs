//! Identity federation, session resolution, and signed action links for the Leafpass
//! plant-classification service.
//!
//! The crate owns the security-bearing core of the service: resolving "who is this caller"
//! (OAuth federation plus session identity) and "is this specific action authorized" (signed,
//! self-contained action tokens). HTTP routes, admin screens, and persistence schemas live in
//! the surrounding application and consume these components as a library.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod action;
pub mod error;
pub mod federation;
pub mod http;
pub mod identity;
pub mod notify;
pub mod session;
pub mod store;

#[cfg(feature = "reqwest")]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests.

	pub use crate::_prelude::*;

	// self
	use crate::{
		federation::{Federation, ProviderConfig},
		http::ReqwestHttpClient,
		store::{IdentityStore, MemoryIdentityStore},
	};

	/// Federation type alias used by reqwest-backed integration tests.
	pub type ReqwestTestFederation = Federation<ReqwestHttpClient>;

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Constructs a [`Federation`] backed by an in-memory identity store and the reqwest
	/// transport used across integration tests.
	pub fn build_reqwest_test_federation(
		config: ProviderConfig,
	) -> (ReqwestTestFederation, Arc<MemoryIdentityStore>) {
		let store_backend = Arc::new(MemoryIdentityStore::default());
		let store: Arc<dyn IdentityStore> = store_backend.clone();
		let federation = Federation::with_http_client(store, config, test_reqwest_http_client());

		(federation, store_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
