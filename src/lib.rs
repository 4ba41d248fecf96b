//! OAuth 2.0 password-grant API client with proactive token refresh, single-flight token
//! rotation, and the small service-to-service helpers that travel with it.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod http;
pub mod inter_service;
pub mod obs;
pub mod pagination;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::OAuthResponse,
		client::ServerClient,
		config::{ClientConfig, ClientConfigBuilder},
		http::ReqwestHttpClient,
	};

	/// Client id accepted by the credential validator.
	pub const TEST_CLIENT_ID: &str = "clientid1234567890";
	/// Client secret accepted by the credential validator.
	pub const TEST_CLIENT_SECRET: &str = "clientsecret1234567890";
	/// Username accepted by the credential validator.
	pub const TEST_USERNAME: &str = "automated.test@example.com";
	/// Password accepted by the credential validator.
	pub const TEST_PASSWORD: &str = "correct-horse";
	/// Token endpoint path served by mock servers.
	pub const TEST_TOKEN_PATH: &str = "/oauth2/token/";

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

	/// Returns a config builder whose token endpoint and API host point at `base_url`.
	pub fn test_config_builder(base_url: &str) -> ClientConfigBuilder {
		let base = Url::parse(base_url).expect("Mock server base URL should parse.");
		let host = base.host_str().expect("Mock server base URL should carry a host.");

		ClientConfig::builder()
			.client_id(TEST_CLIENT_ID)
			.client_secret(TEST_CLIENT_SECRET)
			.api_token_url(format!("{}{TEST_TOKEN_PATH}", base_url.trim_end_matches('/')))
			.api_host(host)
			.api_scheme(base.scheme())
			.grant_type("password")
			.username(TEST_USERNAME)
			.password(TEST_PASSWORD)
	}

	/// Builds a fully populated config pointing at `base_url`.
	pub fn test_config(base_url: &str) -> ClientConfig {
		test_config_builder(base_url).build()
	}

	/// Constructs an uninitialized [`ServerClient`] backed by the insecure test transport.
	pub fn build_test_client(config: ClientConfig) -> ServerClient<ReqwestHttpClient> {
		ServerClient::with_http_client(config, test_reqwest_http_client())
	}

	/// Token endpoint payload that satisfies every postcondition.
	pub fn valid_grant_json() -> &'static str {
		"{\"access_token\":\"GJJGFDGJJGFGJHHJF\",\"scope\":\"this.is.some.dummy.scope\",\"token_type\":\"Bearer\",\"expires_in\":3600,\"refresh_token\":\"YHGFDSETGJKHFDD\"}"
	}

	/// Token grant matching [`valid_grant_json`] with a caller-chosen lifetime.
	pub fn valid_grant(expires_in: i64) -> OAuthResponse {
		OAuthResponse {
			access_token: "GJJGFDGJJGFGJHHJF".into(),
			token_type: "Bearer".into(),
			expires_in,
			refresh_token: "YHGFDSETGJKHFDD".into(),
			scope: "this.is.some.dummy.scope".into(),
		}
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
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

pub use oauth2;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, tokio as _};
