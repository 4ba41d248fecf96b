//! In-memory [`Client`] double for exercising request-dispatching code without a network.

// std
use std::{
	collections::VecDeque,
	sync::atomic::{AtomicUsize, Ordering},
};
// crates.io
use oauth2::http::Method;
// self
use crate::{
	_prelude::*,
	auth::{ClientStatus, OAuthResponse, TokenSecret, TokenState},
	client::{Client, ClientFuture},
	config::ClientConfig,
	error::TransportError,
	http::HttpResponse,
};

/// Request captured by [`MockClient::make_request`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedRequest {
	/// HTTP method.
	pub method: Method,
	/// Target URL.
	pub url: String,
	/// Request body, if any.
	pub body: Option<Vec<u8>>,
}

/// Scriptable [`Client`] that serves queued responses and records every request.
///
/// Authentication succeeds with [`MockClient::grant`] unless a failure has been queued
/// through [`MockClient::fail_next_auth`]. Requests made while the tokens are due trigger a
/// mock refresh, mirroring the real client.
pub struct MockClient {
	config: ClientConfig,
	grant: OAuthResponse,
	state: RwLock<TokenState>,
	responses: Mutex<VecDeque<Result<HttpResponse>>>,
	auth_failures: Mutex<VecDeque<Error>>,
	requests: Mutex<Vec<RecordedRequest>>,
	auth_calls: AtomicUsize,
}
impl MockClient {
	/// Creates an uninitialized mock that authenticates with `grant`.
	pub fn new(config: ClientConfig, grant: OAuthResponse) -> Self {
		Self {
			config,
			grant,
			state: Default::default(),
			responses: Default::default(),
			auth_failures: Default::default(),
			requests: Default::default(),
			auth_calls: AtomicUsize::new(0),
		}
	}

	/// Creates a mock that is already initialized with `grant`.
	pub fn ready(config: ClientConfig, grant: OAuthResponse) -> Self {
		let client = Self::new(config, grant.clone());

		client.store(grant, ClientStatus::Ready);

		client
	}

	/// Grant returned by every successful mock authentication.
	pub fn grant(&self) -> &OAuthResponse {
		&self.grant
	}

	/// Queues the response returned by the next request.
	pub fn push_response(&self, response: HttpResponse) {
		self.responses.lock().push_back(Ok(response));
	}

	/// Queues a failure returned by the next request.
	pub fn push_error(&self, err: Error) {
		self.responses.lock().push_back(Err(err));
	}

	/// Makes the next authentication or refresh fail with `err`.
	pub fn fail_next_auth(&self, err: Error) {
		self.auth_failures.lock().push_back(err);
	}

	/// Requests received so far, oldest first.
	pub fn requests(&self) -> Vec<RecordedRequest> {
		self.requests.lock().clone()
	}

	/// Number of authentications and refreshes performed.
	pub fn auth_calls(&self) -> usize {
		self.auth_calls.load(Ordering::Relaxed)
	}

	fn exchange(&self) -> Result<OAuthResponse> {
		self.auth_calls.fetch_add(1, Ordering::Relaxed);

		match self.auth_failures.lock().pop_front() {
			Some(err) => Err(err),
			None => Ok(self.grant.clone()),
		}
	}

	fn store(&self, grant: OAuthResponse, status: ClientStatus) {
		*self.state.write() =
			TokenState::from_grant(grant, OffsetDateTime::now_utc(), self.config.refresh_ratio, status);
	}

	fn rotate(&self) -> Result<()> {
		if !self.is_initialized() {
			return Err(Error::RefreshUninitialized);
		}

		match self.exchange() {
			Ok(grant) => {
				self.store(grant, ClientStatus::Ready);

				Ok(())
			},
			Err(err) => {
				self.state.write().status = ClientStatus::Degraded;

				Err(err)
			},
		}
	}
}
impl Client for MockClient {
	fn is_initialized(&self) -> bool {
		self.state.read().is_initialized()
	}

	fn initialize(&self) -> ClientFuture<'_, ()> {
		Box::pin(async move {
			self.config.validate()?;

			let grant = self.exchange()?;
			let state = TokenState::from_grant(
				grant,
				OffsetDateTime::now_utc(),
				self.config.refresh_ratio,
				ClientStatus::Ready,
			);

			state.check_postconditions(OffsetDateTime::now_utc())?;
			*self.state.write() = state;

			Ok(())
		})
	}

	fn authenticate(&self) -> ClientFuture<'_, ()> {
		Box::pin(async move {
			self.config.validate()?;

			let grant = self.exchange()?;

			self.update_auth(grant);

			Ok(())
		})
	}

	fn refresh(&self) -> ClientFuture<'_, ()> {
		Box::pin(async move { self.rotate() })
	}

	fn make_request<'a>(
		&'a self,
		method: Method,
		url: &'a str,
		body: Option<Vec<u8>>,
	) -> ClientFuture<'a, HttpResponse> {
		Box::pin(async move {
			if !self.is_initialized() {
				return Err(Error::Uninitialized);
			}
			if self.state.read().needs_refresh_at(OffsetDateTime::now_utc()) {
				self.rotate()?;
			}

			self.requests.lock().push(RecordedRequest { method, url: url.to_owned(), body });
			self.responses.lock().pop_front().unwrap_or_else(|| {
				Err(TransportError::Other("no scripted response left".into()).into())
			})
		})
	}

	fn update_auth(&self, grant: OAuthResponse) {
		let status = self.state.read().status;

		self.store(grant, status);
	}

	fn me_url(&self) -> Result<String> {
		super::me_url(&self.config.api_token_url)
	}

	fn config(&self) -> &ClientConfig {
		&self.config
	}

	fn status(&self) -> ClientStatus {
		self.state.read().status
	}

	fn access_token(&self) -> TokenSecret {
		self.state.read().access_token.clone()
	}

	fn token_type(&self) -> String {
		self.state.read().token_type.clone()
	}

	fn refresh_token(&self) -> TokenSecret {
		self.state.read().refresh_token.clone()
	}

	fn access_scope(&self) -> String {
		self.state.read().access_scope.clone()
	}

	fn expires_in(&self) -> i64 {
		self.state.read().expires_in
	}

	fn refresh_at(&self) -> OffsetDateTime {
		self.state.read().refresh_at
	}
}
impl Debug for MockClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MockClient")
			.field("status", &self.status())
			.field("auth_calls", &self.auth_calls())
			.finish()
	}
}
