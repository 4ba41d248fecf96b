//! Object-safe capability surface shared by the real client and test doubles.

// crates.io
use oauth2::http::Method;
// self
use crate::{
	_prelude::*,
	auth::{ClientStatus, OAuthResponse, TokenSecret},
	client::ServerClient,
	config::ClientConfig,
	http::{ApiHttpClient, HttpResponse},
};

/// Boxed future returned by [`Client`] operations.
pub type ClientFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Operations and accessors of an authenticated API client.
///
/// Code that only dispatches requests should depend on `dyn Client` so it can be exercised
/// against [`MockClient`](crate::client::MockClient) instead of a live token endpoint.
pub trait Client
where
	Self: Send + Sync,
{
	/// Returns `true` once initialization has succeeded.
	fn is_initialized(&self) -> bool;

	/// Validates the configuration, authenticates, and checks the resulting tokens.
	fn initialize(&self) -> ClientFuture<'_, ()>;

	/// Exchanges the configured credentials for fresh tokens.
	fn authenticate(&self) -> ClientFuture<'_, ()>;

	/// Rotates the tokens of an initialized client.
	fn refresh(&self) -> ClientFuture<'_, ()>;

	/// Sends an authenticated JSON request, refreshing the tokens first when they are due.
	fn make_request<'a>(
		&'a self,
		method: Method,
		url: &'a str,
		body: Option<Vec<u8>>,
	) -> ClientFuture<'a, HttpResponse>;

	/// Folds a grant into the token state.
	fn update_auth(&self, grant: OAuthResponse);

	/// Returns the user profile URL derived from the token URL.
	fn me_url(&self) -> Result<String>;

	/// Configuration the client was built with.
	fn config(&self) -> &ClientConfig;

	/// Current lifecycle status.
	fn status(&self) -> ClientStatus;

	/// Latest access token.
	fn access_token(&self) -> TokenSecret;

	/// Latest token type.
	fn token_type(&self) -> String;

	/// Latest refresh token.
	fn refresh_token(&self) -> TokenSecret;

	/// Latest granted scope.
	fn access_scope(&self) -> String;

	/// Token lifetime in seconds reported by the last exchange.
	fn expires_in(&self) -> i64;

	/// Instant after which the next request refreshes the tokens first.
	fn refresh_at(&self) -> OffsetDateTime;

	/// OAuth client id.
	fn client_id(&self) -> &str {
		self.config().client_id.as_str()
	}

	/// OAuth client secret.
	fn client_secret(&self) -> &str {
		self.config().client_secret.secret()
	}

	/// Token endpoint URL.
	fn api_token_url(&self) -> &str {
		&self.config().api_token_url
	}

	/// Auth server domain, if configured.
	fn auth_server_domain(&self) -> Option<&str> {
		self.config().auth_server_domain.as_deref()
	}

	/// API host.
	fn api_host(&self) -> &str {
		&self.config().api_host
	}

	/// API scheme.
	fn api_scheme(&self) -> &str {
		&self.config().api_scheme
	}

	/// OAuth grant type.
	fn grant_type(&self) -> &str {
		&self.config().grant_type
	}

	/// Resource owner username.
	fn username(&self) -> &str {
		self.config().username.as_str()
	}

	/// Resource owner password.
	fn password(&self) -> &str {
		self.config().password.secret()
	}
}

impl<C> Client for ServerClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn is_initialized(&self) -> bool {
		ServerClient::is_initialized(self)
	}

	fn initialize(&self) -> ClientFuture<'_, ()> {
		Box::pin(ServerClient::initialize(self))
	}

	fn authenticate(&self) -> ClientFuture<'_, ()> {
		Box::pin(ServerClient::authenticate(self))
	}

	fn refresh(&self) -> ClientFuture<'_, ()> {
		Box::pin(ServerClient::refresh(self))
	}

	fn make_request<'a>(
		&'a self,
		method: Method,
		url: &'a str,
		body: Option<Vec<u8>>,
	) -> ClientFuture<'a, HttpResponse> {
		Box::pin(ServerClient::make_request(self, method, url, body))
	}

	fn update_auth(&self, grant: OAuthResponse) {
		ServerClient::update_auth(self, grant);
	}

	fn me_url(&self) -> Result<String> {
		ServerClient::me_url(self)
	}

	fn config(&self) -> &ClientConfig {
		ServerClient::config(self)
	}

	fn status(&self) -> ClientStatus {
		ServerClient::status(self)
	}

	fn access_token(&self) -> TokenSecret {
		ServerClient::access_token(self)
	}

	fn token_type(&self) -> String {
		ServerClient::token_type(self)
	}

	fn refresh_token(&self) -> TokenSecret {
		ServerClient::refresh_token(self)
	}

	fn access_scope(&self) -> String {
		ServerClient::access_scope(self)
	}

	fn expires_in(&self) -> i64 {
		ServerClient::expires_in(self)
	}

	fn refresh_at(&self) -> OffsetDateTime {
		ServerClient::refresh_at(self)
	}
}
