//! Password-grant API client with proactive token refresh.
//!
//! [`ServerClient`] owns a validated [`ClientConfig`], a transport, and the [`TokenState`]
//! derived from the most recent grant. The lifecycle is:
//!
//! - `Uninitialized` → [`ServerClient::initialize`] (preconditions, password grant,
//!   postconditions) → `Ready`.
//! - `Ready` → refresh instant reached and [`ServerClient::refresh`] succeeds → `Ready`.
//! - `Ready` → refresh fails → `Degraded`; requests keep retrying the refresh until one
//!   succeeds.
//!
//! Rotation is guarded by a single-flight lock so concurrent requests that all observe an
//! expired refresh instant trigger one exchange and then reuse its result.

mod authenticate;
mod capability;
mod dispatch;
mod metrics;
#[cfg(any(test, feature = "test"))] mod mock;

pub use capability::*;
pub use dispatch::JSON_CONTENT_TYPE;
pub use metrics::RefreshMetrics;
#[cfg(any(test, feature = "test"))] pub use mock::*;

// self
use crate::{
	_prelude::*,
	auth::{ClientStatus, OAuthResponse, TokenSecret, TokenState},
	config::ClientConfig,
	error::ConfigError,
	http::ApiHttpClient,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Path appended to the token URL's origin to reach the "who am I" endpoint.
pub const ME_URL_FRAGMENT: &str = "v1/user/me/?format=json";

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestServerClient = ServerClient<ReqwestHttpClient>;

/// General purpose client for HTTP APIs guarded by an OAuth 2.0 password grant.
///
/// A client must be initialized (see [`ServerClient::initialize`] or
/// [`ServerClient::connect`]) before it can dispatch requests.
pub struct ServerClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Transport used for token exchanges and resource requests.
	pub http_client: Arc<C>,
	/// Counters for refresh attempts and outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	config: ClientConfig,
	state: RwLock<TokenState>,
	refresh_guard: AsyncMutex<()>,
	refresh_flight: Mutex<RefreshFlight>,
}
impl<C> ServerClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Creates an uninitialized client that reuses the caller-provided transport.
	pub fn with_http_client(config: ClientConfig, http_client: impl Into<Arc<C>>) -> Self {
		Self {
			http_client: http_client.into(),
			refresh_metrics: Default::default(),
			config,
			state: Default::default(),
			refresh_guard: AsyncMutex::new(()),
			refresh_flight: Default::default(),
		}
	}

	/// Configuration the client was built with.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Snapshot of the current token state.
	pub fn token_state(&self) -> TokenState {
		self.state.read().clone()
	}

	/// Current lifecycle status.
	pub fn status(&self) -> ClientStatus {
		self.state.read().status
	}

	/// Returns `true` once [`ServerClient::initialize`] has succeeded.
	pub fn is_initialized(&self) -> bool {
		self.status().is_initialized()
	}

	/// Folds a grant into the token state, keeping the lifecycle status.
	pub fn update_auth(&self, grant: OAuthResponse) {
		self.store_grant(grant, None);
	}

	/// Latest access token.
	pub fn access_token(&self) -> TokenSecret {
		self.state.read().access_token.clone()
	}

	/// Latest token type.
	pub fn token_type(&self) -> String {
		self.state.read().token_type.clone()
	}

	/// Latest refresh token.
	pub fn refresh_token(&self) -> TokenSecret {
		self.state.read().refresh_token.clone()
	}

	/// Latest granted scope.
	pub fn access_scope(&self) -> String {
		self.state.read().access_scope.clone()
	}

	/// Token lifetime in seconds reported by the last exchange.
	pub fn expires_in(&self) -> i64 {
		self.state.read().expires_in
	}

	/// Instant after which the next request refreshes the tokens first.
	pub fn refresh_at(&self) -> OffsetDateTime {
		self.state.read().refresh_at
	}

	/// Derives the user profile URL from the token URL's origin.
	pub fn me_url(&self) -> Result<String> {
		me_url(&self.config.api_token_url)
	}

	fn set_status(&self, status: ClientStatus) {
		self.state.write().status = status;
	}

	fn needs_refresh(&self) -> bool {
		self.state.read().needs_refresh_at(OffsetDateTime::now_utc())
	}
}
#[cfg(feature = "reqwest")]
impl ServerClient<ReqwestHttpClient> {
	/// Creates an uninitialized client with a reqwest transport honoring
	/// [`ClientConfig::request_timeout`].
	pub fn new(config: ClientConfig) -> Result<Self> {
		let http_client = ReqwestHttpClient::with_timeout(config.request_timeout)?;

		Ok(Self::with_http_client(config, http_client))
	}

	/// Creates and initializes a client in one step.
	pub async fn connect(config: ClientConfig) -> Result<Self> {
		let client = Self::new(config)?;

		client.initialize().await?;

		Ok(client)
	}

	/// Creates and initializes a client from the process environment.
	pub async fn from_env() -> Result<Self> {
		Self::connect(ClientConfig::from_env()?).await
	}
}
impl<C> Debug for ServerClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.state.read();

		f.debug_struct("ServerClient")
			.field("config", &self.config)
			.field("status", &state.status)
			.field("refresh_at", &state.refresh_at)
			.finish()
	}
}

// Outcome of the most recent refresh exchange, bumped while `refresh_guard` is held.
#[derive(Debug, Default)]
struct RefreshFlight {
	generation: u64,
	failure: Option<Arc<Error>>,
}

/// Connects with `config` and returns the resulting access token.
#[cfg(feature = "reqwest")]
pub async fn get_access_token(config: ClientConfig) -> Result<TokenSecret> {
	let client = ServerClient::connect(config).await?;

	Ok(client.access_token())
}

/// Fails with [`Error::Uninitialized`] unless `client` completed initialization.
pub fn check_initialization(client: &dyn Client) -> Result<()> {
	if client.is_initialized() { Ok(()) } else { Err(Error::Uninitialized) }
}

fn me_url(api_token_url: &str) -> Result<String> {
	let token_url = Url::parse(api_token_url).map_err(ConfigError::from)?;
	let host = token_url.host_str().unwrap_or_default();
	let port = token_url.port().map(|port| format!(":{port}")).unwrap_or_default();

	Ok(format!("{}://{host}{port}/{ME_URL_FRAGMENT}", token_url.scheme()))
}
