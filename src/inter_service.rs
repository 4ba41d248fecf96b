//! JWT-authenticated requests between internal services.
//!
//! Each request carries a short-lived HS256 token signed with a key shared by the caller and
//! the callee. Responses are handed back untouched; interpreting their status is the caller's
//! concern.

// std
#[cfg(feature = "reqwest")] use std::time::Duration as StdDuration;
// crates.io
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use oauth2::http::{
	Method, Request,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	client::JSON_CONTENT_TYPE,
	error::ConfigError,
	http::{self, ApiHttpClient, HttpResponse},
	obs::{self, Operation},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Lifetime of an inter-service token unless overridden.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::minutes(60);
/// Transport timeout of the default inter-service reqwest client.
#[cfg(feature = "reqwest")]
pub const DEFAULT_INTER_SERVICE_TIMEOUT: StdDuration = StdDuration::from_secs(60);

/// Environment variable names read by [`InterServiceConfig::from_env`].
pub mod env {
	/// Shared HS256 signing key.
	pub const JWT_KEY: &str = "JWT_KEY";
	/// Token lifetime in minutes.
	pub const TOKEN_EXPIRE_MINUTES: &str = "INTER_SERVICE_TOKEN_EXPIRE_MINUTES";
}

/// Claims carried by inter-service tokens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
	/// Issued-at, seconds since the Unix epoch.
	pub iat: i64,
	/// Expiry, seconds since the Unix epoch.
	pub exp: i64,
}

/// Target service and signing material for an [`InterServiceClient`].
#[derive(Clone, Debug)]
pub struct InterServiceConfig {
	/// Name of the service being called.
	pub name: String,
	/// Base URL requests are resolved against, without a trailing slash.
	pub root_domain: String,
	/// Shared HS256 signing key.
	pub signing_key: TokenSecret,
	/// Lifetime of each issued token.
	pub token_ttl: Duration,
}
impl InterServiceConfig {
	/// Creates a config with the default token lifetime.
	pub fn new(
		name: impl Into<String>,
		root_domain: impl Into<String>,
		signing_key: impl Into<String>,
	) -> Self {
		Self {
			name: name.into(),
			root_domain: root_domain.into(),
			signing_key: TokenSecret::new(signing_key),
			token_ttl: DEFAULT_TOKEN_TTL,
		}
	}

	/// Overrides the token lifetime.
	pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
		self.token_ttl = ttl;

		self
	}

	/// Reads the signing key and token lifetime from the process environment.
	pub fn from_env(
		name: impl Into<String>,
		root_domain: impl Into<String>,
	) -> Result<Self, ConfigError> {
		Self::from_lookup(name, root_domain, |var| std::env::var(var).ok())
	}

	/// Reads the signing key and token lifetime through `lookup`.
	///
	/// The lifetime falls back to 60 minutes when unset.
	pub fn from_lookup<F>(
		name: impl Into<String>,
		root_domain: impl Into<String>,
		lookup: F,
	) -> Result<Self, ConfigError>
	where
		F: Fn(&'static str) -> Option<String>,
	{
		let signing_key = lookup(env::JWT_KEY)
			.filter(|key| !key.is_empty())
			.ok_or(ConfigError::MissingEnvVar { name: env::JWT_KEY })?;
		let mut config = Self::new(name, root_domain, signing_key);

		if let Some(minutes) = lookup(env::TOKEN_EXPIRE_MINUTES).filter(|v| !v.is_empty()) {
			let parsed = minutes.trim().parse::<i64>().map_err(|_| ConfigError::InvalidEnvVar {
				name: env::TOKEN_EXPIRE_MINUTES,
				value: minutes.clone(),
			})?;

			config.token_ttl = Duration::minutes(parsed);
		}

		Ok(config)
	}
}

/// Client for JWT-authenticated service-to-service requests.
pub struct InterServiceClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Transport used for outbound requests.
	pub http_client: Arc<C>,
	config: InterServiceConfig,
	encoding_key: EncodingKey,
}
impl<C> InterServiceClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_http_client(config: InterServiceConfig, http_client: impl Into<Arc<C>>) -> Self {
		let encoding_key = EncodingKey::from_secret(config.signing_key.expose().as_bytes());

		Self { http_client: http_client.into(), config, encoding_key }
	}

	/// Target service configuration.
	pub fn config(&self) -> &InterServiceConfig {
		&self.config
	}

	/// Name of the target service.
	pub fn name(&self) -> &str {
		&self.config.name
	}

	/// Resolves `path` against the root domain.
	pub fn request_url(&self, path: &str) -> String {
		format!("{}/{path}", self.config.root_domain)
	}

	/// Issues a signed HS256 token valid for the configured lifetime.
	pub fn create_auth_token(&self) -> Result<String> {
		let issued_at = OffsetDateTime::now_utc();
		let claims = Claims {
			iat: issued_at.unix_timestamp(),
			exp: (issued_at + self.config.token_ttl).unix_timestamp(),
		};

		Ok(jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
	}

	/// Checks the signature and expiry of a token issued under the same key.
	pub fn verify_auth_token(&self, token: &str) -> Result<Claims> {
		let key = DecodingKey::from_secret(self.config.signing_key.expose().as_bytes());
		let data = jsonwebtoken::decode::<Claims>(token, &key, &Validation::new(Algorithm::HS256))
			.map_err(Error::InvalidJwt)?;

		Ok(data.claims)
	}

	/// Sends `body` as JSON to `<root_domain>/<path>` with a fresh bearer token.
	pub async fn make_request<B>(&self, method: Method, path: &str, body: &B) -> Result<HttpResponse>
	where
		B: ?Sized + Serialize + Sync,
	{
		obs::observe(Operation::InterServiceRequest, "make_request", async {
			let url = self.request_url(path);
			let token = self.create_auth_token()?;
			let payload = serde_json::to_vec(body).map_err(Error::Encode)?;
			let request = Request::builder()
				.method(method.clone())
				.uri(url.as_str())
				.header(AUTHORIZATION, format!("Bearer {token}"))
				.header(ACCEPT, JSON_CONTENT_TYPE)
				.header(CONTENT_TYPE, JSON_CONTENT_TYPE)
				.body(payload)
				.map_err(ConfigError::from)?;

			obs::record_outbound_request(method.as_str(), &url);

			self.http_client.execute(request).await.map_err(http::map_transport_error)
		})
		.await
	}
}
#[cfg(feature = "reqwest")]
impl InterServiceClient<ReqwestHttpClient> {
	/// Creates a client with a reqwest transport that times out after one minute.
	pub fn new(config: InterServiceConfig) -> Result<Self> {
		let http_client = ReqwestHttpClient::with_timeout(DEFAULT_INTER_SERVICE_TIMEOUT)?;

		Ok(Self::with_http_client(config, http_client))
	}
}
impl<C> Debug for InterServiceClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("InterServiceClient").field("config", &self.config).finish()
	}
}
