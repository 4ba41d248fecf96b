//! Client configuration, environment loading, and the precondition checks run before any
//! network call.
//!
//! [`ClientConfig`] is assembled through [`ClientConfigBuilder`] or [`ClientConfig::from_env`]
//! and validated by [`ClientConfig::validate`], which walks the fields in a fixed order and
//! returns the first failure.

// std
use std::{net::IpAddr, time::Duration as StdDuration};
// crates.io
use oauth2::{ClientId, ClientSecret, ResourceOwnerPassword, ResourceOwnerUsername};
// self
use crate::{_prelude::*, auth::TOKEN_MIN_LENGTH, error::ConfigError};

/// Minimum password length accepted by the credential validator.
pub const PASSWORD_MIN_LENGTH: usize = 4;
/// Default share of a token's lifetime waited out before refreshing it.
pub const DEFAULT_REFRESH_RATIO: f64 = 0.95;
/// Default transport timeout, long enough for slow report-style endpoints.
pub const DEFAULT_REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30 * 60);
/// Only grant type the client speaks.
pub const PASSWORD_GRANT: &str = "password";
/// Header carrying the default workstation id, when one is configured.
pub const WORKSTATION_HEADER: &str = "X-WORKSTATION";

/// Environment variable names read by [`ClientConfig::from_env`].
pub mod env {
	/// OAuth client id.
	pub const CLIENT_ID: &str = "CLIENT_ID";
	/// OAuth client secret.
	pub const CLIENT_SECRET: &str = "CLIENT_SECRET";
	/// Resource owner username (an email address).
	pub const USERNAME: &str = "USERNAME";
	/// Resource owner password.
	pub const PASSWORD: &str = "PASSWORD";
	/// OAuth grant type.
	pub const GRANT_TYPE: &str = "GRANT_TYPE";
	/// Scheme of the API host.
	pub const API_SCHEME: &str = "API_SCHEME";
	/// Token endpoint URL.
	pub const TOKEN_URL: &str = "TOKEN_URL";
	/// API host name or IP address.
	pub const API_HOST: &str = "HOST";
	/// Optional auth server domain.
	pub const AUTH_SERVER_DOMAIN: &str = "AUTH_SERVER_DOMAIN";
	/// Optional workstation id forwarded as an extra header.
	pub const WORKSTATION_ID: &str = "DEFAULT_WORKSTATION_ID";
}

/// Connection settings and credentials for a password-grant API client.
///
/// Secrets are held in `oauth2` newtypes so `Debug` output stays redacted.
#[derive(Clone, Debug)]
pub struct ClientConfig {
	/// OAuth client id.
	pub client_id: ClientId,
	/// OAuth client secret.
	pub client_secret: ClientSecret,
	/// Absolute http(s) URL of the token endpoint.
	pub api_token_url: String,
	/// Auth server domain, when it differs from the token URL host.
	pub auth_server_domain: Option<String>,
	/// Host name or IP address of the API server.
	pub api_host: String,
	/// `http` or `https`.
	pub api_scheme: String,
	/// OAuth grant type; must be `password`.
	pub grant_type: String,
	/// Resource owner username (an email address).
	pub username: ResourceOwnerUsername,
	/// Resource owner password.
	pub password: ResourceOwnerPassword,
	/// Headers attached to every dispatched request.
	pub extra_headers: BTreeMap<String, String>,
	/// Share of the token lifetime to wait out before refreshing, in `(0, 1)`.
	pub refresh_ratio: f64,
	/// Transport timeout applied by the default reqwest client.
	pub request_timeout: StdDuration,
}
impl ClientConfig {
	/// Creates a builder with empty credentials and default tunables.
	pub fn builder() -> ClientConfigBuilder {
		ClientConfigBuilder::default()
	}

	/// Loads the configuration from process environment variables.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Loads the configuration through `lookup`, treating blank values as unset.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&'static str) -> Option<String>,
	{
		let optional = |name| lookup(name).filter(|value| !value.is_empty());
		let required = |name| optional(name).ok_or(ConfigError::MissingEnvVar { name });
		let mut builder = ClientConfig::builder()
			.client_id(required(env::CLIENT_ID)?)
			.client_secret(required(env::CLIENT_SECRET)?)
			.username(required(env::USERNAME)?)
			.password(required(env::PASSWORD)?)
			.grant_type(required(env::GRANT_TYPE)?)
			.api_scheme(required(env::API_SCHEME)?)
			.api_token_url(required(env::TOKEN_URL)?)
			.api_host(required(env::API_HOST)?);

		if let Some(domain) = optional(env::AUTH_SERVER_DOMAIN) {
			builder = builder.auth_server_domain(domain);
		}
		if let Some(workstation) = optional(env::WORKSTATION_ID) {
			builder = builder.header(WORKSTATION_HEADER, workstation);
		}

		Ok(builder.build())
	}

	/// Runs the precondition checks in their fixed order, failing fast.
	pub fn validate(&self) -> Result<(), ConfigError> {
		let client_id = self.client_id.as_str();

		if !is_alphanumeric(client_id) || client_id.len() < TOKEN_MIN_LENGTH {
			return Err(ConfigError::InvalidClientId {
				value: client_id.to_owned(),
				min_length: TOKEN_MIN_LENGTH,
			});
		}

		let client_secret = self.client_secret.secret();

		if !is_alphanumeric(client_secret) || client_secret.len() < TOKEN_MIN_LENGTH {
			return Err(ConfigError::InvalidClientSecret {
				value: client_secret.to_owned(),
				min_length: TOKEN_MIN_LENGTH,
			});
		}
		if !is_request_url(&self.api_token_url) {
			return Err(ConfigError::InvalidTokenUrl { value: self.api_token_url.clone() });
		}
		if !is_host(&self.api_host) {
			return Err(ConfigError::InvalidApiHost { value: self.api_host.clone() });
		}
		if self.api_scheme != "http" && self.api_scheme != "https" {
			return Err(ConfigError::InvalidApiScheme { value: self.api_scheme.clone() });
		}
		if self.grant_type != PASSWORD_GRANT {
			return Err(ConfigError::UnsupportedGrantType { value: self.grant_type.clone() });
		}
		if !is_email(self.username.as_str()) {
			return Err(ConfigError::InvalidUsername { value: self.username.as_str().to_owned() });
		}
		if self.password.secret().chars().count() < PASSWORD_MIN_LENGTH {
			return Err(ConfigError::PasswordTooShort { min_length: PASSWORD_MIN_LENGTH });
		}
		if !(0.0..1.0).contains(&self.refresh_ratio) || self.refresh_ratio <= 0.0 {
			return Err(ConfigError::InvalidRefreshRatio { value: self.refresh_ratio });
		}

		Ok(())
	}
}

/// Builder for [`ClientConfig`]; validation is deferred to client initialization.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	client_id: String,
	client_secret: String,
	api_token_url: String,
	auth_server_domain: Option<String>,
	api_host: String,
	api_scheme: String,
	grant_type: String,
	username: String,
	password: String,
	extra_headers: BTreeMap<String, String>,
	refresh_ratio: f64,
	request_timeout: StdDuration,
}
impl ClientConfigBuilder {
	/// Sets the OAuth client id.
	pub fn client_id(mut self, value: impl Into<String>) -> Self {
		self.client_id = value.into();

		self
	}

	/// Sets the OAuth client secret.
	pub fn client_secret(mut self, value: impl Into<String>) -> Self {
		self.client_secret = value.into();

		self
	}

	/// Sets the token endpoint URL.
	pub fn api_token_url(mut self, value: impl Into<String>) -> Self {
		self.api_token_url = value.into();

		self
	}

	/// Sets the auth server domain.
	pub fn auth_server_domain(mut self, value: impl Into<String>) -> Self {
		self.auth_server_domain = Some(value.into());

		self
	}

	/// Sets the API host.
	pub fn api_host(mut self, value: impl Into<String>) -> Self {
		self.api_host = value.into();

		self
	}

	/// Sets the API scheme.
	pub fn api_scheme(mut self, value: impl Into<String>) -> Self {
		self.api_scheme = value.into();

		self
	}

	/// Sets the OAuth grant type.
	pub fn grant_type(mut self, value: impl Into<String>) -> Self {
		self.grant_type = value.into();

		self
	}

	/// Sets the resource owner username.
	pub fn username(mut self, value: impl Into<String>) -> Self {
		self.username = value.into();

		self
	}

	/// Sets the resource owner password.
	pub fn password(mut self, value: impl Into<String>) -> Self {
		self.password = value.into();

		self
	}

	/// Adds a header sent with every dispatched request.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.extra_headers.insert(name.into(), value.into());

		self
	}

	/// Overrides the refresh ratio (defaults to [`DEFAULT_REFRESH_RATIO`]).
	pub fn refresh_ratio(mut self, ratio: f64) -> Self {
		self.refresh_ratio = ratio;

		self
	}

	/// Overrides the transport timeout (defaults to [`DEFAULT_REQUEST_TIMEOUT`]).
	pub fn request_timeout(mut self, timeout: StdDuration) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Consumes the builder.
	pub fn build(self) -> ClientConfig {
		ClientConfig {
			client_id: ClientId::new(self.client_id),
			client_secret: ClientSecret::new(self.client_secret),
			api_token_url: self.api_token_url,
			auth_server_domain: self.auth_server_domain,
			api_host: self.api_host,
			api_scheme: self.api_scheme,
			grant_type: self.grant_type,
			username: ResourceOwnerUsername::new(self.username),
			password: ResourceOwnerPassword::new(self.password),
			extra_headers: self.extra_headers,
			refresh_ratio: self.refresh_ratio,
			request_timeout: self.request_timeout,
		}
	}
}
impl Default for ClientConfigBuilder {
	fn default() -> Self {
		Self {
			client_id: String::new(),
			client_secret: String::new(),
			api_token_url: String::new(),
			auth_server_domain: None,
			api_host: String::new(),
			api_scheme: String::new(),
			grant_type: String::new(),
			username: String::new(),
			password: String::new(),
			extra_headers: BTreeMap::new(),
			refresh_ratio: DEFAULT_REFRESH_RATIO,
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
		}
	}
}

fn is_alphanumeric(value: &str) -> bool {
	!value.is_empty() && value.bytes().all(|b| b.is_ascii_alphanumeric())
}

fn is_request_url(value: &str) -> bool {
	match Url::parse(value) {
		Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
		Err(_) => false,
	}
}

fn is_host(value: &str) -> bool {
	value.parse::<IpAddr>().is_ok() || is_dns_name(value)
}

fn is_dns_name(value: &str) -> bool {
	let name = value.strip_suffix('.').unwrap_or(value);

	if name.is_empty() || name.len() > 253 {
		return false;
	}

	name.split('.').all(|label| {
		!label.is_empty()
			&& label.len() <= 63
			&& !label.starts_with('-')
			&& !label.ends_with('-')
			&& label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
	})
}

fn is_email(value: &str) -> bool {
	let Some((local, domain)) = value.rsplit_once('@') else {
		return false;
	};

	!local.is_empty()
		&& local.len() <= 64
		&& !local.starts_with('.')
		&& !local.ends_with('.')
		&& !local.contains("..")
		&& local.bytes().all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-/=?^_`{|}~.".contains(&b))
		&& domain.contains('.')
		&& is_dns_name(domain)
}
