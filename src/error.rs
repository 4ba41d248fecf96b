//! Client-level error types shared across authentication, dispatch, and utilities.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Configuration failed a precondition check.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, aborted connections).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Token endpoint or resource endpoint returned malformed JSON.
	#[error(transparent)]
	Decode(#[from] DecodeError),
	/// Token state is internally inconsistent after an otherwise successful exchange.
	#[error(transparent)]
	Postcondition(#[from] PostconditionError),
	/// Message encryption or decryption failed.
	#[error(transparent)]
	Crypto(#[from] crate::crypto::CryptoError),
	/// Inter-service token could not be signed.
	#[error("failed to create token with err: {0}")]
	Jwt(#[from] jsonwebtoken::errors::Error),
	/// Inter-service token failed signature or expiry checks.
	#[error("invalid inter-service token: {0}")]
	InvalidJwt(#[source] jsonwebtoken::errors::Error),
	/// Request body could not be encoded as JSON.
	#[error("failed to encode request body: {0}")]
	Encode(#[source] serde_json::Error),

	/// Token endpoint answered with a non-2xx status.
	#[error("server error status: {status}")]
	AuthServer {
		/// HTTP status code returned by the token endpoint.
		status: u16,
		/// Raw response body, kept for diagnostics.
		body: String,
	},
	/// Resource endpoint answered with something other than JSON.
	#[error("expected application/json Content-Type, got {actual}")]
	ContentType {
		/// Content type reported by the resource endpoint (empty when absent).
		actual: String,
	},
	/// Pagination cursor is not an integer offset.
	#[error("expected `{cursor}` to be parseable as an int; got {value}")]
	PaginationCursor {
		/// Cursor argument name (`after` or `before`).
		cursor: &'static str,
		/// Rejected value.
		value: String,
	},
	/// Refresh exchange failed; requests that waited on the same exchange share this failure.
	#[error(transparent)]
	Refresh(Arc<Error>),
	/// Client was used before a successful `initialize`.
	#[error(
		"the EDI httpClient is not correctly initialized. Please use the `.Initialize` constructor."
	)]
	Uninitialized,
	/// Refresh was requested before a successful `initialize`.
	#[error("cannot Refresh API tokens on an uninitialized client")]
	RefreshUninitialized,
}

/// Configuration and validation failures raised before any network call.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Client id is blank, non-alphanumeric, or too short.
	#[error(
		"`{value}` is not a valid clientId, expected a non-blank alphanumeric string of at least {min_length} characters"
	)]
	InvalidClientId {
		/// Rejected value.
		value: String,
		/// Required minimum length.
		min_length: usize,
	},
	/// Client secret is blank, non-alphanumeric, or too short.
	#[error(
		"`{value}` is not a valid clientSecret, expected a non-blank alphanumeric string of at least {min_length} characters"
	)]
	InvalidClientSecret {
		/// Rejected value.
		value: String,
		/// Required minimum length.
		min_length: usize,
	},
	/// Token URL is not an absolute http(s) URL.
	#[error("`{value}` is not a valid apiTokenURL, expected an http(s) URL")]
	InvalidTokenUrl {
		/// Rejected value.
		value: String,
	},
	/// API host is neither an IP address nor a domain name.
	#[error("`{value}` is not a valid apiHost, expected a valid IP or domain name")]
	InvalidApiHost {
		/// Rejected value.
		value: String,
	},
	/// API scheme is neither `http` nor `https`.
	#[error("`{value}` is not a valid apiScheme, expected http or https")]
	InvalidApiScheme {
		/// Rejected value.
		value: String,
	},
	/// Grant type other than `password`.
	#[error("the only supported OAuth grant type for now is 'password'")]
	UnsupportedGrantType {
		/// Rejected value.
		value: String,
	},
	/// Username is not an email address.
	#[error("the username `{value}` is not a valid email")]
	InvalidUsername {
		/// Rejected value.
		value: String,
	},
	/// Password is shorter than the configured minimum.
	#[error("the Password should be a string of at least {min_length} characters")]
	PasswordTooShort {
		/// Required minimum length.
		min_length: usize,
	},
	/// Refresh ratio outside the open interval (0, 1).
	#[error("`{value}` is not a valid refresh ratio, expected a value strictly between 0 and 1")]
	InvalidRefreshRatio {
		/// Rejected value.
		value: f64,
	},
	/// Required environment variable is missing.
	#[error("the environment variable '{name}' is not set")]
	MissingEnvVar {
		/// Variable name.
		name: &'static str,
	},
	/// Optional tunable in the environment could not be parsed.
	#[error("misconfigured environment variable '{name}': `{value}`")]
	InvalidEnvVar {
		/// Variable name.
		name: &'static str,
		/// Rejected value.
		value: String,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Token URL could not be parsed while deriving another URL from it.
	#[error(transparent)]
	UrlParse(#[from] url::ParseError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("{}", display_chain(&**source))]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error(transparent)]
	Io(#[from] std::io::Error),
	/// Transport reported a failure without a typed error.
	#[error("{0}")]
	Other(String),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// JSON decoding failures, with the path of the offending field.
#[derive(Debug, ThisError)]
#[error(transparent)]
pub struct DecodeError(#[from] pub serde_path_to_error::Error<serde_json::Error>);

/// Token-state fields checked after initialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenField {
	/// `access_token`.
	AccessToken,
	/// `token_type`.
	TokenType,
	/// `refresh_token`.
	RefreshToken,
	/// `scope`.
	AccessScope,
	/// `expires_in`.
	ExpiresIn,
	/// Computed refresh instant.
	RefreshAt,
}
impl TokenField {
	/// Returns the label used in postcondition messages.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenField::AccessToken => "access token",
			TokenField::TokenType => "token type",
			TokenField::RefreshToken => "Refresh token",
			TokenField::AccessScope => "access scope text",
			TokenField::ExpiresIn => "expiresIn",
			TokenField::RefreshAt => "past refreshAt",
		}
	}
}
impl Display for TokenField {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Raised when a grant decodes cleanly but is semantically unusable.
#[derive(Debug, PartialEq, Eq, ThisError)]
#[error("invalid {field} after EDIAPIClient initialization{}", expectation(.field))]
pub struct PostconditionError {
	/// Field that failed the check.
	pub field: TokenField,
}

fn expectation(field: &TokenField) -> &'static str {
	match field {
		TokenField::TokenType => ", expected 'Bearer'",
		_ => "",
	}
}

// Transport errors such as reqwest's hide the root cause (e.g. `EOF`) in the source chain.
fn display_chain(err: &(dyn std::error::Error + 'static)) -> String {
	let mut message = err.to_string();
	let mut source = err.source();

	while let Some(inner) = source {
		let text = inner.to_string();

		if !message.contains(&text) {
			message.push_str(": ");
			message.push_str(&text);
		}

		source = inner.source();
	}

	message
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[derive(Debug, ThisError)]
	#[error("error sending request")]
	struct Outer(#[source] std::io::Error);

	#[test]
	fn network_errors_surface_the_full_chain() {
		let inner = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "EOF");
		let err = TransportError::network(Outer(inner));

		assert_eq!(err.to_string(), "error sending request: EOF");
	}

	#[test]
	fn postcondition_messages_name_the_field() {
		let err = PostconditionError { field: TokenField::AccessToken };

		assert_eq!(err.to_string(), "invalid access token after EDIAPIClient initialization");

		let err = PostconditionError { field: TokenField::TokenType };

		assert_eq!(
			err.to_string(),
			"invalid token type after EDIAPIClient initialization, expected 'Bearer'"
		);
		assert_eq!(
			PostconditionError { field: TokenField::RefreshToken }.to_string(),
			"invalid Refresh token after EDIAPIClient initialization"
		);
		assert_eq!(
			PostconditionError { field: TokenField::AccessScope }.to_string(),
			"invalid access scope text after EDIAPIClient initialization"
		);
	}

	#[test]
	fn password_errors_keep_the_capitalized_field_name() {
		let err = ConfigError::PasswordTooShort { min_length: 4 };

		assert_eq!(err.to_string(), "the Password should be a string of at least 4 characters");
	}

	#[test]
	fn shared_refresh_failures_display_the_underlying_error() {
		let err = Error::Refresh(Arc::new(Error::AuthServer { status: 503, body: String::new() }));

		assert_eq!(err.to_string(), "server error status: 503");
	}

	#[test]
	fn auth_server_errors_report_the_status_only() {
		let err = Error::AuthServer { status: 500, body: "boom".into() };

		assert_eq!(err.to_string(), "server error status: 500");
	}
}
