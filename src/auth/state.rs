//! In-memory token state owned by a single client instance.

// crates.io
use time::PrimitiveDateTime;
// self
use crate::{
	_prelude::*,
	auth::{OAuthResponse, TOKEN_MIN_LENGTH, TokenSecret},
	error::{PostconditionError, TokenField},
};

/// Lifecycle of a client's authentication state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
	/// No successful initialization yet (or the configuration was rejected).
	#[default]
	Uninitialized,
	/// Authenticated; tokens are usable until the refresh instant.
	Ready,
	/// The last refresh failed; requests keep retrying the refresh until one succeeds.
	Degraded,
}
impl ClientStatus {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ClientStatus::Uninitialized => "uninitialized",
			ClientStatus::Ready => "ready",
			ClientStatus::Degraded => "degraded",
		}
	}

	/// `true` once `initialize` has completed successfully.
	pub const fn is_initialized(self) -> bool {
		!matches!(self, ClientStatus::Uninitialized)
	}
}
impl Display for ClientStatus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Tokens and bookkeeping derived from the most recent successful grant.
///
/// A state is always replaced wholesale; no field is updated on its own.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenState {
	/// Access token presented as `Authorization: Bearer <token>`.
	pub access_token: TokenSecret,
	/// Token type reported by the token endpoint.
	pub token_type: String,
	/// Refresh token reported by the token endpoint.
	pub refresh_token: TokenSecret,
	/// Scope granted to the access token.
	pub access_scope: String,
	/// Lifetime in seconds reported by the token endpoint.
	pub expires_in: i64,
	/// Instant after which requests re-authenticate before being sent.
	pub refresh_at: OffsetDateTime,
	/// Authentication lifecycle status.
	pub status: ClientStatus,
}
impl TokenState {
	/// Folds a grant into a fresh state.
	///
	/// `refresh_at` is `issued_at + trunc(expires_in * refresh_ratio)` whole seconds, clamped to
	/// the representable date range.
	pub fn from_grant(
		grant: OAuthResponse,
		issued_at: OffsetDateTime,
		refresh_ratio: f64,
		status: ClientStatus,
	) -> Self {
		let refresh_at = refresh_instant(issued_at, grant.expires_in, refresh_ratio);

		Self {
			access_token: TokenSecret::new(grant.access_token),
			token_type: grant.token_type,
			refresh_token: TokenSecret::new(grant.refresh_token),
			access_scope: grant.scope,
			expires_in: grant.expires_in,
			refresh_at,
			status,
		}
	}

	/// Returns `true` if the access token must be rotated before use at `now`.
	pub fn needs_refresh_at(&self, now: OffsetDateTime) -> bool {
		now >= self.refresh_at
	}

	/// Returns `true` once the owning client completed initialization.
	pub fn is_initialized(&self) -> bool {
		self.status.is_initialized()
	}

	/// Checks that the state is usable, in a fixed order, returning the first failure.
	pub fn check_postconditions(&self, now: OffsetDateTime) -> Result<(), PostconditionError> {
		let fail = |field| Err(PostconditionError { field });

		if self.access_token.len() < TOKEN_MIN_LENGTH {
			return fail(TokenField::AccessToken);
		}
		if self.token_type != "Bearer" {
			return fail(TokenField::TokenType);
		}
		if self.refresh_token.len() < TOKEN_MIN_LENGTH {
			return fail(TokenField::RefreshToken);
		}
		if !self.access_scope.is_ascii() || self.access_scope.len() < TOKEN_MIN_LENGTH {
			return fail(TokenField::AccessScope);
		}
		if self.expires_in < 1 {
			return fail(TokenField::ExpiresIn);
		}
		if self.refresh_at <= now {
			return fail(TokenField::RefreshAt);
		}

		Ok(())
	}
}
impl Default for TokenState {
	fn default() -> Self {
		Self {
			access_token: TokenSecret::default(),
			token_type: String::new(),
			refresh_token: TokenSecret::default(),
			access_scope: String::new(),
			expires_in: 0,
			refresh_at: OffsetDateTime::UNIX_EPOCH,
			status: ClientStatus::Uninitialized,
		}
	}
}

fn refresh_instant(
	issued_at: OffsetDateTime,
	expires_in: i64,
	refresh_ratio: f64,
) -> OffsetDateTime {
	// Float-to-int casts saturate, so only the date addition can overflow.
	let delay = Duration::seconds((expires_in as f64 * refresh_ratio).trunc() as i64);

	issued_at.checked_add(delay).unwrap_or_else(|| {
		let bound = if delay.is_negative() { PrimitiveDateTime::MIN } else { PrimitiveDateTime::MAX };

		bound.assume_utc()
	})
}
