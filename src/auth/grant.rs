//! Token endpoint response payloads.

// self
use crate::{_prelude::*, error::DecodeError};

/// Password-grant response returned by the token endpoint.
///
/// Missing fields decode to their zero values; the postcondition check run during
/// initialization rejects grants that are syntactically valid but semantically empty.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthResponse {
	/// Bearer access token.
	pub access_token: String,
	/// Token type, `Bearer` for every grant this client accepts.
	pub token_type: String,
	/// Lifetime of the access token in seconds.
	pub expires_in: i64,
	/// Refresh token issued alongside the access token.
	pub refresh_token: String,
	/// Space- or dot-delimited scope string.
	pub scope: String,
}
impl OAuthResponse {
	/// Decodes a token endpoint body, preserving the path of the first malformed field.
	pub fn from_json(body: &[u8]) -> Result<Self, DecodeError> {
		let mut de = serde_json::Deserializer::from_slice(body);

		Ok(serde_path_to_error::deserialize(&mut de)?)
	}
}
impl Debug for OAuthResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuthResponse")
			.field("access_token", &"<redacted>")
			.field("token_type", &self.token_type)
			.field("expires_in", &self.expires_in)
			.field("refresh_token", &"<redacted>")
			.field("scope", &self.scope)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn decodes_a_complete_grant() {
		let grant = OAuthResponse::from_json(
			br#"{"access_token":"GJJGFDGJJGFGJHHJF","scope":"this.is.some.dummy.scope","token_type":"Bearer","expires_in":3600,"refresh_token":"YHGFDSETGJKHFDD"}"#,
		)
		.expect("Complete grant should decode.");

		assert_eq!(grant.access_token, "GJJGFDGJJGFGJHHJF");
		assert_eq!(grant.token_type, "Bearer");
		assert_eq!(grant.expires_in, 3600);
		assert_eq!(grant.refresh_token, "YHGFDSETGJKHFDD");
		assert_eq!(grant.scope, "this.is.some.dummy.scope");
	}

	#[test]
	fn missing_fields_fall_back_to_zero_values() {
		let grant =
			OAuthResponse::from_json(br#"{"access_token":"abc"}"#).expect("Partial grant decodes.");

		assert_eq!(grant.access_token, "abc");
		assert_eq!(grant.expires_in, 0);
		assert!(grant.refresh_token.is_empty());
	}

	#[test]
	fn malformed_fields_report_their_path() {
		let err = OAuthResponse::from_json(br#"{"expires_in":"soon"}"#)
			.expect_err("String lifetimes must be rejected.");

		assert_eq!(err.0.path().to_string(), "expires_in");
		assert!(OAuthResponse::from_json(b"not json").is_err());
	}

	#[test]
	fn debug_output_redacts_tokens() {
		let grant = OAuthResponse {
			access_token: "secret-access".into(),
			refresh_token: "secret-refresh".into(),
			..Default::default()
		};
		let rendered = format!("{grant:?}");

		assert!(!rendered.contains("secret-access"));
		assert!(!rendered.contains("secret-refresh"));
	}
}
