//! Authenticated request dispatch.

// crates.io
use oauth2::http::{
	self as http_types, HeaderName, HeaderValue, Method, Request,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
// self
use crate::{
	_prelude::*,
	client::ServerClient,
	error::ConfigError,
	http::{self, ApiHttpClient, HttpResponse},
	obs::{self, Operation},
};

/// Media type every dispatched request sends and every accepted response declares.
pub const JSON_CONTENT_TYPE: &str = "application/json";

impl<C> ServerClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Sends an authenticated JSON request to `url`.
	///
	/// Tokens past their refresh instant are rotated first; concurrent callers share one
	/// rotation. The response is returned with its body fully read, and only when it
	/// declares exactly `application/json`.
	pub async fn make_request(
		&self,
		method: Method,
		url: &str,
		body: Option<Vec<u8>>,
	) -> Result<HttpResponse> {
		obs::observe(Operation::Request, "make_request", async move {
			if !self.is_initialized() {
				return Err(Error::Uninitialized);
			}

			self.ensure_fresh_tokens().await?;

			let request = self.build_request(&method, url, body.unwrap_or_default())?;

			obs::record_outbound_request(method.as_str(), url);

			let response =
				self.http_client.execute(request).await.map_err(http::map_transport_error)?;
			let content_type = response
				.headers()
				.get(CONTENT_TYPE)
				.and_then(|value| value.to_str().ok())
				.unwrap_or_default();

			if content_type != JSON_CONTENT_TYPE {
				obs::record_content_type_mismatch(content_type, response.body());

				return Err(Error::ContentType { actual: content_type.to_owned() });
			}

			Ok(response)
		})
		.await
	}

	async fn ensure_fresh_tokens(&self) -> Result<()> {
		if !self.needs_refresh() {
			return Ok(());
		}

		let generation = self.refresh_flight.lock().generation;
		let _singleflight = self.refresh_guard.lock().await;
		// A refresh that finished while this caller waited settles it, failed or not.
		let shared = {
			let flight = self.refresh_flight.lock();

			(flight.generation != generation).then(|| flight.failure.clone())
		};

		if let Some(failure) = shared {
			self.refresh_metrics.record_coalesced();

			return match failure {
				Some(err) => Err(Error::Refresh(err)),
				None => Ok(()),
			};
		}
		// Initialization may also have replaced the tokens meanwhile.
		if !self.needs_refresh() {
			self.refresh_metrics.record_coalesced();

			return Ok(());
		}

		obs::record_refresh_due(self.refresh_at());

		self.refresh_locked("make_request").await
	}

	fn build_request(&self, method: &Method, url: &str, body: Vec<u8>) -> Result<Request<Vec<u8>>> {
		let access_token = self.access_token();
		let mut request = Request::builder()
			.method(method.clone())
			.uri(url)
			.header(ACCEPT, JSON_CONTENT_TYPE)
			.header(CONTENT_TYPE, JSON_CONTENT_TYPE)
			.header(AUTHORIZATION, format!("Bearer {}", access_token.expose()))
			.body(body)
			.map_err(ConfigError::from)?;

		for (name, value) in &self.config.extra_headers {
			let name = HeaderName::try_from(name.as_str())
				.map_err(|e| ConfigError::from(http_types::Error::from(e)))?;
			let value = HeaderValue::try_from(value.as_str())
				.map_err(|e| ConfigError::from(http_types::Error::from(e)))?;

			request.headers_mut().insert(name, value);
		}

		Ok(request)
	}
}
