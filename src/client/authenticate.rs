//! Initialization, password-grant exchange, and refresh.

// crates.io
use oauth2::http::{
	Method, Request,
	header::{ACCEPT, CONTENT_TYPE},
};
// self
use crate::{
	_prelude::*,
	auth::{ClientStatus, OAuthResponse, TokenState},
	client::ServerClient,
	error::ConfigError,
	http::{self, ApiHttpClient},
	obs::{self, Operation},
};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

impl<C> ServerClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Validates the configuration, authenticates, and checks the resulting tokens.
	///
	/// Nothing is sent when the configuration is invalid. A grant that fails the
	/// postcondition check leaves the client uninitialized.
	pub async fn initialize(&self) -> Result<()> {
		obs::observe(Operation::Initialize, "initialize", async {
			if let Err(err) = self.config.validate() {
				self.set_status(ClientStatus::Uninitialized);

				return Err(err.into());
			}

			self.authenticate_unchecked().await?;

			let mut state = self.state.write();

			if let Err(err) = state.check_postconditions(OffsetDateTime::now_utc()) {
				state.status = ClientStatus::Uninitialized;

				return Err(err.into());
			}

			state.status = ClientStatus::Ready;

			Ok(())
		})
		.await
	}

	/// Runs the precondition checks, then exchanges the configured credentials for tokens.
	///
	/// On success the token state is replaced wholesale; the lifecycle status is kept.
	pub async fn authenticate(&self) -> Result<()> {
		obs::observe(Operation::Authenticate, "authenticate", async {
			self.config.validate()?;
			self.authenticate_unchecked().await
		})
		.await
	}

	/// Rotates the tokens of an initialized client by repeating the password grant.
	///
	/// A failed rotation marks the client degraded and keeps the previous tokens, so the
	/// next request retries it. Postconditions are not re-checked here.
	pub async fn refresh(&self) -> Result<()> {
		let _singleflight = self.refresh_guard.lock().await;

		self.refresh_locked("refresh").await
	}

	async fn authenticate_unchecked(&self) -> Result<()> {
		let _singleflight = self.refresh_guard.lock().await;
		let grant = self.exchange_password_grant().await?;

		self.store_grant(grant, None);

		Ok(())
	}

	// Callers must hold `refresh_guard`.
	pub(super) async fn refresh_locked(&self, stage: &'static str) -> Result<()> {
		obs::observe(Operation::Refresh, stage, async {
			if !self.is_initialized() {
				return Err(Error::RefreshUninitialized);
			}

			self.refresh_metrics.record_attempt();

			match self.exchange_password_grant().await {
				Ok(grant) => {
					self.store_grant(grant, Some(ClientStatus::Ready));
					self.refresh_metrics.record_success();
					self.finish_flight(None);

					Ok(())
				},
				Err(err) => {
					let err = Arc::new(err);

					self.set_status(ClientStatus::Degraded);
					self.refresh_metrics.record_failure();
					self.finish_flight(Some(err.clone()));

					Err(Error::Refresh(err))
				},
			}
		})
		.await
	}

	fn finish_flight(&self, failure: Option<Arc<Error>>) {
		let mut flight = self.refresh_flight.lock();

		flight.generation = flight.generation.wrapping_add(1);
		flight.failure = failure;
	}

	async fn exchange_password_grant(&self) -> Result<OAuthResponse> {
		let config = &self.config;
		let form = url::form_urlencoded::Serializer::new(String::new())
			.append_pair("grant_type", &config.grant_type)
			.append_pair("client_id", config.client_id.as_str())
			.append_pair("client_secret", config.client_secret.secret())
			.append_pair("username", config.username.as_str())
			.append_pair("password", config.password.secret())
			.finish();
		let request = Request::builder()
			.method(Method::POST)
			.uri(config.api_token_url.as_str())
			.header(CONTENT_TYPE, FORM_CONTENT_TYPE)
			.header(ACCEPT, "application/json")
			.body(form.into_bytes())
			.map_err(ConfigError::from)?;

		obs::record_outbound_request(Method::POST.as_str(), &config.api_token_url);

		let response = self.http_client.execute(request).await.map_err(http::map_transport_error)?;
		let status = response.status();

		if !status.is_success() {
			return Err(Error::AuthServer {
				status: status.as_u16(),
				body: String::from_utf8_lossy(response.body()).into_owned(),
			});
		}

		Ok(OAuthResponse::from_json(response.body())?)
	}

	pub(super) fn store_grant(&self, grant: OAuthResponse, status: Option<ClientStatus>) {
		let mut state = self.state.write();
		let status = status.unwrap_or(state.status);

		*state =
			TokenState::from_grant(grant, OffsetDateTime::now_utc(), self.config.refresh_ratio, status);
	}
}
