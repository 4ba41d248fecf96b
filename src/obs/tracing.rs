// self
use crate::{_prelude::*, obs::Operation};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOperation<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOperation<F> = F;

/// A span builder used by client operations.
#[derive(Clone, Debug)]
pub struct OperationSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OperationSpan {
	/// Creates a new span tagged with the provided operation + stage.
	pub fn new(operation: Operation, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span =
				tracing::info_span!("server_client.operation", operation = operation.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (operation, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOperation<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a debug event describing an outbound request; header values are never logged.
pub fn record_outbound_request(method: &str, url: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(method, url, "dispatching request");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (method, url);
	}
}

/// Emits a debug event for a resource response whose content type was rejected.
pub fn record_content_type_mismatch(content_type: &str, body: &[u8]) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(
			content_type,
			body = %String::from_utf8_lossy(body),
			"mismatched content type"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (content_type, body);
	}
}

/// Emits an info event when the client refreshes its tokens ahead of a request.
pub fn record_refresh_due(refresh_at: OffsetDateTime) {
	#[cfg(feature = "tracing")]
	{
		tracing::info!(%refresh_at, "access token reached its refresh instant");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = refresh_at;
	}
}

/// Emits a warning event for an operation that failed.
pub fn record_failure_event(operation: Operation, error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(operation = operation.as_str(), %error, "operation failed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (operation, error);
	}
}
