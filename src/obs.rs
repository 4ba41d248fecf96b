//! Optional observability helpers for client operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `server_client.operation` with the
//!   `operation` and `stage` (call site) fields, plus debug events for outbound requests.
//! - Enable `metrics` to increment the `server_client_operation_total` counter for every
//!   attempt/success/failure, labeled by `operation` + `outcome`.

mod tracing;

pub use tracing::*;

// self
use crate::_prelude::*;

/// Client operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// Precondition check, first authentication, and postcondition check.
	Initialize,
	/// Password-grant exchange against the token endpoint.
	Authenticate,
	/// Token rotation on an initialized client.
	Refresh,
	/// Authenticated resource request.
	Request,
	/// JWT-authenticated service-to-service request.
	InterServiceRequest,
}
impl Operation {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::Initialize => "initialize",
			Operation::Authenticate => "authenticate",
			Operation::Refresh => "refresh",
			Operation::Request => "request",
			Operation::InterServiceRequest => "inter_service_request",
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationOutcome {
	/// Entry to a client operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OperationOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationOutcome::Attempt => "attempt",
			OperationOutcome::Success => "success",
			OperationOutcome::Failure => "failure",
		}
	}
}
impl Display for OperationOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` inside an operation span, recording attempt and outcome counters around it.
pub(crate) async fn observe<T, Fut>(operation: Operation, stage: &'static str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = OperationSpan::new(operation, stage);

	count_outcome(operation, OperationOutcome::Attempt);

	let result = span.instrument(fut).await;
	let outcome = match &result {
		Ok(_) => OperationOutcome::Success,
		Err(err) => {
			record_failure_event(operation, err);

			OperationOutcome::Failure
		},
	};

	count_outcome(operation, outcome);

	result
}

#[cfg(feature = "metrics")]
fn count_outcome(operation: Operation, outcome: OperationOutcome) {
	metrics::counter!(
		"server_client_operation_total",
		"operation" => operation.as_str(),
		"outcome" => outcome.as_str()
	)
	.increment(1);
}

#[cfg(not(feature = "metrics"))]
fn count_outcome(_: Operation, _: OperationOutcome) {}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn observe_hands_back_the_inner_result() {
		let ok = observe(Operation::Request, "unit", async { Ok(7) }).await;

		assert_eq!(ok.expect("Successful futures should pass through."), 7);

		let err = observe::<(), _>(Operation::Refresh, "unit", async {
			Err(Error::RefreshUninitialized)
		})
		.await
		.expect_err("Failures should pass through.");

		assert!(matches!(err, Error::RefreshUninitialized));
	}

	#[test]
	fn labels_are_stable() {
		assert_eq!(Operation::InterServiceRequest.to_string(), "inter_service_request");
		assert_eq!(OperationOutcome::Failure.to_string(), "failure");
	}
}
