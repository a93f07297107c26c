//! Observability hooks for the request pipeline.
//!
//! # Feature Flags
//!
//! - `tracing` (on by default): every `fetch_with_auth` call and every refresh exchange runs in a
//!   `learnmap_session.op` span carrying `op` and `stage`. Sign-out and retry events are logged.
//! - `metrics`: each operation bumps `learnmap_session_op_total{op, outcome}` on entry and on
//!   completion.

mod metrics;
mod tracing;

pub(crate) use self::tracing::{retry_unauthorized, session_failed, teardown_storage_failed};

// self
use crate::_prelude::*;

/// Operations observed by the pipeline; the value of the `op` label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// One logical `fetch_with_auth` call, including its retry.
	Request,
	/// One refresh exchange against the backend.
	Refresh,
}
impl OpKind {
	/// Label used in spans and metrics.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::Request => "request",
			OpKind::Refresh => "refresh",
		}
	}
}

/// Value of the `outcome` metric label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// The operation started.
	Attempt,
	/// The operation returned `Ok`.
	Success,
	/// The operation returned `Err`.
	Failure,
}
impl OpOutcome {
	/// Label used in metrics.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}
}

/// Runs `fut` inside an operation span and records its attempt and outcome.
pub(crate) async fn observe<F, T, E>(kind: OpKind, stage: &'static str, fut: F) -> Result<T, E>
where
	F: Future<Output = Result<T, E>>,
{
	metrics::record(kind, OpOutcome::Attempt);

	let result = tracing::in_span(kind, stage, fut).await;
	let outcome = if result.is_ok() { OpOutcome::Success } else { OpOutcome::Failure };

	metrics::record(kind, outcome);

	result
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn observe_passes_the_result_through() {
		let ok: Result<u8, ()> = observe(OpKind::Refresh, "observe_ok", async { Ok(7) }).await;
		let err: Result<u8, &str> =
			observe(OpKind::Request, "observe_err", async { Err("boom") }).await;

		assert_eq!(ok, Ok(7));
		assert_eq!(err, Err("boom"));
	}

	#[test]
	fn labels_are_stable() {
		assert_eq!(OpKind::Request.as_str(), "request");
		assert_eq!(OpOutcome::Failure.as_str(), "failure");
	}
}
