// self
use crate::{_prelude::*, obs::OpKind, store::StoreError};

pub(super) fn in_span<F>(
	kind: OpKind,
	stage: &'static str,
	fut: F,
) -> impl Future<Output = F::Output>
where
	F: Future,
{
	#[cfg(feature = "tracing")]
	{
		use tracing::Instrument;

		fut.instrument(tracing::info_span!("learnmap_session.op", op = kind.as_str(), stage))
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, stage);

		fut
	}
}

pub(crate) fn session_failed(login_url: &str) {
	#[cfg(feature = "tracing")]
	tracing::warn!(login_url, "session failed; redirecting to login");
	#[cfg(not(feature = "tracing"))]
	let _ = login_url;
}

// The session is already failing, so the error can only be reported.
pub(crate) fn teardown_storage_failed(err: &StoreError) {
	#[cfg(feature = "tracing")]
	tracing::warn!(error = %err, "failed to remove persisted credentials during sign-out");
	#[cfg(not(feature = "tracing"))]
	let _ = err;
}

pub(crate) fn retry_unauthorized(endpoint: &str) {
	#[cfg(feature = "tracing")]
	tracing::debug!(endpoint, "refreshed credential was rejected; not retrying again");
	#[cfg(not(feature = "tracing"))]
	let _ = endpoint;
}
