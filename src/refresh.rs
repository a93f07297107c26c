//! Refresh exchange with a single-flight guard.
//!
//! [`RefreshCoordinator::refresh`] exchanges the stored refresh credential for a new pair via
//! `POST <refresh_url>?refresh_token=<token>`. At most one exchange is in flight at a time: the
//! first caller installs a shared future into the pending slot and every caller arriving before
//! it settles awaits that same future. The exchange persists the new pair (or tears the session
//! down) before the shared outcome resolves, so every waiter wakes up to a store that already
//! reflects the result. The slot is emptied as the final step of the exchange, and the next
//! call after that starts a fresh exchange. A rejection reported after a failed exchange already
//! signed the session out gets that failure back instead of a second teardown.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use futures::future::{BoxFuture, FutureExt, Shared};
// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenSecret},
	error::RefreshError,
	http::ReqwestHttpClient,
	obs::{self, OpKind},
	session::SessionFailurePolicy,
	store::CredentialStore,
};

type RefreshOutcome = Result<TokenSecret, RefreshError>;
type PendingRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

enum Ticket {
	Current(TokenSecret),
	Pending(PendingRefresh),
	Ended(RefreshError),
}
impl Ticket {
	async fn redeem(self) -> RefreshOutcome {
		match self {
			Ticket::Current(access) => Ok(access),
			Ticket::Pending(pending) => pending.await,
			Ticket::Ended(e) => Err(e),
		}
	}
}

#[derive(Default)]
struct Slot {
	pending: Option<PendingRefresh>,
	// Why the last exchange failed; reset by the next exchange that settles.
	failed: Option<RefreshError>,
}

#[derive(Deserialize)]
struct RefreshBody {
	access_token: Option<String>,
	refresh_token: Option<String>,
}

/// Performs refresh exchanges and de-duplicates concurrent attempts.
///
/// Cloning is cheap; clones share the pending slot, the store, and the metrics.
#[derive(Clone)]
pub struct RefreshCoordinator(Arc<CoordinatorInner>);
struct CoordinatorInner {
	http_client: ReqwestHttpClient,
	refresh_url: Url,
	store: Arc<CredentialStore>,
	policy: Arc<dyn SessionFailurePolicy>,
	metrics: RefreshMetrics,
	slot: Mutex<Slot>,
}
impl RefreshCoordinator {
	/// Creates a coordinator exchanging credentials at `refresh_url`.
	pub fn new(
		http_client: ReqwestHttpClient,
		refresh_url: Url,
		store: Arc<CredentialStore>,
		policy: Arc<dyn SessionFailurePolicy>,
	) -> Self {
		Self(Arc::new(CoordinatorInner {
			http_client,
			refresh_url,
			store,
			policy,
			metrics: RefreshMetrics::default(),
			slot: Mutex::new(Slot::default()),
		}))
	}

	/// Counters describing exchanges performed so far.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.0.metrics
	}

	/// Whether an exchange is currently in flight.
	pub fn is_refreshing(&self) -> bool {
		self.0.slot.lock().pending.is_some()
	}

	/// Exchanges the stored refresh credential for a new pair and returns the new access
	/// credential.
	///
	/// Joins the exchange already in flight when there is one. On failure the store has been
	/// cleared and the failure policy notified before this returns.
	pub async fn refresh(&self) -> RefreshOutcome {
		self.join_or_start(None).redeem().await
	}

	/// Refreshes on behalf of a request the backend rejected while it presented `rejected`.
	///
	/// When the stored access credential no longer matches `rejected`, a sibling request has
	/// already rotated the pair and the current credential is returned without a new exchange.
	/// When the session was torn down in the meantime, the reason is returned without another
	/// exchange or teardown.
	pub async fn refresh_rejected(&self, rejected: &TokenSecret) -> RefreshOutcome {
		self.join_or_start(Some(rejected)).redeem().await
	}

	// Decides under the slot lock. An exchange updates the store cache before it empties the
	// slot, so with no exchange in flight the cache already reflects the last outcome.
	fn join_or_start(&self, rejected: Option<&TokenSecret>) -> Ticket {
		let mut slot = self.0.slot.lock();

		if let Some(pending) = slot.pending.as_ref() {
			self.0.metrics.record_joined();

			return Ticket::Pending(pending.clone());
		}
		if let Some(rejected) = rejected {
			match self.0.store.cached_access() {
				Some(current) if &current != rejected => {
					self.0.metrics.record_reused();

					return Ticket::Current(current);
				},
				Some(_) => {},
				None if self.0.store.is_cleared() => {
					let reason = slot.failed.clone().unwrap_or(RefreshError::MissingRefreshToken);

					return Ticket::Ended(reason);
				},
				None => {},
			}
		}

		let inner = Arc::clone(&self.0);
		let pending = async move {
			let outcome = inner.run().await;
			let mut slot = inner.slot.lock();

			slot.pending = None;
			slot.failed = outcome.as_ref().err().cloned();
			drop(slot);

			outcome
		}
		.boxed()
		.shared();

		slot.pending = Some(pending.clone());

		Ticket::Pending(pending)
	}
}
impl CoordinatorInner {
	async fn run(&self) -> RefreshOutcome {
		let outcome = obs::observe(OpKind::Refresh, "refresh_exchange", self.exchange()).await;

		if outcome.is_ok() {
			self.metrics.record_success();
		} else {
			self.metrics.record_failure();
			self.tear_down().await;
		}

		outcome
	}

	async fn exchange(&self) -> RefreshOutcome {
		let refresh = self
			.store
			.get()
			.await?
			.and_then(|stored| stored.refresh)
			.ok_or(RefreshError::MissingRefreshToken)?;
		let mut url = self.refresh_url.clone();

		url.query_pairs_mut().append_pair("refresh_token", refresh.expose());
		self.metrics.record_exchange();

		let response =
			self.http_client.post(url).send().await.map_err(transport_failure)?;
		let status = response.status();

		if !status.is_success() {
			return Err(RefreshError::Rejected { status: status.as_u16() });
		}

		let body = response.bytes().await.map_err(transport_failure)?;
		let pair = parse_refresh_body(&body)?;
		let access = pair.access.clone();

		self.store.set(pair).await?;

		Ok(access)
	}

	async fn tear_down(&self) {
		if let Err(e) = self.store.clear().await {
			obs::teardown_storage_failed(&e);
		}

		self.policy.on_auth_failure();
	}
}
impl Debug for RefreshCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCoordinator")
			.field("refresh_url", &self.0.refresh_url.path())
			.field("refreshing", &self.is_refreshing())
			.field("metrics", &self.0.metrics)
			.finish()
	}
}

// The refresh URL carries the refresh credential in its query, so keep it out of messages.
fn transport_failure(e: ReqwestError) -> RefreshError {
	RefreshError::Transport { message: e.without_url().to_string() }
}

fn parse_refresh_body(body: &[u8]) -> Result<CredentialPair, RefreshError> {
	let mut de = serde_json::Deserializer::from_slice(body);
	let parsed: RefreshBody = serde_path_to_error::deserialize(&mut de)
		.map_err(|e| RefreshError::MalformedResponse { message: e.to_string() })?;
	let (Some(access), Some(refresh)) = (parsed.access_token, parsed.refresh_token) else {
		return Err(RefreshError::MalformedResponse {
			message: "access_token and refresh_token are both required".into(),
		});
	};

	CredentialPair::new(access, refresh)
		.map_err(|e| RefreshError::MalformedResponse { message: e.to_string() })
}
