//! Session failure policy: what happens once no valid credential can be obtained.
//!
//! The pipeline tears the session down in two steps. It clears the [`CredentialStore`] itself
//! and then notifies the injected [`SessionFailurePolicy`], which owns the user-visible
//! consequence (typically navigating to the login surface). Policies must be idempotent: when
//! several requests fail together the pipeline may report the same failure episode more than
//! once.
//!
//! [`CredentialStore`]: crate::store::CredentialStore

// std
use std::sync::atomic::{AtomicBool, Ordering};
// self
use crate::{_prelude::*, obs};

/// Decides the consequence of unrecoverable authentication failure.
pub trait SessionFailurePolicy
where
	Self: Send + Sync,
{
	/// Called after the stored credentials were cleared. Must tolerate repeated and concurrent
	/// calls within one failure episode.
	fn on_auth_failure(&self);

	/// Called when fresh credentials were established by sign-in, opening a new episode.
	fn on_session_established(&self) {}
}

/// Hands control to the login surface.
pub trait Navigator
where
	Self: Send + Sync,
{
	/// Navigates to `target`.
	fn navigate(&self, target: &Url);
}
impl<F> Navigator for F
where
	F: Send + Sync + Fn(&Url),
{
	fn navigate(&self, target: &Url) {
		self(target)
	}
}

/// Policy that redirects to the login URL once per failure episode.
pub struct LoginRedirect {
	login_url: Url,
	navigator: Arc<dyn Navigator>,
	fired: AtomicBool,
}
impl LoginRedirect {
	/// Creates a policy navigating to `login_url` through `navigator`.
	pub fn new(login_url: Url, navigator: Arc<dyn Navigator>) -> Self {
		Self { login_url, navigator, fired: AtomicBool::new(false) }
	}

	/// Login surface this policy navigates to.
	pub fn login_url(&self) -> &Url {
		&self.login_url
	}

	/// Whether the current episode already navigated.
	pub fn has_fired(&self) -> bool {
		self.fired.load(Ordering::Acquire)
	}
}
impl SessionFailurePolicy for LoginRedirect {
	fn on_auth_failure(&self) {
		if self.fired.swap(true, Ordering::AcqRel) {
			return;
		}

		obs::session_failed(self.login_url.as_str());
		self.navigator.navigate(&self.login_url);
	}

	fn on_session_established(&self) {
		self.fired.store(false, Ordering::Release);
	}
}
impl Debug for LoginRedirect {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginRedirect")
			.field("login_url", &self.login_url.as_str())
			.field("fired", &self.has_fired())
			.finish()
	}
}

/// Policy that does nothing beyond the store teardown the pipeline already performed.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopPolicy;
impl SessionFailurePolicy for NoopPolicy {
	fn on_auth_failure(&self) {}
}
