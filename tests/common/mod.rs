//! Shared fixtures for the integration suites.

#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
use parking_lot::Mutex;
// self
use learnmap_session::{
	auth::TokenSecret,
	client::AuthenticatedClient,
	config::ClientConfig,
	session::Navigator,
	store::{CredentialStore, KeyValueBackend, MemoryBackend},
	url::Url,
};

pub const REFRESH_PATH: &str = "/api/auth/refresh";

/// Navigator that records every navigation instead of performing it.
#[derive(Debug, Default)]
pub struct RecordingNavigator(Mutex<Vec<Url>>);
impl RecordingNavigator {
	pub fn count(&self) -> usize {
		self.0.lock().len()
	}

	pub fn targets(&self) -> Vec<Url> {
		self.0.lock().clone()
	}
}
impl Navigator for RecordingNavigator {
	fn navigate(&self, target: &Url) {
		self.0.lock().push(target.clone());
	}
}

/// Client plus the collaborators tests want to inspect.
pub struct TestSession {
	pub client: AuthenticatedClient,
	pub backend: MemoryBackend,
	pub navigator: Arc<RecordingNavigator>,
}
impl TestSession {
	pub fn store(&self) -> &Arc<CredentialStore> {
		self.client.store()
	}

	pub async fn stored_pair(&self) -> Option<(String, Option<String>)> {
		self.store().get().await.expect("Reading the credential store should succeed.").map(
			|stored| {
				(
					stored.access.expose().to_owned(),
					stored.refresh.as_ref().map(TokenSecret::expose).map(str::to_owned),
				)
			},
		)
	}
}

/// Builds a client against `base_url` persisting into `backend`.
pub fn build_test_session(base_url: &str, backend: MemoryBackend) -> TestSession {
	let config =
		ClientConfig::builder(base_url).build().expect("Failed to build test configuration.");
	let navigator = Arc::new(RecordingNavigator::default());
	let store_backend: Arc<dyn KeyValueBackend> = Arc::new(backend.clone());
	let client = AuthenticatedClient::new(config, store_backend, navigator.clone())
		.expect("Failed to build test client.");

	TestSession { client, backend, navigator }
}

/// Backend seeded with an access/refresh pair under the default keys.
pub fn seeded_backend(access: &str, refresh: &str) -> MemoryBackend {
	MemoryBackend::with_entries([("auth_token", access), ("refresh_token", refresh)])
}

/// Body returned by a successful refresh exchange.
pub fn refresh_body(access: &str, refresh: &str) -> String {
	format!("{{\"access_token\":\"{access}\",\"refresh_token\":\"{refresh}\"}}")
}
