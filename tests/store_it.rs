mod common;

// std
use std::sync::{
	Arc,
	atomic::{AtomicBool, Ordering},
};
// crates.io
use httpmock::prelude::*;
// self
use common::*;
use learnmap_session::{
	auth::CredentialPair,
	client::{ApiRequest, AuthenticatedClient},
	config::ClientConfig,
	error::{Error, RefreshError},
	store::{KeyValueBackend, MemoryBackend, StoreError, StoreFuture},
};

/// Memory backend whose operations can be switched to fail one by one.
#[derive(Debug, Default)]
struct FlakyBackend {
	inner: MemoryBackend,
	fail_reads: AtomicBool,
	fail_writes: AtomicBool,
	fail_removes: AtomicBool,
}
impl FlakyBackend {
	fn seeded(access: &str, refresh: &str) -> Self {
		Self { inner: seeded_backend(access, refresh), ..Default::default() }
	}
}
impl KeyValueBackend for FlakyBackend {
	fn read<'a>(&'a self, keys: &'a [&'a str]) -> StoreFuture<'a, Vec<Option<String>>> {
		if self.fail_reads.load(Ordering::SeqCst) {
			return Box::pin(async {
				Err(StoreError::Backend { message: "storage disabled".into() })
			});
		}

		self.inner.read(keys)
	}

	fn write<'a>(&'a self, entries: &'a [(&'a str, &'a str)]) -> StoreFuture<'a, ()> {
		if self.fail_writes.load(Ordering::SeqCst) {
			return Box::pin(async {
				Err(StoreError::Backend { message: "quota exceeded".into() })
			});
		}

		self.inner.write(entries)
	}

	fn remove<'a>(&'a self, keys: &'a [&'a str]) -> StoreFuture<'a, ()> {
		if self.fail_removes.load(Ordering::SeqCst) {
			return Box::pin(async {
				Err(StoreError::Backend { message: "storage locked".into() })
			});
		}

		self.inner.remove(keys)
	}
}

fn flaky_client(
	base_url: &str,
	backend: Arc<FlakyBackend>,
) -> (AuthenticatedClient, Arc<RecordingNavigator>) {
	let config =
		ClientConfig::builder(base_url).build().expect("Failed to build test configuration.");
	let navigator = Arc::new(RecordingNavigator::default());
	let client = AuthenticatedClient::new(config, backend, navigator.clone())
		.expect("Failed to build test client.");

	(client, navigator)
}

#[tokio::test]
async fn failed_write_keeps_previous_pair() -> color_eyre::Result<()> {
	let backend = Arc::new(FlakyBackend::seeded("a1", "r1"));
	let (client, _) = flaky_client("http://localhost:8000", backend.clone());

	assert!(client.store().get().await?.is_some());

	backend.fail_writes.store(true, Ordering::SeqCst);

	let err = client
		.sign_in(CredentialPair::new("a2", "r2")?)
		.await
		.expect_err("Backend write failures should be reported.");

	assert!(matches!(err, Error::Storage(StoreError::Backend { .. })), "{err:?}");

	let access = client.store().access().await?.expect("Previous pair should still be readable.");

	assert_eq!(access.expose(), "a1");
	assert_eq!(backend.inner.snapshot().get("auth_token").map(String::as_str), Some("a1"));

	Ok(())
}

#[tokio::test]
async fn sign_in_reports_storage_failures() -> color_eyre::Result<()> {
	let backend = Arc::new(FlakyBackend::default());
	let (client, _) = flaky_client("http://localhost:8000", backend.clone());

	backend.fail_writes.store(true, Ordering::SeqCst);

	let err = client
		.sign_in(CredentialPair::new("a1", "r1")?)
		.await
		.expect_err("Sign-in should surface the write failure.");

	assert!(matches!(err, Error::Storage(StoreError::Backend { .. })), "{err:?}");
	assert!(client.store().get().await?.is_none());

	Ok(())
}

#[tokio::test]
async fn unreadable_storage_fails_without_network() {
	let server = MockServer::start_async().await;
	let backend = Arc::new(FlakyBackend::seeded("a1", "r1"));
	let (client, navigator) = flaky_client(&server.base_url(), backend.clone());
	let any = server
		.mock_async(|when, then| {
			when.path_prefix("/");
			then.status(200);
		})
		.await;

	backend.fail_reads.store(true, Ordering::SeqCst);

	let err = client
		.fetch_with_auth(ApiRequest::get("/x"))
		.await
		.expect_err("Unreadable storage should fail the request.");

	assert!(matches!(err, Error::Storage(_)), "{err:?}");
	assert_eq!(navigator.count(), 0);

	any.assert_calls_async(0).await;
}

#[tokio::test]
async fn unpersistable_refresh_signs_out() {
	let server = MockServer::start_async().await;
	let backend = Arc::new(FlakyBackend::seeded("a1", "r1"));
	let (client, navigator) = flaky_client(&server.base_url(), backend.clone());
	let stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/x").header("authorization", "Bearer a1");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path(REFRESH_PATH);
			then.status(200).body(refresh_body("a2", "r2"));
		})
		.await;
	let retried = server
		.mock_async(|when, then| {
			when.method(GET).path("/x").header("authorization", "Bearer a2");
			then.status(200);
		})
		.await;

	backend.fail_writes.store(true, Ordering::SeqCst);

	let err = client
		.fetch_with_auth(ApiRequest::get("/x"))
		.await
		.expect_err("A refresh that cannot be persisted should fail the request.");

	assert!(
		matches!(err, Error::AuthenticationFailed { source: RefreshError::Storage(_) }),
		"{err:?}"
	);

	stale.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;
	retried.assert_calls_async(0).await;

	assert!(backend.inner.snapshot().is_empty());
	assert_eq!(navigator.count(), 1);
}

#[tokio::test]
async fn failed_teardown_removal_stays_signed_out() {
	let server = MockServer::start_async().await;
	let backend = Arc::new(FlakyBackend::seeded("a1", "r1"));
	let (client, navigator) = flaky_client(&server.base_url(), backend.clone());
	let stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/x").header("authorization", "Bearer a1");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path(REFRESH_PATH);
			then.status(401);
		})
		.await;

	backend.fail_removes.store(true, Ordering::SeqCst);

	let err = client
		.fetch_with_auth(ApiRequest::get("/x"))
		.await
		.expect_err("A rejected refresh should fail the request.");

	assert!(matches!(err, Error::AuthenticationFailed { .. }), "{err:?}");
	// The backend still holds the revoked pair, but the store must not hand it out again.
	assert_eq!(backend.inner.snapshot().get("auth_token").map(String::as_str), Some("a1"));
	assert!(client.store().get().await.expect("Read should succeed.").is_none());

	let err = client
		.fetch_with_auth(ApiRequest::get("/x"))
		.await
		.expect_err("Requests after a failed sign-out should not be sent.");

	assert!(matches!(err, Error::NotAuthenticated), "{err:?}");

	stale.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;

	assert_eq!(client.refresher().metrics().exchanges(), 1);
	assert_eq!(navigator.count(), 1);
}

#[tokio::test]
async fn sign_out_with_failed_removal_reports_and_forgets() -> color_eyre::Result<()> {
	let backend = Arc::new(FlakyBackend::seeded("a1", "r1"));
	let (client, _) = flaky_client("http://localhost:8000", backend.clone());

	assert!(client.store().get().await?.is_some());

	backend.fail_removes.store(true, Ordering::SeqCst);

	let err = client.sign_out().await.expect_err("The removal failure should be reported.");

	assert!(matches!(err, Error::Storage(StoreError::Backend { .. })), "{err:?}");
	assert!(client.store().get().await?.is_none());

	backend.fail_removes.store(false, Ordering::SeqCst);
	client.sign_in(CredentialPair::new("a2", "r2")?).await?;

	assert_eq!(client.store().access().await?.as_ref().map(|a| a.expose()), Some("a2"));

	Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_never_observe_mixed_pairs() -> color_eyre::Result<()> {
	const ROUNDS: usize = 20;

	let backend = Arc::new(FlakyBackend::default());
	let (client, _) = flaky_client("http://localhost:8000", backend.clone());

	client.sign_in(CredentialPair::new("a0", "r0")?).await?;

	let writers = (1..=ROUNDS)
		.map(|i| {
			let client = client.clone();

			tokio::spawn(async move {
				let pair = CredentialPair::new(format!("a{i}"), format!("r{i}"))
					.expect("Pair fixture should be valid.");

				client.sign_in(pair).await
			})
		})
		.collect::<Vec<_>>();
	let readers = (0..ROUNDS)
		.map(|_| {
			let store = client.store().clone();

			tokio::spawn(async move {
				for _ in 0..50 {
					let stored = store
						.get()
						.await
						.expect("Read should succeed.")
						.expect("A pair should always be present.");
					let refresh = stored.refresh.expect("Every written pair carries a refresh.");

					assert_eq!(stored.access.expose()[1..], refresh.expose()[1..]);

					tokio::task::yield_now().await;
				}
			})
		})
		.collect::<Vec<_>>();

	for writer in writers {
		writer.await??;
	}
	for reader in readers {
		reader.await?;
	}

	let persisted = backend.inner.snapshot();

	assert_eq!(persisted["auth_token"][1..], persisted["refresh_token"][1..]);

	Ok(())
}
