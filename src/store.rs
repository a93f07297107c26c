//! Credential storage: the durable key-value seam and the cached [`CredentialStore`] on top of it.

pub mod file;
pub mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, StoredCredentials, TokenSecret},
};

/// Boxed future returned by [`KeyValueBackend`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Durable string-to-string storage that survives process restarts.
///
/// Multi-key writes and removals must be applied as a unit: either every entry lands or the
/// backend reports an error and leaves the previous contents readable.
pub trait KeyValueBackend
where
	Self: Send + Sync,
{
	/// Reads the values stored under `keys`, in order.
	fn read<'a>(&'a self, keys: &'a [&'a str]) -> StoreFuture<'a, Vec<Option<String>>>;

	/// Writes every `(key, value)` entry.
	fn write<'a>(&'a self, entries: &'a [(&'a str, &'a str)]) -> StoreFuture<'a, ()>;

	/// Removes every key; missing keys are ignored.
	fn remove<'a>(&'a self, keys: &'a [&'a str]) -> StoreFuture<'a, ()>;
}

/// Error type produced by [`KeyValueBackend`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure (quota, permissions, disabled storage).
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Key names under which the two credentials are persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageKeys {
	/// Key holding the access credential.
	pub access: String,
	/// Key holding the refresh credential.
	pub refresh: String,
}
impl Default for StorageKeys {
	fn default() -> Self {
		Self { access: "auth_token".into(), refresh: "refresh_token".into() }
	}
}

// What this process knows about the persisted credentials.
#[derive(Clone, Debug)]
enum CacheState {
	// Nothing was read or written yet; the backend is authoritative.
	Unknown,
	// Signed out by this process. Never re-read, even if the backend removal failed.
	Empty,
	Present(StoredCredentials),
}
impl CacheState {
	fn credentials(&self) -> Option<&StoredCredentials> {
		match self {
			CacheState::Present(stored) => Some(stored),
			CacheState::Unknown | CacheState::Empty => None,
		}
	}
}

/// In-memory mirror of the persisted credentials.
///
/// The backend is read once, on first use. Afterwards the mirror is authoritative: it only
/// changes through [`set`](Self::set) and [`clear`](Self::clear). Mutations are serialized and
/// only publish a pair once the backend accepted it, so a reader never observes an access
/// credential next to a refresh credential from another pair.
pub struct CredentialStore {
	backend: Arc<dyn KeyValueBackend>,
	keys: StorageKeys,
	cache: RwLock<CacheState>,
	writes: AsyncMutex<()>,
}
impl CredentialStore {
	/// Creates a store over `backend` using the default key names.
	pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
		Self::with_keys(backend, StorageKeys::default())
	}

	/// Creates a store over `backend` using custom key names.
	pub fn with_keys(backend: Arc<dyn KeyValueBackend>, keys: StorageKeys) -> Self {
		Self { backend, keys, cache: RwLock::new(CacheState::Unknown), writes: AsyncMutex::new(()) }
	}

	/// Returns the persisted key names.
	pub fn keys(&self) -> &StorageKeys {
		&self.keys
	}

	/// Returns the current credentials, hydrating from the backend on first use.
	pub async fn get(&self) -> Result<Option<StoredCredentials>, StoreError> {
		if let Some(known) = self.known() {
			return Ok(known);
		}

		let _writes = self.writes.lock().await;

		if let Some(known) = self.known() {
			return Ok(known);
		}

		let hydrated = self.hydrate().await?;

		*self.cache.write() = match &hydrated {
			Some(stored) => CacheState::Present(stored.clone()),
			None => CacheState::Empty,
		};

		Ok(hydrated)
	}

	/// Returns the current access credential, if any.
	pub async fn access(&self) -> Result<Option<TokenSecret>, StoreError> {
		Ok(self.get().await?.map(|stored| stored.access))
	}

	/// Returns the cached access credential without consulting the backend.
	pub(crate) fn cached_access(&self) -> Option<TokenSecret> {
		self.cache.read().credentials().map(|stored| stored.access.clone())
	}

	/// Whether this process signed the session out and no pair was stored since.
	pub(crate) fn is_cleared(&self) -> bool {
		matches!(*self.cache.read(), CacheState::Empty)
	}

	/// Persists `pair` and then publishes it to readers.
	///
	/// A backend failure leaves the previous credentials in place and is returned to the caller.
	/// Sessions are opened through
	/// [`AuthenticatedClient::sign_in`](crate::client::AuthenticatedClient::sign_in), which also
	/// re-arms the failure policy.
	pub(crate) async fn set(&self, pair: CredentialPair) -> Result<(), StoreError> {
		let _writes = self.writes.lock().await;
		let entries = [
			(self.keys.access.as_str(), pair.access.expose()),
			(self.keys.refresh.as_str(), pair.refresh.expose()),
		];

		self.backend.write(&entries).await?;
		*self.cache.write() = CacheState::Present(pair.into());

		Ok(())
	}

	/// Drops both credentials from memory and from the backend.
	///
	/// This process stops using the credentials even when the backend removal fails: the store
	/// stays empty until the next [`set`](Self::set) and does not re-read the leftovers.
	pub async fn clear(&self) -> Result<(), StoreError> {
		let _writes = self.writes.lock().await;

		*self.cache.write() = CacheState::Empty;
		self.backend.remove(&[self.keys.access.as_str(), self.keys.refresh.as_str()]).await
	}

	fn known(&self) -> Option<Option<StoredCredentials>> {
		match &*self.cache.read() {
			CacheState::Unknown => None,
			CacheState::Empty => Some(None),
			CacheState::Present(stored) => Some(Some(stored.clone())),
		}
	}

	async fn hydrate(&self) -> Result<Option<StoredCredentials>, StoreError> {
		let values =
			self.backend.read(&[self.keys.access.as_str(), self.keys.refresh.as_str()]).await?;
		let mut values = values.into_iter();
		let access =
			values.next().flatten().and_then(|v| TokenSecret::with_kind("access", v).ok());
		let refresh =
			values.next().flatten().and_then(|v| TokenSecret::with_kind("refresh", v).ok());

		Ok(access.map(|access| StoredCredentials { access, refresh }))
	}
}
impl Debug for CredentialStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialStore")
			.field("keys", &self.keys)
			.field("signed_in", &self.cache.read().credentials().is_some())
			.finish()
	}
}
