//! Thread-safe in-memory [`KeyValueBackend`] for local development and tests.

// self
use crate::{
	_prelude::*,
	store::{KeyValueBackend, StoreError, StoreFuture},
};

type EntryMap = Arc<RwLock<HashMap<String, String>>>;

/// Storage backend that keeps entries in-process; contents are lost on exit.
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend(EntryMap);
impl MemoryBackend {
	/// Creates a backend pre-populated with `entries`.
	pub fn with_entries<I, K, V>(entries: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		let map = entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect();

		Self(Arc::new(RwLock::new(map)))
	}

	/// Returns a copy of every stored entry.
	pub fn snapshot(&self) -> HashMap<String, String> {
		self.0.read().clone()
	}

	fn write_now(map: &EntryMap, entries: &[(&str, &str)]) -> Result<(), StoreError> {
		let mut guard = map.write();

		for (key, value) in entries {
			guard.insert((*key).to_owned(), (*value).to_owned());
		}

		Ok(())
	}
}
impl KeyValueBackend for MemoryBackend {
	fn read<'a>(&'a self, keys: &'a [&'a str]) -> StoreFuture<'a, Vec<Option<String>>> {
		Box::pin(async move {
			let guard = self.0.read();

			Ok(keys.iter().map(|key| guard.get(*key).cloned()).collect())
		})
	}

	fn write<'a>(&'a self, entries: &'a [(&'a str, &'a str)]) -> StoreFuture<'a, ()> {
		Box::pin(async move { Self::write_now(&self.0, entries) })
	}

	fn remove<'a>(&'a self, keys: &'a [&'a str]) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let mut guard = self.0.write();

			for key in keys {
				guard.remove(*key);
			}

			Ok(())
		})
	}
}
