//! File-backed [`KeyValueBackend`] that keeps credentials across restarts.

// std
use std::{
	collections::BTreeMap,
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	store::{KeyValueBackend, StoreError, StoreFuture},
};

/// Persists entries as a JSON object, rewriting the whole file after each mutation.
#[derive(Clone, Debug)]
pub struct FileBackend {
	path: PathBuf,
	inner: Arc<RwLock<BTreeMap<String, String>>>,
}
impl FileBackend {
	/// Opens (or creates) a backend at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Returns the snapshot location.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<BTreeMap<String, String>, StoreError> {
		if !path.exists() {
			return Ok(BTreeMap::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(BTreeMap::new());
		}

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist(&self, contents: &BTreeMap<String, String>) -> Result<(), StoreError> {
		let serialized =
			serde_json::to_vec_pretty(contents).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize credential snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	// Applies `mutate` to a copy and only swaps it in once the file has been replaced.
	fn commit<F>(&self, mutate: F) -> Result<(), StoreError>
	where
		F: FnOnce(&mut BTreeMap<String, String>),
	{
		let mut guard = self.inner.write();
		let mut next = guard.clone();

		mutate(&mut next);
		self.persist(&next)?;
		*guard = next;

		Ok(())
	}
}
impl KeyValueBackend for FileBackend {
	fn read<'a>(&'a self, keys: &'a [&'a str]) -> StoreFuture<'a, Vec<Option<String>>> {
		Box::pin(async move {
			let guard = self.inner.read();

			Ok(keys.iter().map(|key| guard.get(*key).cloned()).collect())
		})
	}

	fn write<'a>(&'a self, entries: &'a [(&'a str, &'a str)]) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.commit(|map| {
				for (key, value) in entries {
					map.insert((*key).to_owned(), (*value).to_owned());
				}
			})
		})
	}

	fn remove<'a>(&'a self, keys: &'a [&'a str]) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.commit(|map| {
				for key in keys {
					map.remove(*key);
				}
			})
		})
	}
}
