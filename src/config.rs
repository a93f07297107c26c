//! Client configuration: backend origin, refresh endpoint, login surface, and storage keys.

// std
use std::env;
// self
use crate::{_prelude::*, error::ConfigError, store::StorageKeys};

/// Environment variable consulted by [`ClientConfig::from_env`].
pub const BASE_URL_ENV: &str = "LEARNMAP_API_BASE_URL";
/// Origin used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
/// Refresh exchange path relative to the base URL.
pub const DEFAULT_REFRESH_PATH: &str = "/api/auth/refresh";
/// Login surface path relative to the base URL.
pub const DEFAULT_LOGIN_PATH: &str = "/login";
/// Content type applied when the caller does not set one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Validated configuration shared by the client, the refresh coordinator, and the REST wrappers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// API origin every request path is joined onto.
	pub base_url: Url,
	/// Fully resolved refresh exchange endpoint.
	pub refresh_url: Url,
	/// Login surface the failure policy navigates to.
	pub login_url: Url,
	/// Persisted key names for the two credentials.
	pub storage_keys: StorageKeys,
	/// Content type applied when the caller does not set one.
	pub default_content_type: String,
	/// Timeout applied to every request sent by a crate-built HTTP client.
	pub request_timeout: Option<Duration>,
}
impl ClientConfig {
	/// Starts a builder for `base_url`.
	pub fn builder(base_url: impl AsRef<str>) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Builds a configuration from [`BASE_URL_ENV`], falling back to [`DEFAULT_BASE_URL`].
	pub fn from_env() -> Result<Self, ConfigError> {
		let base = env::var(BASE_URL_ENV)
			.ok()
			.filter(|value| !value.trim().is_empty())
			.unwrap_or_else(|| DEFAULT_BASE_URL.into());

		Self::builder(base).build()
	}

	/// Resolves an API path (e.g. `/api/learning/modules`) against the base URL.
	pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		join(&self.base_url, path)
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Clone, Debug)]
pub struct ClientConfigBuilder {
	/// Raw base URL, parsed on build.
	pub base_url: String,
	/// Refresh exchange path.
	pub refresh_path: String,
	/// Login surface path or absolute URL.
	pub login: String,
	/// Persisted key names.
	pub storage_keys: StorageKeys,
	/// Content type applied when the caller does not set one.
	pub default_content_type: String,
	/// Optional request timeout.
	pub request_timeout: Option<Duration>,
}
impl ClientConfigBuilder {
	/// Creates a new builder seeded with defaults for `base_url`.
	pub fn new(base_url: impl AsRef<str>) -> Self {
		Self {
			base_url: base_url.as_ref().trim().to_owned(),
			refresh_path: DEFAULT_REFRESH_PATH.into(),
			login: DEFAULT_LOGIN_PATH.into(),
			storage_keys: StorageKeys::default(),
			default_content_type: DEFAULT_CONTENT_TYPE.into(),
			request_timeout: None,
		}
	}

	/// Overrides the refresh exchange path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Overrides the login surface; accepts a path or an absolute URL.
	pub fn login(mut self, login: impl Into<String>) -> Self {
		self.login = login.into();

		self
	}

	/// Overrides the persisted key names.
	pub fn storage_keys(mut self, access: impl Into<String>, refresh: impl Into<String>) -> Self {
		self.storage_keys = StorageKeys { access: access.into(), refresh: refresh.into() };

		self
	}

	/// Overrides the default content type.
	pub fn default_content_type(mut self, content_type: impl Into<String>) -> Self {
		self.default_content_type = content_type.into();

		self
	}

	/// Sets the per-request timeout.
	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = Some(timeout);

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let base_url = parse_base(&self.base_url)?;
		let refresh_url = join(&base_url, &self.refresh_path)?;
		let login_url = join(&base_url, &self.login)?;

		validate_keys(&self.storage_keys)?;

		if matches!(self.request_timeout, Some(timeout) if !timeout.is_positive()) {
			return Err(ConfigError::NonPositiveTimeout);
		}

		Ok(ClientConfig {
			base_url,
			refresh_url,
			login_url,
			storage_keys: self.storage_keys,
			default_content_type: self.default_content_type,
			request_timeout: self.request_timeout,
		})
	}
}

fn parse_base(raw: &str) -> Result<Url, ConfigError> {
	let mut url = Url::parse(raw).map_err(|source| ConfigError::InvalidBaseUrl { source })?;

	if url.cannot_be_a_base() {
		return Err(ConfigError::CannotBeABase { url: url.to_string() });
	}
	if !matches!(url.scheme(), "http" | "https") {
		return Err(ConfigError::UnsupportedScheme { scheme: url.scheme().into() });
	}
	// Keep any path prefix (`https://host/app`) when joining relative API paths.
	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());

		url.set_path(&path);
	}

	Ok(url)
}

fn join(base: &Url, path: &str) -> Result<Url, ConfigError> {
	let relative = path.trim_start_matches('/');

	base.join(relative).map_err(|source| ConfigError::InvalidPath { path: path.into(), source })
}

fn validate_keys(keys: &StorageKeys) -> Result<(), ConfigError> {
	if keys.access.trim().is_empty() {
		return Err(ConfigError::EmptyStorageKey { which: "access" });
	}
	if keys.refresh.trim().is_empty() {
		return Err(ConfigError::EmptyStorageKey { which: "refresh" });
	}
	if keys.access == keys.refresh {
		return Err(ConfigError::DuplicateStorageKey { key: keys.access.clone() });
	}

	Ok(())
}
