//! Transport wrapper shared by the client and the refresh coordinator.

// std
use std::ops::Deref;
// self
use crate::{_prelude::*, config::ClientConfig, error::ConfigError};

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// The refresh exchange and regular API calls go through the same client, so the refresh call
/// inherits whatever timeout the transport is configured with.
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client honoring [`ClientConfig::request_timeout`].
	pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
		let mut builder = ReqwestClient::builder();

		if let Some(timeout) = config.request_timeout {
			let timeout = std::time::Duration::try_from(timeout)
				.map_err(|_| ConfigError::NonPositiveTimeout)?;

			builder = builder.timeout(timeout);
		}

		builder.build().map(Self).map_err(ConfigError::http_client_build)
	}
}
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
