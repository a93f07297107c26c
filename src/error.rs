//! Session-level error types shared by the client, the refresh coordinator, and the store.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error surfaced by [`AuthenticatedClient`](crate::client::AuthenticatedClient) and
/// the REST wrappers built on it.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure while persisting or clearing credentials.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration or request construction problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout); no response was received.
	#[error(transparent)]
	Network(#[from] TransportError),

	/// No access credential was available at dispatch time.
	#[error("No access credential is stored; sign in first.")]
	NotAuthenticated,
	/// Backend answered with a non-success status that the pipeline does not recover from.
	#[error("Backend responded with HTTP status {status}.")]
	Http {
		/// HTTP status code returned by the backend.
		status: u16,
	},
	/// Credential refresh failed and the session was torn down.
	#[error("Authentication failed; the session has been signed out.")]
	AuthenticationFailed {
		/// Why the refresh exchange could not produce new credentials.
		#[source]
		source: RefreshError,
	},
	/// Response body did not match the expected JSON shape.
	#[error("Response body from {endpoint} could not be decoded.")]
	Decode {
		/// Endpoint path that produced the body.
		endpoint: String,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}

/// Reasons a refresh exchange could not produce a new credential pair.
///
/// One outcome is fanned out to every request waiting on the same exchange, so the type is
/// `Clone` and carries rendered messages instead of transport handles.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RefreshError {
	/// The store holds no refresh credential to exchange.
	#[error("No refresh credential is stored.")]
	MissingRefreshToken,
	/// Refresh endpoint answered with a non-success status.
	#[error("Refresh endpoint rejected the exchange with HTTP status {status}.")]
	Rejected {
		/// HTTP status code returned by the refresh endpoint.
		status: u16,
	},
	/// Refresh endpoint answered 2xx but the body lacked a usable credential pair.
	#[error("Refresh endpoint returned an unusable body: {message}.")]
	MalformedResponse {
		/// Parser or validation message.
		message: String,
	},
	/// Transport failed before the refresh endpoint answered.
	#[error("Refresh exchange failed in transport: {message}.")]
	Transport {
		/// Rendered transport error.
		message: String,
	},
	/// New credentials could not be persisted.
	#[error("Refreshed credentials could not be persisted: {0}")]
	Storage(#[from] crate::store::StoreError),
}

/// Configuration and request construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base URL cannot be parsed.
	#[error("Base URL is invalid.")]
	InvalidBaseUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL cannot carry paths (e.g. `mailto:` or `data:` URLs).
	#[error("Base URL `{url}` cannot be used as a base for API paths.")]
	CannotBeABase {
		/// Offending URL.
		url: String,
	},
	/// Only `http` and `https` origins are supported.
	#[error("Base URL scheme `{scheme}` is not supported.")]
	UnsupportedScheme {
		/// Offending scheme.
		scheme: String,
	},
	/// Request path could not be joined onto the base URL.
	#[error("Path `{path}` cannot be joined onto the base URL.")]
	InvalidPath {
		/// Offending path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Storage key names must be non-empty.
	#[error("The {which} storage key must not be empty.")]
	EmptyStorageKey {
		/// Which key failed validation.
		which: &'static str,
	},
	/// Access and refresh credentials must live under distinct keys.
	#[error("Access and refresh credentials cannot share the storage key `{key}`.")]
	DuplicateStorageKey {
		/// Shared key name.
		key: String,
	},
	/// Caller-supplied header value is not valid.
	#[error("Header `{name}` has an invalid value.")]
	InvalidHeader {
		/// Header name.
		name: String,
	},
	/// Request timeout must be positive.
	#[error("Request timeout must be positive.")]
	NonPositiveTimeout,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {endpoint}.")]
	Network {
		/// Endpoint path being called.
		endpoint: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(
		endpoint: impl Into<String>,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { endpoint: endpoint.into(), source: Box::new(src) }
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;
	use crate::store::StoreError;

	#[test]
	fn authentication_failed_exposes_refresh_reason() {
		let err = Error::AuthenticationFailed { source: RefreshError::Rejected { status: 403 } };
		let source = StdError::source(&err)
			.expect("AuthenticationFailed should expose the refresh failure as its source.");

		assert!(source.to_string().contains("403"));
	}

	#[test]
	fn store_error_converts_with_message() {
		let err: Error = StoreError::Backend { message: "quota exceeded".into() }.into();

		assert!(matches!(err, Error::Storage(_)));
		assert!(err.to_string().contains("quota exceeded"));
	}
}
