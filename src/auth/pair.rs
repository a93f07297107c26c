//! Access/refresh credential pairs and their hydrated form.

// self
use crate::{
	_prelude::*,
	auth::{SecretError, TokenSecret},
};

/// Access + refresh credentials issued together by login or a refresh exchange.
///
/// The pair is only ever written as a unit, so a persisted access credential never outlives the
/// refresh credential it was minted with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialPair {
	/// Short-lived bearer credential attached to API calls.
	pub access: TokenSecret,
	/// Longer-lived credential exchanged for a new pair.
	pub refresh: TokenSecret,
}
impl CredentialPair {
	/// Validates and wraps a freshly issued pair.
	pub fn new(
		access: impl Into<String>,
		refresh: impl Into<String>,
	) -> Result<Self, SecretError> {
		Ok(Self {
			access: TokenSecret::with_kind("access", access)?,
			refresh: TokenSecret::with_kind("refresh", refresh)?,
		})
	}
}

/// Credentials as observed by readers of the store.
///
/// Sessions persisted before refresh credentials were issued only carry an access credential;
/// those can authorize requests but cannot be refreshed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredCredentials {
	/// Access credential attached to outgoing requests.
	pub access: TokenSecret,
	/// Refresh credential, when the session has one.
	pub refresh: Option<TokenSecret>,
}
impl From<CredentialPair> for StoredCredentials {
	fn from(pair: CredentialPair) -> Self {
		Self { access: pair.access, refresh: Some(pair.refresh) }
	}
}
