//! Redacted bearer secret wrapper.

// self
use crate::_prelude::*;

/// Errors raised when a bearer secret fails validation.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum SecretError {
	/// Bearer secrets must carry at least one non-whitespace character.
	#[error("The {kind} credential is empty.")]
	Empty {
		/// Which credential failed validation.
		kind: &'static str,
	},
}

/// Opaque bearer secret that keeps token material out of logs.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a bearer string after rejecting empty values.
	pub fn new(value: impl Into<String>) -> Result<Self, SecretError> {
		Self::with_kind("bearer", value)
	}

	pub(crate) fn with_kind(
		kind: &'static str,
		value: impl Into<String>,
	) -> Result<Self, SecretError> {
		let value = value.into();

		if value.trim().is_empty() {
			return Err(SecretError::Empty { kind });
		}

		Ok(Self(value))
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
