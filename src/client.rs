//! Authenticated request pipeline.
//!
//! [`AuthenticatedClient::fetch_with_auth`] is the only way the crate talks to the backend:
//!
//! 1. Without a stored access credential the call fails with [`Error::NotAuthenticated`] and the
//!    failure policy fires; nothing is sent.
//! 2. The request carries the caller's headers, a default `Content-Type`, and
//!    `Authorization: Bearer <access>`. Callers cannot override the `Authorization` header.
//! 3. Transport failures surface as [`Error::Network`] without a refresh.
//! 4. A 401 triggers one refresh through the [`RefreshCoordinator`] and one retry. The retry's
//!    outcome is final, including a second 401.
//! 5. Any other non-2xx status surfaces as [`Error::Http`]; 2xx responses are returned as-is.

// crates.io
use reqwest::{
	Method, Response, StatusCode,
	header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
};
// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenSecret},
	config::ClientConfig,
	error::{ConfigError, TransportError},
	http::ReqwestHttpClient,
	obs::{self, OpKind},
	refresh::RefreshCoordinator,
	session::{LoginRedirect, Navigator, SessionFailurePolicy},
	store::{CredentialStore, KeyValueBackend},
};

/// Re-buildable description of one logical API call.
///
/// The pipeline may dispatch the same request twice (before and after a refresh), so the body is
/// kept as owned bytes instead of a one-shot stream.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the configured base URL, or an absolute URL.
	pub target: String,
	/// Caller-supplied headers.
	pub headers: HeaderMap,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
}
impl ApiRequest {
	/// Creates a request for `target` with no headers or body.
	pub fn new(method: Method, target: impl Into<String>) -> Self {
		Self { method, target: target.into(), headers: HeaderMap::new(), body: None }
	}

	/// Shorthand for a `GET` request.
	pub fn get(target: impl Into<String>) -> Self {
		Self::new(Method::GET, target)
	}

	/// Shorthand for a `POST` request.
	pub fn post(target: impl Into<String>) -> Self {
		Self::new(Method::POST, target)
	}

	/// Adds a typed header, replacing earlier values for the same name.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Adds a header from strings, validating both name and value.
	pub fn try_header(self, name: &str, value: &str) -> Result<Self, ConfigError> {
		let invalid = || ConfigError::InvalidHeader { name: name.to_owned() };
		let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
		let value = HeaderValue::from_str(value).map_err(|_| invalid())?;

		Ok(self.header(name, value))
	}

	/// Sets the request body.
	pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}
}

/// Entry point for every backend call.
///
/// Clones share the credential store, the failure policy, and the refresh coordinator, so all
/// requests issued through any clone take part in the same single-flight refresh.
#[derive(Clone)]
pub struct AuthenticatedClient {
	http_client: ReqwestHttpClient,
	config: Arc<ClientConfig>,
	content_type: HeaderValue,
	store: Arc<CredentialStore>,
	policy: Arc<dyn SessionFailurePolicy>,
	refresher: RefreshCoordinator,
}
impl AuthenticatedClient {
	/// Creates a client whose failure policy redirects to [`ClientConfig::login_url`].
	pub fn new(
		config: ClientConfig,
		backend: Arc<dyn KeyValueBackend>,
		navigator: Arc<dyn Navigator>,
	) -> Result<Self, ConfigError> {
		let policy = Arc::new(LoginRedirect::new(config.login_url.clone(), navigator));
		let http_client = ReqwestHttpClient::from_config(&config)?;
		let store = Arc::new(CredentialStore::with_keys(backend, config.storage_keys.clone()));

		Self::with_parts(config, store, policy, http_client)
	}

	/// Creates a client from explicitly constructed collaborators.
	pub fn with_parts(
		config: ClientConfig,
		store: Arc<CredentialStore>,
		policy: Arc<dyn SessionFailurePolicy>,
		http_client: ReqwestHttpClient,
	) -> Result<Self, ConfigError> {
		let content_type = HeaderValue::from_str(&config.default_content_type)
			.map_err(|_| ConfigError::InvalidHeader { name: CONTENT_TYPE.as_str().into() })?;
		let refresher = RefreshCoordinator::new(
			http_client.clone(),
			config.refresh_url.clone(),
			store.clone(),
			policy.clone(),
		);

		Ok(Self { http_client, config: Arc::new(config), content_type, store, policy, refresher })
	}

	/// Configuration the client was built with.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Credential store backing this client.
	pub fn store(&self) -> &Arc<CredentialStore> {
		&self.store
	}

	/// Refresh coordinator shared by all clones of this client.
	pub fn refresher(&self) -> &RefreshCoordinator {
		&self.refresher
	}

	/// Persists credentials obtained by the login surface and opens a new session episode.
	pub async fn sign_in(&self, pair: CredentialPair) -> Result<()> {
		self.store.set(pair).await?;
		self.policy.on_session_established();

		Ok(())
	}

	/// Drops the stored credentials.
	pub async fn sign_out(&self) -> Result<()> {
		self.store.clear().await?;

		Ok(())
	}

	/// Sends `request` with the stored access credential, refreshing and retrying once on 401.
	pub async fn fetch_with_auth(&self, request: ApiRequest) -> Result<Response> {
		obs::observe(OpKind::Request, "fetch_with_auth", self.dispatch(request)).await
	}

	async fn dispatch(&self, request: ApiRequest) -> Result<Response> {
		let url = self.resolve(&request.target)?;
		let Some(access) = self.store.access().await? else {
			self.policy.on_auth_failure();

			return Err(Error::NotAuthenticated);
		};
		let response = self.send(&request, &url, &access).await?;

		if response.status() != StatusCode::UNAUTHORIZED {
			return ensure_success(response);
		}

		drop(response);

		let access = self
			.refresher
			.refresh_rejected(&access)
			.await
			.map_err(|source| Error::AuthenticationFailed { source })?;
		let response = self.send(&request, &url, &access).await?;

		if response.status() == StatusCode::UNAUTHORIZED {
			obs::retry_unauthorized(url.path());
		}

		ensure_success(response)
	}

	async fn send(
		&self,
		request: &ApiRequest,
		url: &Url,
		access: &TokenSecret,
	) -> Result<Response> {
		let mut headers = request.headers.clone();

		if !headers.contains_key(CONTENT_TYPE) {
			headers.insert(CONTENT_TYPE, self.content_type.clone());
		}

		headers.insert(AUTHORIZATION, bearer(access)?);

		let mut builder =
			self.http_client.request(request.method.clone(), url.clone()).headers(headers);

		if let Some(body) = &request.body {
			builder = builder.body(body.clone());
		}

		builder
			.send()
			.await
			.map_err(|e| TransportError::network(url.path(), e.without_url()).into())
	}

	fn resolve(&self, target: &str) -> Result<Url, ConfigError> {
		match Url::parse(target) {
			Ok(url) => Ok(url),
			Err(url::ParseError::RelativeUrlWithoutBase) => self.config.endpoint(target),
			Err(source) => Err(ConfigError::InvalidPath { path: target.into(), source }),
		}
	}
}
impl Debug for AuthenticatedClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthenticatedClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("store", &self.store)
			.field("refresher", &self.refresher)
			.finish()
	}
}

fn bearer(access: &TokenSecret) -> Result<HeaderValue, ConfigError> {
	let mut value = HeaderValue::from_str(&format!("Bearer {}", access.expose()))
		.map_err(|_| ConfigError::InvalidHeader { name: AUTHORIZATION.as_str().into() })?;

	value.set_sensitive(true);

	Ok(value)
}

fn ensure_success(response: Response) -> Result<Response> {
	let status = response.status();

	if status.is_success() { Ok(response) } else { Err(Error::Http { status: status.as_u16() }) }
}
