//! Learning REST wrappers: thin URL builders and JSON decoders over
//! [`AuthenticatedClient::fetch_with_auth`].
//!
//! The wrappers never look at status codes or retry on their own; the pipeline already did
//! both by the time a response reaches them.

// crates.io
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	client::{ApiRequest, AuthenticatedClient},
	error::{ConfigError, TransportError},
};

/// Dashboard summary for the signed-in learner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DashboardOverview {
	/// Coins earned across all modules.
	#[serde(default)]
	pub total_coins: i64,
	/// Remaining overview fields, passed through untouched.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

/// Module and progress endpoints of the learning backend.
#[derive(Clone, Debug)]
pub struct LearningApi {
	client: AuthenticatedClient,
}
impl LearningApi {
	/// Wraps an authenticated client.
	pub fn new(client: AuthenticatedClient) -> Self {
		Self { client }
	}

	/// Underlying authenticated client.
	pub fn client(&self) -> &AuthenticatedClient {
		&self.client
	}

	/// `GET /api/learning/modules`
	pub async fn modules(&self) -> Result<Vec<Value>> {
		let url = self.endpoint(&["learning", "modules"])?;

		self.fetch_json(ApiRequest::get(url)).await
	}

	/// `GET /api/learning/modules/{module_id}/lessons`
	pub async fn module_lessons(&self, module_id: &str) -> Result<Value> {
		let url = self.endpoint(&["learning", "modules", module_id, "lessons"])?;

		self.fetch_json(ApiRequest::get(url)).await
	}

	/// `POST /api/learning/lessons/{lesson_id}/complete`
	pub async fn complete_lesson(&self, lesson_id: &str) -> Result<Value> {
		let url = self.endpoint(&["learning", "lessons", lesson_id, "complete"])?;

		self.fetch_json(ApiRequest::post(url)).await
	}

	/// `GET /api/dashboard/overview`
	pub async fn dashboard_overview(&self) -> Result<DashboardOverview> {
		let url = self.endpoint(&["dashboard", "overview"])?;

		self.fetch_json(ApiRequest::get(url)).await
	}

	/// `GET /api/dashboard/modules`
	pub async fn module_progress(&self) -> Result<Value> {
		let url = self.endpoint(&["dashboard", "modules"])?;

		self.fetch_json(ApiRequest::get(url)).await
	}

	// Segments are percent-encoded individually, so identifiers cannot inject extra path parts.
	fn endpoint(&self, segments: &[&str]) -> Result<Url, ConfigError> {
		let base = self.client.config().endpoint("api")?;
		let mut url = base.clone();

		url.path_segments_mut()
			.map_err(|_| ConfigError::CannotBeABase { url: base.to_string() })?
			.pop_if_empty()
			.extend(segments);

		Ok(url)
	}

	async fn fetch_json<T>(&self, request: ApiRequest) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let endpoint = request.target.clone();
		let response = self.client.fetch_with_auth(request).await?;
		let body = response
			.bytes()
			.await
			.map_err(|e| TransportError::network(endpoint.as_str(), e.without_url()))?;

		decode(&endpoint, &body)
	}
}

/// Learner-facing state loaded from the backend for the map view.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LearnerState {
	/// Coins shown in the map header.
	pub coins: i64,
	/// Modules rendered as neighborhoods.
	pub modules: Vec<Value>,
	/// Latest dashboard overview, once loaded.
	pub overview: Option<DashboardOverview>,
}
impl LearnerState {
	/// Loads the dashboard overview and the coin balance it carries.
	pub async fn load_user_data(&mut self, api: &LearningApi) -> Result<()> {
		let overview = api.dashboard_overview().await?;

		self.coins = overview.total_coins;
		self.overview = Some(overview);

		Ok(())
	}

	/// Loads the module list.
	pub async fn load_modules(&mut self, api: &LearningApi) -> Result<()> {
		self.modules = api.modules().await?;

		Ok(())
	}
}

fn decode<T>(endpoint: &str, body: &[u8]) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut de = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut de)
		.map_err(|source| Error::Decode { endpoint: endpoint.to_owned(), source })
}
