use crate::error::HostError;
use crate::http::layers::auth::{require_api_key, ApiKey};
use crate::routes::{get_health, get_jobs, post_transcribe};
use axum::{extract::FromRef, middleware::from_fn, middleware::from_fn_with_state, routing::get, Router};
use some_services::{rate_limit_middleware, ClientRateLimiter};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use transcribe_jobs::{JobConfig, JobManager, TranscriptionProvider};

pub mod config;
pub mod error;
pub mod handlers;
pub mod health;
pub mod http;
pub mod metrics;
pub mod provider;
pub mod routes;
pub mod upload;

pub use config::*;
pub use health::perform_health_check;
pub use provider::OpenAiProvider;

#[derive(Clone)]
pub struct AppState {
	pub config: Arc<Config>,
	pub jobs: Arc<JobManager>,
	pub limiter: Arc<ClientRateLimiter>,
	pub api_key: Arc<ApiKey>,
	pub upload_dir: Arc<PathBuf>,
}

impl AppState {
	/// Create the upload directory and start the job manager under `cancel_token`.
	pub async fn build(config: Arc<Config>, provider: Arc<dyn TranscriptionProvider>, cancel_token: &CancellationToken) -> Result<Self, HostError> {
		let upload_dir = config.upload_dir();
		tokio::fs::create_dir_all(&upload_dir).await?;
		tracing::info!(path = %upload_dir.display(), "Upload directory ready");

		let jobs = JobManager::start(JobConfig::from(config.as_ref()), provider, cancel_token);

		Ok(Self {
			limiter: Arc::new(ClientRateLimiter::per_minute(config.rate_limit_per_minute)),
			api_key: Arc::new(ApiKey::new(&config.api_secret)),
			jobs: Arc::new(jobs),
			upload_dir: Arc::new(upload_dir),
			config,
		})
	}
}

impl FromRef<AppState> for Arc<JobManager> {
	fn from_ref(state: &AppState) -> Self {
		Arc::clone(&state.jobs)
	}
}

impl FromRef<AppState> for Arc<Config> {
	fn from_ref(state: &AppState) -> Self {
		Arc::clone(&state.config)
	}
}

/// The full router. Only the job routes are rate limited and authenticated; the
/// limiter runs first so rejected keys still spend tokens.
pub fn app(state: AppState) -> Router {
	let protected_routes = Router::new()
		.merge(post_transcribe(state.config.max_upload_bytes()))
		.merge(get_jobs())
		.route_layer(from_fn_with_state(Arc::clone(&state.api_key), require_api_key))
		.route_layer(from_fn_with_state(Arc::clone(&state.limiter), rate_limit_middleware));

	let public_routes = Router::new()
		.merge(get_health())
		.route("/metrics", get(metrics::http::metrics_handler));

	Router::new()
		.merge(protected_routes)
		.merge(public_routes)
		.with_state(state)
		.layer(from_fn(metrics::http::metrics_middleware))
		.layer(TraceLayer::new_for_http())
}
