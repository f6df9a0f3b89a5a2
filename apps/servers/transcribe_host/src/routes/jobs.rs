use crate::handlers::jobs as routes;
use crate::http::layers::auth::API_KEY_HEADER;
use axum::routing::get;
use axum::{
	extract::FromRef,
	http::{header::CONTENT_TYPE, HeaderName, Method},
	Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use transcribe_jobs::JobManager;

pub fn get_jobs<S>() -> Router<S>
where
	S: Clone + Send + Sync + 'static,
	Arc<JobManager>: FromRef<S>,
{
	let cors = CorsLayer::new()
		.allow_origin(Any)
		.allow_methods([Method::GET])
		.allow_headers([CONTENT_TYPE, HeaderName::from_static(API_KEY_HEADER)]);

	Router::new().route("/jobs/:id", get(routes::get_job)).layer(cors)
}
