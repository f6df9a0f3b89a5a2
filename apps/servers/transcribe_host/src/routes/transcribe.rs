use crate::handlers::transcribe as routes;
use crate::http::layers::auth::API_KEY_HEADER;
use crate::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::{
	extract::FromRef,
	http::{header::CONTENT_TYPE, HeaderName, Method},
	Router,
};
use tower_http::cors::{Any, CorsLayer};

/// Room for multipart boundaries and the non-audio fields.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn post_transcribe<S>(max_upload_bytes: usize) -> Router<S>
where
	S: Clone + Send + Sync + 'static,
	AppState: FromRef<S>,
{
	let cors = CorsLayer::new()
		.allow_origin(Any)
		.allow_methods([Method::POST])
		.allow_headers([CONTENT_TYPE, HeaderName::from_static(API_KEY_HEADER)]);

	Router::new()
		.route("/transcribe", post(routes::transcribe))
		.layer(DefaultBodyLimit::max(max_upload_bytes.saturating_add(FORM_OVERHEAD_BYTES)))
		.layer(cors)
}
