use axum::{
	body::Body,
	extract::MatchedPath,
	http::{header::CONTENT_TYPE, Request, StatusCode},
	middleware::Next,
	response::{IntoResponse, Response},
};
use lazy_static::lazy_static;
use prometheus::{register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec, TextEncoder};
use std::time::Instant;

const UNMATCHED_ROUTE: &str = "unmatched";

lazy_static! {
	static ref HTTP_REQUESTS_TOTAL: IntCounterVec =
		register_int_counter_vec!("http_requests_total", "Total number of HTTP requests", &["method", "route", "status"]).expect("Failed to register HTTP_REQUESTS_TOTAL");
	static ref HTTP_REQUEST_DURATION: HistogramVec =
		register_histogram_vec!("http_request_duration_seconds", "HTTP request duration in seconds", &["method", "route"]).expect("Failed to register HTTP_REQUEST_DURATION");
}

/// Middleware for Prometheus metrics collection.
///
/// Labels use the route template so `/jobs/:id` stays one series.
pub async fn metrics_middleware(req: Request<Body>, next: Next) -> Response<Body> {
	let method = req.method().to_string();
	let route = req.extensions().get::<MatchedPath>().map_or(UNMATCHED_ROUTE, MatchedPath::as_str).to_owned();

	let start = Instant::now();
	let response = next.run(req).await;
	let duration = start.elapsed().as_secs_f64();

	let status = response.status().as_u16().to_string();

	HTTP_REQUESTS_TOTAL.with_label_values(&[&method, &route, &status]).inc();
	HTTP_REQUEST_DURATION.with_label_values(&[&method, &route]).observe(duration);

	response
}

/// Prometheus metrics handler
pub async fn metrics_handler() -> Response {
	let encoder = TextEncoder::new();
	let metric_families = prometheus::gather();
	let mut buffer = Vec::new();

	if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
		tracing::error!("Failed to gather metrics: {}", e);
		return StatusCode::INTERNAL_SERVER_ERROR.into_response();
	}

	(StatusCode::OK, [(CONTENT_TYPE, encoder.format_type().to_string())], buffer).into_response()
}
