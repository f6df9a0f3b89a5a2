use axum::{
	body::Body,
	extract::{ConnectInfo, State},
	http::{header::RETRY_AFTER, HeaderValue, Request, StatusCode},
	middleware::Next,
	response::{IntoResponse, Response},
	Json,
};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Error, Debug)]
pub enum RateLimitError {
	#[error("Rate limit exceeded")]
	RateLimited { retry_after: Duration },
}

impl IntoResponse for RateLimitError {
	fn into_response(self) -> Response {
		match self {
			Self::RateLimited { retry_after } => {
				let secs = retry_after.as_secs().max(1);
				let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(serde_json::json!({ "error": self.to_string() }))).into_response();
				response.headers_mut().insert(RETRY_AFTER, HeaderValue::from(secs));
				response
			}
		}
	}
}

struct TokenBucket {
	tokens: f64,
	last_refill: Instant,
}

impl TokenBucket {
	fn refill(&mut self, now: Instant, capacity: f64, per_sec: f64) {
		let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
		self.tokens = elapsed.mul_add(per_sec, self.tokens).min(capacity);
		self.last_refill = now;
	}
}

/// One token bucket per client, each refilled to `capacity` over `window`.
pub struct ClientRateLimiter {
	capacity: u32,
	window: Duration,
	buckets: DashMap<String, TokenBucket>,
}

impl ClientRateLimiter {
	#[must_use]
	pub fn new(capacity: u32, window: Duration) -> Self {
		Self {
			capacity,
			window,
			buckets: DashMap::new(),
		}
	}

	#[must_use]
	pub fn per_minute(max_requests: u32) -> Self {
		Self::new(max_requests, Duration::from_secs(60))
	}

	pub fn check(&self, client: &str) -> Result<(), RateLimitError> {
		self.check_at(client, Instant::now())
	}

	pub fn check_at(&self, client: &str, now: Instant) -> Result<(), RateLimitError> {
		let capacity = f64::from(self.capacity);
		let per_sec = self.refill_per_sec();

		let mut bucket = self.buckets.entry(client.to_owned()).or_insert_with(|| TokenBucket { tokens: capacity, last_refill: now });
		bucket.refill(now, capacity, per_sec);

		if bucket.tokens >= 1.0 {
			bucket.tokens -= 1.0;
			return Ok(());
		}

		let retry_after = if per_sec > 0.0 {
			Duration::from_secs_f64((1.0 - bucket.tokens) / per_sec)
		} else {
			self.window
		};
		Err(RateLimitError::RateLimited { retry_after })
	}

	/// Forget clients whose bucket has had a full window to refill.
	pub fn prune_idle(&self, now: Instant) -> usize {
		let before = self.buckets.len();
		self.buckets.retain(|_, bucket| now.saturating_duration_since(bucket.last_refill) < self.window);
		before.saturating_sub(self.buckets.len())
	}

	#[must_use]
	pub fn tracked_clients(&self) -> usize {
		self.buckets.len()
	}

	fn refill_per_sec(&self) -> f64 {
		let window = self.window.as_secs_f64();
		if window <= 0.0 {
			return 0.0;
		}
		f64::from(self.capacity) / window
	}
}

/// Key requests by peer IP; requests served without connect info share one bucket.
fn client_key(request: &Request<Body>) -> String {
	request
		.extensions()
		.get::<ConnectInfo<SocketAddr>>()
		.map_or_else(|| UNKNOWN_CLIENT.to_string(), |ConnectInfo(addr)| addr.ip().to_string())
}

pub async fn rate_limit_middleware(
	State(limiter): State<Arc<ClientRateLimiter>>,
	request: Request<Body>,
	next: Next,
) -> Result<impl IntoResponse, RateLimitError> {
	let client = client_key(&request);
	if let Err(e) = limiter.check(&client) {
		tracing::warn!(client = %client, "Rate limit exceeded");
		return Err(e);
	}
	Ok(next.run(request).await)
}
