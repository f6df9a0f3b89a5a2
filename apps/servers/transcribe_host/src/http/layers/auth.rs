use crate::error::HostError;
use axum::{body::Body, extract::State, http::Request, middleware::Next, response::IntoResponse};
use sha2::{Digest, Sha256};
use std::sync::Arc;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Shared secret, kept only as a digest so comparisons do not depend on its length.
pub struct ApiKey {
	digest: [u8; 32],
}

impl ApiKey {
	pub fn new(secret: &str) -> Self {
		Self {
			digest: Sha256::digest(secret.as_bytes()).into(),
		}
	}

	pub fn matches(&self, candidate: &[u8]) -> bool {
		let candidate: [u8; 32] = Sha256::digest(candidate).into();
		candidate.iter().zip(self.digest.iter()).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
	}
}

/// Reject the request before any body is read unless `x-api-key` holds the secret.
pub async fn require_api_key(State(key): State<Arc<ApiKey>>, request: Request<Body>, next: Next) -> Result<impl IntoResponse, HostError> {
	let authorized = request.headers().get(API_KEY_HEADER).is_some_and(|value| key.matches(value.as_bytes()));

	if !authorized {
		tracing::debug!(path = %request.uri().path(), "Rejected request without a valid API key");
		return Err(HostError::Unauthorized);
	}

	Ok(next.run(request).await)
}
