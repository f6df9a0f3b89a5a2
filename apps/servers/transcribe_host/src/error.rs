use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use transcribe_jobs::JobError;

#[derive(thiserror::Error, Debug)]
pub enum HostError {
	#[error("unauthorized")]
	Unauthorized,

	#[error("job not found")]
	NotFound,

	#[error("missing required multipart field `audio`")]
	MissingAudio,

	#[error("audio file exceeds the {limit_mb} MB limit")]
	PayloadTooLarge { limit_mb: usize },

	#[error("invalid multipart body: {0}")]
	Multipart(#[from] MultipartError),

	#[error("job error: {0}")]
	Job(#[from] JobError),

	#[error("I/O error: {0}")]
	IoError(#[from] std::io::Error),

	#[error("HTTP client error: {0}")]
	HttpClient(#[from] reqwest::Error),
}

impl HostError {
	fn status_code(&self) -> StatusCode {
		match self {
			Self::Unauthorized => StatusCode::UNAUTHORIZED,
			Self::NotFound => StatusCode::NOT_FOUND,
			Self::MissingAudio => StatusCode::BAD_REQUEST,
			Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
			Self::Multipart(e) => e.status(),
			Self::Job(JobError::ShuttingDown) => StatusCode::SERVICE_UNAVAILABLE,
			Self::Job(JobError::DuplicateId(_)) => StatusCode::INTERNAL_SERVER_ERROR,
			Self::IoError(_) | Self::HttpClient(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl IntoResponse for HostError {
	fn into_response(self) -> Response {
		let status = self.status_code();
		// internals stay in the log, the caller gets the canonical reason
		let message = if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
			tracing::error!("Request failed: {:?}", self);
			status.canonical_reason().unwrap_or("Internal Server Error").to_string()
		} else {
			self.to_string()
		};

		(status, Json(serde_json::json!({ "error": message }))).into_response()
	}
}
