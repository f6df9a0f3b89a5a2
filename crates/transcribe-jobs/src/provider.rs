use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// What a background task sends to the speech-to-text service.
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
	pub content: Vec<u8>,
	pub filename: String,
	pub language: String,
}

/// Raw provider reply. Interpreting it is left to the job manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResponse {
	pub status: u16,
	pub body: String,
}

impl ProviderResponse {
	#[must_use]
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Failures before a provider reply could be read.
#[derive(Debug, Error)]
pub enum ProviderError {
	#[error("transcription request timed out")]
	Timeout,

	#[error("transcription request failed: {0}")]
	Transport(String),

	#[error("invalid transcription request: {0}")]
	InvalidRequest(String),
}

#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
	async fn transcribe(&self, request: TranscriptionRequest) -> Result<ProviderResponse, ProviderError>;
}

/// A successful reply, either decoded or kept as the raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptOutcome {
	Structured(String),
	Raw(String),
}

#[derive(Deserialize)]
struct TranscriptBody {
	text: String,
}

impl TranscriptOutcome {
	/// Decode `{"text": ...}`, falling back to the untouched body.
	#[must_use]
	pub fn parse(body: &str) -> Self {
		match serde_json::from_str::<TranscriptBody>(body) {
			Ok(parsed) => Self::Structured(parsed.text.trim().to_string()),
			Err(_) => Self::Raw(body.to_string()),
		}
	}

	#[must_use]
	pub const fn is_structured(&self) -> bool {
		matches!(self, Self::Structured(_))
	}

	#[must_use]
	pub fn into_transcript(self) -> String {
		match self {
			Self::Structured(text) | Self::Raw(text) => text,
		}
	}
}
