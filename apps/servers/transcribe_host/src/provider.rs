use crate::config::Config;
use crate::error::HostError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::time::Instant;
use transcribe_jobs::{ProviderError, ProviderResponse, TranscriptionProvider, TranscriptionRequest};

/// OpenAI-compatible `audio/transcriptions` endpoint.
pub struct OpenAiProvider {
	client: Client,
	url: String,
	api_key: String,
	model: String,
}

impl OpenAiProvider {
	pub fn new(config: &Config) -> Result<Self, HostError> {
		let client = Client::builder().timeout(config.provider_timeout()).build()?;

		Ok(Self {
			client,
			url: config.provider_url.clone(),
			api_key: config.openai_api_key.clone(),
			model: config.transcription_model.clone(),
		})
	}

	fn form(&self, request: TranscriptionRequest) -> Result<Form, ProviderError> {
		let part = Part::bytes(request.content)
			.file_name(request.filename)
			.mime_str("application/octet-stream")
			.map_err(|e| ProviderError::InvalidRequest(e.to_string()))?;

		Ok(Form::new()
			.part("file", part)
			.text("model", self.model.clone())
			.text("language", request.language))
	}
}

fn classify(e: &reqwest::Error) -> ProviderError {
	if e.is_timeout() {
		ProviderError::Timeout
	} else {
		ProviderError::Transport(e.to_string())
	}
}

#[async_trait]
impl TranscriptionProvider for OpenAiProvider {
	async fn transcribe(&self, request: TranscriptionRequest) -> Result<ProviderResponse, ProviderError> {
		let bytes = request.content.len();
		let form = self.form(request)?;
		let start = Instant::now();

		let response = self
			.client
			.post(&self.url)
			.bearer_auth(&self.api_key)
			.multipart(form)
			.send()
			.await
			.map_err(|e| classify(&e))?;

		let status = response.status().as_u16();
		let body = response.text().await.map_err(|e| classify(&e))?;

		tracing::debug!(
			status,
			bytes,
			elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
			"Provider responded"
		);

		Ok(ProviderResponse { status, body })
	}
}
