use crate::error::HostError;
use crate::upload::spool_audio;
use crate::AppState;
use axum::{
	extract::{Multipart, State},
	http::StatusCode,
	response::Json,
};
use serde::Serialize;
use tracing::instrument;
use transcribe_jobs::JobId;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
	job_id: JobId,
}

#[axum::debug_handler(state = AppState)]
#[instrument(name = "transcribe", skip_all)]
pub async fn transcribe(State(state): State<AppState>, multipart: Multipart) -> Result<(StatusCode, Json<SubmitResponse>), HostError> {
	let upload = spool_audio(multipart, &state.upload_dir, state.config.max_upload_bytes())
		.await?
		.ok_or(HostError::MissingAudio)?;

	let path = upload.path.clone();
	let job_id = match state.jobs.submit(upload) {
		Ok(id) => id,
		Err(e) => {
			if let Err(cleanup) = tokio::fs::remove_file(&path).await {
				tracing::warn!(path = %path.display(), "Failed to remove rejected upload: {}", cleanup);
			}
			return Err(e.into());
		}
	};

	tracing::info!(job_id = %job_id, "Transcription job accepted");
	Ok((StatusCode::ACCEPTED, Json(SubmitResponse { job_id })))
}
