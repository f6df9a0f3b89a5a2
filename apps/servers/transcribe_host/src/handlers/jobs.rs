use crate::error::HostError;
use axum::{
	extract::{Path, State},
	response::Json,
};
use std::sync::Arc;
use tracing::instrument;
use transcribe_jobs::{JobManager, JobState};

/// Current state of a job. Unknown and evicted ids look the same.
#[axum::debug_handler]
#[instrument(name = "get_job", skip(jobs))]
pub async fn get_job(State(jobs): State<Arc<JobManager>>, Path(id): Path<String>) -> Result<Json<JobState>, HostError> {
	let job = jobs.get(&id).ok_or(HostError::NotFound)?;
	Ok(Json(job.state))
}
