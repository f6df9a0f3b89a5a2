use crate::JobId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
	/// The generator handed out an id that is still registered.
	#[error("job id {0} is already registered")]
	DuplicateId(JobId),

	#[error("job manager is shutting down")]
	ShuttingDown,
}
