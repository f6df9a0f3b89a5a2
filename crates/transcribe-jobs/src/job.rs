use serde::Serialize;
use std::borrow::Borrow;
use std::fmt;
use std::path::PathBuf;
use tokio::time::Instant;
use uuid::Uuid;

/// Used when a failure carries no description of its own, so an `error` job
/// never reports an empty message.
const UNKNOWN_FAILURE: &str = "transcription failed without a diagnostic message";

/// Opaque, unguessable job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
	#[must_use]
	pub fn generate() -> Self {
		Self(Uuid::new_v4().to_string())
	}

	#[must_use]
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for JobId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl Borrow<str> for JobId {
	fn borrow(&self) -> &str {
		&self.0
	}
}

impl From<String> for JobId {
	fn from(value: String) -> Self {
		Self(value)
	}
}

/// Status and payload in one type: a transcript only exists on `Done`, an
/// error only on `Error`, and `Processing` carries neither.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobState {
	Processing,
	Done { transcript: String },
	Error { error: String },
}

impl JobState {
	#[must_use]
	pub const fn is_terminal(&self) -> bool {
		!matches!(self, Self::Processing)
	}

	#[must_use]
	pub const fn label(&self) -> &'static str {
		match self {
			Self::Processing => "processing",
			Self::Done { .. } => "done",
			Self::Error { .. } => "error",
		}
	}
}

/// Snapshot of a registered job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
	pub id: JobId,
	pub created_at: Instant,
	pub state: JobState,
}

impl Job {
	pub(crate) fn processing(id: JobId, created_at: Instant) -> Self {
		Self {
			id,
			created_at,
			state: JobState::Processing,
		}
	}
}

/// Terminal result written by the task that owns a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
	Done { transcript: String },
	Failed { error: String },
}

impl Completion {
	#[must_use]
	pub fn done(transcript: impl Into<String>) -> Self {
		Self::Done { transcript: transcript.into() }
	}

	#[must_use]
	pub fn failed(error: impl Into<String>) -> Self {
		let error = error.into();
		if error.trim().is_empty() {
			return Self::Failed { error: UNKNOWN_FAILURE.to_string() };
		}
		Self::Failed { error }
	}

	#[must_use]
	pub const fn label(&self) -> &'static str {
		match self {
			Self::Done { .. } => "done",
			Self::Failed { .. } => "error",
		}
	}
}

impl From<Completion> for JobState {
	fn from(completion: Completion) -> Self {
		match completion {
			Completion::Done { transcript } => Self::Done { transcript },
			Completion::Failed { error } => Self::Error { error },
		}
	}
}

/// An uploaded file spooled to disk, owned by the job once submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
	pub path: PathBuf,
	pub filename: String,
}
