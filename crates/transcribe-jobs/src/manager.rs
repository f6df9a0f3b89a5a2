use crate::metrics::{JOBS_FINISHED, JOBS_IN_FLIGHT, JOBS_SUBMITTED};
use crate::{Completion, Job, JobError, JobId, JobStore, TranscriptOutcome, TranscriptionProvider, TranscriptionRequest, TtlReaper, UpdateStatus, Upload};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, instrument, warn};

const ABANDONED_AT_SHUTDOWN: &str = "server shut down before the transcription finished";

#[derive(Debug, Clone)]
pub struct JobConfig {
	/// Retention window for every job record
	pub ttl: Duration,
	/// How often the reaper sweeps
	pub reaper_interval: Duration,
	/// Language hint forwarded to the provider
	pub language: String,
}

/// Owns the registry, the reaper and every background transcription task.
pub struct JobManager {
	store: Arc<JobStore>,
	provider: Arc<dyn TranscriptionProvider>,
	language: Arc<str>,
	tracker: TaskTracker,
	cancel_token: CancellationToken,
	/// Fired only when the shutdown drain times out. Not derived from the
	/// parent token, so a process-wide cancel still lets jobs finish.
	abandon_token: CancellationToken,
	reaper_task: Mutex<Option<JoinHandle<()>>>,
}

impl JobManager {
	/// Build the registry and start the reaper. Must be called inside a tokio runtime.
	pub fn start(config: JobConfig, provider: Arc<dyn TranscriptionProvider>, parent_token: &CancellationToken) -> Self {
		let store = Arc::new(JobStore::new(config.ttl));
		let cancel_token = parent_token.child_token();
		let reaper_task = TtlReaper::new(Arc::clone(&store), config.reaper_interval, &cancel_token).spawn();

		info!(ttl_secs = config.ttl.as_secs(), language = %config.language, "Job manager started");

		Self {
			store,
			provider,
			language: Arc::from(config.language),
			tracker: TaskTracker::new(),
			cancel_token,
			abandon_token: CancellationToken::new(),
			reaper_task: Mutex::new(Some(reaper_task)),
		}
	}

	pub const fn store(&self) -> &Arc<JobStore> {
		&self.store
	}

	pub fn get(&self, id: &str) -> Option<Job> {
		self.store.get(id)
	}

	/// Number of background tasks that have not finished yet.
	pub fn in_flight(&self) -> usize {
		self.tracker.len()
	}

	/// Register the upload and start transcribing it in the background.
	///
	/// Returns as soon as the job is registered. On error the upload still
	/// belongs to the caller.
	#[instrument(name = "submit_job", skip(self, upload), fields(filename = %upload.filename))]
	pub fn submit(&self, upload: Upload) -> Result<JobId, JobError> {
		if self.cancel_token.is_cancelled() {
			return Err(JobError::ShuttingDown);
		}

		let id = JobId::generate();
		self.store.create(id.clone())?;
		JOBS_SUBMITTED.inc();

		let cleanup = TaskCleanup::new(upload.path.clone());
		let store = Arc::clone(&self.store);
		let provider = Arc::clone(&self.provider);
		let language = Arc::clone(&self.language);
		let abandon_token = self.abandon_token.clone();
		let job_id = id.clone();
		self.tracker.spawn(async move {
			let _cleanup = cleanup;
			tokio::select! {
				() = process(&store, provider.as_ref(), &job_id, &upload, &language) => {}
				() = abandon_token.cancelled() => abandon(&store, &job_id),
			}
		});

		debug!(job_id = %id, "Job accepted");
		Ok(id)
	}

	/// Stop the reaper, refuse new jobs and wait up to `timeout` for running
	/// ones. Returns `false` when tasks were still running at the deadline;
	/// those are cancelled, marked as failed and their uploads removed before
	/// this returns.
	pub async fn shutdown(&self, timeout: Duration) -> bool {
		self.cancel_token.cancel();
		self.tracker.close();

		let reaper_task = self.reaper_task.lock().unwrap_or_else(PoisonError::into_inner).take();
		if let Some(handle) = reaper_task {
			if let Err(e) = handle.await {
				error!("TTL reaper task failed: {}", e);
			}
		}

		let pending = self.tracker.len();
		if pending > 0 {
			info!(pending, "Waiting for in-flight transcription jobs");
		}

		if tokio::time::timeout(timeout, self.tracker.wait()).await.is_err() {
			warn!(pending = self.tracker.len(), "Shutdown timeout reached, abandoning running jobs");
			self.abandon_token.cancel();
			self.tracker.wait().await;
			return false;
		}

		info!("Job manager stopped");
		true
	}
}

/// Releases the in-flight slot and removes the spooled upload when the task
/// ends, whether it finished, was abandoned or panicked.
struct TaskCleanup {
	path: PathBuf,
}

impl TaskCleanup {
	fn new(path: PathBuf) -> Self {
		JOBS_IN_FLIGHT.inc();
		Self { path }
	}
}

impl Drop for TaskCleanup {
	fn drop(&mut self) {
		JOBS_IN_FLIGHT.dec();
		if let Err(e) = std::fs::remove_file(&self.path) {
			warn!(path = %self.path.display(), "Failed to remove upload: {}", e);
		}
	}
}

/// Read, transcribe, record. Each step runs once and in this order; the upload
/// is removed afterwards by the task's [`TaskCleanup`].
#[instrument(name = "process_job", skip_all, fields(job_id = %id))]
async fn process(store: &JobStore, provider: &dyn TranscriptionProvider, id: &JobId, upload: &Upload, language: &str) {
	let completion = transcribe_upload(provider, upload, language).await;
	let label = completion.label();

	match store.update(id.as_str(), completion) {
		UpdateStatus::Applied => {
			JOBS_FINISHED.with_label_values(&[label]).inc();
			info!(status = label, "Job finished");
		}
		UpdateStatus::Missing => debug!(status = label, "Job evicted before it finished, result dropped"),
		UpdateStatus::AlreadyTerminal => warn!(status = label, "Job was already terminal, result dropped"),
	}
}

fn abandon(store: &JobStore, id: &JobId) {
	if store.update(id.as_str(), Completion::failed(ABANDONED_AT_SHUTDOWN)) == UpdateStatus::Applied {
		JOBS_FINISHED.with_label_values(&["error"]).inc();
	}
	warn!(job_id = %id, "Job abandoned at shutdown");
}

async fn transcribe_upload(provider: &dyn TranscriptionProvider, upload: &Upload, language: &str) -> Completion {
	let content = match tokio::fs::read(&upload.path).await {
		Ok(content) => content,
		Err(e) => return Completion::failed(format!("failed to read upload: {e}")),
	};

	let request = TranscriptionRequest {
		content,
		filename: upload.filename.clone(),
		language: language.to_string(),
	};

	match provider.transcribe(request).await {
		Ok(response) if response.is_success() => {
			let outcome = TranscriptOutcome::parse(&response.body);
			if !outcome.is_structured() {
				debug!("Provider reply is not structured, keeping raw body as transcript");
			}
			Completion::done(outcome.into_transcript())
		}
		Ok(response) => {
			warn!(status = response.status, "Provider rejected transcription");
			if response.body.trim().is_empty() {
				return Completion::failed(format!("provider responded with status {}", response.status));
			}
			Completion::failed(response.body)
		}
		Err(e) => {
			warn!("Provider call failed: {}", e);
			Completion::failed(e.to_string())
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{ProviderError, ProviderResponse};
	use async_trait::async_trait;
	use tempfile::TempDir;

	struct Canned(Result<ProviderResponse, fn() -> ProviderError>);

	#[async_trait]
	impl TranscriptionProvider for Canned {
		async fn transcribe(&self, _request: TranscriptionRequest) -> Result<ProviderResponse, ProviderError> {
			self.0.clone().map_err(|make| make())
		}
	}

	fn reply(status: u16, body: &str) -> Canned {
		Canned(Ok(ProviderResponse {
			status,
			body: body.to_string(),
		}))
	}

	fn spooled(dir: &TempDir) -> Upload {
		let path = dir.path().join("clip.wav");
		std::fs::write(&path, b"RIFF").unwrap();
		Upload {
			path,
			filename: "clip.wav".to_string(),
		}
	}

	#[tokio::test]
	async fn test_whitespace_rejection_falls_back_to_status() {
		let dir = TempDir::new().unwrap();

		let completion = transcribe_upload(&reply(503, "  \n"), &spooled(&dir), "pt").await;

		assert_eq!(completion, Completion::failed("provider responded with status 503"));
	}

	#[tokio::test]
	async fn test_structured_reply_is_trimmed() {
		let dir = TempDir::new().unwrap();

		let completion = transcribe_upload(&reply(200, r#"{"text":"  bom dia \n"}"#), &spooled(&dir), "pt").await;

		assert_eq!(completion, Completion::done("bom dia"));
	}

	#[tokio::test]
	async fn test_provider_error_uses_its_message() {
		let dir = TempDir::new().unwrap();

		let timeout: fn() -> ProviderError = || ProviderError::Timeout;

		let completion = transcribe_upload(&Canned(Err(timeout)), &spooled(&dir), "pt").await;

		assert_eq!(completion, Completion::failed("transcription request timed out"));
	}

	#[tokio::test]
	async fn test_missing_upload_is_a_read_failure() {
		let dir = TempDir::new().unwrap();
		let upload = Upload {
			path: dir.path().join("nope.wav"),
			filename: "nope.wav".to_string(),
		};

		let completion = transcribe_upload(&reply(200, "unused"), &upload, "pt").await;

		assert!(matches!(completion, Completion::Failed { error } if error.starts_with("failed to read upload")));
	}
}
