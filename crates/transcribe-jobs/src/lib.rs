//! In-memory lifecycle for asynchronous transcription jobs.
//!
//! A [`JobManager`] registers an upload in the [`JobStore`], hands the file to a
//! [`TranscriptionProvider`] on a detached task and records exactly one terminal
//! state for it. A [`TtlReaper`] evicts records older than the retention window,
//! whatever their status.

pub mod error;
pub mod job;
pub mod manager;
pub mod metrics;
pub mod provider;
pub mod reaper;
pub mod store;

pub use error::JobError;
pub use job::{Completion, Job, JobId, JobState, Upload};
pub use manager::{JobConfig, JobManager};
pub use provider::{ProviderError, ProviderResponse, TranscriptOutcome, TranscriptionProvider, TranscriptionRequest};
pub use reaper::TtlReaper;
pub use store::{JobStore, JobStoreStats, UpdateStatus};
