use crate::{Completion, Job, JobError, JobId, JobState};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Result of a terminal update. None of these are errors for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
	Applied,
	/// Never registered, or already evicted by the reaper.
	Missing,
	AlreadyTerminal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobStoreStats {
	pub total: usize,
	pub processing: usize,
	pub done: usize,
	pub error: usize,
}

/// Registry of jobs keyed by id.
///
/// One `RwLock` guards the whole map. Every method takes the lock for a single
/// map operation and releases it before returning, so no caller can hold it
/// across I/O or an `.await`.
pub struct JobStore {
	ttl: Duration,
	jobs: RwLock<HashMap<JobId, Job>>,
}

impl JobStore {
	#[must_use]
	pub fn new(ttl: Duration) -> Self {
		Self {
			ttl,
			jobs: RwLock::new(HashMap::new()),
		}
	}

	#[must_use]
	pub const fn ttl(&self) -> Duration {
		self.ttl
	}

	/// Register `id` as `processing`, stamped with the current time.
	pub fn create(&self, id: JobId) -> Result<Job, JobError> {
		self.create_at(id, Instant::now())
	}

	pub fn create_at(&self, id: JobId, now: Instant) -> Result<Job, JobError> {
		let mut jobs = self.write();
		if jobs.contains_key(&id) {
			return Err(JobError::DuplicateId(id));
		}

		let job = Job::processing(id.clone(), now);
		jobs.insert(id, job.clone());
		Ok(job)
	}

	pub fn get(&self, id: &str) -> Option<Job> {
		self.get_at(id, Instant::now())
	}

	/// Jobs past the retention window are hidden here even if the reaper has
	/// not removed them yet. Removal stays the reaper's job.
	pub fn get_at(&self, id: &str, now: Instant) -> Option<Job> {
		let ttl = self.ttl;
		self.read().get(id).filter(|job| now.saturating_duration_since(job.created_at) <= ttl).cloned()
	}

	/// Move a `processing` job to its terminal state.
	///
	/// Evicted or unknown ids are left absent, and terminal jobs keep their
	/// first payload.
	pub fn update(&self, id: &str, completion: Completion) -> UpdateStatus {
		let mut jobs = self.write();
		let Some(job) = jobs.get_mut(id) else {
			return UpdateStatus::Missing;
		};

		if job.state.is_terminal() {
			return UpdateStatus::AlreadyTerminal;
		}

		job.state = JobState::from(completion);
		UpdateStatus::Applied
	}

	/// Remove every job older than the retention window at `now`.
	pub fn sweep(&self, now: Instant) -> usize {
		let ttl = self.ttl;
		let mut jobs = self.write();
		let before = jobs.len();
		jobs.retain(|_, job| now.saturating_duration_since(job.created_at) <= ttl);
		before - jobs.len()
	}

	pub fn len(&self) -> usize {
		self.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.read().is_empty()
	}

	pub fn stats(&self) -> JobStoreStats {
		let jobs = self.read();
		let mut stats = JobStoreStats {
			total: jobs.len(),
			..JobStoreStats::default()
		};

		for job in jobs.values() {
			match job.state {
				JobState::Processing => stats.processing += 1,
				JobState::Done { .. } => stats.done += 1,
				JobState::Error { .. } => stats.error += 1,
			}
		}

		stats
	}

	// Every critical section is a single map operation, so a panic elsewhere
	// cannot leave a half-written entry behind and the guard is safe to reuse.
	fn read(&self) -> RwLockReadGuard<'_, HashMap<JobId, Job>> {
		self.jobs.read().unwrap_or_else(PoisonError::into_inner)
	}

	fn write(&self) -> RwLockWriteGuard<'_, HashMap<JobId, Job>> {
		self.jobs.write().unwrap_or_else(PoisonError::into_inner)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;

	const TTL: Duration = Duration::from_secs(60);

	fn store_with_job() -> (JobStore, JobId, Instant) {
		let store = JobStore::new(TTL);
		let id = JobId::generate();
		let now = Instant::now();
		store.create_at(id.clone(), now).unwrap();
		(store, id, now)
	}

	#[test]
	fn test_create_starts_processing() {
		let (store, id, created) = store_with_job();

		let job = store.get(id.as_str()).unwrap();
		assert_eq!(job.state, JobState::Processing);
		assert_eq!(job.created_at, created);
		assert_eq!(store.len(), 1);
	}

	#[test]
	fn test_create_rejects_duplicate_id() {
		let (store, id, _) = store_with_job();

		let result = store.create(id.clone());

		assert!(matches!(result, Err(JobError::DuplicateId(dup)) if dup == id));
		assert_eq!(store.len(), 1);
	}

	#[test]
	fn test_get_unknown_id() {
		let store = JobStore::new(TTL);
		assert!(store.get("00000000-0000-4000-8000-000000000000").is_none());
	}

	#[test]
	fn test_get_hides_expired_job_before_sweep() {
		let (store, id, created) = store_with_job();

		assert!(store.get_at(id.as_str(), created + TTL).is_some());
		assert!(store.get_at(id.as_str(), created + TTL + Duration::from_secs(1)).is_none());
		assert_eq!(store.len(), 1);
	}

	#[test]
	fn test_update_applies_once() {
		let (store, id, _) = store_with_job();

		assert_eq!(store.update(id.as_str(), Completion::done("ola mundo")), UpdateStatus::Applied);
		assert_eq!(store.update(id.as_str(), Completion::failed("late")), UpdateStatus::AlreadyTerminal);

		let job = store.get(id.as_str()).unwrap();
		assert_eq!(
			job.state,
			JobState::Done {
				transcript: "ola mundo".to_string()
			}
		);
	}

	#[test]
	fn test_update_missing_does_not_recreate() {
		let store = JobStore::new(TTL);

		assert_eq!(store.update("gone", Completion::done("text")), UpdateStatus::Missing);
		assert!(store.get("gone").is_none());
		assert!(store.is_empty());
	}

	#[test]
	fn test_sweep_respects_ttl_boundary() {
		let (store, id, created) = store_with_job();

		assert_eq!(store.sweep(created + TTL), 0);
		assert!(store.get(id.as_str()).is_some());

		assert_eq!(store.sweep(created + TTL + Duration::from_millis(1)), 1);
		assert!(store.get(id.as_str()).is_none());
	}

	#[test]
	fn test_sweep_evicts_regardless_of_status() {
		let store = JobStore::new(TTL);
		let now = Instant::now();
		let ids: Vec<JobId> = (0..3).map(|_| JobId::generate()).collect();
		for id in &ids {
			store.create_at(id.clone(), now).unwrap();
		}
		store.update(ids[0].as_str(), Completion::done("a"));
		store.update(ids[1].as_str(), Completion::failed("b"));

		let fresh = JobId::generate();
		store.create_at(fresh.clone(), now + TTL).unwrap();

		assert_eq!(store.sweep(now + TTL + Duration::from_secs(1)), 3);
		assert_eq!(store.len(), 1);
		assert!(store.get(fresh.as_str()).is_some());
	}

	#[test]
	fn test_update_after_sweep_is_noop() {
		let (store, id, created) = store_with_job();

		store.sweep(created + TTL * 2);

		assert_eq!(store.update(id.as_str(), Completion::done("too late")), UpdateStatus::Missing);
		assert!(store.is_empty());
	}

	#[test]
	fn test_stats_counts_states() {
		let store = JobStore::new(TTL);
		let ids: Vec<JobId> = (0..4).map(|_| JobId::generate()).collect();
		for id in &ids {
			store.create(id.clone()).unwrap();
		}
		store.update(ids[0].as_str(), Completion::done(""));
		store.update(ids[1].as_str(), Completion::failed("x"));
		store.update(ids[2].as_str(), Completion::failed("y"));

		let stats = store.stats();
		assert_eq!(
			stats,
			JobStoreStats {
				total: 4,
				processing: 1,
				done: 1,
				error: 2,
			}
		);
	}

	#[test]
	fn test_concurrent_updates_and_sweeps() {
		let store = Arc::new(JobStore::new(Duration::ZERO));
		let start = Instant::now();
		let ids: Vec<JobId> = (0..200).map(|_| JobId::generate()).collect();
		for id in &ids {
			store.create_at(id.clone(), start).unwrap();
		}

		let updaters: Vec<_> = ids
			.chunks(50)
			.map(|chunk| {
				let store = Arc::clone(&store);
				let chunk = chunk.to_vec();
				std::thread::spawn(move || {
					for id in chunk {
						let status = store.update(id.as_str(), Completion::done("x"));
						assert_ne!(status, UpdateStatus::AlreadyTerminal);
					}
				})
			})
			.collect();

		let sweeper = {
			let store = Arc::clone(&store);
			std::thread::spawn(move || {
				let mut removed = 0;
				for _ in 0..10 {
					removed += store.sweep(start + Duration::from_secs(1));
				}
				removed
			})
		};

		for handle in updaters {
			handle.join().unwrap();
		}
		let removed = sweeper.join().unwrap() + store.sweep(start + Duration::from_secs(1));

		assert_eq!(removed, 200);
		assert!(store.is_empty());
	}
}
