use crate::metrics::JOBS_EVICTED;
use crate::JobStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Periodic sweep that enforces the store's retention window.
pub struct TtlReaper {
	store: Arc<JobStore>,
	period: Duration,
	cancel_token: CancellationToken,
}

impl TtlReaper {
	pub fn new(store: Arc<JobStore>, period: Duration, parent_token: &CancellationToken) -> Self {
		Self {
			store,
			period,
			cancel_token: parent_token.child_token(),
		}
	}

	/// Spawn the sweep loop. It runs until the token is cancelled.
	pub fn spawn(self) -> JoinHandle<()> {
		tokio::spawn(async move {
			let mut interval = tokio::time::interval(self.period);
			// a slow sweep delays the next one instead of queueing a burst
			interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
			info!(period_ms = self.period.as_millis(), ttl_secs = self.store.ttl().as_secs(), "TTL reaper started");

			loop {
				tokio::select! {
					_ = self.cancel_token.cancelled() => break,
					_ = interval.tick() => self.run_cycle(),
				}
			}

			info!("TTL reaper stopped");
		})
	}

	pub fn shutdown(&self) {
		self.cancel_token.cancel();
	}

	fn run_cycle(&self) {
		let removed = self.store.sweep(Instant::now());
		if removed > 0 {
			JOBS_EVICTED.inc_by(removed as u64);
			let stats = self.store.stats();
			debug!(
				removed,
				processing = stats.processing,
				done = stats.done,
				error = stats.error,
				"Evicted expired jobs"
			);
		}
	}
}
