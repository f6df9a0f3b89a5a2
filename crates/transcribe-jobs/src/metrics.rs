use lazy_static::lazy_static;
use prometheus::{register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter, IntCounterVec, IntGauge};

lazy_static! {
	pub static ref JOBS_SUBMITTED: IntCounter = register_int_counter!("transcribe_jobs_submitted_total", "Total number of accepted transcription jobs").expect("Failed to register JOBS_SUBMITTED");
	pub static ref JOBS_FINISHED: IntCounterVec =
		register_int_counter_vec!("transcribe_jobs_finished_total", "Transcription jobs that reached a terminal state", &["status"]).expect("Failed to register JOBS_FINISHED");
	pub static ref JOBS_EVICTED: IntCounter = register_int_counter!("transcribe_jobs_evicted_total", "Job records removed by the TTL reaper").expect("Failed to register JOBS_EVICTED");
	pub static ref JOBS_IN_FLIGHT: IntGauge = register_int_gauge!("transcribe_jobs_in_flight", "Background transcription tasks currently running").expect("Failed to register JOBS_IN_FLIGHT");
}
