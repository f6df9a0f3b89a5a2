pub mod health;
pub mod jobs;
pub mod transcribe;

pub use health::get_health;
pub use jobs::get_jobs;
pub use transcribe::post_transcribe;
