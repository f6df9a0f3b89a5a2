use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use transcribe_jobs::JobConfig;

const UPLOAD_SUBDIR: &str = "transcribe_host";

#[derive(Parser, Clone, Debug)]
#[command(author, version, about = "Accepts audio uploads and transcribes them in the background", long_about = None)]
pub struct Config {
	/// Use JSON formatting for tracing
	#[arg(long, env = "LOG_JSON", default_value = "false")]
	pub log_json: bool,

	/// Log filter, e.g. `info,transcribe_jobs=debug`
	#[arg(long, env = "RUST_LOG")]
	pub rust_log: Option<String>,

	/// Server host
	#[arg(long, env = "HOST", default_value = "0.0.0.0")]
	pub host: String,

	/// Server port
	#[arg(long, env = "PORT", default_value = "3000")]
	pub port: u16,

	/// Bearer token for the transcription provider
	#[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
	pub openai_api_key: String,

	/// Shared secret expected in the `x-api-key` header
	#[arg(long, env = "API_SECRET", hide_env_values = true)]
	pub api_secret: String,

	/// Largest accepted audio upload, in megabytes
	#[arg(long, env = "MAX_FILE_SIZE_MB", default_value = "25")]
	pub max_file_size_mb: usize,

	/// How long finished or abandoned jobs stay pollable, in minutes
	#[arg(long, env = "JOB_TTL_MINUTES", default_value = "60")]
	pub job_ttl_minutes: u64,

	/// Period of the expired-job sweep, in seconds
	#[arg(long, env = "REAPER_INTERVAL_SECS", default_value = "30")]
	pub reaper_interval_secs: u64,

	/// Provider model identifier
	#[arg(long, env = "TRANSCRIPTION_MODEL", default_value = "whisper-1")]
	pub transcription_model: String,

	/// Language hint sent with every transcription
	#[arg(long, env = "TRANSCRIPTION_LANGUAGE", default_value = "pt")]
	pub transcription_language: String,

	/// Provider transcription endpoint
	#[arg(long, env = "PROVIDER_URL", default_value = "https://api.openai.com/v1/audio/transcriptions")]
	pub provider_url: String,

	/// Timeout for one provider call, in seconds
	#[arg(long, env = "PROVIDER_TIMEOUT_SECS", default_value = "300")]
	pub provider_timeout_secs: u64,

	/// Requests per minute allowed per client address
	#[arg(long, env = "RATE_LIMIT_PER_MINUTE", default_value = "60")]
	pub rate_limit_per_minute: u32,

	/// Where uploads are spooled while they wait for the provider
	#[arg(long, env = "UPLOAD_DIR")]
	pub upload_dir: Option<PathBuf>,

	/// Grace period for in-flight jobs on shutdown, in seconds
	#[arg(long, env = "SHUTDOWN_TIMEOUT_SECS", default_value = "10")]
	pub shutdown_timeout_secs: u64,

	/// Probe /health on the given port and exit
	#[arg(long)]
	pub health_check: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
	#[error("{0} must not be empty")]
	Empty(&'static str),

	#[error("{0} must be greater than 0")]
	Zero(&'static str),

	#[error("reaper interval ({interval_secs}s) must be shorter than the job TTL ({ttl_secs}s)")]
	ReaperSlowerThanTtl { interval_secs: u64, ttl_secs: u64 },
}

impl Config {
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.api_secret.trim().is_empty() {
			return Err(ConfigError::Empty("API_SECRET"));
		}
		if self.openai_api_key.trim().is_empty() {
			return Err(ConfigError::Empty("OPENAI_API_KEY"));
		}
		if self.transcription_model.trim().is_empty() {
			return Err(ConfigError::Empty("TRANSCRIPTION_MODEL"));
		}

		for (name, value) in [
			("MAX_FILE_SIZE_MB", self.max_file_size_mb as u64),
			("JOB_TTL_MINUTES", self.job_ttl_minutes),
			("REAPER_INTERVAL_SECS", self.reaper_interval_secs),
			("PROVIDER_TIMEOUT_SECS", self.provider_timeout_secs),
			("RATE_LIMIT_PER_MINUTE", u64::from(self.rate_limit_per_minute)),
		] {
			if value == 0 {
				return Err(ConfigError::Zero(name));
			}
		}

		let ttl_secs = self.job_ttl().as_secs();
		if self.reaper_interval_secs >= ttl_secs {
			return Err(ConfigError::ReaperSlowerThanTtl {
				interval_secs: self.reaper_interval_secs,
				ttl_secs,
			});
		}

		Ok(())
	}

	pub fn bind_addr(&self) -> String {
		format!("{}:{}", self.host, self.port)
	}

	pub const fn max_upload_bytes(&self) -> usize {
		self.max_file_size_mb * 1024 * 1024
	}

	pub const fn job_ttl(&self) -> Duration {
		Duration::from_secs(self.job_ttl_minutes * 60)
	}

	pub const fn provider_timeout(&self) -> Duration {
		Duration::from_secs(self.provider_timeout_secs)
	}

	pub const fn shutdown_timeout(&self) -> Duration {
		Duration::from_secs(self.shutdown_timeout_secs)
	}

	pub fn upload_dir(&self) -> PathBuf {
		self.upload_dir.clone().unwrap_or_else(|| std::env::temp_dir().join(UPLOAD_SUBDIR))
	}
}

impl From<&Config> for JobConfig {
	fn from(config: &Config) -> Self {
		Self {
			ttl: config.job_ttl(),
			reaper_interval: Duration::from_secs(config.reaper_interval_secs),
			language: config.transcription_language.clone(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(extra: &[&str]) -> Config {
		let mut args = vec!["transcribe_host", "--openai-api-key", "sk-test", "--api-secret", "s3cret"];
		args.extend_from_slice(extra);
		Config::parse_from(args)
	}

	#[test]
	fn test_defaults() {
		let config = parse(&["--port", "3000", "--job-ttl-minutes", "60", "--transcription-language", "pt"]);

		assert_eq!(config.port, 3000);
		assert_eq!(config.job_ttl(), Duration::from_secs(3600));
		assert_eq!(config.transcription_language, "pt");
		assert_eq!(config.validate(), Ok(()));
	}

	#[test]
	fn test_upload_limit_in_bytes() {
		let config = parse(&["--max-file-size-mb", "2"]);
		assert_eq!(config.max_upload_bytes(), 2 * 1024 * 1024);
	}

	#[test]
	fn test_rejects_empty_secret() {
		let mut config = parse(&[]);
		config.api_secret = " ".to_string();
		assert_eq!(config.validate(), Err(ConfigError::Empty("API_SECRET")));
	}

	#[test]
	fn test_rejects_zero_ttl() {
		let config = parse(&["--job-ttl-minutes", "0"]);
		assert_eq!(config.validate(), Err(ConfigError::Zero("JOB_TTL_MINUTES")));
	}

	#[test]
	fn test_rejects_reaper_slower_than_ttl() {
		let config = parse(&["--job-ttl-minutes", "1", "--reaper-interval-secs", "90"]);
		assert_eq!(
			config.validate(),
			Err(ConfigError::ReaperSlowerThanTtl {
				interval_secs: 90,
				ttl_secs: 60
			})
		);
	}

	#[test]
	fn test_job_config_conversion() {
		let config = parse(&["--job-ttl-minutes", "5", "--reaper-interval-secs", "10", "--transcription-language", "pt"]);
		let job_config = JobConfig::from(&config);

		assert_eq!(job_config.ttl, Duration::from_secs(300));
		assert_eq!(job_config.reaper_interval, Duration::from_secs(10));
		assert_eq!(job_config.language, "pt");
	}
}
