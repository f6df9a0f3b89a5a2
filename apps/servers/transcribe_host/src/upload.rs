use crate::error::HostError;
use axum::extract::multipart::Field;
use axum::extract::Multipart;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use transcribe_jobs::Upload;
use uuid::Uuid;

pub const AUDIO_FIELD: &str = "audio";
const DEFAULT_FILENAME: &str = "audio.wav";
const MAX_FILENAME_LEN: usize = 100;

/// Stream the first `audio` field to a fresh file under `dir`.
///
/// Returns `None` when the form has no such field. The file is removed again if
/// anything goes wrong while writing it.
pub async fn spool_audio(mut multipart: Multipart, dir: &Path, max_bytes: usize) -> Result<Option<Upload>, HostError> {
	while let Some(mut field) = multipart.next_field().await? {
		if field.name() != Some(AUDIO_FIELD) {
			continue;
		}

		let filename = field.file_name().map_or_else(|| DEFAULT_FILENAME.to_string(), sanitize_filename);
		let path = dir.join(format!("{}-{}", Uuid::new_v4(), filename));

		if let Err(e) = write_field(&mut field, &path, max_bytes).await {
			if let Err(cleanup) = tokio::fs::remove_file(&path).await {
				tracing::debug!(path = %path.display(), "No partial upload to remove: {}", cleanup);
			}
			return Err(e);
		}

		return Ok(Some(Upload { path, filename }));
	}

	Ok(None)
}

async fn write_field(field: &mut Field<'_>, path: &Path, max_bytes: usize) -> Result<(), HostError> {
	let mut file = File::create(path).await?;
	let mut written = 0usize;

	while let Some(chunk) = field.chunk().await? {
		written += chunk.len();
		if written > max_bytes {
			return Err(HostError::PayloadTooLarge {
				limit_mb: max_bytes / (1024 * 1024),
			});
		}
		file.write_all(&chunk).await?;
	}

	file.flush().await?;
	tracing::debug!(bytes = written, path = %path.display(), "Upload spooled");
	Ok(())
}

/// Keep the client's name recognisable (the provider sniffs the extension) but
/// safe to use as a path component.
pub fn sanitize_filename(name: &str) -> String {
	let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
	let cleaned: String = base
		.chars()
		.map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
		.collect();
	let cleaned = cleaned.trim_start_matches('.');

	if cleaned.is_empty() {
		return DEFAULT_FILENAME.to_string();
	}

	// ascii only by now, so byte offsets are char offsets; keep the tail for the extension
	cleaned[cleaned.len().saturating_sub(MAX_FILENAME_LEN)..].to_string()
}
