use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Configuration error: {0}")]
	ConfigError(String),

	#[error("Invalid manifest line {line}: {message}")]
	InvalidManifest { line: usize, message: String },

	#[error("ComfyUI layout error: {0}")]
	LayoutError(String),

	#[error("Download failed: {0}")]
	DownloadFailed(String),

	#[error("Unexpected HTTP status {status} for {url}")]
	HttpStatus { url: String, status: u16 },

	#[error("Hash verification failed for downloaded file: {}", .path.display())]
	HashMismatch { path: PathBuf },

	#[error("Verification failed: {0} of the listed models are missing or corrupt")]
	VerificationFailed(usize),

	#[error("HTTP error: {0}")]
	HttpError(#[from] reqwest::Error),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),

	#[error("Serialization error: {0}")]
	SerializationError(String),
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Error::SerializationError(err.to_string())
	}
}

impl From<toml::de::Error> for Error {
	fn from(err: toml::de::Error) -> Self {
		Error::SerializationError(err.to_string())
	}
}

impl From<toml::ser::Error> for Error {
	fn from(err: toml::ser::Error) -> Self {
		Error::SerializationError(err.to_string())
	}
}

pub type Result<T> = std::result::Result<T, Error>;
