use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const CACHE_PATH_ENV: &str = "MODEL_CACHE_PATH";
pub const DEFAULT_COMFYUI_REPO: &str = "https://github.com/comfyanonymous/ComfyUI.git";
pub const LEDGER_FILE: &str = ".modelsync.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
	pub cache_path: PathBuf,
	pub manifest_path: PathBuf,
	pub comfyui_dir: PathBuf,
	pub comfyui_repo: String,
	pub ledger_path: PathBuf,
	pub interval: Duration,
}

impl Config {
	/// Builds the configuration and creates the cache directory.
	pub fn new(
		cache_path: Option<PathBuf>,
		manifest_path: PathBuf,
		comfyui_dir: PathBuf,
		comfyui_repo: String,
		interval_minutes: u64,
	) -> crate::error::Result<Self> {
		let cache_path = cache_path
			.filter(|p| !p.as_os_str().is_empty())
			.ok_or_else(|| {
				crate::error::Error::ConfigError(format!("{} environment variable not set", CACHE_PATH_ENV))
			})?;

		if interval_minutes == 0 {
			return Err(crate::error::Error::ConfigError(
				"Cycle interval must be at least one minute".to_string(),
			));
		}
		let interval_secs = interval_minutes.checked_mul(60).ok_or_else(|| {
			crate::error::Error::ConfigError(format!("Cycle interval of {} minutes is too large", interval_minutes))
		})?;

		std::fs::create_dir_all(&cache_path)?;
		let ledger_path = cache_path.join(LEDGER_FILE);

		Ok(Self {
			cache_path,
			manifest_path,
			comfyui_dir,
			comfyui_repo,
			ledger_path,
			interval: Duration::from_secs(interval_secs),
		})
	}

	pub fn interval_minutes(&self) -> u64 {
		self.interval.as_secs() / 60
	}
}
