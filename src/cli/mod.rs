use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{Config, DEFAULT_COMFYUI_REPO};

#[derive(Parser)]
#[command(name = "modelsync")]
#[command(version, about = "Keeps a ComfyUI model cache in sync with a hash-pinned manifest", long_about = None)]
pub struct Cli {
	#[command(flatten)]
	pub global: GlobalArgs,

	/// Defaults to `run` when omitted
	#[command(subcommand)]
	pub command: Option<Commands>,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
	/// Directory where model files are cached
	#[arg(long, global = true, env = "MODEL_CACHE_PATH")]
	pub cache_path: Option<PathBuf>,

	/// Manifest listing `<type> <url> <filename> <sha256>` per line
	#[arg(long, global = true, env = "MODELSYNC_MANIFEST", default_value = "models.txt")]
	pub manifest: PathBuf,

	/// ComfyUI checkout used to discover model folder names
	#[arg(long, global = true, env = "MODELSYNC_COMFYUI_DIR", default_value = "ComfyUI")]
	pub comfyui_dir: PathBuf,

	/// Repository cloned when the checkout is missing
	#[arg(long, global = true, env = "MODELSYNC_COMFYUI_REPO", default_value = DEFAULT_COMFYUI_REPO)]
	pub comfyui_repo: String,

	/// Minutes between download cycles
	#[arg(long, global = true, env = "MODELSYNC_INTERVAL_MINUTES", default_value = "30")]
	pub interval_minutes: u64,

	/// Address for the status API while running (e.g. "0.0.0.0:8080")
	#[arg(long, global = true, env = "MODELSYNC_LISTEN")]
	pub listen: Option<String>,
}

impl GlobalArgs {
	pub fn into_config(self) -> crate::error::Result<Config> {
		Config::new(
			self.cache_path,
			self.manifest,
			self.comfyui_dir,
			self.comfyui_repo,
			self.interval_minutes,
		)
	}
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
	/// Sync the cache now and again on every interval until SIGINT/SIGTERM
	Run,

	/// Run a single download cycle and exit
	Sync,

	/// Check cached files against the manifest without downloading
	Verify,

	/// List manifest entries with their cache location
	List,
}

impl Default for Commands {
	fn default() -> Self {
		Commands::Run
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn no_subcommand_parses() {
		let cli = Cli::try_parse_from(["modelsync", "--cache-path", "/tmp/models"]).unwrap();
		assert!(cli.command.is_none());
		assert_eq!(cli.global.cache_path, Some(PathBuf::from("/tmp/models")));
		assert_eq!(cli.global.manifest, PathBuf::from("models.txt"));
		assert_eq!(cli.global.comfyui_repo, DEFAULT_COMFYUI_REPO);
	}

	#[test]
	fn global_flags_are_accepted_after_subcommand() {
		let cli = Cli::try_parse_from([
			"modelsync",
			"run",
			"--listen",
			"127.0.0.1:9000",
			"--interval-minutes",
			"5",
		])
		.unwrap();

		assert_eq!(cli.global.interval_minutes, 5);
		assert_eq!(cli.global.listen.as_deref(), Some("127.0.0.1:9000"));
		assert!(matches!(cli.command, Some(Commands::Run)));
	}

	#[test]
	fn listen_address_is_read_from_env_without_subcommand() {
		std::env::set_var("MODELSYNC_LISTEN", "127.0.0.1:9999");
		let cli = Cli::try_parse_from(["modelsync", "--cache-path", "/tmp/x"]);
		std::env::remove_var("MODELSYNC_LISTEN");

		let cli = cli.unwrap();
		assert!(cli.command.is_none());
		assert!(matches!(cli.command.unwrap_or_default(), Commands::Run));
		assert_eq!(cli.global.listen.as_deref(), Some("127.0.0.1:9999"));
	}

	#[test]
	fn cli_definition_is_consistent() {
		use clap::CommandFactory;
		Cli::command().debug_assert();
	}
}
