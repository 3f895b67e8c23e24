use crate::config::Config;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedModel {
    pub model_type: String,
    pub folder: String,
    pub filename: String,
    pub url: String,
    pub sha256: String,
    pub size: u64,
    pub path: PathBuf,
    pub verified_at: String,
}

impl CachedModel {
    pub fn key(&self) -> String {
        registry_key(&self.folder, &self.filename)
    }
}

fn staging_path(ledger: &Path) -> PathBuf {
    let mut name = ledger.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    ledger.with_file_name(name)
}

pub fn registry_key(folder: &str, filename: &str) -> String {
    format!("{}/{}", folder, filename)
}

/// Record of files the synchroniser has verified, stored next to the cache.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ModelRegistry {
    models: BTreeMap<String, CachedModel>,
}

impl ModelRegistry {
    pub fn load(config: &Config) -> Result<Self> {
        if !config.ledger_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config.ledger_path)?;
        let registry: ModelRegistry = toml::from_str(&content)?;
        Ok(registry)
    }

    /// Like [`ModelRegistry::load`], but starts over when the file is unreadable.
    pub fn load_or_default(config: &Config) -> Self {
        Self::load(config).unwrap_or_else(|e| {
            tracing::warn!(
                "Ignoring unreadable ledger {}: {}",
                config.ledger_path.display(),
                e
            );
            Self::default()
        })
    }

    /// Writes a sibling temp file and renames it over the ledger, so readers
    /// only ever see a complete file.
    pub fn save(&self, config: &Config) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        let staging = staging_path(&config.ledger_path);
        fs::write(&staging, content)?;
        fs::rename(&staging, &config.ledger_path)?;
        Ok(())
    }

    pub fn record(&mut self, model: CachedModel) {
        self.models.insert(model.key(), model);
    }

    pub fn forget(&mut self, folder: &str, filename: &str) -> Option<CachedModel> {
        self.models.remove(&registry_key(folder, filename))
    }

    pub fn get(&self, folder: &str, filename: &str) -> Option<&CachedModel> {
        self.models.get(&registry_key(folder, filename))
    }

    pub fn list_models(&self) -> Vec<&CachedModel> {
        self.models.values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_COMFYUI_REPO;

    fn config(dir: &std::path::Path) -> Config {
        Config::new(
            Some(dir.to_path_buf()),
            PathBuf::from("models.txt"),
            PathBuf::from("ComfyUI"),
            DEFAULT_COMFYUI_REPO.to_string(),
            30,
        )
        .unwrap()
    }

    fn cached(folder: &str, filename: &str) -> CachedModel {
        CachedModel {
            model_type: folder.trim_end_matches('s').to_string(),
            folder: folder.to_string(),
            filename: filename.to_string(),
            url: format!("https://example.com/{}", filename),
            sha256: "ab".repeat(32),
            size: 42,
            path: PathBuf::from(folder).join(filename),
            verified_at: "2026-01-01T00:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        let mut registry = ModelRegistry::default();
        registry.record(cached("loras", "b.safetensors"));
        registry.record(cached("checkpoints", "a.safetensors"));
        registry.save(&config).unwrap();

        let loaded = ModelRegistry::load(&config).unwrap();
        let keys: Vec<String> = loaded.list_models().iter().map(|m| m.key()).collect();
        assert_eq!(keys, ["checkpoints/a.safetensors", "loras/b.safetensors"]);
        assert_eq!(
            loaded.get("loras", "b.safetensors"),
            Some(&cached("loras", "b.safetensors"))
        );
    }

    #[test]
    fn save_replaces_ledger_without_leaving_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        fs::write(&config.ledger_path, "stale = [").unwrap();

        let mut registry = ModelRegistry::default();
        registry.record(cached("vae", "v.pt"));
        registry.save(&config).unwrap();

        assert!(!staging_path(&config.ledger_path).exists());
        let loaded = ModelRegistry::load(&config).unwrap();
        assert!(loaded.get("vae", "v.pt").is_some());

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, [crate::config::LEDGER_FILE]);
    }

    #[test]
    fn corrupt_ledger_falls_back_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        fs::write(&config.ledger_path, "this is [not toml").unwrap();

        assert!(ModelRegistry::load(&config).is_err());
        assert!(ModelRegistry::load_or_default(&config).list_models().is_empty());
    }

    #[test]
    fn forget_removes_entry() {
        let mut registry = ModelRegistry::default();
        registry.record(cached("vae", "v.pt"));

        assert!(registry.forget("vae", "v.pt").is_some());
        assert!(registry.get("vae", "v.pt").is_none());
    }
}
