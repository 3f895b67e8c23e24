use crate::config::Config;
use crate::download::{verify_sha256, Downloader, FetchOutcome};
use crate::error::{Error, Result};
use crate::layout::ComfyLayout;
use crate::manifest::{Manifest, ModelEntry};
use crate::model::{CachedModel, ModelRegistry};
use serde::Serialize;
use std::path::PathBuf;

/// A manifest entry together with its place in the cache.
#[derive(Debug, Clone)]
pub struct ResolvedEntry {
    pub entry: ModelEntry,
    pub folder: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub started_at: String,
    pub finished_at: String,
    pub verified: usize,
    pub downloaded: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Verified,
    Missing,
    Mismatch,
}

pub struct Synchronizer {
    config: Config,
    downloader: Downloader,
    registry: ModelRegistry,
}

impl Synchronizer {
    pub fn new(config: Config) -> Result<Self> {
        let registry = ModelRegistry::load_or_default(&config);
        let downloader = Downloader::new()?;
        Ok(Self {
            config,
            downloader,
            registry,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Reads the manifest and maps every entry onto the ComfyUI folder layout.
    pub async fn resolve_entries(&self) -> Result<Vec<ResolvedEntry>> {
        let layout = ComfyLayout::discover(&self.config.comfyui_dir, &self.config.comfyui_repo).await?;
        let manifest = Manifest::load(&self.config.manifest_path)?;

        Ok(manifest
            .entries()
            .iter()
            .map(|entry| {
                let folder = layout.resolve(&entry.model_type);
                let path = self.config.cache_path.join(&folder).join(&entry.filename);
                ResolvedEntry {
                    entry: entry.clone(),
                    folder,
                    path,
                }
            })
            .collect())
    }

    /// One pass over the manifest. The first entry that cannot be made valid aborts the pass.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let started_at = chrono::Utc::now().to_rfc3339();
        std::fs::create_dir_all(&self.config.cache_path)?;

        let entries = self.resolve_entries().await?;
        let mut report = CycleReport {
            started_at,
            finished_at: String::new(),
            verified: 0,
            downloaded: 0,
        };

        for resolved in &entries {
            if self.sync_entry(resolved).await? {
                report.downloaded += 1;
            } else {
                report.verified += 1;
            }
        }

        report.finished_at = chrono::Utc::now().to_rfc3339();
        Ok(report)
    }

    /// Returns whether a download was needed.
    async fn sync_entry(&mut self, resolved: &ResolvedEntry) -> Result<bool> {
        let ResolvedEntry {
            entry,
            folder,
            path,
        } = resolved;

        tokio::fs::create_dir_all(self.config.cache_path.join(folder)).await?;

        if path.exists() {
            tracing::info!("File already exists: {}", path.display());
            if verify_sha256(path, &entry.sha256).await? {
                tracing::info!("Hash verified for existing file: {}", entry.filename);
                self.remember(resolved)?;
                return Ok(false);
            }
            tracing::warn!(
                "Hash mismatch for existing file: {}, attempting to resume download",
                entry.filename
            );
        }

        tracing::info!("Downloading {} to {}", entry.url, path.display());
        match self.downloader.fetch(&entry.url, path).await? {
            FetchOutcome::AlreadyComplete => {}
            FetchOutcome::Resumed { bytes } | FetchOutcome::Fresh { bytes } => {
                tracing::debug!("Transferred {} bytes for {}", bytes, entry.filename);
            }
        }

        if !verify_sha256(path, &entry.sha256).await? {
            tokio::fs::remove_file(path).await?;
            if self.registry.forget(folder, &entry.filename).is_some() {
                self.registry.save(&self.config)?;
            }
            return Err(Error::HashMismatch { path: path.clone() });
        }

        tracing::info!("Successfully downloaded and verified: {}", entry.filename);
        self.remember(resolved)?;
        Ok(true)
    }

    fn remember(&mut self, resolved: &ResolvedEntry) -> Result<()> {
        let size = std::fs::metadata(&resolved.path)?.len();
        self.registry.record(CachedModel {
            model_type: resolved.entry.model_type.clone(),
            folder: resolved.folder.clone(),
            filename: resolved.entry.filename.clone(),
            url: resolved.entry.url.clone(),
            sha256: resolved.entry.sha256.clone(),
            size,
            path: resolved.path.clone(),
            verified_at: chrono::Utc::now().to_rfc3339(),
        });
        self.registry.save(&self.config)
    }

    /// Checks the cache against the manifest without downloading anything.
    pub async fn verify(&self) -> Result<Vec<(ResolvedEntry, EntryStatus)>> {
        let mut results = Vec::new();

        for resolved in self.resolve_entries().await? {
            let status = if !resolved.path.is_file() {
                EntryStatus::Missing
            } else if verify_sha256(&resolved.path, &resolved.entry.sha256).await? {
                EntryStatus::Verified
            } else {
                EntryStatus::Mismatch
            };
            results.push((resolved, status));
        }

        Ok(results)
    }
}
