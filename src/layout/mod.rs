use crate::error::{Error, Result};
use std::path::Path;
use tokio::process::Command;

/// Model folder names taken from a ComfyUI checkout's `models/` directory.
#[derive(Debug, Clone, Default)]
pub struct ComfyLayout {
    folders: Vec<String>,
}

impl ComfyLayout {
    pub fn new(mut folders: Vec<String>) -> Self {
        folders.sort();
        Self { folders }
    }

    /// Clones the repository into `dir` when absent, then reads its model folders.
    pub async fn discover(dir: &Path, repo_url: &str) -> Result<Self> {
        if !dir.exists() {
            clone_repository(repo_url, dir).await?;
        }

        let layout = Self::scan(&dir.join("models"))?;
        tracing::info!("Found model folders: {}", layout.folders.join(", "));
        Ok(layout)
    }

    fn scan(models_path: &Path) -> Result<Self> {
        if !models_path.is_dir() {
            return Err(Error::LayoutError(format!(
                "Models directory not found in ComfyUI repository: {}",
                models_path.display()
            )));
        }

        let mut folders = Vec::new();
        for entry in std::fs::read_dir(models_path)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with('.') {
                folders.push(name);
            }
        }

        Ok(Self::new(folders))
    }

    pub fn folders(&self) -> &[String] {
        &self.folders
    }

    /// Maps a manifest model type to a folder name, falling back to the plural form.
    pub fn resolve(&self, model_type: &str) -> String {
        let plural = format!("{}s", model_type);
        if !self.contains(model_type) && self.contains(&plural) {
            return plural;
        }
        model_type.to_string()
    }

    fn contains(&self, name: &str) -> bool {
        self.folders.iter().any(|f| f == name)
    }
}

async fn clone_repository(repo_url: &str, dir: &Path) -> Result<()> {
    tracing::info!("Cloning ComfyUI repository from {}...", repo_url);

    let status = Command::new("git")
        .arg("clone")
        .arg(repo_url)
        .arg(dir)
        .status()
        .await
        .map_err(|e| Error::LayoutError(format!("Failed to run git: {}", e)))?;

    if !status.success() {
        return Err(Error::LayoutError(format!(
            "git clone of {} exited with {}",
            repo_url, status
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn layout(names: &[&str]) -> ComfyLayout {
        ComfyLayout::new(names.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn resolves_singular_type_to_plural_folder() {
        let layout = layout(&["checkpoints", "loras", "vae"]);
        assert_eq!(layout.resolve("checkpoint"), "checkpoints");
        assert_eq!(layout.resolve("lora"), "loras");
    }

    #[test]
    fn exact_folder_name_wins() {
        let layout = layout(&["vae", "vaes"]);
        assert_eq!(layout.resolve("vae"), "vae");
        assert_eq!(layout.resolve("checkpoints"), "checkpoints");
    }

    #[test]
    fn unknown_type_is_kept_verbatim() {
        let layout = layout(&["checkpoints"]);
        assert_eq!(layout.resolve("upscaler"), "upscaler");
    }

    #[tokio::test]
    async fn discover_lists_visible_directories_only() {
        let dir = tempfile::tempdir().unwrap();
        let models = dir.path().join("models");
        fs::create_dir_all(models.join("loras")).unwrap();
        fs::create_dir_all(models.join("checkpoints")).unwrap();
        fs::create_dir_all(models.join(".cache")).unwrap();
        fs::write(models.join("put_models_here.txt"), b"").unwrap();

        let layout = ComfyLayout::discover(dir.path(), "unused").await.unwrap();
        assert_eq!(layout.folders(), ["checkpoints", "loras"]);
    }

    #[tokio::test]
    async fn checkout_without_models_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = ComfyLayout::discover(dir.path(), "unused").await.unwrap_err();
        assert!(matches!(err, Error::LayoutError(_)));
    }
}
