use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One `<model_type> <url> <filename> <sha256>` line of the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub model_type: String,
    pub url: String,
    pub filename: String,
    pub sha256: String,
}

#[derive(Debug, Default, Clone)]
pub struct Manifest {
    entries: Vec<ModelEntry>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Could not read manifest {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut entries = Vec::new();

        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let entry = parse_line(line).map_err(|message| {
                tracing::error!("Invalid line format: {}", line);
                Error::InvalidManifest {
                    line: idx + 1,
                    message,
                }
            })?;
            entries.push(entry);
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ModelEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_line(line: &str) -> std::result::Result<ModelEntry, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [model_type, url, filename, sha256] = fields.as_slice() else {
        return Err(format!(
            "each line must contain exactly four space-separated values: {}",
            line
        ));
    };

    if !is_bare_name(model_type) {
        return Err(format!("model type must be a bare folder name: {}", model_type));
    }

    let parsed = url::Url::parse(url).map_err(|e| format!("invalid url '{}': {}", url, e))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!("unsupported url scheme '{}'", parsed.scheme()));
    }

    if !is_bare_name(filename) {
        return Err(format!("filename must be a bare file name: {}", filename));
    }

    if sha256.len() != 64 || !sha256.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("sha256 must be 64 hex characters: {}", sha256));
    }

    Ok(ModelEntry {
        model_type: model_type.to_string(),
        url: url.to_string(),
        filename: filename.to_string(),
        sha256: sha256.to_ascii_lowercase(),
    })
}

/// A single path component: no separators, not `.` or `..`.
fn is_bare_name(name: &str) -> bool {
    name != "." && name != ".." && !name.contains(['/', '\\'])
}
