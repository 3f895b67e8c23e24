pub mod progress;
pub mod verify;

pub use verify::{sha256_file, verify_sha256};

use crate::error::{Error, Result};
use futures_util::StreamExt;
use progress::Progress;
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, RANGE};
use reqwest::{Client, Response, StatusCode};
use std::path::Path;
use std::time::Duration;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};

const WRITE_BUFFER: usize = 1024 * 1024;

/// What a call to [`Downloader::fetch`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    AlreadyComplete,
    Resumed { bytes: u64 },
    Fresh { bytes: u64 },
}

#[derive(Clone)]
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .user_agent(concat!("modelsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::DownloadFailed(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Downloads `url` into `destination`, resuming from whatever is already on disk.
    pub async fn fetch(&self, url: &str, destination: &Path) -> Result<FetchOutcome> {
        let existing = match tokio::fs::metadata(destination).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };

        let advertised = self.content_length(url).await;
        if existing > 0 && advertised == Some(existing) {
            tracing::info!("File is already complete. No need to resume.");
            return Ok(FetchOutcome::AlreadyComplete);
        }

        let mut offset = existing;
        let mut response = self.get(url, offset).await?;
        if response.status() == StatusCode::RANGE_NOT_SATISFIABLE {
            tracing::warn!("Server rejected resume from byte {}, restarting download", existing);
            offset = 0;
            response = self.get(url, offset).await?;
        }

        let status = response.status();
        if status == StatusCode::PARTIAL_CONTENT && offset > 0 {
            let total = header_total(&response, offset);
            let file = OpenOptions::new().append(true).open(destination).await?;
            let written = stream_to(response, file, Progress::new(offset, total)).await?;
            Ok(FetchOutcome::Resumed {
                bytes: written - offset,
            })
        } else if status.is_success() {
            if offset > 0 {
                tracing::warn!("Server does not support range requests, starting from the beginning");
            }
            let total = header_u64(&response, CONTENT_LENGTH.as_str()).unwrap_or(0);
            let file = File::create(destination).await?;
            let written = stream_to(response, file, Progress::new(0, total)).await?;
            Ok(FetchOutcome::Fresh { bytes: written })
        } else {
            Err(Error::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            })
        }
    }

    async fn content_length(&self, url: &str) -> Option<u64> {
        match self.client.head(url).send().await {
            Ok(response) if response.status().is_success() => {
                header_u64(&response, CONTENT_LENGTH.as_str()).filter(|len| *len > 0)
            }
            Ok(response) => {
                tracing::debug!("HEAD {} returned {}", url, response.status());
                None
            }
            Err(e) => {
                tracing::debug!("HEAD {} failed: {}", url, e);
                None
            }
        }
    }

    async fn get(&self, url: &str, from: u64) -> Result<Response> {
        let mut request = self.client.get(url);
        if from > 0 {
            tracing::info!("Resuming download from byte {}", from);
            request = request.header(RANGE, format!("bytes={}-", from));
        }
        Ok(request.send().await?)
    }
}

// Content-Length is read from the raw header: reqwest reports the body size
// hint, which is zero for HEAD responses.
fn header_u64(response: &Response, name: &str) -> Option<u64> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Full object size of a 206 response, from `Content-Range: bytes a-b/total`.
fn header_total(response: &Response, offset: u64) -> u64 {
    response
        .headers()
        .get(CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_content_range_total)
        .or_else(|| header_u64(response, CONTENT_LENGTH.as_str()).map(|len| len + offset))
        .unwrap_or(0)
}

fn parse_content_range_total(value: &str) -> Option<u64> {
    value.rsplit('/').next()?.trim().parse().ok()
}

async fn stream_to(response: Response, file: File, mut progress: Progress) -> Result<u64> {
    let mut writer = BufWriter::with_capacity(WRITE_BUFFER, file);
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        writer.write_all(&chunk).await?;
        progress.advance(chunk.len() as u64);
    }

    writer.flush().await?;
    progress.finish();
    Ok(progress.downloaded())
}
