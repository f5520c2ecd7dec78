//! Source acquisition: resolves the CLI input to a local file.
//!
//! Local paths are used in place. `http://` and `https://` URLs are streamed
//! into the scratch workspace under a sanitized file name.

use crate::config::FetchConfig;
use futures::StreamExt;
use passforge_av::Workspace;
use reqwest::{Client, StatusCode, Url};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

/// Acquisition failures. Any of these aborts the run before encoding starts.
#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    #[error("invalid source URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP error {status} fetching {url}")]
    HttpStatus { url: String, status: StatusCode },

    #[error("transport error fetching {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("source file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("I/O error writing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Workspace(#[from] passforge_av::Error),
}

/// What the user pointed us at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    Local(PathBuf),
    Remote(String),
}

impl SourceRef {
    pub fn parse(input: &str) -> Self {
        let lower = input.trim_start().to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            SourceRef::Remote(input.trim().to_string())
        } else {
            SourceRef::Local(PathBuf::from(input))
        }
    }
}

/// Derive the local file name for a remote source.
///
/// The last path segment is percent-decoded and split at its final dot. The
/// base name keeps only ASCII letters and digits. The extension is kept as-is
/// but must itself be ASCII alphanumeric.
pub fn sanitized_file_name(url: &Url) -> Result<String, AcquireError> {
    let invalid = |reason: &str| AcquireError::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| invalid("URL has no file name"))?;

    let decoded = urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string());

    let (stem, extension) = decoded
        .rsplit_once('.')
        .filter(|(_, ext)| !ext.is_empty())
        .ok_or_else(|| invalid("file name has no extension"))?;
    if !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(invalid("file extension is not alphanumeric"));
    }

    let clean: String = stem.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    if clean.is_empty() {
        return Err(invalid("file name has no alphanumeric characters"));
    }

    Ok(format!("{clean}.{extension}"))
}

/// Resolves inputs to local files, downloading remote ones.
pub struct Acquirer {
    client: Client,
    workspace: Workspace,
}

impl Acquirer {
    pub fn new(workspace: Workspace, fetch: &FetchConfig) -> Self {
        let client = Client::builder()
            .connect_timeout(fetch.connect_timeout())
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Self { client, workspace }
    }

    /// Resolve `input` to a local path.
    pub async fn acquire(&self, input: &str) -> Result<PathBuf, AcquireError> {
        match SourceRef::parse(input) {
            SourceRef::Local(path) => {
                if !path.is_file() {
                    error!("Source file not found: {:?}", path);
                    return Err(AcquireError::SourceNotFound(path));
                }
                Ok(path)
            }
            SourceRef::Remote(url) => self.fetch(&url).await,
        }
    }

    /// Stream `url` into the workspace and return the downloaded path.
    pub async fn fetch(&self, url: &str) -> Result<PathBuf, AcquireError> {
        let parsed = Url::parse(url).map_err(|e| AcquireError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let file_name = sanitized_file_name(&parsed)?;
        Workspace::create(self.workspace.root())?;

        let dest = self.workspace.download_path(&file_name);
        let partial = self.workspace.partial_path(&file_name);

        info!("Start to fetch URI: {} => {:?}", url, dest);

        match self.download(parsed, &partial).await {
            Ok(bytes) => {
                let path = self.workspace.finalize_download(&partial, &dest)?;
                info!("Finished fetch URI: {} => {:?} ({} bytes)", url, path, bytes);
                Ok(path)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                match &e {
                    AcquireError::HttpStatus { status, .. } => {
                        error!("HTTP Error: {} {}", status.as_u16(), url)
                    }
                    AcquireError::Transport { source, .. } => {
                        error!("URL Error: {} {}", source, url)
                    }
                    other => error!("Fetch failed: {}", other),
                }
                Err(e)
            }
        }
    }

    async fn download(&self, url: Url, partial: &Path) -> Result<u64, AcquireError> {
        let url_str = url.to_string();
        let transport = |source| AcquireError::Transport {
            url: url_str.clone(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AcquireError::HttpStatus {
                url: url_str.clone(),
                status,
            });
        }

        let io_err = |source| AcquireError::Io {
            path: partial.to_path_buf(),
            source,
        };

        let mut file = tokio::fs::File::create(partial).await.map_err(io_err)?;
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(transport)?;
            file.write_all(&chunk).await.map_err(io_err)?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(io_err)?;
        Ok(written)
    }
}
