use std::env;
use std::path::Path;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("{path} does not exist and no download URL is configured")]
    Missing { path: String },
    #[error("GITHUB_TOKEN is not a valid header value")]
    InvalidToken,
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to download {url}: {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Makes sure `path` exists, fetching it from `url` when it does not.
/// `GITHUB_TOKEN`, when set, is sent as a bearer token.
pub async fn ensure_artifact(path: &Path, url: Option<&str>) -> Result<(), ArtifactError> {
    let token = env::var("GITHUB_TOKEN").ok();
    ensure_artifact_with_token(path, url, token.as_deref()).await
}

async fn ensure_artifact_with_token(
    path: &Path,
    url: Option<&str>,
    token: Option<&str>,
) -> Result<(), ArtifactError> {
    if fs::try_exists(path).await.unwrap_or(false) {
        tracing::debug!(path = %path.display(), "artifact present");
        return Ok(());
    }

    let url = url.ok_or_else(|| ArtifactError::Missing {
        path: path.display().to_string(),
    })?;
    download_file(url, path, token).await
}

async fn download_file(
    url: &str,
    path: &Path,
    token: Option<&str>,
) -> Result<(), ArtifactError> {
    tracing::info!(%url, path = %path.display(), "downloading artifact");

    let mut headers = HeaderMap::new();
    if let Some(token) = token {
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ArtifactError::InvalidToken)?;
        headers.insert(AUTHORIZATION, value);
    }
    headers.insert(ACCEPT, HeaderValue::from_static("application/octet-stream"));

    let request_error = |source| ArtifactError::Request {
        url: url.to_string(),
        source,
    };
    let response = reqwest::Client::new()
        .get(url)
        .headers(headers)
        .send()
        .await
        .map_err(request_error)?;

    if !response.status().is_success() {
        return Err(ArtifactError::Status {
            url: url.to_string(),
            status: response.status(),
        });
    }

    let bytes = response.bytes().await.map_err(request_error)?;

    let write_error = |source| ArtifactError::Write {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(write_error)?;
    }
    fs::write(path, &bytes).await.map_err(write_error)?;

    tracing::info!(path = %path.display(), bytes = bytes.len(), "artifact saved");
    Ok(())
}
