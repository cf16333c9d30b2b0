use std::path::Path;

use tokio::io::AsyncWriteExt;
use url::Url;

const USER_AGENT: &str = "image-classifier-api/1.0";

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Invalid image URL: {0}")]
    InvalidUrl(String),
    #[error("Failed to download image from URL: {0}")]
    Status(u16),
    #[error("Image exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },
    #[error("{0}")]
    Request(String),
    #[error("Failed to write image to disk: {0}")]
    Io(#[from] std::io::Error),
}

// ── Public result type ───────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Downloaded {
    pub bytes: u64,
    pub content_type: Option<String>,
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Shared client for image downloads.
pub fn build_client() -> Result<reqwest::Client, FetchError> {
    reqwest::ClientBuilder::new()
        .connect_timeout(std::time::Duration::from_secs(5))
        .redirect(reqwest::redirect::Policy::limited(10))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| FetchError::Request(e.to_string()))
}

/// Stream `url` into `dest`, creating or truncating the file.
///
/// Only a 2xx response is accepted; anything else fails with
/// [`FetchError::Status`] and leaves `dest` untouched. Bodies larger than
/// `max_bytes` fail with [`FetchError::TooLarge`].
pub async fn download_image(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    max_bytes: u64,
) -> Result<Downloaded, FetchError> {
    let url = Url::parse(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

    let mut response = client.get(url.clone()).send().await.map_err(request_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }

    if response.content_length().is_some_and(|len| len > max_bytes) {
        return Err(FetchError::TooLarge { limit: max_bytes });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    let mut file = tokio::fs::File::create(dest).await?;
    let mut bytes = 0u64;
    while let Some(chunk) = response.chunk().await.map_err(request_error)? {
        bytes += chunk.len() as u64;
        if bytes > max_bytes {
            return Err(FetchError::TooLarge { limit: max_bytes });
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    tracing::info!("Image downloaded successfully: {} ({} bytes)", url, bytes);

    Ok(Downloaded {
        bytes,
        content_type,
    })
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn request_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Request(format!("TimeoutError: {}", e))
    } else if e.is_connect() {
        FetchError::Request(format!("ConnectError: {}", e))
    } else {
        FetchError::Request(format!("RequestError: {}", e))
    }
}
