use std::path::PathBuf;
use std::sync::Arc;

use crate::backoff::{Backoff, RetryError};
use crate::fetch::{self, Downloaded, FetchError};
use crate::models::ClassificationResult;
use crate::parse::parse_classification;
use crate::vertex::{ImageClassifier, ImagePart, ModelError};

// ── Constants ────────────────────────────────────────────────────────────────

const DEFAULT_MIME_TYPE: &str = "image/jpeg";

pub const CLASSIFICATION_PROMPT: &str = concat!(
    "Classify the image into one of the following categories: 'Clothes', 'Toys', 'Books', 'Electronics', 'Stationery' or 'Others'. ",
    "Provide a detailed and specific name for the item, including relevant details such as brand, model, or type. ",
    "Give a short description (min 30 words and max 50 words), describing the main features and appearance of the item. ",
    "Additionally, assess the quality of the item based on visual appearance. ",
    "Categorize the quality of the item into one of the following categories: 'excellent', 'good', 'fair', or 'poor'. ",
    "Return the results in the following format:\n",
    "Category: <Category>\n",
    "Item: <Item Name>\n",
    "Description: <Item Description>\n",
    "Quality: <Quality Category>",
);

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error("image_url is required")]
    MissingImageUrl,
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Classify(#[from] RetryError<ModelError>),
    #[error("Scratch file error: {0}")]
    Scratch(#[source] std::io::Error),
}

// ── Analyzer ─────────────────────────────────────────────────────────────────

/// Per-process pipeline: download, classify with backoff, parse.
pub struct Analyzer {
    http: reqwest::Client,
    classifier: Arc<dyn ImageClassifier>,
    backoff: Backoff,
    scratch_dir: PathBuf,
    max_image_bytes: u64,
}

impl Analyzer {
    pub fn new(
        http: reqwest::Client,
        classifier: Arc<dyn ImageClassifier>,
        backoff: Backoff,
        scratch_dir: PathBuf,
        max_image_bytes: u64,
    ) -> Self {
        Self {
            http,
            classifier,
            backoff,
            scratch_dir,
            max_image_bytes,
        }
    }

    pub async fn analyze(&self, image_url: Option<&str>) -> Result<ClassificationResult, AnalyzeError> {
        let image_url = match image_url {
            Some(url) if !url.is_empty() => url,
            _ => return Err(AnalyzeError::MissingImageUrl),
        };

        // Unique per request; the file is removed when `scratch` drops.
        let scratch = tempfile::Builder::new()
            .prefix("analyze-")
            .suffix(".img")
            .tempfile_in(&self.scratch_dir)
            .map_err(AnalyzeError::Scratch)?
            .into_temp_path();

        let downloaded =
            fetch::download_image(&self.http, image_url, &scratch, self.max_image_bytes).await?;
        tracing::debug!("scratch file {} holds {} bytes", scratch.display(), downloaded.bytes);
        let image = load_image(&scratch, &downloaded).await?;

        let text = self
            .backoff
            .run(|| self.classifier.generate(CLASSIFICATION_PROMPT, &image))
            .await?;

        tracing::debug!("model reply: {:?}", text);
        Ok(parse_classification(&text))
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

async fn load_image(path: &std::path::Path, downloaded: &Downloaded) -> Result<ImagePart, AnalyzeError> {
    let data = tokio::fs::read(path).await.map_err(AnalyzeError::Scratch)?;
    Ok(ImagePart {
        mime_type: mime_type(downloaded.content_type.as_deref()),
        data,
    })
}

/// `image/*` content types are passed through; anything else is sent as JPEG.
fn mime_type(content_type: Option<&str>) -> String {
    content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .filter(|ct| ct.starts_with("image/"))
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string())
}
