use std::net::SocketAddr;
use std::path::PathBuf;

use crate::backoff::DEFAULT_MAX_RETRIES;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_REGION: &str = "asia-east1";
const DEFAULT_MODEL: &str = "gemini-1.5-pro-001";
// Vertex AI rejects inline request payloads above 20 MB.
const DEFAULT_MAX_IMAGE_BYTES: u64 = 20 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error("SCRATCH_DIR {path:?} is not writable: {source}")]
    ScratchDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Runtime settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub project_id: String,
    pub region: String,
    pub model: String,
    pub access_token: Option<String>,
    pub api_base: String,
    pub max_retries: u32,
    pub max_image_bytes: u64,
    pub scratch_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_raw = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_raw.parse().map_err(|_| ConfigError::Invalid {
            name: "BIND_ADDR",
            value: bind_raw.clone(),
        })?;

        let project_id = get("VERTEX_PROJECT_ID").ok_or(ConfigError::Missing("VERTEX_PROJECT_ID"))?;
        let region = get("VERTEX_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string());
        let model = get("VERTEX_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_base = get("VERTEX_API_BASE")
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("https://{}-aiplatform.googleapis.com", region));

        let max_retries = match get("MAX_RETRIES") {
            Some(raw) => raw.trim().parse::<u32>().map_err(|_| ConfigError::Invalid {
                name: "MAX_RETRIES",
                value: raw,
            })?,
            None => DEFAULT_MAX_RETRIES,
        };

        let max_image_bytes = match get("MAX_IMAGE_BYTES") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
                name: "MAX_IMAGE_BYTES",
                value: raw,
            })?,
            None => DEFAULT_MAX_IMAGE_BYTES,
        };

        let scratch_dir = get("SCRATCH_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);

        Ok(Self {
            bind_addr,
            project_id,
            region,
            model,
            access_token: get("VERTEX_ACCESS_TOKEN"),
            api_base,
            max_retries,
            max_image_bytes,
            scratch_dir,
        })
    }

    /// Create and drop a throwaway file to prove the scratch directory is usable.
    pub fn check_scratch_dir(&self) -> Result<(), ConfigError> {
        tempfile::tempfile_in(&self.scratch_dir)
            .map(drop)
            .map_err(|source| ConfigError::ScratchDir {
                path: self.scratch_dir.clone(),
                source,
            })
    }

    pub fn generate_content_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
            self.api_base, self.project_id, self.region, self.model
        )
    }
}
