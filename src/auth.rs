use std::sync::Arc;

use async_trait::async_trait;

const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

#[derive(Debug, thiserror::Error)]
#[error("failed to obtain access token: {0}")]
pub struct AuthError(String);

impl AuthError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Supplies a bearer token for each model request.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<String, AuthError>;
}

/// A fixed token, used when `VERTEX_ACCESS_TOKEN` is set.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<String, AuthError> {
        Ok(self.0.clone())
    }
}

/// Application Default Credentials. The provider caches tokens and refreshes
/// them before they expire.
pub struct AdcTokenSource {
    provider: Arc<dyn gcp_auth::TokenProvider>,
}

impl AdcTokenSource {
    pub async fn discover() -> Result<Self, AuthError> {
        let provider = gcp_auth::provider()
            .await
            .map_err(|e| AuthError::new(e.to_string()))?;
        Ok(Self { provider })
    }
}

#[async_trait]
impl TokenSource for AdcTokenSource {
    async fn token(&self) -> Result<String, AuthError> {
        let token = self
            .provider
            .token(&[CLOUD_PLATFORM_SCOPE])
            .await
            .map_err(|e| AuthError::new(e.to_string()))?;
        Ok(token.as_str().to_string())
    }
}

/// Static override when configured, otherwise Application Default Credentials.
pub async fn token_source(access_token: Option<&str>) -> Result<Arc<dyn TokenSource>, AuthError> {
    match access_token {
        Some(token) => {
            tracing::info!("using VERTEX_ACCESS_TOKEN for model requests");
            Ok(Arc::new(StaticToken::new(token)))
        }
        None => {
            let source = AdcTokenSource::discover().await?;
            tracing::info!("using Application Default Credentials for model requests");
            Ok(Arc::new(source))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_configured_token_overrides_discovery() {
        let source = token_source(Some("ya29.override")).await.unwrap();
        assert_eq!(source.token().await.unwrap(), "ya29.override");
        assert_eq!(source.token().await.unwrap(), "ya29.override");
    }

    #[test]
    fn test_auth_error_message() {
        let err = AuthError::new("no credentials found");
        assert_eq!(err.to_string(), "failed to obtain access token: no credentials found");
    }
}
