use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;

mod analyze;
mod auth;
mod backoff;
mod config;
mod fetch;
mod models;
mod parse;
mod vertex;

#[cfg(test)]
mod test_support;

use analyze::{AnalyzeError, Analyzer};
use backoff::Backoff;
use config::Config;
use models::AnalyzeRequest;
use vertex::VertexClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::from_env()?;
    config.check_scratch_dir()?;

    let tokens = auth::token_source(config.access_token.as_deref()).await?;
    let classifier = VertexClient::new(&config, tokens)?;
    tracing::info!("using model endpoint {}", classifier.endpoint());

    let backoff = Backoff::new(config.max_retries);
    tracing::info!(
        "rate-limited model calls are attempted up to {} times",
        backoff.max_retries()
    );

    let analyzer = Analyzer::new(
        fetch::build_client()?,
        Arc::new(classifier),
        backoff,
        config.scratch_dir.clone(),
        config.max_image_bytes,
    );

    let app = router(Arc::new(analyzer));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(analyzer: Arc<Analyzer>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/analyze-image", post(analyze_endpoint))
        .layer(TraceLayer::new_for_http())
        .with_state(analyzer)
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn analyze_endpoint(
    State(analyzer): State<Arc<Analyzer>>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Response {
    // A body we cannot read as `{"image_url": "..."}` has no usable image_url.
    let image_url = match &body {
        Ok(Json(req)) => req.image_url.as_deref(),
        Err(rejection) => {
            tracing::debug!("rejected request body: {}", rejection);
            None
        }
    };

    match analyzer.analyze(image_url).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            let status = match &e {
                AnalyzeError::MissingImageUrl => StatusCode::BAD_REQUEST,
                AnalyzeError::Fetch(_) | AnalyzeError::Classify(_) | AnalyzeError::Scratch(_) => {
                    tracing::error!("image analysis failed: {}", e);
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            (status, Json(json!({"error": e.to_string()}))).into_response()
        }
    }
}
