use std::net::SocketAddr;

use axum::Router;

use crate::config::Config;

/// Serve `app` on an ephemeral local port for the lifetime of the test runtime.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub fn test_config() -> Config {
    Config {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        project_id: "test-project".to_string(),
        region: "asia-east1".to_string(),
        model: "gemini-1.5-pro-001".to_string(),
        access_token: None,
        api_base: "http://127.0.0.1:9".to_string(),
        max_retries: 5,
        max_image_bytes: 20 * 1024 * 1024,
        scratch_dir: std::env::temp_dir(),
    }
}
