use crate::handlers;
use axum::routing::{get, post};
use axum::Router;
use perp_screener_screener::ScreenerService;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub struct ApiServer {
    service: Arc<ScreenerService>,
}

impl ApiServer {
    #[must_use]
    pub const fn new(service: Arc<ScreenerService>) -> Self {
        Self { service }
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/api/data", get(handlers::get_data))
            .route("/api/status", get(handlers::get_status))
            .route("/api/refresh", post(handlers::trigger_refresh))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.service.clone())
    }

    /// Starts the web server listening on the specified address.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind to the address or
    /// serve requests.
    pub async fn serve(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Web API listening on {}", addr);

        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use perp_screener_core::AppConfig;
    use tower::ServiceExt;

    fn offline_service() -> Arc<ScreenerService> {
        let mut config = AppConfig::default();
        config.screener.proxy_file = "definitely/not/a/proxy.txt".to_string();
        Arc::new(ScreenerService::from_config(config).unwrap())
    }

    #[tokio::test]
    async fn test_router_serves_status() {
        let server = ApiServer::new(offline_service());
        let router = server.router();

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["exists"], false);
        assert_eq!(json["row_count"], 0);
    }

    #[tokio::test]
    async fn test_router_data_404_before_first_run() {
        let server = ApiServer::new(offline_service());
        let router = server.router();

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/data")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
