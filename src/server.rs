//! HTTP server
//!
//! ## Endpoints
//!
//! - `POST /predict`: score one customer
//! - `GET  /health`: liveness plus loaded model summary
//!
//! Pipeline failures are reported in a 200 body as `{"error": ...}`;
//! malformed requests are rejected before scoring with a 4xx status.

use crate::config::ServerConfig;
use crate::models::scorer::ChurnScorer;
use crate::types::customer::CustomerRecord;
use crate::types::prediction::ScoreResponse;
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{HeaderValue, Request},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

/// Header carrying the per-request correlation id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the application router around a loaded scorer.
pub fn build_router(scorer: Arc<ChurnScorer>) -> Router {
    Router::new()
        .route("/predict", post(predict_handler))
        .route("/health", get(health_handler))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(scorer)
}

/// Bind and serve until Ctrl-C.
pub async fn start_server(config: &ServerConfig, scorer: Arc<ChurnScorer>) -> Result<()> {
    let addr = config.bind_addr();
    let app = build_router(scorer);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Churn scoring API ready on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Echo the client's `x-request-id` or assign a fresh UUID v4.
async fn request_id_middleware(req: Request<Body>, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut response = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// `POST /predict`
async fn predict_handler(
    State(scorer): State<Arc<ChurnScorer>>,
    payload: Result<Json<CustomerRecord>, JsonRejection>,
) -> Response {
    let Json(customer) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!(status = %rejection.status(), error = %rejection.body_text(), "Rejected request body");
            return (
                rejection.status(),
                Json(serde_json::json!({ "detail": rejection.body_text() })),
            )
                .into_response();
        }
    };

    let response = match scorer.score(&customer) {
        Ok(result) => ScoreResponse::Scored(result),
        Err(e) => {
            warn!(geography = %customer.geography, error = %e, "Scoring failed");
            ScoreResponse::Failed {
                error: e.to_string(),
            }
        }
    };

    Json(response).into_response()
}

/// `GET /health`
async fn health_handler(State(scorer): State<Arc<ChurnScorer>>) -> Response {
    Json(serde_json::json!({
        "status": "ok",
        "model": scorer.model_name(),
        "features": scorer.feature_count(),
    }))
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelsConfig;
    use crate::models::loader::ArtifactLoader;
    use crate::types::prediction::DEFAULT_THRESHOLD;
    use axum::http::{header, Method, StatusCode};
    use serde_json::{json, Value};
    use std::path::Path;
    use tower::ServiceExt;

    fn make_router() -> Router {
        let config = ModelsConfig {
            models_dir: Path::new(env!("CARGO_MANIFEST_DIR"))
                .join("tests/fixtures/model")
                .to_string_lossy()
                .into_owned(),
            ..ModelsConfig::default()
        };
        let artifacts = ArtifactLoader::new().load_all(&config).unwrap();
        let scorer = ChurnScorer::new(artifacts, DEFAULT_THRESHOLD).unwrap();
        build_router(Arc::new(scorer))
    }

    fn predict_request(body: &Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/predict")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn customer_json() -> Value {
        json!({
            "Geography": "France",
            "CreditScore": 650,
            "Gender": "Female",
            "Age": 40,
            "Tenure": 3,
            "Balance": 0.0,
            "NumOfProducts": 2,
            "HasCrCard": 1,
            "IsActiveMember": 1,
            "EstimatedSalary": 50000.0
        })
    }

    async fn body_json(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), 100_000)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_predict_success() {
        let response = make_router()
            .oneshot(predict_request(&customer_json()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json, json!({"probability": 0.5, "churn_prediction": "NO"}));
    }

    #[tokio::test]
    async fn test_predict_yes() {
        let mut body = customer_json();
        body["Geography"] = json!("Germany");

        let response = make_router().oneshot(predict_request(&body)).await.unwrap();
        let json = body_json(response).await;
        assert_eq!(json["churn_prediction"], "YES");
        assert_eq!(json["probability"], 0.8808);
    }

    #[tokio::test]
    async fn test_pipeline_error_is_200_with_error_body() {
        let mut body = customer_json();
        body["Geography"] = json!("Narnia");

        let response = make_router().oneshot(predict_request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(
            json,
            json!({"error": "Found unknown categories ['Narnia'] in column 0 during transform"})
        );
    }

    #[tokio::test]
    async fn test_missing_field_is_validation_error() {
        let mut body = customer_json();
        body.as_object_mut().unwrap().remove("Tenure");

        let response = make_router().oneshot(predict_request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let json = body_json(response).await;
        assert!(json["detail"].as_str().unwrap().contains("Tenure"));
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn test_mistyped_field_is_validation_error() {
        let mut body = customer_json();
        body["CreditScore"] = json!("high");

        let response = make_router().oneshot(predict_request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_float_for_integer_field_is_validation_error() {
        for age in [json!(40.0), json!("40")] {
            let mut body = customer_json();
            body["Age"] = age;

            let response = make_router().oneshot(predict_request(&body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
            let json = body_json(response).await;
            assert!(json["detail"].as_str().unwrap().contains("Age"));
        }
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/predict")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"Geography\": "))
            .unwrap();

        let response = make_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_content_type_rejected() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/predict")
            .body(Body::from(customer_json().to_string()))
            .unwrap();

        let response = make_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = make_router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json, json!({"status": "ok", "model": "dense", "features": 11}));
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let mut request = predict_request(&customer_json());
        request
            .headers_mut()
            .insert(REQUEST_ID_HEADER, HeaderValue::from_static("abc-123"));

        let response = make_router().oneshot(request).await.unwrap();
        assert_eq!(response.headers()[REQUEST_ID_HEADER], "abc-123");
    }

    #[tokio::test]
    async fn test_request_id_is_generated() {
        let response = make_router()
            .oneshot(predict_request(&customer_json()))
            .await
            .unwrap();

        let id = response.headers()[REQUEST_ID_HEADER].to_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/predict")
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap();

        let response = make_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
        assert!(response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
    }
}
