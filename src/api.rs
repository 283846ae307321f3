//! HTTP transport over the service facade

use crate::error::{BatchError, ModelError, PredictError};
use crate::metrics::TEXT_CONTENT_TYPE;
use crate::service::{ServiceFacade, PREDICT_ENDPOINT};
use crate::types::prediction::PredictRequest;
use axum::{
    extract::{rejection::JsonRejection, MatchedPath, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};
use uuid::Uuid;

type AppState = Arc<ServiceFacade>;

/// Response header carrying the per-request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Error body returned for every non-2xx prediction response
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_index: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
}

impl From<&PredictError> for ErrorBody {
    fn from(e: &PredictError) -> Self {
        let (record_index, fields) = match e {
            PredictError::Batch(BatchError::InvalidRecord { index, source }) => {
                (Some(*index), source.fields())
            }
            _ => (None, Vec::new()),
        };

        Self {
            detail: e.to_string(),
            error: e.kind(),
            record_index,
            fields,
        }
    }
}

fn error_response(e: &PredictError) -> Response {
    let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorBody::from(e))).into_response()
}

/// Build the application router
pub fn router(facade: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/model/info", get(model_info_handler))
        .route("/metrics", get(metrics_handler))
        .route(PREDICT_ENDPOINT, post(predict_handler))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&facade),
            track_requests,
        ))
        .with_state(facade)
}

/// Assigns a request id, logs the request and tracks in-flight count.
/// `/predict` counters are recorded by the facade itself.
async fn track_requests(State(facade): State<AppState>, req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = req.method().to_string();
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let metrics = Arc::clone(facade.service_metrics());
    let _active = metrics.track_active();
    let start = Instant::now();

    info!(request_id = %request_id, method = %method, path = %endpoint, "Request started");

    let mut response = next.run(req).await;
    let duration = start.elapsed();
    let status = response.status().as_u16();

    if endpoint != PREDICT_ENDPOINT {
        metrics.record_request(&method, &endpoint, status, duration);
    }

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    info!(
        request_id = %request_id,
        method = %method,
        path = %endpoint,
        status = status,
        duration_ms = duration.as_secs_f64() * 1000.0,
        "Request completed"
    );

    response
}

/// GET / -- service index
async fn index_handler(State(facade): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "service": "Heart Disease Prediction API",
        "version": facade.version(),
        "endpoints": {
            "health": "/health",
            "ready": "/ready",
            "model_info": "/model/info",
            "metrics": "/metrics",
            "predict": PREDICT_ENDPOINT,
        }
    }))
}

/// GET /health -- 503 until the model is ready, and forever after a failed load
async fn health_handler(State(facade): State<AppState>) -> impl IntoResponse {
    let report = facade.health();
    let status = if report.status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

/// GET /ready
async fn ready_handler(State(facade): State<AppState>) -> impl IntoResponse {
    let readiness = facade.readiness();
    let status = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(readiness))
}

/// GET /model/info
async fn model_info_handler(State(facade): State<AppState>) -> Response {
    match facade.model_info() {
        Ok(info) => Json(info).into_response(),
        Err(e) => error_response(&PredictError::Model(e)),
    }
}

/// GET /metrics -- Prometheus text exposition
async fn metrics_handler(State(facade): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)],
        facade.metrics(),
    )
}

/// POST /predict
async fn predict_handler(
    State(facade): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return error_response(&facade.reject_malformed(rejection.body_text())),
    };

    let worker = Arc::clone(&facade);
    match tokio::task::spawn_blocking(move || worker.predict(&request.data)).await {
        Ok(Ok(response)) => (StatusCode::OK, Json(response)).into_response(),
        Ok(Err(e)) => error_response(&e),
        Err(e) => {
            error!(error = %e, "Prediction task aborted");
            facade.service_metrics().record_request(
                "POST",
                PREDICT_ENDPOINT,
                500,
                Duration::ZERO,
            );
            error_response(&PredictError::Model(ModelError::Inference(e.to_string())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::ServiceMetrics;
    use crate::models::handle::ModelHandle;
    use crate::testing::{record_with_age, sample_record, StubClassifier};
    use crate::types::record::FeatureName;
    use axum::body::Body;
    use serde_json::Value;
    use tower::ServiceExt;

    fn facade(loaded: bool) -> AppState {
        let handle = ModelHandle::new("models/heart.onnx", FeatureName::ALL.to_vec());
        let metrics = Arc::new(ServiceMetrics::new().unwrap());
        let facade = ServiceFacade::new(Arc::new(handle), metrics).unwrap();
        if loaded {
            facade.load_model_with(|_| Ok(StubClassifier::shared()));
        }
        Arc::new(facade)
    }

    async fn send(app: &Router, request: axum::http::Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    fn get(uri: &str) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn post_json(body: String) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method("POST")
            .uri("/predict")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    fn json_body(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test]
    async fn test_predict_single_record() {
        let app = router(facade(true));
        let body = json!({ "data": [sample_record()] }).to_string();

        let (status, bytes) = send(&app, post_json(body)).await;
        assert_eq!(status, StatusCode::OK);

        let json = json_body(&bytes);
        assert_eq!(json["predictions"].as_array().unwrap().len(), 1);
        assert_eq!(json["predictions"][0]["record_index"], 0);
        let probability = json["predictions"][0]["probability"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&probability));
        assert_eq!(json["metadata"]["count"], 1);
    }

    #[tokio::test]
    async fn test_predict_batch_in_order() {
        let app = router(facade(true));
        let body = json!({
            "data": [record_with_age(40), record_with_age(50), record_with_age(70)]
        })
        .to_string();

        let (status, bytes) = send(&app, post_json(body)).await;
        assert_eq!(status, StatusCode::OK);

        let json = json_body(&bytes);
        let indices: Vec<u64> = json["predictions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["record_index"].as_u64().unwrap())
            .collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_predict_missing_field_names_it() {
        let app = router(facade(true));
        let mut record = sample_record();
        record.as_object_mut().unwrap().remove("age");
        let body = json!({ "data": [sample_record(), record] }).to_string();

        let (status, bytes) = send(&app, post_json(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let json = json_body(&bytes);
        assert_eq!(json["error"], "missing_fields");
        assert_eq!(json["record_index"], 1);
        assert_eq!(json["fields"], json!(["age"]));
        assert!(json["detail"].as_str().unwrap().contains("age"));
    }

    #[tokio::test]
    async fn test_predict_empty_batch() {
        let app = router(facade(true));
        let (status, bytes) = send(&app, post_json(r#"{"data": []}"#.to_string())).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_body(&bytes)["error"], "empty_batch");
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let state = facade(true);
        let app = router(Arc::clone(&state));

        let (status, bytes) = send(&app, post_json("{not json".to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_body(&bytes)["error"], "malformed_body");

        let (status, _) = send(&app, post_json(r#"{"records": []}"#.to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert_eq!(
            state.service_metrics().request_count("POST", "/predict", 400),
            2
        );
    }

    #[tokio::test]
    async fn test_predict_before_load_is_unavailable() {
        let app = router(facade(false));
        let body = json!({ "data": [sample_record()] }).to_string();

        let (status, bytes) = send(&app, post_json(body)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(&bytes)["error"], "model_not_loaded");
    }

    #[tokio::test]
    async fn test_health_and_readiness_follow_model() {
        let state = facade(false);
        let app = router(Arc::clone(&state));

        let (status, bytes) = send(&app, get("/health")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(&bytes)["status"], "unhealthy");

        let (status, _) = send(&app, get("/ready")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, _) = send(&app, get("/model/info")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        state.load_model_with(|_| Ok(StubClassifier::shared()));

        let (status, bytes) = send(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        let json = json_body(&bytes);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["model_loaded"], true);
        assert_eq!(json["model_state"], "ready");

        let (status, bytes) = send(&app, get("/ready")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&bytes)["ready"], true);
    }

    #[tokio::test]
    async fn test_model_info() {
        let app = router(facade(true));
        let (status, bytes) = send(&app, get("/model/info")).await;

        assert_eq!(status, StatusCode::OK);
        let json = json_body(&bytes);
        assert_eq!(json["n_features"], 13);
        assert_eq!(json["feature_order"][0], "age");
        assert_eq!(json["feature_order"][12], "thal");
        assert_eq!(json["path"], "models/heart.onnx");
        assert!(json.get("model_path").is_none());
        assert!(json["loaded_at"].is_string());
    }

    #[tokio::test]
    async fn test_metrics_endpoint_counts_requests() {
        let app = router(facade(true));
        send(&app, get("/health")).await;
        send(&app, post_json(json!({ "data": [sample_record()] }).to_string())).await;

        let response = app.clone().oneshot(get("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            TEXT_CONTENT_TYPE
        );
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains(r#"api_requests_total{endpoint="/health",method="GET",status="200"} 1"#));
        assert!(text.contains(r#"api_requests_total{endpoint="/predict",method="POST",status="200"} 1"#));
        assert!(text.contains("predictions_total"));
    }

    #[tokio::test]
    async fn test_index_lists_endpoints() {
        let app = router(facade(true));
        let (status, bytes) = send(&app, get("/")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&bytes)["endpoints"]["predict"], "/predict");
    }
}
