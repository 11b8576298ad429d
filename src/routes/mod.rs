//! API Routes
//!
//! All endpoints are mounted under `/api`:
//! - `POST /api/upload/` - CSV upload (multipart `file` + `name`)
//! - `GET /api/summary/` - Summary statistics of the current dataset
//! - `GET /api/equipment/` - Records of the current dataset
//! - `GET /api/equipment-types/` - Type distribution of the current dataset
//! - `GET /api/history/` - The most recent uploads
//! - `GET /api/history/{id}/` - One dataset with its records
//! - `POST /api/history/{id}/select/` - Make a dataset current
//! - `POST /api/generate-pdf/` - PDF report of the current dataset
//! - `GET /api/health` - Health check
//!
//! The current dataset is tracked per `X-Session-Id` header.

pub mod equipment;
pub mod health;
pub mod history;
pub mod report;
pub mod upload;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::apply_cors;
use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let max_upload = state.config.upload.max_bytes;
    let origins = state.config.server.cors_allowed_origins.clone();

    let api_router = Router::new()
        .merge(upload::router(state.clone()))
        .merge(equipment::router(state.clone()))
        .merge(history::router(state.clone()))
        .merge(report::router(state.clone()))
        .merge(health::router(state));

    let router = Router::new()
        .nest("/api", api_router)
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(TraceLayer::new_for_http());

    apply_cors(router, &origins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::data_registry::{DatasetStore, HISTORY_LIMIT};
    use crate::report::PdfReportRenderer;
    use crate::service::EquipmentService;
    use crate::session::{SessionRegistry, SESSION_HEADER};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    const BOUNDARY: &str = "equipment-test-boundary";

    const TWO_PUMPS: &str = "Equipment Name,Type,Flowrate,Pressure,Temperature\n\
                             Pump-1,Pump,100,5,80\n\
                             Pump-2,Pump,120,5.5,82\n";

    fn app() -> Router {
        app_with(Config::default())
    }

    fn app_with(config: Config) -> Router {
        let service =
            EquipmentService::new(DatasetStore::in_memory(), Arc::new(PdfReportRenderer::new()));
        create_router(AppState {
            config,
            service,
            sessions: SessionRegistry::default(),
        })
    }

    fn multipart_body(file_name: &str, content: &str, name: Option<&str>) -> String {
        let mut body = String::new();
        if let Some(name) = name {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\n{name}\r\n"
            ));
        }
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: text/csv\r\n\r\n{content}\r\n--{BOUNDARY}--\r\n"
        ));
        body
    }

    fn upload_request(session: &str, file_name: &str, content: &str, name: Option<&str>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/upload/")
            .header(SESSION_HEADER, session)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(file_name, content, name)))
            .unwrap()
    }

    fn request(method: &str, uri: &str, session: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(SESSION_HEADER, session)
            .body(Body::empty())
            .unwrap()
    }

    async fn json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_upload_then_query_current_dataset() {
        let app = app();

        let response = app
            .clone()
            .oneshot(upload_request("s1", "pumps.csv", TWO_PUMPS, Some("Pumps")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let dataset = json(response).await;
        assert_eq!(dataset["name"], "Pumps");
        assert_eq!(dataset["file_name"], "pumps.csv");
        assert_eq!(dataset["equipments"].as_array().unwrap().len(), 2);
        assert_eq!(dataset["summary_stats"]["total_count"], 2);

        let summary = json(app.clone().oneshot(request("GET", "/api/summary/", "s1")).await.unwrap()).await;
        assert_eq!(summary["parameter_stats"]["flowrate"]["mean"], 110.0);
        assert_eq!(summary["parameter_stats"]["flowrate"]["std"], 10.0);
        assert_eq!(summary["equipment_type_distribution"]["Pump"], 2);

        let equipment = json(app.clone().oneshot(request("GET", "/api/equipment/", "s1")).await.unwrap()).await;
        assert_eq!(equipment[0]["equipment_name"], "Pump-1");
        assert_eq!(equipment[1]["equipment_type"], "Pump");

        let types = json(
            app.clone()
                .oneshot(request("GET", "/api/equipment-types/", "s1"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(types, serde_json::json!({ "Pump": 2 }));
    }

    #[tokio::test]
    async fn test_views_are_empty_without_current_dataset() {
        let app = app();

        let summary = json(app.clone().oneshot(request("GET", "/api/summary/", "fresh")).await.unwrap()).await;
        assert_eq!(
            summary,
            serde_json::json!({
                "total_count": 0,
                "equipment_type_distribution": {},
                "parameter_stats": {}
            })
        );

        let equipment = json(app.clone().oneshot(request("GET", "/api/equipment/", "fresh")).await.unwrap()).await;
        assert_eq!(equipment, serde_json::json!([]));

        let response = app
            .oneshot(request("POST", "/api/generate-pdf/", "fresh"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(response).await["error"], "No active dataset");
    }

    #[tokio::test]
    async fn test_malformed_upload_returns_400_and_persists_nothing() {
        let app = app();
        let bad = "Equipment Name,Type,Flowrate,Temperature\nPump-1,Pump,100,80\n";

        let response = app
            .clone()
            .oneshot(upload_request("s1", "bad.csv", bad, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json(response).await;
        assert_eq!(body["row"], 1);
        assert!(body["error"].as_str().unwrap().contains("Pressure"));

        let history = json(app.oneshot(request("GET", "/api/history/", "s1")).await.unwrap()).await;
        assert_eq!(history, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_non_csv_upload_is_rejected() {
        let response = app()
            .oneshot(upload_request("s1", "pumps.txt", TWO_PUMPS, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(response).await["error"], "Invalid request: File must be a CSV");
    }

    #[tokio::test]
    async fn test_history_listing_and_detail() {
        let app = app();
        let mut ids = Vec::new();
        for i in 0..(HISTORY_LIMIT + 1) {
            let name = format!("upload-{i}");
            let response = app
                .clone()
                .oneshot(upload_request("s1", "pumps.csv", TWO_PUMPS, Some(&name)))
                .await
                .unwrap();
            ids.push(json(response).await["id"].as_str().unwrap().to_string());
        }

        let history = json(app.clone().oneshot(request("GET", "/api/history/", "s1")).await.unwrap()).await;
        let listed: Vec<&str> = history
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["id"].as_str().unwrap())
            .collect();
        let expected: Vec<&str> = ids[1..].iter().rev().map(String::as_str).collect();
        assert_eq!(listed, expected);
        assert_eq!(history[0]["summary_stats"]["total_count"], 2);

        let detail = app
            .clone()
            .oneshot(request("GET", &format!("/api/history/{}/", ids[5]), "s1"))
            .await
            .unwrap();
        assert_eq!(detail.status(), StatusCode::OK);
        let detail = json(detail).await;
        assert_eq!(detail["name"], "upload-5");
        assert_eq!(detail["equipments"].as_array().unwrap().len(), 2);

        let evicted = app
            .clone()
            .oneshot(request("GET", &format!("/api/history/{}/", ids[0]), "s1"))
            .await
            .unwrap();
        assert_eq!(evicted.status(), StatusCode::NOT_FOUND);

        let garbage = app
            .oneshot(request("GET", "/api/history/not-a-uuid/", "s1"))
            .await
            .unwrap();
        assert_eq!(garbage.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_select_is_scoped_to_session() {
        let app = app();
        let mixed = "Equipment Name,Type,Flowrate,Pressure,Temperature\nV-1,Valve,60,4,100\n";

        let first = json(
            app.clone()
                .oneshot(upload_request("alice", "pumps.csv", TWO_PUMPS, None))
                .await
                .unwrap(),
        )
        .await;
        app.clone()
            .oneshot(upload_request("alice", "valves.csv", mixed, None))
            .await
            .unwrap();

        let uri = format!("/api/history/{}/select/", first["id"].as_str().unwrap());
        let response = app.clone().oneshot(request("POST", &uri, "bob")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bob = json(app.clone().oneshot(request("GET", "/api/summary/", "bob")).await.unwrap()).await;
        assert_eq!(bob, first["summary_stats"]);

        let alice = json(app.oneshot(request("GET", "/api/equipment-types/", "alice")).await.unwrap()).await;
        assert_eq!(alice, serde_json::json!({ "Valve": 1 }));
    }

    #[tokio::test]
    async fn test_generate_pdf() {
        let app = app();
        let dataset = json(
            app.clone()
                .oneshot(upload_request("s1", "pumps.csv", TWO_PUMPS, None))
                .await
                .unwrap(),
        )
        .await;

        let response = app
            .oneshot(request("POST", "/api/generate-pdf/", "s1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/pdf"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            format!(
                "attachment; filename=\"equipment_report_{}.pdf\"",
                dataset["id"].as_str().unwrap()
            )
            .as_str()
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["storage"], "memory");
    }

    #[tokio::test]
    async fn test_oversized_upload_returns_413() {
        let mut config = Config::default();
        config.upload.max_bytes = 256;
        let app = app_with(config);

        let mut csv = String::from("Equipment Name,Type,Flowrate,Pressure,Temperature\n");
        for i in 0..200 {
            csv.push_str(&format!("Pump-{},Pump,100,5,80\n", i));
        }

        let response = app
            .clone()
            .oneshot(upload_request("s1", "big.csv", &csv, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let history = json(app.oneshot(request("GET", "/api/history/", "s1")).await.unwrap()).await;
        assert_eq!(history, serde_json::json!([]));
    }
}
