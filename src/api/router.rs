//! API router.
//!
//! Returns a composable `Router` with every endpoint under `/api/`.
//!
//! Layers (outermost → innermost):
//! 1. CORS (permissive) → 2. `Cache-Control: no-store` → 3. Request log

use axum::http::{header, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the API router.
///
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn api_router(ctx: ApiContext) -> Router {
    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/process", post(endpoints::chat::process))
        .route("/history", get(endpoints::chat::history))
        .route("/reset", post(endpoints::chat::reset))
        .route("/chats/new", post(endpoints::chat::reset))
        .route("/chats/list", get(endpoints::chat::list))
        .route("/sessions/:id/turns", post(endpoints::chat::append_turn))
        .route("/appointments", get(endpoints::appointments::list))
        .route(
            "/appointments/get-specialists",
            post(endpoints::appointments::specialists),
        )
        .route(
            "/appointments/specialist-types",
            get(endpoints::appointments::specialist_types),
        )
        .route("/appointments/get-slots", post(endpoints::appointments::slots))
        .route("/appointments/book", post(endpoints::appointments::book))
        .route("/appointments/confirm", post(endpoints::appointments::confirm))
        .with_state(ctx)
        .layer(axum::middleware::from_fn(middleware::audit::log_access));

    Router::new()
        .nest("/api", routes)
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::appointment::AppointmentResolver;
    use crate::pipeline::agents::SpecialistAgentDispatch;
    use crate::pipeline::llm::MockGenerator;
    use crate::pipeline::orchestrator::ChatOrchestrator;
    use crate::pipeline::routing::{RoutingDecisionEngine, StaticDecision};
    use crate::store::{JsonAppointmentStore, JsonSessionStore, ReferenceData};

    /// Router over temp-dir stores, a fixed routing decision and a fixed reply.
    fn test_app(dir: &tempfile::TempDir, target: &str, reply: &str) -> Router {
        let sessions = Arc::new(JsonSessionStore::new(dir.path().join("sessions")).unwrap());
        let orchestrator = ChatOrchestrator::new(
            RoutingDecisionEngine::new(
                Arc::new(StaticDecision::new(target, "test routing", Some(0.8))),
                Duration::from_secs(5),
                5,
            ),
            SpecialistAgentDispatch::single(
                Arc::new(MockGenerator::new(reply)),
                Duration::from_secs(5),
                5,
            ),
            sessions,
        );
        let resolver = AppointmentResolver::new(
            Arc::new(ReferenceData::default()),
            Arc::new(JsonAppointmentStore::new(dir.path().join("appointments.json"))),
        );
        api_router(ApiContext::new(Arc::new(orchestrator), Arc::new(resolver), true))
    }

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    fn booking(email: &str) -> Value {
        json!({
            "patient_name": "Ada Lovelace",
            "patient_email": email,
            "specialist_type": "Neurologist",
            "slot_datetime": "2025-01-27T09:00:00",
            "reason": "Persistent headaches",
            "reasoning": "symptom agent"
        })
    }

    // =================================================================
    // HEALTH / LAYERS
    // =================================================================

    #[tokio::test]
    async fn health_reports_status_with_no_store_and_cors() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, "fallback", "hi");

        let request = Request::builder()
            .uri("/api/health")
            .header("Origin", "http://localhost:3000")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("Cache-Control").unwrap(), "no-store");
        assert!(response
            .headers()
            .contains_key("access-control-allow-origin"));

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["llm_configured"], true);
    }

    #[tokio::test]
    async fn not_found_for_unknown_route() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, "fallback", "hi");
        let (status, _) = call(&app, "GET", "/api/nonexistent", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    // =================================================================
    // CHAT
    // =================================================================

    #[tokio::test]
    async fn process_then_history_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(
            &dir,
            "lifestyle",
            "Aim for eight hours. You could book an appointment with a Sleep Specialist.",
        );

        let (status, json) = call(
            &app,
            "POST",
            "/api/process",
            Some(json!({"text": "How can I sleep better?", "session_id": "chat_api_1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["session_id"], "chat_api_1");
        assert_eq!(json["handler"], "lifestyle");
        assert_eq!(json["original"], "How can I sleep better?");
        assert_eq!(json["routing"]["target"], "lifestyle");
        assert_eq!(json["booking_suggested"], true);

        let (status, history) = call(&app, "GET", "/api/history?session_id=chat_api_1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history["message_count"], 1);
        assert_eq!(history["turns"][0]["handler"], "lifestyle");

        let (_, list) = call(&app, "GET", "/api/chats/list", None).await;
        assert_eq!(list["count"], 1);
        assert_eq!(list["chats"][0]["preview"], "How can I sleep better?");
    }

    #[tokio::test]
    async fn process_applies_symptom_override() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, "medication", "Please describe the dizziness.");
        let (status, json) = call(
            &app,
            "POST",
            "/api/process",
            Some(json!({"text": "I feel dizzy since starting this medication"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["handler"], "symptom");
        assert!(json["routing"]["reasoning"]
            .as_str()
            .unwrap()
            .contains("safety override"));
        assert!(json["session_id"].as_str().unwrap().starts_with("chat_"));
    }

    #[tokio::test]
    async fn process_rejects_blank_message() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, "fallback", "hi");
        let (status, json) = call(&app, "POST", "/api/process", Some(json!({"text": "   "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn history_of_unknown_session_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, "fallback", "hi");
        let (status, json) = call(&app, "GET", "/api/history?session_id=never_seen", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message_count"], 0);

        let (status, _) = call(&app, "GET", "/api/history?session_id=..%2Fescape", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn reset_replaces_previous_session() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, "fallback", "hi");
        let message = json!({"text": "hello", "session_id": "old"});
        call(&app, "POST", "/api/process", Some(message)).await;

        let (status, json) =
            call(&app, "POST", "/api/reset", Some(json!({"session_id": "old"}))).await;
        assert_eq!(status, StatusCode::OK);
        let new_id = json["session_id"].as_str().unwrap().to_string();
        assert_ne!(new_id, "old");

        let (_, old) = call(&app, "GET", "/api/history?session_id=old", None).await;
        assert_eq!(old["message_count"], 0);

        let (status, fresh) = call(&app, "POST", "/api/chats/new", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_ne!(fresh["session_id"], new_id.as_str());
    }

    #[tokio::test]
    async fn append_turn_saves_returned_turn() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, "fallback", "hi");
        let turn = serde_json::to_value(crate::models::Turn::system("q", "a", "retry")).unwrap();
        let (status, json) = call(&app, "POST", "/api/sessions/retry_1/turns", Some(turn)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message_count"], 1);
    }

    #[tokio::test]
    async fn append_turn_rejects_inconsistent_turn() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, "fallback", "hi");

        let mut turn = serde_json::to_value(crate::models::Turn::system("q", "a", "r")).unwrap();
        turn["routing"]["confidence"] = json!(7.5);
        let (status, json) = call(&app, "POST", "/api/sessions/retry_2/turns", Some(turn)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("routing.confidence"));

        let mut turn = serde_json::to_value(crate::models::Turn::system("q", "a", "r")).unwrap();
        turn["handler"] = json!("medication");
        let (status, _) = call(&app, "POST", "/api/sessions/retry_2/turns", Some(turn)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, history) = call(&app, "GET", "/api/history?session_id=retry_2", None).await;
        assert_eq!(history["message_count"], 0);
    }

    // =================================================================
    // APPOINTMENTS
    // =================================================================

    #[tokio::test]
    async fn specialists_for_condition_in_keyword_order() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, "fallback", "hi");
        let (status, json) = call(
            &app,
            "POST",
            "/api/appointments/get-specialists",
            Some(json!({"condition": "I have persistent headaches and joint pain"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json["specialist_types"],
            json!(["Neurologist", "Primary Care Physician", "Rheumatologist", "Orthopedist"])
        );
        assert_eq!(json["specialists"][0]["type"], "Neurologist");
    }

    #[tokio::test]
    async fn slots_and_specialist_types() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, "fallback", "hi");

        let (status, json) =
            call(&app, "POST", "/api/appointments/get-slots", Some(json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["specialist_type"], "Primary Care Physician");
        assert!(!json["slots"].as_array().unwrap().is_empty());

        let (status, _) = call(
            &app,
            "POST",
            "/api/appointments/get-slots",
            Some(json!({"specialist_type": "Wizard"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, types) = call(&app, "GET", "/api/appointments/specialist-types", None).await;
        assert!(types["specialists"]
            .as_array()
            .unwrap()
            .iter()
            .all(|s| s["type"] != "Emergency Medicine"));
    }

    #[tokio::test]
    async fn invalid_email_booking_rejected_without_persisting() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, "fallback", "hi");
        let (status, json) =
            call(&app, "POST", "/api/appointments/book", Some(booking("not-an-email"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"]["message"].as_str().unwrap().contains("email"));

        let (_, list) = call(&app, "GET", "/api/appointments", None).await;
        assert_eq!(list["appointments"], json!([]));
    }

    #[tokio::test]
    async fn booking_then_confirmation_turn() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, "fallback", "hi");

        let (status, first) =
            call(&app, "POST", "/api/appointments/book", Some(booking("ada@example.com"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["appointment"]["id"], "APT-0001");
        assert_eq!(first["appointment"]["status"], "confirmed");
        let (_, second) =
            call(&app, "POST", "/api/appointments/book", Some(booking("ada@example.com"))).await;
        assert_eq!(second["appointment"]["id"], "APT-0002");

        let (status, _) = call(
            &app,
            "POST",
            "/api/appointments/confirm",
            Some(json!({
                "session_id": "booked_chat",
                "message": first["message"],
                "appointment_id": "APT-0001",
                "reasoning": "symptom agent"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, history) = call(&app, "GET", "/api/history?session_id=booked_chat", None).await;
        assert_eq!(history["turns"][0]["handler"], "system");
        assert_eq!(history["turns"][0]["metadata"]["appointment_id"], "APT-0001");

        let (_, list) = call(&app, "GET", "/api/appointments", None).await;
        assert_eq!(list["appointments"].as_array().unwrap().len(), 2);
    }
}
