//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API, WebSocket endpoint, and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        AnalyzeAnswerPayload, AnswerAnalysis, ErrorResponse, ReportResponse,
        SelectSubmodulePayload, SelectViewPayload, SessionSummary, SessionView, StartCoursePayload,
        SubmitQuizPayload, SubmoduleDetail,
    },
    state::AppState,
    ws::ws_handler,
};

use axum::{
    Router,
    routing::{get, post, put},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_session,
        handlers::list_sessions,
        handlers::get_session,
        handlers::start_course,
        handlers::approve,
        handlers::hold,
        handlers::select_submodule,
        handlers::take_quiz,
        handlers::submit_quiz,
        handlers::analyze_answer,
        handlers::select_view,
        handlers::reset,
        handlers::get_submodule,
        handlers::get_report,
    ),
    components(
        schemas(
            SessionView, SessionSummary, StartCoursePayload, SelectSubmodulePayload,
            SubmitQuizPayload, AnalyzeAnswerPayload, SelectViewPayload, AnswerAnalysis,
            SubmoduleDetail, ReportResponse, ErrorResponse
        )
    ),
    tags(
        (name = "Shewit API", description = "Multi-agent tutoring sessions")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route(
            "/sessions",
            get(handlers::list_sessions).post(handlers::create_session),
        )
        .route("/sessions/{id}", get(handlers::get_session))
        .route("/sessions/{id}/start", post(handlers::start_course))
        .route("/sessions/{id}/approve", post(handlers::approve))
        .route("/sessions/{id}/hold", post(handlers::hold))
        .route("/sessions/{id}/select", post(handlers::select_submodule))
        .route("/sessions/{id}/quiz", post(handlers::take_quiz))
        .route("/sessions/{id}/quiz/submit", post(handlers::submit_quiz))
        .route("/sessions/{id}/quiz/analyze", post(handlers::analyze_answer))
        .route("/sessions/{id}/view", put(handlers::select_view))
        .route("/sessions/{id}/reset", post(handlers::reset))
        .route(
            "/sessions/{id}/submodules/{sub_id}",
            get(handlers::get_submodule),
        )
        .route("/sessions/{id}/report", get(handlers::get_report))
        .route("/sessions/{id}/ws", get(ws_handler))
        // Apply the state ONLY to this group of routes.
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use serde_json::{Value, json};
    use shewit_core::{CourseState, demo::DemoAgentGateway};
    use tower::ServiceExt;
    use uuid::Uuid;

    fn test_app(require_approval: bool) -> (Router, Arc<AppState>) {
        let state = Arc::new(AppState::new(Arc::new(DemoAgentGateway::new(
            require_approval,
        ))));
        (create_router(state.clone()), state)
    }

    async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create(router: &Router) -> String {
        let (status, body) = send(router, Method::POST, "/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_create_and_get_session() {
        let (router, _) = test_app(false);
        let id = create(&router).await;

        let (status, body) = send(&router, Method::GET, &format!("/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"]["phase"], "idle");
        assert_eq!(body["requiresHumanApproval"], false);

        let (status, body) = send(&router, Method::GET, "/sessions", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let (router, _) = test_app(false);
        let uri = format!("/sessions/{}/start", Uuid::new_v4());

        let (status, body) = send(&router, Method::POST, &uri, Some(json!({"subject": "Algebra"}))).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["message"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_full_lesson_flow() {
        let (router, _) = test_app(false);
        let id = create(&router).await;
        let base = format!("/sessions/{id}");

        let (status, body) = send(&router, Method::POST, &format!("{base}/start"), Some(json!({"subject": "Algebra"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"]["phase"], "roadmap_ready");
        assert_eq!(body["state"]["modules"].as_array().unwrap().len(), 3);
        assert_eq!(body["state"]["isThinking"], false);

        let (status, body) = send(
            &router,
            Method::POST,
            &format!("{base}/select"),
            Some(json!({"moduleId": "m1", "submoduleId": "m1-s1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"]["activeView"], "lesson");
        assert_eq!(body["state"]["modules"][0]["submodules"][0]["status"], "available");

        let (status, body) = send(&router, Method::POST, &format!("{base}/quiz"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"]["phase"], "quiz_active");
        let quiz = body["state"]["modules"][0]["submodules"][0]["quiz"].as_array().unwrap().clone();
        assert_eq!(quiz.len(), 3);

        let answers: Vec<u64> = quiz.iter().map(|q| q["correctAnswer"].as_u64().unwrap()).collect();
        let (status, body) = send(&router, Method::POST, &format!("{base}/quiz/submit"), Some(json!({"answers": answers}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"]["activeView"], "report");
        let sub = &body["state"]["modules"][0]["submodules"][0];
        assert_eq!(sub["status"], "completed");
        approx::assert_relative_eq!(sub["score"].as_f64().unwrap(), 1.0);

        let (status, _) = send(&router, Method::POST, &format!("{base}/quiz/submit"), Some(json!({"answers": [0, 0, 0]}))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(&router, Method::GET, &format!("{base}/report"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["subject"], "Algebra");
        assert_eq!(body["report"]["completedSubmodules"], 1);
        assert_eq!(body["report"]["totalSubmodules"], 9);

        let (status, body) = send(&router, Method::GET, &format!("{base}/submodules/m1-s1"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["moduleId"], "m1");
        assert!(body["submodule"]["content"].as_str().unwrap().contains("Key Ideas"));

        let (status, _) = send(&router, Method::GET, &format!("{base}/submodules/nope"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_approval_hold_and_approve() {
        let (router, _) = test_app(true);
        let id = create(&router).await;
        let base = format!("/sessions/{id}");

        let (_, body) = send(&router, Method::POST, &format!("{base}/start"), Some(json!({"subject": "Algebra"}))).await;
        assert_eq!(body["requiresHumanApproval"], true);
        assert_eq!(body["state"]["pendingAction"]["agent"], "Curriculum Planner");
        assert!(body["state"]["modules"].as_array().unwrap().is_empty());

        let (status, body) = send(&router, Method::POST, &format!("{base}/hold"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["requiresHumanApproval"], false);
        assert_eq!(body["state"]["phase"], "idle");

        let (status, _) = send(&router, Method::POST, &format!("{base}/approve"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        send(&router, Method::POST, &format!("{base}/start"), Some(json!({"subject": "Algebra"}))).await;
        let (status, body) = send(&router, Method::POST, &format!("{base}/approve"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["requiresHumanApproval"], false);
        assert_eq!(body["state"]["modules"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_input_and_precondition_errors() {
        let (router, _) = test_app(false);
        let id = create(&router).await;
        let base = format!("/sessions/{id}");

        let (status, _) = send(&router, Method::POST, &format!("{base}/start"), Some(json!({"subject": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&router, Method::PUT, &format!("{base}/view"), Some(json!({"view": "quiz"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(&router, Method::POST, &format!("{base}/quiz"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        send(&router, Method::POST, &format!("{base}/start"), Some(json!({"subject": "Algebra"}))).await;
        let (status, body) = send(&router, Method::PUT, &format!("{base}/view"), Some(json!({"view": "report"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"]["activeView"], "report");

        let (status, _) = send(
            &router,
            Method::POST,
            &format!("{base}/select"),
            Some(json!({"moduleId": "m1", "submoduleId": "m9-s9"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_busy_session_is_rejected() {
        let (router, state) = test_app(false);
        let id = create(&router).await;
        let id = Uuid::parse_str(&id).unwrap();
        let busy = CourseState {
            is_thinking: true,
            ..Default::default()
        };
        state.sessions.commit(id, busy).await;

        let (status, body) = send(&router, Method::POST, &format!("/sessions/{id}/start"), Some(json!({"subject": "Algebra"}))).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["message"].as_str().unwrap().contains("still working"));
    }

    #[tokio::test]
    async fn test_analyze_answer_and_reset() {
        let (router, _) = test_app(false);
        let id = create(&router).await;
        let base = format!("/sessions/{id}");
        send(&router, Method::POST, &format!("{base}/start"), Some(json!({"subject": "Algebra"}))).await;
        send(&router, Method::POST, &format!("{base}/select"), Some(json!({"moduleId": "m2", "submoduleId": "m2-s1"}))).await;
        send(&router, Method::POST, &format!("{base}/quiz"), None).await;

        let (status, body) = send(
            &router,
            Method::POST,
            &format!("{base}/quiz/analyze"),
            Some(json!({"questionId": "q2", "answer": DemoAgentGateway::correct_answer(1)})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        approx::assert_relative_eq!(body["analysis"]["score"].as_f64().unwrap(), 1.0);
        assert_eq!(body["session"]["state"]["logs"][0]["agent"], "Feedback Analyzer");

        let (status, body) = send(&router, Method::POST, &format!("{base}/reset"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["state"]["modules"].as_array().unwrap().is_empty());
        assert_eq!(body["state"]["subject"], "");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_submits_score_once() {
        let (router, _) = test_app(false);
        for _ in 0..10 {
            let id = create(&router).await;
            let base = format!("/sessions/{id}");
            send(&router, Method::POST, &format!("{base}/start"), Some(json!({"subject": "Algebra"}))).await;
            send(&router, Method::POST, &format!("{base}/select"), Some(json!({"moduleId": "m1", "submoduleId": "m1-s1"}))).await;
            let (status, _) = send(&router, Method::POST, &format!("{base}/quiz"), None).await;
            assert_eq!(status, StatusCode::OK);

            let mut submits = tokio::task::JoinSet::new();
            for n in 0..16u64 {
                let router = router.clone();
                let uri = format!("{base}/quiz/submit");
                submits.spawn(async move {
                    let answers = json!({"answers": [n % 4, n % 4, n % 4]});
                    send(&router, Method::POST, &uri, Some(answers)).await.0
                });
            }
            let mut accepted = 0;
            while let Some(status) = submits.join_next().await {
                match status.unwrap() {
                    StatusCode::OK => accepted += 1,
                    other => assert_eq!(other, StatusCode::CONFLICT),
                }
            }
            assert_eq!(accepted, 1);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_starts_never_leave_session_busy() {
        let (router, _) = test_app(false);
        let id = create(&router).await;
        let base = format!("/sessions/{id}");

        let mut starts = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let router = router.clone();
            let uri = format!("{base}/start");
            starts.spawn(async move {
                send(&router, Method::POST, &uri, Some(json!({"subject": "Algebra"}))).await.0
            });
        }
        let mut accepted = 0;
        while let Some(status) = starts.join_next().await {
            match status.unwrap() {
                StatusCode::OK => accepted += 1,
                other => assert_eq!(other, StatusCode::CONFLICT),
            }
        }
        assert!(accepted >= 1);

        let (_, body) = send(&router, Method::GET, &base, None).await;
        assert_eq!(body["state"]["isThinking"], false);
        assert_eq!(body["state"]["modules"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_rejected_step_releases_the_session() {
        let (router, _) = test_app(false);
        let id = create(&router).await;
        let base = format!("/sessions/{id}");

        let (status, _) = send(&router, Method::POST, &format!("{base}/start"), Some(json!({"subject": " "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = send(&router, Method::GET, &base, None).await;
        assert_eq!(body["state"]["isThinking"], false);

        let (status, _) = send(&router, Method::POST, &format!("{base}/start"), Some(json!({"subject": "Algebra"}))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[test]
    fn test_openapi_document_lists_routes() {
        let doc = ApiDoc::openapi();
        for path in ["/sessions", "/sessions/{id}/start", "/sessions/{id}/quiz/submit", "/sessions/{id}/view"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
