//! Axum Handlers for the REST API
//!
//! Every intent maps onto one orchestrator step. Steps that reach the agent
//! gateway run in their own task so that a client hanging up mid-request
//! cannot strand a session with its busy flag raised; revisions published
//! while the step runs are committed to the session store as they arrive.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use shewit_core::report::ProgressReport;
use shewit_core::{CourseError, CourseState, Orchestrator};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    models::{
        AnalyzeAnswerPayload, AnswerAnalysis, ErrorResponse, ReportResponse,
        SelectSubmodulePayload, SelectViewPayload, SessionSummary, SessionView, StartCoursePayload,
        SubmitQuizPayload, SubmoduleDetail,
    },
    state::AppState,
};

pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    InternalServerError(anyhow::Error),
}

impl ApiError {
    fn session_not_found(id: Uuid) -> Self {
        ApiError::NotFound(format!("Session with id '{}' not found", id))
    }

    /// Maps a rejected orchestrator step onto a client error.
    pub fn from_course(err: CourseError) -> Self {
        let message = err.to_string();
        match err {
            CourseError::Busy
            | CourseError::NoPendingAction
            | CourseError::NoSelection
            | CourseError::NoLesson(_)
            | CourseError::NoQuiz(_)
            | CourseError::AlreadyScored(_)
            | CourseError::ViewLocked(_) => ApiError::Conflict(message),
            CourseError::UnknownSubModule { .. } | CourseError::UnknownQuestion(_) => {
                ApiError::NotFound(message)
            }
            CourseError::EmptySubject | CourseError::AnswerOutOfRange(_) | CourseError::Quiz(_) => {
                ApiError::BadRequest(message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { message })).into_response()
            }
            ApiError::Conflict(message) => {
                (StatusCode::CONFLICT, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

async fn load(state: &AppState, id: Uuid) -> Result<CourseState, ApiError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| ApiError::session_not_found(id))
}

/// Runs a gateway-bound step against the stored revision of session `id`.
///
/// The session is claimed first: the idle check and the busy revision are
/// committed under one lock, so a second step on the same session gets
/// `Busy` instead of starting its own gateway chain. The step's final
/// revision is committed even if the caller is gone by the time it lands;
/// a rejected step puts the unclaimed revision back.
async fn run_step<T, F, Fut>(
    state: &AppState,
    id: Uuid,
    step: F,
) -> Result<(CourseState, T), ApiError>
where
    T: Send + 'static,
    F: FnOnce(Orchestrator, CourseState) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(CourseState, T), CourseError>> + Send + 'static,
{
    let claimed = state
        .sessions
        .update(id, |current| {
            if current.is_thinking {
                return Err(CourseError::Busy);
            }
            Ok(CourseState {
                is_thinking: true,
                ..current.clone()
            })
        })
        .await
        .ok_or_else(|| ApiError::session_not_found(id))?
        .map_err(ApiError::from_course)?;
    let current = CourseState {
        is_thinking: false,
        ..claimed.clone()
    };

    let (state_tx, mut state_rx) = mpsc::channel::<CourseState>(8);
    let orchestrator = Orchestrator::new(state.gateway.clone(), Some(state_tx));

    let store = state.sessions.clone();
    let forwarder = tokio::spawn(async move {
        while let Some(revision) = state_rx.recv().await {
            store.commit(id, revision).await;
        }
    });

    let store = state.sessions.clone();
    let task = tokio::spawn(async move {
        // The orchestrator, and with it the sender, is dropped when the step ends.
        let result = step(orchestrator, current.clone()).await;
        if let Err(e) = forwarder.await {
            warn!(session_id = %id, error = ?e, "Revision forwarder stopped early");
        }
        match &result {
            Ok((next, _)) => {
                store.commit(id, next.clone()).await;
            }
            Err(_) => {
                store.commit_if(id, &claimed, current).await;
            }
        }
        result
    });

    task.await?.map_err(ApiError::from_course)
}

/// Runs a step that needs no gateway call and commits its revision.
///
/// The step sees the stored revision under the store's write lock, so two
/// concurrent steps on one session never act on the same revision.
async fn apply<F>(state: &AppState, id: Uuid, step: F) -> Result<Json<SessionView>, ApiError>
where
    F: FnOnce(&Orchestrator, &CourseState) -> Result<CourseState, CourseError>,
{
    let orchestrator = Orchestrator::new(state.gateway.clone(), None);
    let next = state
        .sessions
        .update(id, |current| step(&orchestrator, current))
        .await
        .ok_or_else(|| ApiError::session_not_found(id))?
        .map_err(ApiError::from_course)?;
    Ok(Json(SessionView::new(id, next)))
}

/// Create a new tutoring session with an empty course.
#[utoipa::path(
    post,
    path = "/sessions",
    responses(
        (status = 201, description = "Session created successfully", body = SessionView),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn create_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (id, course) = state.sessions.create().await;
    info!(session_id = %id, "Session created");
    (StatusCode::CREATED, Json(SessionView::new(id, course)))
}

/// List all sessions.
#[utoipa::path(
    get,
    path = "/sessions",
    responses(
        (status = 200, description = "List of sessions", body = [SessionSummary])
    )
)]
pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<Vec<SessionSummary>> {
    Json(state.sessions.list().await)
}

/// Get the current revision of a session.
#[utoipa::path(
    get,
    path = "/sessions/{id}",
    responses(
        (status = 200, description = "Session details", body = SessionView),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let course = load(&state, id).await?;
    Ok(Json(SessionView::new(id, course)))
}

/// Start a course on a subject.
///
/// The supervisor either plans the roadmap right away or leaves a proposal
/// awaiting approval.
#[utoipa::path(
    post,
    path = "/sessions/{id}/start",
    request_body = StartCoursePayload,
    responses(
        (status = 200, description = "Course started", body = SessionView),
        (status = 400, description = "Empty subject", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "Session is busy", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn start_course(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StartCoursePayload>,
) -> Result<Json<SessionView>, ApiError> {
    let (next, ()) = run_step(&state, id, move |orchestrator, current| async move {
        orchestrator
            .start_course(&current, &payload.subject)
            .await
            .map(|next| (next, ()))
    })
    .await?;
    Ok(Json(SessionView::new(id, next)))
}

/// Approve the pending roadmap proposal.
#[utoipa::path(
    post,
    path = "/sessions/{id}/approve",
    responses(
        (status = 200, description = "Roadmap generated", body = SessionView),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "Nothing to approve, or session is busy", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn approve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let (next, ()) = run_step(&state, id, |orchestrator, current| async move {
        orchestrator.approve(&current).await.map(|next| (next, ()))
    })
    .await?;
    Ok(Json(SessionView::new(id, next)))
}

/// Put the pending roadmap proposal on hold.
#[utoipa::path(
    post,
    path = "/sessions/{id}/hold",
    responses(
        (status = 200, description = "Proposal dropped", body = SessionView),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "Nothing to hold", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn hold(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    apply(&state, id, |orchestrator, current| orchestrator.hold(current)).await
}

/// Select a submodule, drafting its lesson on first visit.
#[utoipa::path(
    post,
    path = "/sessions/{id}/select",
    request_body = SelectSubmodulePayload,
    responses(
        (status = 200, description = "Submodule selected", body = SessionView),
        (status = 404, description = "Session or submodule not found", body = ErrorResponse),
        (status = 409, description = "Session is busy", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn select_submodule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SelectSubmodulePayload>,
) -> Result<Json<SessionView>, ApiError> {
    let (next, ()) = run_step(&state, id, move |orchestrator, current| async move {
        orchestrator
            .select_submodule(&current, &payload.module_id, &payload.submodule_id)
            .await
            .map(|next| (next, ()))
    })
    .await?;
    Ok(Json(SessionView::new(id, next)))
}

/// Open the quiz for the selected submodule, generating it on first use.
#[utoipa::path(
    post,
    path = "/sessions/{id}/quiz",
    responses(
        (status = 200, description = "Quiz ready", body = SessionView),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "No lesson selected, or session is busy", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn take_quiz(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let (next, ()) = run_step(&state, id, |orchestrator, current| async move {
        orchestrator.take_quiz(&current).await.map(|next| (next, ()))
    })
    .await?;
    Ok(Json(SessionView::new(id, next)))
}

/// Submit answers for the current quiz.
#[utoipa::path(
    post,
    path = "/sessions/{id}/quiz/submit",
    request_body = SubmitQuizPayload,
    responses(
        (status = 200, description = "Quiz scored", body = SessionView),
        (status = 400, description = "Wrong number of answers", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "No quiz, or already scored", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn submit_quiz(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitQuizPayload>,
) -> Result<Json<SessionView>, ApiError> {
    apply(&state, id, |orchestrator, current| {
        orchestrator.submit_quiz(current, &payload.answers)
    })
    .await
}

/// Ask the Feedback Analyzer about one answer of the current quiz.
#[utoipa::path(
    post,
    path = "/sessions/{id}/quiz/analyze",
    request_body = AnalyzeAnswerPayload,
    responses(
        (status = 200, description = "Answer analyzed", body = AnswerAnalysis),
        (status = 400, description = "Answer index out of range", body = ErrorResponse),
        (status = 404, description = "Session or question not found", body = ErrorResponse),
        (status = 409, description = "No quiz, or session is busy", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn analyze_answer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AnalyzeAnswerPayload>,
) -> Result<Json<AnswerAnalysis>, ApiError> {
    let (next, analysis) = run_step(&state, id, move |orchestrator, current| async move {
        orchestrator
            .analyze_answer(&current, &payload.question_id, payload.answer)
            .await
    })
    .await?;
    Ok(Json(AnswerAnalysis {
        session: SessionView::new(id, next),
        analysis,
    }))
}

/// Switch the visible tab.
#[utoipa::path(
    put,
    path = "/sessions/{id}/view",
    request_body = SelectViewPayload,
    responses(
        (status = 200, description = "View switched", body = SessionView),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "View requires a curriculum", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn select_view(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SelectViewPayload>,
) -> Result<Json<SessionView>, ApiError> {
    apply(&state, id, |orchestrator, current| {
        orchestrator.select_view(current, payload.view)
    })
    .await
}

/// Start over with an empty roadmap.
#[utoipa::path(
    post,
    path = "/sessions/{id}/reset",
    responses(
        (status = 200, description = "Session reset", body = SessionView),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn reset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    apply(&state, id, |orchestrator, current| Ok(orchestrator.reset(current))).await
}

/// Get one submodule with its lesson, quiz and score.
#[utoipa::path(
    get,
    path = "/sessions/{id}/submodules/{sub_id}",
    responses(
        (status = 200, description = "Submodule details", body = SubmoduleDetail),
        (status = 404, description = "Session or submodule not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID"),
        ("sub_id" = String, Path, description = "Submodule ID")
    )
)]
pub async fn get_submodule(
    State(state): State<Arc<AppState>>,
    Path((id, sub_id)): Path<(Uuid, String)>,
) -> Result<Json<SubmoduleDetail>, ApiError> {
    let course = load(&state, id).await?;
    course
        .modules
        .iter()
        .find_map(|m| {
            m.submodules
                .iter()
                .find(|s| s.id == sub_id)
                .map(|s| SubmoduleDetail {
                    module_id: m.id.clone(),
                    submodule: s.clone(),
                })
        })
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Submodule '{}' not found", sub_id)))
}

/// Get completion counts and mean scores for the session's roadmap.
#[utoipa::path(
    get,
    path = "/sessions/{id}/report",
    responses(
        (status = 200, description = "Progress report", body = ReportResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReportResponse>, ApiError> {
    let course = load(&state, id).await?;
    Ok(Json(ReportResponse {
        report: ProgressReport::from_modules(&course.modules),
        subject: course.subject,
    }))
}
