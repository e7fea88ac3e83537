//! API Models
//!
//! Request payloads and response bodies for the REST API, annotated for
//! OpenAPI generation with `utoipa`. Course types from `shewit-core` are
//! embedded as-is and documented as opaque objects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shewit_core::gateway::FeedbackAnalysis;
use shewit_core::report::ProgressReport;
use shewit_core::{CourseState, Phase, SubModule, View};
use utoipa::ToSchema;
use uuid::Uuid;

/// One session's current revision.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    #[schema(value_type = String, format = Uuid)]
    pub id: Uuid,
    /// True while a roadmap proposal waits for the student.
    pub requires_human_approval: bool,
    #[schema(value_type = Object)]
    pub state: CourseState,
}

impl SessionView {
    pub fn new(id: Uuid, state: CourseState) -> Self {
        Self {
            id,
            requires_human_approval: state.requires_human_approval(),
            state,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    #[schema(value_type = String, format = Uuid)]
    pub id: Uuid,
    pub subject: String,
    #[schema(value_type = String, example = "roadmap_ready")]
    pub phase: Phase,
    pub is_thinking: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, ToSchema)]
pub struct StartCoursePayload {
    #[schema(example = "Linear Algebra")]
    pub subject: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelectSubmodulePayload {
    #[schema(example = "m1")]
    pub module_id: String,
    #[schema(example = "m1-s1")]
    pub submodule_id: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SubmitQuizPayload {
    /// Selected option index per question, in question order.
    #[schema(example = json!([0, 2, 1]))]
    pub answers: Vec<usize>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeAnswerPayload {
    #[schema(example = "q1")]
    pub question_id: String,
    pub answer: usize,
}

#[derive(Deserialize, ToSchema)]
pub struct SelectViewPayload {
    #[schema(value_type = String, example = "quiz")]
    pub view: View,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct AnswerAnalysis {
    pub session: SessionView,
    /// Absent when the Feedback Analyzer could not be reached.
    #[schema(value_type = Object)]
    pub analysis: Option<FeedbackAnalysis>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SubmoduleDetail {
    pub module_id: String,
    #[schema(value_type = Object)]
    pub submodule: SubModule,
}

#[derive(Serialize, ToSchema)]
pub struct ReportResponse {
    pub subject: String,
    #[schema(value_type = Object)]
    pub report: ProgressReport,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub message: String,
}
