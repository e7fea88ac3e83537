//! Course Data Model
//!
//! This module defines the aggregate that every orchestrator step reads and
//! rewrites: the subject, the module/submodule roadmap, the current
//! selection, the agent activity log and the approval gate.

use crate::activity::ActivityLog;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named stage of the tutoring pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentRole {
    #[serde(rename = "Supervisor")]
    Supervisor,
    #[serde(rename = "Curriculum Planner")]
    CurriculumPlanner,
    #[serde(rename = "Concept Explainer")]
    ConceptExplainer,
    #[serde(rename = "Assessment Generator")]
    AssessmentGenerator,
    #[serde(rename = "Evaluator")]
    Evaluator,
    #[serde(rename = "Feedback Analyzer")]
    FeedbackAnalyzer,
    #[serde(rename = "Progress Tracker")]
    ProgressTracker,
}

impl AgentRole {
    pub const ALL: [AgentRole; 7] = [
        AgentRole::Supervisor,
        AgentRole::CurriculumPlanner,
        AgentRole::ConceptExplainer,
        AgentRole::AssessmentGenerator,
        AgentRole::Evaluator,
        AgentRole::FeedbackAnalyzer,
        AgentRole::ProgressTracker,
    ];

    /// The display name, which is also the name the supervisor prompt uses.
    pub fn name(&self) -> &'static str {
        match self {
            AgentRole::Supervisor => "Supervisor",
            AgentRole::CurriculumPlanner => "Curriculum Planner",
            AgentRole::ConceptExplainer => "Concept Explainer",
            AgentRole::AssessmentGenerator => "Assessment Generator",
            AgentRole::Evaluator => "Evaluator",
            AgentRole::FeedbackAnalyzer => "Feedback Analyzer",
            AgentRole::ProgressTracker => "Progress Tracker",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle of a submodule. The ordering of the variants is the only
/// direction a submodule may move in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubModuleStatus {
    #[default]
    Locked,
    Available,
    Completed,
}

/// A multiple-choice question produced by the Assessment Generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: String,
    pub question: String,
    /// Answer options, four are expected.
    pub options: Vec<String>,
    /// Index into `options` of the correct answer.
    pub correct_answer: usize,
}

/// The smallest addressable unit of the curriculum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubModule {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: SubModuleStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz: Option<Vec<QuizQuestion>>,
    /// Fraction of correct answers in `[0, 1]`, present once completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl SubModule {
    /// Creates a new, locked `SubModule` with no content.
    pub fn new(id: impl Into<String>, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            status: SubModuleStatus::Locked,
            content: None,
            quiz: None,
            score: None,
        }
    }

    /// Moves the status forward to `status`.
    ///
    /// Returns `false` and leaves the submodule untouched when `status` is
    /// not ahead of the current one.
    pub fn advance(&mut self, status: SubModuleStatus) -> bool {
        if status > self.status {
            self.status = status;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: String,
    pub title: String,
    pub submodules: Vec<SubModule>,
}

/// A proposed change held back until the student approves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAction {
    pub agent: AgentRole,
    pub action: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl PendingAction {
    /// The Curriculum Planner's proposal to (re)build the whole roadmap.
    pub fn generate_roadmap() -> Self {
        Self {
            agent: AgentRole::CurriculumPlanner,
            action: "Generate Roadmap".to_string(),
            params: serde_json::Value::Object(Default::default()),
        }
    }
}

/// Where the orchestrator currently is in the tutoring flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Planning,
    AwaitingApproval,
    RoadmapReady,
    LessonDrafting,
    LessonReady,
    QuizDrafting,
    QuizActive,
    Reporting,
}

/// The tab a client shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Roadmap,
    Lesson,
    Quiz,
    Report,
}

impl View {
    /// Every tab except the roadmap needs at least one module to show.
    pub fn requires_modules(&self) -> bool {
        !matches!(self, View::Roadmap)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Roadmap => write!(f, "roadmap"),
            View::Lesson => write!(f, "lesson"),
            View::Quiz => write!(f, "quiz"),
            View::Report => write!(f, "report"),
        }
    }
}

/// One revision of a tutoring session.
///
/// Revisions are values: orchestrator steps borrow the current revision and
/// return the next one. The approval gate is carried by `pending_action`
/// alone, so "approval required" and "pending action present" cannot drift
/// apart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseState {
    pub subject: String,
    pub modules: Vec<Module>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_module_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_sub_module_id: Option<String>,
    #[serde(default)]
    pub logs: ActivityLog,
    #[serde(default)]
    pub is_thinking: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_action: Option<PendingAction>,
    #[serde(default)]
    pub phase: Phase,
    #[serde(default)]
    pub active_view: View,
}

impl CourseState {
    pub fn requires_human_approval(&self) -> bool {
        self.pending_action.is_some()
    }

    pub fn find_module(&self, module_id: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.id == module_id)
    }

    /// Looks a submodule up by its module and its own id.
    pub fn find_submodule(&self, module_id: &str, submodule_id: &str) -> Option<&SubModule> {
        self.find_module(module_id)?
            .submodules
            .iter()
            .find(|s| s.id == submodule_id)
    }

    /// Looks a submodule up by id alone. Submodule ids are unique across the roadmap.
    pub fn submodule(&self, submodule_id: &str) -> Option<&SubModule> {
        self.modules
            .iter()
            .flat_map(|m| m.submodules.iter())
            .find(|s| s.id == submodule_id)
    }

    pub fn current_module(&self) -> Option<&Module> {
        self.find_module(self.current_module_id.as_deref()?)
    }

    pub fn current_submodule(&self) -> Option<&SubModule> {
        self.find_submodule(
            self.current_module_id.as_deref()?,
            self.current_sub_module_id.as_deref()?,
        )
    }

    /// Returns a copy of this revision with `update` applied to one submodule.
    ///
    /// Every other submodule is carried over unchanged. An unknown id yields
    /// an identical copy.
    pub fn map_submodule(&self, submodule_id: &str, update: impl FnOnce(&mut SubModule)) -> Self {
        let mut next = self.clone();
        if let Some(sub) = next
            .modules
            .iter_mut()
            .flat_map(|m| m.submodules.iter_mut())
            .find(|s| s.id == submodule_id)
        {
            update(sub);
        }
        next
    }
}
