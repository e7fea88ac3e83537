//! Agent Gateway
//!
//! Each agent role's work is one request/response round trip to a hosted
//! model. This module defines the typed replies and the `AgentGateway`
//! contract the orchestrator calls; `llm_gateway` and `demo` provide the
//! implementations.

use crate::course::{AgentRole, Module, QuizQuestion};
use anyhow::Result;
use async_trait::async_trait;
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The name the supervisor uses to ask for a human checkpoint.
pub const HUMAN_APPROVAL: &str = "Human Approval";

/// Everything the supervisor sees when choosing the next agent.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorContext {
    pub subject: String,
    pub modules: Vec<Module>,
    pub current_submodule_id: Option<String>,
    pub last_action: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecisionParameters {
    /// ID of the target module if applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,
    /// ID of the target submodule if applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submodule_id: Option<String>,
}

/// The supervisor's choice of the next agent to invoke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorDecision {
    pub agent: String,
    pub reason: String,
    /// Optional context parameters for the next agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<DecisionParameters>,
    pub requires_approval: bool,
}

impl SupervisorDecision {
    /// Maps the free-form `agent` string onto a known role.
    ///
    /// Tries the exact display name, then a case-insensitive match, then a
    /// fuzzy match so that "planner" or "CurriculumPlanner" still resolve.
    pub fn role(&self) -> Option<AgentRole> {
        let wanted = self.agent.trim();
        if let Some(role) = AgentRole::ALL
            .into_iter()
            .find(|r| r.name().eq_ignore_ascii_case(wanted))
        {
            return Some(role);
        }
        if wanted.len() < 4 || self.is_human_approval() {
            return None;
        }

        let matcher = SkimMatcherV2::default().ignore_case();
        AgentRole::ALL
            .into_iter()
            .filter_map(|r| matcher.fuzzy_match(r.name(), wanted).map(|score| (score, r)))
            .max_by_key(|(score, _)| *score)
            .map(|(_, role)| role)
    }

    pub fn is_human_approval(&self) -> bool {
        self.agent.trim().eq_ignore_ascii_case(HUMAN_APPROVAL)
    }

    /// True when the student must confirm the roadmap before it is planned.
    ///
    /// Only the planner can be gated; `requiresApproval` on any other agent
    /// is ignored.
    pub fn requests_approval(&self) -> bool {
        self.is_human_approval()
            || (self.requires_approval && self.role() == Some(AgentRole::CurriculumPlanner))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PlannedSubModule {
    pub id: String,
    pub title: String,
    /// A one or two sentence summary of what the submodule teaches.
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PlannedModule {
    pub id: String,
    pub title: String,
    pub submodules: Vec<PlannedSubModule>,
}

/// The Curriculum Planner's roadmap, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CurriculumPlan {
    pub modules: Vec<PlannedModule>,
}

/// The Evaluator's critique of a drafted lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContentEvaluation {
    pub approved: bool,
    pub feedback: String,
    /// A rewritten lesson, provided when the draft was not approved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub improved_content: Option<String>,
}

/// The Assessment Generator's questions, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Assessment {
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FeedbackAnalysis {
    /// How correct the student's choice is, from 0 to 1.
    pub score: f64,
    pub tip: String,
}

/// The contract for reaching the hosted model, one method per agent role.
///
/// Any transport failure, non-JSON reply or reply of the wrong shape is an
/// `Err` for that call; implementations do not retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AgentGateway: Send + Sync {
    /// Supervisor: decides which agent acts next.
    async fn decide_next_agent(&self, context: &SupervisorContext) -> Result<SupervisorDecision>;

    /// Curriculum Planner: 3-5 modules of 2-4 submodules each.
    async fn plan_curriculum(&self, subject: &str) -> Result<CurriculumPlan>;

    /// Concept Explainer: a Markdown lesson for one submodule.
    async fn explain_concept(
        &self,
        subject: &str,
        title: &str,
        description: &str,
    ) -> Result<String>;

    /// Evaluator: critiques a lesson and optionally rewrites it.
    async fn evaluate_content(&self, content: &str) -> Result<ContentEvaluation>;

    /// Assessment Generator: three four-option questions over a lesson.
    async fn generate_assessment(&self, title: &str, content: &str) -> Result<Assessment>;

    /// Feedback Analyzer: scores one answer and suggests a tip.
    async fn analyze_feedback(
        &self,
        question: &str,
        student_answer: &str,
        correct_answer: &str,
    ) -> Result<FeedbackAnalysis>;
}
