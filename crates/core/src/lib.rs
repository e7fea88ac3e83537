//! Core logic for the Shewit tutoring center.
//!
//! The crate holds the course data model, the bounded agent activity log,
//! quiz scoring, the `AgentGateway` seam to the hosted model, and the
//! orchestrator that folds gateway results into new course revisions.

pub mod activity;
pub mod course;
pub mod demo;
pub mod error;
pub mod gateway;
pub mod llm_gateway;
pub mod orchestrator;
pub mod prompt;
pub mod quiz;
pub mod report;
pub mod validate;

pub use activity::{ActivityLog, AgentLog, LogPayload};
pub use course::{
    AgentRole, CourseState, Module, PendingAction, Phase, QuizQuestion, SubModule, SubModuleStatus,
    View,
};
pub use error::CourseError;
pub use gateway::AgentGateway;
pub use orchestrator::Orchestrator;
