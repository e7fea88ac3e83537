//! Tutoring Orchestrator
//!
//! Drives a course through its phases: start → (approval) → planning →
//! lesson drafting → quiz drafting → quiz → report. Every step borrows the
//! current revision and returns the next one; the input is never mutated.
//!
//! Calls to the gateway are issued one at a time. While a step is waiting on
//! the model, the in-flight revision (with `is_thinking` raised) is
//! published to the optional observer channel so clients can show progress.
//! A failed call never escapes as an error: the step returns the original
//! revision plus a Supervisor note and the busy flag cleared.

use crate::activity::{AgentLog, LogPayload};
use crate::course::{AgentRole, CourseState, PendingAction, Phase, SubModuleStatus, View};
use crate::error::CourseError;
use crate::gateway::{AgentGateway, FeedbackAnalysis, SupervisorContext};
use crate::quiz;
use crate::validate;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};

const WAIT_FOR_USER: &str = "Wait for user input";

pub struct Orchestrator {
    gateway: Arc<dyn AgentGateway>,
    /// Optional channel receiving every in-flight revision.
    state_tx: Option<mpsc::Sender<CourseState>>,
}

impl Orchestrator {
    pub fn new(gateway: Arc<dyn AgentGateway>, state_tx: Option<mpsc::Sender<CourseState>>) -> Self {
        Self { gateway, state_tx }
    }

    /// Asks the supervisor how to begin `subject`, then either plans the
    /// roadmap straight away or parks a roadmap proposal for approval.
    #[instrument(skip_all, fields(subject = %subject))]
    pub async fn start_course(
        &self,
        state: &CourseState,
        subject: &str,
    ) -> Result<CourseState, CourseError> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(CourseError::EmptySubject);
        }
        ensure_idle(state)?;

        let mut next = state.clone();
        next.subject = subject.to_string();
        next.is_thinking = true;
        next.logs.record(AgentLog::new(
            AgentRole::Supervisor,
            format!("Initiating Shewit Learning Protocol for \"{subject}\"."),
            "Deciding next step...",
        ));
        self.publish(&next).await;

        let context = SupervisorContext {
            subject: subject.to_string(),
            modules: state.modules.clone(),
            current_submodule_id: state.current_sub_module_id.clone(),
            last_action: "Initialize Course".to_string(),
        };
        let decision = match self.gateway.decide_next_agent(&context).await {
            Ok(decision) => decision,
            Err(e) => return Ok(recover(state, next, "Error starting course", &e)),
        };

        next.logs.record(
            AgentLog::new(
                AgentRole::Supervisor,
                decision.reason.clone(),
                format!("Invoke {}", decision.agent),
            )
            .with_result(LogPayload::Decision(decision.clone())),
        );

        if decision.requests_approval() {
            info!(agent = %decision.agent, "Roadmap proposal is waiting for approval");
            next.pending_action = Some(PendingAction::generate_roadmap());
            next.phase = Phase::AwaitingApproval;
            next.is_thinking = false;
            return Ok(next);
        }
        if decision.role() != Some(AgentRole::CurriculumPlanner) {
            warn!(agent = %decision.agent, "Supervisor did not pick the planner for a new course; planning anyway");
        }

        Ok(self.plan(state, next).await)
    }

    /// Runs the pending roadmap proposal.
    #[instrument(skip_all)]
    pub async fn approve(&self, state: &CourseState) -> Result<CourseState, CourseError> {
        ensure_idle(state)?;
        if state.pending_action.is_none() {
            return Err(CourseError::NoPendingAction);
        }
        info!("Roadmap proposal approved");
        Ok(self.plan(state, state.clone()).await)
    }

    /// Drops the pending roadmap proposal and keeps the current roadmap.
    #[instrument(skip_all)]
    pub fn hold(&self, state: &CourseState) -> Result<CourseState, CourseError> {
        ensure_idle(state)?;
        let Some(pending) = &state.pending_action else {
            return Err(CourseError::NoPendingAction);
        };
        let mut next = state.clone();
        next.logs.record(AgentLog::new(
            AgentRole::Supervisor,
            format!("Student put \"{}\" on hold.", pending.action),
            WAIT_FOR_USER,
        ));
        next.pending_action = None;
        next.phase = Phase::Idle;
        Ok(next)
    }

    /// Replaces the roadmap with a freshly planned one.
    async fn plan(&self, state: &CourseState, mut next: CourseState) -> CourseState {
        next.is_thinking = true;
        next.pending_action = None;
        next.phase = Phase::Planning;
        next.logs.record(AgentLog::new(
            AgentRole::CurriculumPlanner,
            format!("Designing curriculum for {}", next.subject),
            "Building Modules and Submodules",
        ));
        self.publish(&next).await;

        let planned = self
            .gateway
            .plan_curriculum(&next.subject)
            .await
            .and_then(|plan| Ok(validate::curriculum(plan)?));
        let modules = match planned {
            Ok(modules) => modules,
            Err(e) => return recover(state, next, "Error planning curriculum", &e),
        };

        info!(modules = modules.len(), "Curriculum defined");
        next.logs.record(
            AgentLog::new(
                AgentRole::CurriculumPlanner,
                "Curriculum defined.",
                "Modules loaded",
            )
            .with_result(LogPayload::Curriculum(modules.clone())),
        );
        next.modules = modules;
        next.current_module_id = None;
        next.current_sub_module_id = None;
        next.is_thinking = false;
        next.phase = Phase::RoadmapReady;
        next.active_view = View::Roadmap;
        next
    }

    /// Selects a submodule and makes sure it has a lesson.
    ///
    /// A submodule without content goes through the Concept Explainer and
    /// then the Evaluator; the evaluator's rewrite wins over the draft.
    /// Content is written once, so reselecting a drafted submodule only
    /// moves the selection.
    #[instrument(skip_all, fields(module_id = %module_id, submodule_id = %submodule_id))]
    pub async fn select_submodule(
        &self,
        state: &CourseState,
        module_id: &str,
        submodule_id: &str,
    ) -> Result<CourseState, CourseError> {
        ensure_idle(state)?;
        let sub = state
            .find_submodule(module_id, submodule_id)
            .ok_or_else(|| CourseError::UnknownSubModule {
                module_id: module_id.to_string(),
                submodule_id: submodule_id.to_string(),
            })?
            .clone();

        let mut next = state.clone();
        next.current_module_id = Some(module_id.to_string());
        next.current_sub_module_id = Some(submodule_id.to_string());

        if sub.content.is_some() {
            next.logs.record(AgentLog::new(
                AgentRole::Supervisor,
                format!("Student resumed submodule: {}", sub.title),
                "Open lesson",
            ));
            next.phase = Phase::LessonReady;
            next.active_view = View::Lesson;
            return Ok(next);
        }

        next.is_thinking = true;
        next.phase = Phase::LessonDrafting;
        next.logs.record(AgentLog::new(
            AgentRole::Supervisor,
            format!("Student selected submodule: {}", sub.title),
            format!("Invoking {}", AgentRole::ConceptExplainer),
        ));
        self.publish(&next).await;

        let draft = self
            .gateway
            .explain_concept(&state.subject, &sub.title, &sub.description)
            .await
            .and_then(|text| Ok(validate::lesson_text(text)?));
        let draft = match draft {
            Ok(draft) => draft,
            Err(e) => return Ok(recover(state, next, "Error drafting lesson", &e)),
        };
        next.logs.record(AgentLog::new(
            AgentRole::ConceptExplainer,
            "Drafting explanation content.",
            "Waiting for Evaluator critique...",
        ));
        self.publish(&next).await;

        let evaluation = match self.gateway.evaluate_content(&draft).await {
            Ok(evaluation) => validate::evaluation(evaluation),
            Err(e) => return Ok(recover(state, next, "Error evaluating lesson", &e)),
        };
        next.logs.record(
            AgentLog::new(
                AgentRole::Evaluator,
                evaluation.feedback.clone(),
                if evaluation.approved {
                    "Approved"
                } else {
                    "Improving content"
                },
            )
            .with_result(LogPayload::Evaluation(evaluation.clone())),
        );

        let content = evaluation.improved_content.unwrap_or(draft);
        let mut next = next.map_submodule(submodule_id, |s| {
            s.content = Some(content);
            s.advance(SubModuleStatus::Available);
        });
        next.is_thinking = false;
        next.phase = Phase::LessonReady;
        next.active_view = View::Lesson;
        Ok(next)
    }

    /// Opens the quiz for the current lesson, generating it on first use.
    #[instrument(skip_all)]
    pub async fn take_quiz(&self, state: &CourseState) -> Result<CourseState, CourseError> {
        ensure_idle(state)?;
        let sub = state.current_submodule().ok_or(CourseError::NoSelection)?;
        let Some(content) = sub.content.clone() else {
            return Err(CourseError::NoLesson(sub.id.clone()));
        };
        let (submodule_id, title) = (sub.id.clone(), sub.title.clone());

        let mut next = state.clone();
        if sub.quiz.is_some() {
            next.phase = Phase::QuizActive;
            next.active_view = View::Quiz;
            return Ok(next);
        }

        next.is_thinking = true;
        next.phase = Phase::QuizDrafting;
        next.logs.record(AgentLog::new(
            AgentRole::AssessmentGenerator,
            "Creating knowledge check questions.",
            "Analyzing lesson context...",
        ));
        self.publish(&next).await;

        let generated = self
            .gateway
            .generate_assessment(&title, &content)
            .await
            .and_then(|assessment| Ok(validate::assessment(assessment)?));
        let questions = match generated {
            Ok(questions) => questions,
            Err(e) => return Ok(recover(state, next, "Error generating assessment", &e)),
        };

        next.logs.record(
            AgentLog::new(
                AgentRole::AssessmentGenerator,
                "Assessment ready.",
                "Waiting for student response",
            )
            .with_result(LogPayload::Assessment(questions.clone())),
        );
        let mut next = next.map_submodule(&submodule_id, |s| s.quiz = Some(questions));
        next.is_thinking = false;
        next.phase = Phase::QuizActive;
        next.active_view = View::Quiz;
        Ok(next)
    }

    /// Grades the student's answers for the current quiz and completes the
    /// submodule. A submodule is scored exactly once.
    #[instrument(skip_all)]
    pub fn submit_quiz(
        &self,
        state: &CourseState,
        answers: &[usize],
    ) -> Result<CourseState, CourseError> {
        ensure_idle(state)?;
        let sub = state.current_submodule().ok_or(CourseError::NoSelection)?;
        if sub.status == SubModuleStatus::Completed {
            return Err(CourseError::AlreadyScored(sub.id.clone()));
        }
        let questions = sub
            .quiz
            .as_deref()
            .ok_or_else(|| CourseError::NoQuiz(sub.id.clone()))?;
        let outcome = quiz::grade(questions, answers)?;
        info!(
            submodule = %sub.id,
            score = outcome.score,
            correct = outcome.correct_count(),
            "Quiz scored"
        );

        let mut next = state.map_submodule(&sub.id, |s| {
            s.score = Some(outcome.score);
            s.advance(SubModuleStatus::Completed);
        });
        next.logs.record(
            AgentLog::new(
                AgentRole::FeedbackAnalyzer,
                format!("Student scored {}%", outcome.percent()),
                "Updating Progress Tracker",
            )
            .with_result(LogPayload::Score(outcome.score)),
        );
        next.phase = Phase::Reporting;
        next.active_view = View::Report;
        Ok(next)
    }

    /// Asks the Feedback Analyzer about one answer of the current quiz.
    ///
    /// Returns the analysis alongside the next revision; the analysis is
    /// `None` when the model call failed.
    #[instrument(skip_all, fields(question_id = %question_id, answer = answer))]
    pub async fn analyze_answer(
        &self,
        state: &CourseState,
        question_id: &str,
        answer: usize,
    ) -> Result<(CourseState, Option<FeedbackAnalysis>), CourseError> {
        ensure_idle(state)?;
        let sub = state.current_submodule().ok_or(CourseError::NoSelection)?;
        let question = sub
            .quiz
            .as_deref()
            .ok_or_else(|| CourseError::NoQuiz(sub.id.clone()))?
            .iter()
            .find(|q| q.id == question_id)
            .ok_or_else(|| CourseError::UnknownQuestion(question_id.to_string()))?;
        let student_answer = question
            .options
            .get(answer)
            .ok_or(CourseError::AnswerOutOfRange(answer))?;
        let correct_answer = question
            .options
            .get(question.correct_answer)
            .ok_or(CourseError::AnswerOutOfRange(question.correct_answer))?;

        let mut next = state.clone();
        next.is_thinking = true;
        next.logs.record(AgentLog::new(
            AgentRole::FeedbackAnalyzer,
            format!("Reviewing answer to: {}", question.question),
            "Analyzing student choice...",
        ));
        self.publish(&next).await;

        let analysis = self
            .gateway
            .analyze_feedback(&question.question, student_answer, correct_answer)
            .await
            .and_then(|analysis| Ok(validate::feedback(analysis)?));
        match analysis {
            Ok(analysis) => {
                next.logs.record(
                    AgentLog::new(
                        AgentRole::FeedbackAnalyzer,
                        analysis.tip.clone(),
                        format!("Answer rated {}%", (analysis.score * 100.0).round()),
                    )
                    .with_result(LogPayload::Feedback(analysis.clone())),
                );
                next.is_thinking = false;
                Ok((next, Some(analysis)))
            }
            Err(e) => Ok((recover(state, next, "Error analyzing answer", &e), None)),
        }
    }

    /// Switches the visible tab.
    pub fn select_view(&self, state: &CourseState, view: View) -> Result<CourseState, CourseError> {
        if view.requires_modules() && state.modules.is_empty() {
            return Err(CourseError::ViewLocked(view));
        }
        let mut next = state.clone();
        next.active_view = view;
        Ok(next)
    }

    /// Starts over with an empty roadmap. The activity log is kept.
    ///
    /// Allowed while a step is in flight; that step's result will land on a
    /// revision nobody is looking at anymore.
    #[instrument(skip_all)]
    pub fn reset(&self, state: &CourseState) -> CourseState {
        let mut logs = state.logs.clone();
        logs.record(AgentLog::new(
            AgentRole::Supervisor,
            "Starting a new session.",
            WAIT_FOR_USER,
        ));
        CourseState {
            logs,
            ..Default::default()
        }
    }

    async fn publish(&self, revision: &CourseState) {
        if let Some(tx) = &self.state_tx {
            if tx.send(revision.clone()).await.is_err() {
                warn!("Failed to publish course revision: receiver dropped.");
            }
        }
    }
}

fn ensure_idle(state: &CourseState) -> Result<(), CourseError> {
    if state.is_thinking {
        return Err(CourseError::Busy);
    }
    Ok(())
}

/// The revision a failed step degrades to: the step's starting revision,
/// the log entries the attempt wrote, and one Supervisor note.
fn recover(
    state: &CourseState,
    attempt: CourseState,
    thought: &str,
    error: &anyhow::Error,
) -> CourseState {
    error!(error = ?error, "{thought}");
    let mut revision = state.clone();
    revision.logs = attempt.logs;
    revision.logs.record(AgentLog::new(
        AgentRole::Supervisor,
        format!("{thought}: {error}"),
        WAIT_FOR_USER,
    ));
    revision.is_thinking = false;
    revision
}
