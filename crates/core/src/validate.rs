//! Response Validation
//!
//! Model replies are checked before they touch a course revision. The
//! policy is to fail closed on anything the rest of the system relies on
//! (ids, answer indices, score range) and to only warn about counts that
//! differ from what the prompts ask for.

use crate::course::{Module, QuizQuestion, SubModule};
use crate::gateway::{Assessment, ContentEvaluation, CurriculumPlan, FeedbackAnalysis};
use std::collections::HashSet;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("The curriculum has no modules")]
    EmptyCurriculum,
    #[error("Module '{0}' has no submodules")]
    EmptyModule(String),
    #[error("A {0} is missing its id")]
    MissingId(&'static str),
    #[error("A {0} is missing its title")]
    MissingTitle(&'static str),
    #[error("Duplicate {kind} id '{id}'")]
    DuplicateId { kind: &'static str, id: String },
    #[error("The assessment has no questions")]
    EmptyAssessment,
    #[error("Question '{0}' needs at least two options")]
    TooFewOptions(String),
    #[error("Question '{id}' marks option {index} correct but has only {options} options")]
    AnswerOutOfRange {
        id: String,
        index: usize,
        options: usize,
    },
    #[error("Feedback score {0} is outside [0, 1]")]
    ScoreOutOfRange(f64),
    #[error("The lesson text is empty")]
    EmptyLesson,
}

/// Turns a planned roadmap into locked modules.
///
/// Submodule ids must be unique across the whole roadmap since the rest of
/// the system can look a submodule up by its id alone.
pub fn curriculum(plan: CurriculumPlan) -> Result<Vec<Module>, ValidationError> {
    if plan.modules.is_empty() {
        return Err(ValidationError::EmptyCurriculum);
    }
    if !(3..=5).contains(&plan.modules.len()) {
        warn!(modules = plan.modules.len(), "Curriculum module count outside 3-5");
    }

    let mut module_ids = HashSet::new();
    let mut submodule_ids = HashSet::new();
    let mut modules = Vec::with_capacity(plan.modules.len());

    for planned in plan.modules {
        let id = required_id(planned.id, "module")?;
        if planned.title.trim().is_empty() {
            return Err(ValidationError::MissingTitle("module"));
        }
        if !module_ids.insert(id.clone()) {
            return Err(ValidationError::DuplicateId { kind: "module", id });
        }
        if planned.submodules.is_empty() {
            return Err(ValidationError::EmptyModule(id));
        }
        if !(2..=4).contains(&planned.submodules.len()) {
            warn!(module = %id, submodules = planned.submodules.len(), "Submodule count outside 2-4");
        }

        let mut submodules = Vec::with_capacity(planned.submodules.len());
        for sub in planned.submodules {
            let sub_id = required_id(sub.id, "submodule")?;
            if sub.title.trim().is_empty() {
                return Err(ValidationError::MissingTitle("submodule"));
            }
            if !submodule_ids.insert(sub_id.clone()) {
                return Err(ValidationError::DuplicateId {
                    kind: "submodule",
                    id: sub_id,
                });
            }
            submodules.push(SubModule::new(sub_id, sub.title, sub.description));
        }

        modules.push(Module {
            id,
            title: planned.title,
            submodules,
        });
    }

    Ok(modules)
}

/// Checks that every question can be scored.
pub fn assessment(assessment: Assessment) -> Result<Vec<QuizQuestion>, ValidationError> {
    let questions = assessment.questions;
    if questions.is_empty() {
        return Err(ValidationError::EmptyAssessment);
    }
    if questions.len() != 3 {
        warn!(questions = questions.len(), "Assessment does not have 3 questions");
    }

    let mut ids = HashSet::new();
    for q in &questions {
        if q.id.trim().is_empty() {
            return Err(ValidationError::MissingId("question"));
        }
        if !ids.insert(q.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                kind: "question",
                id: q.id.clone(),
            });
        }
        if q.options.len() < 2 {
            return Err(ValidationError::TooFewOptions(q.id.clone()));
        }
        if q.options.len() != 4 {
            warn!(question = %q.id, options = q.options.len(), "Question does not have 4 options");
        }
        if q.correct_answer >= q.options.len() {
            return Err(ValidationError::AnswerOutOfRange {
                id: q.id.clone(),
                index: q.correct_answer,
                options: q.options.len(),
            });
        }
    }

    Ok(questions)
}

pub fn feedback(analysis: FeedbackAnalysis) -> Result<FeedbackAnalysis, ValidationError> {
    if !(0.0..=1.0).contains(&analysis.score) {
        return Err(ValidationError::ScoreOutOfRange(analysis.score));
    }
    Ok(analysis)
}

pub fn lesson_text(text: String) -> Result<String, ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::EmptyLesson);
    }
    Ok(text)
}

/// A blank rewrite counts as no rewrite.
pub fn evaluation(mut evaluation: ContentEvaluation) -> ContentEvaluation {
    if evaluation
        .improved_content
        .as_deref()
        .is_some_and(|c| c.trim().is_empty())
    {
        evaluation.improved_content = None;
    }
    evaluation
}

fn required_id(id: String, kind: &'static str) -> Result<String, ValidationError> {
    let id = id.trim().to_string();
    if id.is_empty() {
        return Err(ValidationError::MissingId(kind));
    }
    Ok(id)
}
