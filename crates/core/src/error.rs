use crate::course::View;
use crate::quiz::QuizError;

/// A step was requested that the current revision cannot take.
///
/// These are precondition failures: the caller's revision is left exactly as
/// it was. Failures of the hosted model are not reported here; they are
/// folded into the returned revision as a Supervisor log entry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CourseError {
    #[error("A subject is required to start a course")]
    EmptySubject,
    #[error("The agents are still working on the previous request")]
    Busy,
    #[error("There is no pending action awaiting approval")]
    NoPendingAction,
    #[error("Submodule '{submodule_id}' was not found in module '{module_id}'")]
    UnknownSubModule {
        module_id: String,
        submodule_id: String,
    },
    #[error("No submodule is currently selected")]
    NoSelection,
    #[error("Submodule '{0}' has no lesson content yet")]
    NoLesson(String),
    #[error("Submodule '{0}' has no quiz yet")]
    NoQuiz(String),
    #[error("Submodule '{0}' has already been scored")]
    AlreadyScored(String),
    #[error("Question '{0}' was not found in the current quiz")]
    UnknownQuestion(String),
    #[error("Answer index {0} is out of range")]
    AnswerOutOfRange(usize),
    #[error("The {0} view is unavailable until a curriculum exists")]
    ViewLocked(View),
    #[error(transparent)]
    Quiz(#[from] QuizError),
}
