//! Quiz Scoring
//!
//! A single linear pass over the questions: one point per answer that
//! matches `correct_answer`, divided by the number of questions.

use crate::course::QuizQuestion;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuizError {
    #[error("Cannot score a quiz with no questions")]
    NoQuestions,
    #[error("Expected {expected} answers but received {received}")]
    AnswerCountMismatch { expected: usize, received: usize },
}

/// The graded result of one quiz attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizOutcome {
    /// Per-question correctness, in question order.
    pub correct: Vec<bool>,
    /// `correct_count / question_count`, always within `[0, 1]`.
    pub score: f64,
}

impl QuizOutcome {
    pub fn correct_count(&self) -> usize {
        self.correct.iter().filter(|c| **c).count()
    }

    /// The score as a whole percentage, rounded to nearest.
    pub fn percent(&self) -> u32 {
        (self.score * 100.0).round() as u32
    }
}

/// Grades `answers` (selected option indices) against `questions`.
///
/// An index past the end of a question's options simply counts as wrong.
pub fn grade(questions: &[QuizQuestion], answers: &[usize]) -> Result<QuizOutcome, QuizError> {
    if questions.is_empty() {
        return Err(QuizError::NoQuestions);
    }
    if answers.len() != questions.len() {
        return Err(QuizError::AnswerCountMismatch {
            expected: questions.len(),
            received: answers.len(),
        });
    }

    let correct: Vec<bool> = questions
        .iter()
        .zip(answers)
        .map(|(q, answer)| *answer == q.correct_answer)
        .collect();
    let hits = correct.iter().filter(|c| **c).count();
    let score = hits as f64 / questions.len() as f64;

    Ok(QuizOutcome { correct, score })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn question(id: &str, correct_answer: usize) -> QuizQuestion {
        QuizQuestion {
            id: id.to_string(),
            question: format!("Question {id}"),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer,
        }
    }

    #[test]
    fn test_two_of_three_correct() {
        let questions = vec![question("q1", 0), question("q2", 1), question("q3", 2)];
        let outcome = grade(&questions, &[0, 3, 2]).unwrap();

        assert_eq!(outcome.correct, vec![true, false, true]);
        assert_eq!(outcome.correct_count(), 2);
        assert_relative_eq!(outcome.score, 2.0 / 3.0);
        assert_eq!(outcome.percent(), 67);
    }

    #[test]
    fn test_score_bounds() {
        let questions = vec![question("q1", 0), question("q2", 0)];
        assert_relative_eq!(grade(&questions, &[0, 0]).unwrap().score, 1.0);
        assert_relative_eq!(grade(&questions, &[1, 2]).unwrap().score, 0.0);
    }

    #[test]
    fn test_single_question_quiz() {
        let outcome = grade(&[question("q1", 3)], &[3]).unwrap();
        assert_relative_eq!(outcome.score, 1.0);
    }

    #[test]
    fn test_empty_quiz_is_rejected() {
        assert_eq!(grade(&[], &[]), Err(QuizError::NoQuestions));
    }

    #[test]
    fn test_answer_count_must_match() {
        let questions = vec![question("q1", 0), question("q2", 1)];
        assert_eq!(
            grade(&questions, &[0]),
            Err(QuizError::AnswerCountMismatch {
                expected: 2,
                received: 1
            })
        );
    }

    #[test]
    fn test_out_of_range_answer_is_wrong() {
        let outcome = grade(&[question("q1", 0)], &[9]).unwrap();
        assert_eq!(outcome.correct, vec![false]);
    }
}
