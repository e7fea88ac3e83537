//! Offline Agent Gateway
//!
//! A deterministic `AgentGateway` for development and integration testing.
//! Useful for exercising the full tutoring flow without external
//! dependencies or API costs.

use crate::course::QuizQuestion;
use crate::gateway::{
    AgentGateway, Assessment, ContentEvaluation, CurriculumPlan, FeedbackAnalysis, PlannedModule,
    PlannedSubModule, SupervisorContext, SupervisorDecision,
};
use anyhow::Result;
use async_trait::async_trait;

const MODULE_TITLES: [&str; 3] = ["Foundations", "Core Techniques", "Applications"];
const SUBMODULE_TITLES: [&str; 3] = ["Key Ideas", "Worked Examples", "Common Pitfalls"];

/// A gateway that answers every role with fixed, well-formed content.
#[derive(Debug, Clone, Default)]
pub struct DemoAgentGateway {
    /// When set, the supervisor asks for approval before planning.
    pub require_approval: bool,
}

impl DemoAgentGateway {
    pub fn new(require_approval: bool) -> Self {
        Self { require_approval }
    }

    /// The option index the demo quiz marks correct for question `n`.
    pub fn correct_answer(n: usize) -> usize {
        n % 4
    }
}

#[async_trait]
impl AgentGateway for DemoAgentGateway {
    async fn decide_next_agent(&self, context: &SupervisorContext) -> Result<SupervisorDecision> {
        let reason = if context.modules.is_empty() {
            format!("No roadmap exists yet for {}.", context.subject)
        } else {
            format!("The roadmap for {} should be refreshed.", context.subject)
        };
        Ok(SupervisorDecision {
            agent: "Curriculum Planner".to_string(),
            reason,
            parameters: None,
            requires_approval: self.require_approval,
        })
    }

    /// Generates a 3 x 3 roadmap with ids `m1`..`m3` and `m1-s1`..`m3-s3`.
    async fn plan_curriculum(&self, subject: &str) -> Result<CurriculumPlan> {
        let modules = MODULE_TITLES
            .iter()
            .enumerate()
            .map(|(i, title)| PlannedModule {
                id: format!("m{}", i + 1),
                title: format!("{subject}: {title}"),
                submodules: SUBMODULE_TITLES
                    .iter()
                    .enumerate()
                    .map(|(j, sub)| PlannedSubModule {
                        id: format!("m{}-s{}", i + 1, j + 1),
                        title: format!("{title}: {sub}"),
                        description: format!("{sub} of {title} in {subject}."),
                    })
                    .collect(),
            })
            .collect();
        Ok(CurriculumPlan { modules })
    }

    async fn explain_concept(
        &self,
        subject: &str,
        title: &str,
        description: &str,
    ) -> Result<String> {
        Ok(format!(
            "## {title}\n\n{description}\n\n- **Context**: part of the {subject} course.\n- **Practice**: try the knowledge check when ready."
        ))
    }

    async fn evaluate_content(&self, _content: &str) -> Result<ContentEvaluation> {
        Ok(ContentEvaluation {
            approved: true,
            feedback: "Clear and accurate.".to_string(),
            improved_content: None,
        })
    }

    async fn generate_assessment(&self, title: &str, _content: &str) -> Result<Assessment> {
        let questions = (0..3)
            .map(|n| QuizQuestion {
                id: format!("q{}", n + 1),
                question: format!("Question {} about {title}?", n + 1),
                options: (0..4).map(|o| format!("Option {}", o + 1)).collect(),
                correct_answer: Self::correct_answer(n),
            })
            .collect();
        Ok(Assessment { questions })
    }

    async fn analyze_feedback(
        &self,
        _question: &str,
        student_answer: &str,
        correct_answer: &str,
    ) -> Result<FeedbackAnalysis> {
        let (score, tip) = if student_answer == correct_answer {
            (1.0, "Correct. Try explaining why the other options fail.".to_string())
        } else {
            (0.0, format!("The answer is '{correct_answer}'. Review the key ideas section."))
        };
        Ok(FeedbackAnalysis { score, tip })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate;

    #[tokio::test]
    async fn test_demo_replies_pass_validation() {
        let gateway = DemoAgentGateway::default();

        let modules = validate::curriculum(gateway.plan_curriculum("Algebra").await.unwrap()).unwrap();
        assert_eq!(modules.len(), 3);
        assert!(modules.iter().all(|m| m.submodules.len() == 3));
        assert_eq!(modules[2].submodules[2].id, "m3-s3");

        let quiz = validate::assessment(gateway.generate_assessment("t", "c").await.unwrap()).unwrap();
        assert_eq!(quiz.len(), 3);
        assert_eq!(quiz[1].correct_answer, DemoAgentGateway::correct_answer(1));
    }

    #[tokio::test]
    async fn test_demo_feedback() {
        let gateway = DemoAgentGateway::default();
        let right = gateway.analyze_feedback("q", "4", "4").await.unwrap();
        let wrong = gateway.analyze_feedback("q", "3", "4").await.unwrap();
        assert_eq!(right.score, 1.0);
        assert_eq!(wrong.score, 0.0);
        assert!(wrong.tip.contains("'4'"));
    }
}
