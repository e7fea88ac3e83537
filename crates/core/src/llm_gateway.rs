//! LLM-backed Agent Gateway
//!
//! Implements `AgentGateway` against any OpenAI-compatible chat-completions
//! endpoint. Structured calls ask for `json_schema` output using a schema
//! derived from the Rust reply type, then parse the reply strictly.

use crate::gateway::{
    AgentGateway, Assessment, ContentEvaluation, CurriculumPlan, FeedbackAnalysis,
    SupervisorContext, SupervisorDecision,
};
use crate::prompt::{self, render};
use anyhow::{Context, Result};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat, ResponseFormatJsonSchema,
    },
};
use async_trait::async_trait;
use schemars::{JsonSchema, generate::SchemaSettings};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tracing::debug;

const SYSTEM_PROMPT: &str = "You are one member of an AI tutoring team. Follow the role you are given and answer only in the requested format.";

/// An implementation of `AgentGateway` that uses an OpenAI-compatible API.
pub struct LLMAgentGateway {
    client: Client<OpenAIConfig>,
    model: String,
    prompts: HashMap<String, String>,
}

impl LLMAgentGateway {
    /// Creates a new LLM-based gateway.
    ///
    /// # Arguments
    ///
    /// * `config` - OpenAI API configuration (API key, base URL, etc.).
    /// * `model` - Model identifier to use for every agent role.
    /// * `prompts` - Templates keyed by operation; see [`prompt::REQUIRED_KEYS`].
    pub fn new(config: OpenAIConfig, model: String, prompts: HashMap<String, String>) -> Self {
        Self {
            client: Client::with_config(config),
            model,
            prompts,
        }
    }

    fn prompt(&self, key: &str, vars: &[(&str, &str)]) -> Result<String> {
        let template = self
            .prompts
            .get(key)
            .with_context(|| format!("Missing prompt template: '{key}'"))?;
        Ok(render(template, vars))
    }

    /// Sends one prompt and returns the raw text of the first choice.
    async fn complete(&self, prompt: String, format: Option<ResponseFormat>) -> Result<String> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model).messages(vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT)
                .build()?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()?
                .into(),
        ]);
        if let Some(format) = format {
            args.response_format(format);
        }
        let request = args.build()?;

        let response = self.client.chat().create(request).await?;

        let answer = response
            .choices
            .first()
            .context("No response choice from LLM")?
            .message
            .content
            .clone()
            .context("No content in LLM response")?;
        Ok(answer)
    }

    /// Sends one prompt constrained to `T`'s schema and parses the reply as `T`.
    async fn complete_json<T>(&self, name: &str, prompt: String) -> Result<T>
    where
        T: DeserializeOwned + JsonSchema,
    {
        let format = ResponseFormat::JsonSchema {
            json_schema: ResponseFormatJsonSchema {
                description: None,
                name: name.to_string(),
                schema: Some(response_schema::<T>()?),
                strict: Some(false),
            },
        };
        let text = self.complete(prompt, Some(format)).await?;
        debug!(operation = name, bytes = text.len(), "Structured reply received");
        serde_json::from_str(strip_code_fence(&text))
            .with_context(|| format!("Reply for '{name}' did not match the expected JSON shape"))
    }
}

/// Builds a self-contained JSON schema for `T` with every subschema inlined.
fn response_schema<T: JsonSchema>() -> Result<serde_json::Value> {
    let schema = SchemaSettings::draft07()
        .with(|s| s.inline_subschemas = true)
        .into_generator()
        .into_root_schema_for::<T>();
    let mut value = serde_json::to_value(&schema)?;
    if let Some(object) = value.as_object_mut() {
        object.remove("$schema");
        object.remove("title");
    }
    Ok(value)
}

/// Some models wrap JSON in a Markdown fence even when asked not to.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let body = rest.strip_prefix("json").unwrap_or(rest);
            body.strip_suffix("```").unwrap_or(body).trim()
        }
        None => trimmed,
    }
}

#[async_trait]
impl AgentGateway for LLMAgentGateway {
    async fn decide_next_agent(&self, context: &SupervisorContext) -> Result<SupervisorDecision> {
        let modules = serde_json::to_string(&context.modules)?;
        let prompt = self.prompt(
            prompt::SUPERVISOR_DECIDE,
            &[
                ("subject", &context.subject),
                ("modules", &modules),
                (
                    "current_submodule",
                    context.current_submodule_id.as_deref().unwrap_or("None"),
                ),
                ("last_action", &context.last_action),
            ],
        )?;
        self.complete_json("supervisor_decision", prompt).await
    }

    async fn plan_curriculum(&self, subject: &str) -> Result<CurriculumPlan> {
        let prompt = self.prompt(prompt::PLAN_CURRICULUM, &[("subject", subject)])?;
        self.complete_json("curriculum_plan", prompt).await
    }

    async fn explain_concept(
        &self,
        subject: &str,
        title: &str,
        description: &str,
    ) -> Result<String> {
        let prompt = self.prompt(
            prompt::EXPLAIN_CONCEPT,
            &[
                ("subject", subject),
                ("title", title),
                ("description", description),
            ],
        )?;
        self.complete(prompt, None).await
    }

    async fn evaluate_content(&self, content: &str) -> Result<ContentEvaluation> {
        let prompt = self.prompt(prompt::EVALUATE_CONTENT, &[("content", content)])?;
        self.complete_json("content_evaluation", prompt).await
    }

    async fn generate_assessment(&self, title: &str, content: &str) -> Result<Assessment> {
        let prompt = self.prompt(
            prompt::GENERATE_ASSESSMENT,
            &[("title", title), ("content", content)],
        )?;
        self.complete_json("assessment", prompt).await
    }

    async fn analyze_feedback(
        &self,
        question: &str,
        student_answer: &str,
        correct_answer: &str,
    ) -> Result<FeedbackAnalysis> {
        let prompt = self.prompt(
            prompt::ANALYZE_FEEDBACK,
            &[
                ("question", question),
                ("student_answer", student_answer),
                ("correct_answer", correct_answer),
            ],
        )?;
        self.complete_json("feedback_analysis", prompt).await
    }
}
