//! Answer judge for the evaluation harness

use conductor_provider::{
    object_schema, ChatParams, ChatResponse, Message, ParamSpec, ParamType, Provider, Tool,
    ToolChoice,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::{AgentError, Result};

const VERDICT_TOOL: &str = "submit_verdict";

const JUDGE_DIRECTIVE: &str = "\
You evaluate answers produced by an AI model. Using the question, the ground truth and \
the model's answer, judge how well the answer matches the ground truth for that question. \
Submit your judgement with the submit_verdict tool.";

/// Judgement of one proposed answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub explanation: String,
    pub is_answer_correct: bool,
}

pub struct Judge<P: Provider> {
    provider: Arc<P>,
    model: String,
}

impl<P: Provider> Judge<P> {
    pub fn new(provider: Arc<P>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub async fn evaluate(
        &self,
        question: &str,
        ground_truth: &str,
        proposed: &str,
    ) -> Result<Verdict> {
        let params = ChatParams {
            model: self.model.clone(),
            messages: vec![
                Message::system(JUDGE_DIRECTIVE),
                Message::user(render_prompt(question, ground_truth, proposed)),
            ],
            tools: vec![verdict_tool()],
            temperature: 0.0,
            tool_choice: ToolChoice::Required(VERDICT_TOOL.to_string()),
            ..Default::default()
        };

        let response = self.provider.chat(params).await?;
        let verdict = parse_verdict(&response)?;
        debug!("◆ VERDICT {}", verdict.is_answer_correct);
        Ok(verdict)
    }
}

fn render_prompt(question: &str, ground_truth: &str, proposed: &str) -> String {
    format!(
        "# Question\n\n{}\n\n# Ground truth\n\n{}\n\n# AI model's answer\n\n{}",
        question, ground_truth, proposed
    )
}

fn verdict_tool() -> Tool {
    Tool::new(
        VERDICT_TOOL,
        "Record whether the AI model's answer is correct.",
        object_schema(&[
            ParamSpec::required("explanation", ParamType::String, "Reasoning behind the verdict"),
            ParamSpec::required(
                "is_answer_correct",
                ParamType::Boolean,
                "True when the answer matches the ground truth",
            ),
        ]),
    )
}

/// Read the verdict from the forced tool call, or from JSON text when the
/// model answered in content instead
fn parse_verdict(response: &ChatResponse) -> Result<Verdict> {
    if let Some(call) = response.tool_calls.iter().find(|c| c.name == VERDICT_TOOL) {
        return serde_json::from_value(call.arguments.clone())
            .map_err(|e| AgentError::InvalidVerdict(e.to_string()));
    }

    let content = response.content.as_deref().unwrap_or_default();
    serde_json::from_str(strip_fences(content))
        .map_err(|_| AgentError::InvalidVerdict(format!("unparseable judge output: {}", content)))
}

fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.strip_prefix("json").unwrap_or(body);
    body.strip_suffix("```").unwrap_or(body).trim()
}
