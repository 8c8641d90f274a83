//! Sub-agents and the adapter that exposes them as tools

use async_trait::async_trait;
use conductor_provider::{object_schema, ParamSpec, ParamType, Provider};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::reasoning::{EventSink, LoopOutcome, ReasoningLoop};
use crate::tools::{parse_args, ToolErrorKind, ToolOutcome, ToolTrait};

/// Longest tool result quoted back in a degraded answer
const QUOTE_LIMIT: usize = 1500;

/// How a sub-agent run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus {
    Completed,
    Exhausted { steps: u32 },
    Failed,
}

/// The single textual answer of one sub-agent run
#[derive(Debug, Clone, PartialEq)]
pub struct SubAgentReply {
    pub answer: String,
    pub status: ReplyStatus,
}

/// Domain-restricted reasoning loop; holds no per-run state
pub struct SubAgent<P: Provider> {
    inner: ReasoningLoop<P>,
}

impl<P: Provider> SubAgent<P> {
    pub fn new(inner: ReasoningLoop<P>) -> Self {
        Self { inner }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.inner.tools().names()
    }

    pub async fn run(&self, input_text: &str) -> SubAgentReply {
        self.run_with_events(input_text, None).await
    }

    /// Run once from a fresh turn containing only `input_text`
    pub async fn run_with_events(
        &self,
        input_text: &str,
        events: Option<&EventSink>,
    ) -> SubAgentReply {
        let mut turn = self.inner.start_turn();
        turn.push_user(input_text);

        match self.inner.run(&mut turn, events).await {
            LoopOutcome::Done(answer) => SubAgentReply {
                answer,
                status: ReplyStatus::Completed,
            },
            LoopOutcome::Exhausted { steps } => {
                let mut answer = format!(
                    "SubAgentExhausted: the {} agent used all {} reasoning steps without reaching a final answer.",
                    self.name(),
                    steps
                );
                if let Some(last) = turn.last_tool_result() {
                    answer.push_str("\nLast tool result: ");
                    answer.push_str(&truncate(last, QUOTE_LIMIT));
                }
                SubAgentReply {
                    answer,
                    status: ReplyStatus::Exhausted { steps },
                }
            }
            LoopOutcome::Failed(message) => SubAgentReply {
                answer: format!(
                    "The {} agent could not complete the request: {}",
                    self.name(),
                    message
                ),
                status: ReplyStatus::Failed,
            },
        }
    }
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[derive(Deserialize)]
struct AdapterArgs {
    input_text: String,
}

/// A whole sub-agent behind the ordinary tool interface
pub struct SubAgentTool<P: Provider> {
    name: String,
    description: String,
    agent: Arc<SubAgent<P>>,
}

impl<P: Provider> SubAgentTool<P> {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        agent: Arc<SubAgent<P>>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            agent,
        }
    }
}

#[async_trait]
impl<P: Provider + 'static> ToolTrait for SubAgentTool<P> {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        object_schema(&[ParamSpec::required(
            "input_text",
            ParamType::String,
            "One self-contained sub-task for this agent",
        )])
    }

    async fn execute(&self, args: Value) -> ToolOutcome {
        let args: AdapterArgs = match parse_args(&self.name, args) {
            Ok(args) => args,
            Err(outcome) => return outcome,
        };

        info!("◆ {} ← {}", self.name, args.input_text);
        let reply = self.agent.run(&args.input_text).await;

        match reply.status {
            ReplyStatus::Completed => ToolOutcome::ok(reply.answer),
            ReplyStatus::Exhausted { .. } => {
                warn!("◆ {} EXHAUSTED", self.name);
                ToolOutcome::error(ToolErrorKind::Exhausted, reply.answer)
            }
            ReplyStatus::Failed => ToolOutcome::error(ToolErrorKind::Resource, reply.answer),
        }
    }
}
