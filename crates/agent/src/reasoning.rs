//! Bounded reasoning loop
//!
//! Shared by the coordinator and every sub-agent. Each step asks the model
//! for either a final answer or a batch of tool calls. A batch runs
//! concurrently and is joined before the next step, so every result is in
//! the turn state before the model reasons again.

use conductor_config::AgentProfile;
use conductor_provider::{ChatParams, Provider, ToolCall, ToolChoice};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

use crate::tools::{ToolErrorKind, ToolOutcome, ToolRegistry};
use crate::turn::{DispatchRecord, TurnState};
use crate::AgentError;

const EMPTY_ANSWER: &str = "Task completed.";

/// Step budget, fan-out bound and sampling for one loop
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub max_steps: u32,
    pub max_parallel_calls: usize,
    pub call_timeout: Duration,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LoopSettings {
    pub fn from_profile(profile: &AgentProfile, call_timeout: Duration) -> Self {
        Self {
            max_steps: profile.max_steps,
            max_parallel_calls: profile.max_parallel_calls,
            call_timeout,
            temperature: profile.temperature,
            max_tokens: profile.max_tokens,
        }
    }
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            max_steps: 8,
            max_parallel_calls: 4,
            call_timeout: Duration::from_secs(60),
            temperature: 0.2,
            max_tokens: 4096,
        }
    }
}

/// How a loop ended
#[derive(Debug, Clone, PartialEq)]
pub enum LoopOutcome {
    /// The model produced a final answer
    Done(String),
    /// The step budget ran out first
    Exhausted { steps: u32 },
    /// Inference failed
    Failed(String),
}

impl LoopOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, LoopOutcome::Done(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            LoopOutcome::Done(_) => "done",
            LoopOutcome::Exhausted { .. } => "exhausted",
            LoopOutcome::Failed(_) => "failed",
        }
    }
}

/// Progress notifications for front-ends
#[derive(Debug, Clone)]
pub enum TurnEvent {
    ToolCalls { agent: String, calls: Vec<ToolCall> },
    ToolResult { agent: String, record: DispatchRecord },
    Answer { agent: String, text: String },
}

pub type EventSink = mpsc::UnboundedSender<TurnEvent>;

pub(crate) fn emit(events: Option<&EventSink>, event: TurnEvent) {
    if let Some(sink) = events {
        // A closed receiver only means nobody is watching
        let _ = sink.send(event);
    }
}

/// Reasoning/Done state machine over a fixed tool set
pub struct ReasoningLoop<P: Provider> {
    name: String,
    provider: Arc<P>,
    model: String,
    directive: String,
    tools: ToolRegistry,
    settings: LoopSettings,
}

impl<P: Provider> ReasoningLoop<P> {
    pub fn new(
        name: impl Into<String>,
        provider: Arc<P>,
        model: impl Into<String>,
        directive: impl Into<String>,
        tools: ToolRegistry,
        settings: LoopSettings,
    ) -> Self {
        Self {
            name: name.into(),
            provider,
            model: model.into(),
            directive: directive.into(),
            tools,
            settings,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn directive(&self) -> &str {
        &self.directive
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    /// Empty turn seeded with this loop's directive
    pub fn start_turn(&self) -> TurnState {
        TurnState::new(Some(&self.directive))
    }

    /// Drive `turn` until the model answers or the step budget runs out
    pub async fn run(&self, turn: &mut TurnState, events: Option<&EventSink>) -> LoopOutcome {
        for step in 1..=self.settings.max_steps {
            let params = ChatParams {
                model: self.model.clone(),
                messages: turn.messages().to_vec(),
                tools: self.tools.definitions(),
                max_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
                tool_choice: if self.tools.is_empty() {
                    ToolChoice::None
                } else {
                    ToolChoice::Auto
                },
            };

            let response = match self.provider.chat(params).await {
                Ok(response) => response,
                Err(e) => {
                    warn!("◆ {} INFERENCE FAILED AT STEP {}: {}", self.name, step, e);
                    return LoopOutcome::Failed(e.to_string());
                }
            };

            debug!(
                "◆ {} STEP {}/{}: {} TOOL CALLS",
                self.name,
                step,
                self.settings.max_steps,
                response.tool_calls.len()
            );

            if !response.has_tool_calls() {
                let text = response
                    .content
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| EMPTY_ANSWER.to_string());
                turn.push_assistant_text(text.clone());
                emit(
                    events,
                    TurnEvent::Answer {
                        agent: self.name.clone(),
                        text: text.clone(),
                    },
                );
                return LoopOutcome::Done(text);
            }

            let calls = normalize_ids(response.tool_calls, step);
            turn.push_tool_calls(response.content, &calls);
            emit(
                events,
                TurnEvent::ToolCalls {
                    agent: self.name.clone(),
                    calls: calls.clone(),
                },
            );

            let records = self.dispatch_batch(&calls, events).await;
            for record in &records {
                if let Err(e) = turn.push_tool_result(&record.call_id, &record.target, &record.outcome)
                {
                    warn!("◆ {} DROPPED RESULT: {}", self.name, e);
                }
            }
        }

        warn!(
            "◆ {} EXHAUSTED AFTER {} STEPS",
            self.name, self.settings.max_steps
        );
        LoopOutcome::Exhausted {
            steps: self.settings.max_steps,
        }
    }

    /// Run every call of one step concurrently and wait for all of them.
    /// Records come back in request order.
    async fn dispatch_batch(
        &self,
        calls: &[ToolCall],
        events: Option<&EventSink>,
    ) -> Vec<DispatchRecord> {
        let permits = Semaphore::new(self.settings.max_parallel_calls.max(1));
        let permits = &permits;

        let pending = calls.iter().map(|call| async move {
            let _permit = permits.acquire().await.ok();
            let record = self.dispatch(call).await;
            emit(
                events,
                TurnEvent::ToolResult {
                    agent: self.name.clone(),
                    record: record.clone(),
                },
            );
            record
        });

        join_all(pending).await
    }

    async fn dispatch(&self, call: &ToolCall) -> DispatchRecord {
        let started = Instant::now();
        let execution = self.tools.execute(&call.name, call.arguments.clone());

        let outcome = match tokio::time::timeout(self.settings.call_timeout, execution).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(AgentError::UnknownTool(name))) => ToolOutcome::error(
                ToolErrorKind::UnknownTool,
                format!(
                    "Unknown tool '{}'. Available tools: {}",
                    name,
                    self.tools.names().join(", ")
                ),
            ),
            Ok(Err(e)) => ToolOutcome::error(ToolErrorKind::Resource, e.to_string()),
            Err(_) => ToolOutcome::error(
                ToolErrorKind::Timeout,
                format!(
                    "'{}' did not finish within {}s",
                    call.name,
                    self.settings.call_timeout.as_secs_f32()
                ),
            ),
        };

        let latency = started.elapsed();
        info!(
            "◆ {} → {} [{}] {}ms",
            self.name,
            call.name,
            outcome.tag(),
            latency.as_millis()
        );

        DispatchRecord {
            call_id: call.id.clone(),
            target: call.name.clone(),
            input: call.arguments.clone(),
            outcome,
            latency,
        }
    }
}

/// Give every call in a batch a non-empty, unique id
fn normalize_ids(calls: Vec<ToolCall>, step: u32) -> Vec<ToolCall> {
    let mut seen = HashSet::new();
    calls
        .into_iter()
        .enumerate()
        .map(|(i, mut call)| {
            if call.id.is_empty() || !seen.insert(call.id.clone()) {
                call.id = format!("call_{}_{}", step, i);
                seen.insert(call.id.clone());
            }
            call
        })
        .collect()
}
