//! Coordinator agent
//!
//! Top-level reasoning loop whose tool set holds sub-agent adapters and
//! nothing else. The only constructor takes adapters, so raw capability
//! tools can never reach the coordinator.

use conductor_provider::{Message, Provider};
use std::sync::Arc;
use tracing::{info, warn};

use crate::reasoning::{emit, EventSink, LoopOutcome, LoopSettings, ReasoningLoop, TurnEvent};
use crate::subagent::SubAgentTool;
use crate::tools::ToolRegistry;
use crate::turn::TurnState;
use crate::Result;

const COORDINATOR_NAME: &str = "coordinator";

/// Result of one user turn
#[derive(Debug)]
pub struct TurnReport {
    /// Final user-facing text, present for every outcome
    pub answer: String,
    pub outcome: LoopOutcome,
    pub turn: TurnState,
}

impl TurnReport {
    /// Conversation to re-supply on the next user message
    pub fn conversation(&self) -> Vec<Message> {
        self.turn.conversation()
    }
}

pub struct Coordinator<P: Provider> {
    inner: ReasoningLoop<P>,
}

impl<P: Provider + 'static> Coordinator<P> {
    pub fn new(
        provider: Arc<P>,
        model: impl Into<String>,
        directive: impl Into<String>,
        adapters: Vec<SubAgentTool<P>>,
        settings: LoopSettings,
    ) -> Result<Self> {
        let mut tools = ToolRegistry::new();
        for adapter in adapters {
            tools.register(adapter)?;
        }
        Ok(Self {
            inner: ReasoningLoop::new(COORDINATOR_NAME, provider, model, directive, tools, settings),
        })
    }

    pub fn adapter_names(&self) -> Vec<String> {
        self.inner.tools().names()
    }

    pub fn model(&self) -> &str {
        self.inner.model()
    }

    pub fn settings(&self) -> &LoopSettings {
        self.inner.settings()
    }

    /// Answer `user_message` given the earlier conversation
    pub async fn run_turn(
        &self,
        history: &[Message],
        user_message: &str,
        events: Option<&EventSink>,
    ) -> TurnReport {
        let mut turn = TurnState::carry_forward(Some(self.inner.directive()), history);
        turn.push_user(user_message);
        info!("◆ TURN {} STARTED", turn.id());

        let outcome = self.inner.run(&mut turn, events).await;
        let answer = match &outcome {
            LoopOutcome::Done(text) => text.clone(),
            LoopOutcome::Exhausted { steps } => {
                warn!("◆ TURN {} EXHAUSTED AFTER {} STEPS", turn.id(), steps);
                self.close_turn(
                    &mut turn,
                    format!(
                        "I could not finish this request within {} planning steps. \
                         Please narrow the question or try again.",
                        steps
                    ),
                    events,
                )
            }
            LoopOutcome::Failed(message) => {
                warn!("◆ TURN {} FAILED: {}", turn.id(), message);
                self.close_turn(
                    &mut turn,
                    format!(
                        "I could not reach the language model to answer this request ({}). \
                         Please try again later.",
                        message
                    ),
                    events,
                )
            }
        };

        info!("◆ TURN {} {}", turn.id(), outcome.label().to_uppercase());
        TurnReport {
            answer,
            outcome,
            turn,
        }
    }

    fn close_turn(&self, turn: &mut TurnState, text: String, events: Option<&EventSink>) -> String {
        turn.push_assistant_text(text.clone());
        emit(
            events,
            TurnEvent::Answer {
                agent: self.inner.name().to_string(),
                text: text.clone(),
            },
        );
        text
    }
}
