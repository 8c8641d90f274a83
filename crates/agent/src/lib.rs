//! Agents and dispatch
//!
//! Capability tools, the bounded reasoning loop shared by every agent,
//! sub-agents exposed as tools, and the coordinator that plans over them.

use thiserror::Error;

pub mod coordinator;
pub mod evaluator;
pub mod reasoning;
pub mod roster;
pub mod subagent;
pub mod tools;
pub mod turn;

pub use coordinator::{Coordinator, TurnReport};
pub use evaluator::{Judge, Verdict};
pub use reasoning::{EventSink, LoopOutcome, LoopSettings, ReasoningLoop, TurnEvent};
pub use roster::Roster;
pub use subagent::{ReplyStatus, SubAgent, SubAgentReply, SubAgentTool};
pub use tools::{ToolErrorKind, ToolOutcome, ToolRegistry, ToolTrait};
pub use turn::{DispatchRecord, TurnState};

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("◆ TOOL NOT FOUND: {0}")]
    UnknownTool(String),

    #[error("◆ DUPLICATE TOOL: {0}")]
    DuplicateTool(String),

    #[error("◆ ORPHAN TOOL RESULT: {0}")]
    OrphanToolResult(String),

    #[error("◆ INFERENCE ERROR: {0}")]
    Provider(#[from] conductor_provider::ProviderError),

    #[error("◆ INVALID VERDICT: {0}")]
    InvalidVerdict(String),
}

pub type Result<T> = std::result::Result<T, AgentError>;
