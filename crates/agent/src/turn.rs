//! Turn state
//!
//! Append-only message history for one agent run. A tool result is only
//! accepted for a call requested by the latest assistant message that has
//! not been answered yet, so results always follow their request.

use conductor_provider::{Message, ToolCall, ToolCallDef};
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

use crate::tools::ToolOutcome;
use crate::{AgentError, Result};

/// Message history threaded through one reasoning loop
#[derive(Debug, Clone)]
pub struct TurnState {
    id: Uuid,
    messages: Vec<Message>,
    pending: Vec<String>,
}

impl TurnState {
    /// Fresh turn seeded by an optional system directive
    pub fn new(directive: Option<&str>) -> Self {
        let mut messages = Vec::new();
        if let Some(directive) = directive {
            messages.push(Message::system(directive));
        }
        Self {
            id: Uuid::new_v4(),
            messages,
            pending: Vec::new(),
        }
    }

    /// Turn seeded with an earlier conversation; system messages in
    /// `history` are dropped in favour of `directive`
    pub fn carry_forward(directive: Option<&str>, history: &[Message]) -> Self {
        let mut turn = Self::new(directive);
        turn.messages
            .extend(history.iter().filter(|m| !m.is_role("system")).cloned());
        turn
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Call ids still waiting for a result
    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.pending.clear();
        self.messages.push(Message::user(content));
    }

    pub fn push_assistant_text(&mut self, content: impl Into<String>) {
        self.pending.clear();
        self.messages.push(Message::assistant(content));
    }

    /// Record an assistant message requesting `calls`
    pub fn push_tool_calls(&mut self, content: Option<String>, calls: &[ToolCall]) {
        let defs: Vec<ToolCallDef> = calls.iter().map(ToolCallDef::from).collect();
        self.pending = calls.iter().map(|c| c.id.clone()).collect();
        self.messages.push(Message::assistant_calls(content, defs));
    }

    /// Append the result for a pending call
    pub fn push_tool_result(
        &mut self,
        call_id: &str,
        name: &str,
        outcome: &ToolOutcome,
    ) -> Result<()> {
        let Some(pos) = self.pending.iter().position(|id| id == call_id) else {
            return Err(AgentError::OrphanToolResult(call_id.to_string()));
        };
        self.pending.remove(pos);
        self.messages
            .push(Message::tool(call_id, name, outcome.render()));
        Ok(())
    }

    /// Content of the most recent tool result, if any
    pub fn last_tool_result(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.is_role("tool"))
            .and_then(|m| m.content.as_deref())
    }

    /// Conversation without system messages, for carrying into the next turn
    pub fn conversation(&self) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|m| !m.is_role("system"))
            .cloned()
            .collect()
    }
}

/// One tool or adapter invocation, kept for logging and event streams
#[derive(Debug, Clone)]
pub struct DispatchRecord {
    pub call_id: String,
    pub target: String,
    pub input: Value,
    pub outcome: ToolOutcome,
    pub latency: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolErrorKind;
    use serde_json::json;

    fn calls() -> Vec<ToolCall> {
        vec![
            ToolCall::new("a", "call_sql_agent", json!({"input_text": "sum budgets"})),
            ToolCall::new("b", "call_web_agent", json!({"input_text": "seoul population"})),
        ]
    }

    #[test]
    fn test_results_follow_requests() {
        let mut turn = TurnState::new(Some("directive"));
        turn.push_user("question");
        turn.push_tool_calls(None, &calls());
        assert_eq!(turn.pending(), &["a".to_string(), "b".to_string()]);

        // Completion order does not matter while both are pending
        turn.push_tool_result("b", "call_web_agent", &ToolOutcome::ok("9.4M"))
            .unwrap();
        turn.push_tool_result("a", "call_sql_agent", &ToolOutcome::ok("20500"))
            .unwrap();
        assert!(turn.pending().is_empty());

        let roles: Vec<&str> = turn.messages().iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "tool", "tool"]);
        assert_eq!(turn.last_tool_result(), Some("20500"));
    }

    #[test]
    fn test_orphan_result_rejected() {
        let mut turn = TurnState::new(None);
        turn.push_user("question");
        let err = turn
            .push_tool_result("x", "call_sql_agent", &ToolOutcome::ok("1"))
            .unwrap_err();
        assert!(matches!(err, AgentError::OrphanToolResult(ref id) if id == "x"));
        assert_eq!(turn.len(), 1);
    }

    #[test]
    fn test_duplicate_result_rejected() {
        let mut turn = TurnState::new(None);
        turn.push_tool_calls(None, &calls());
        let outcome = ToolOutcome::error(ToolErrorKind::Timeout, "timed out");
        turn.push_tool_result("a", "call_sql_agent", &outcome).unwrap();
        assert!(turn.push_tool_result("a", "call_sql_agent", &outcome).is_err());
    }

    #[test]
    fn test_new_request_closes_previous_batch() {
        let mut turn = TurnState::new(None);
        turn.push_tool_calls(None, &calls());
        turn.push_assistant_text("never mind");
        assert!(turn
            .push_tool_result("a", "call_sql_agent", &ToolOutcome::ok("1"))
            .is_err());
    }

    #[test]
    fn test_carry_forward_replaces_directive() {
        let mut first = TurnState::new(Some("old"));
        first.push_user("hi");
        first.push_assistant_text("hello");

        let second = TurnState::carry_forward(Some("new"), &first.conversation());
        assert_ne!(first.id(), second.id());
        assert_eq!(second.messages()[0].content.as_deref(), Some("new"));
        assert_eq!(second.len(), 3);
    }
}
