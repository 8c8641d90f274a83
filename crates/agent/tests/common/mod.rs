//! Shared test fixtures: a scripted provider and instrumented tools
#![allow(dead_code)]

use async_trait::async_trait;
use conductor_agent::{ToolOutcome, ToolTrait};
use conductor_provider::{
    ChatParams, ChatResponse, Provider, ProviderError, ToolCall,
};
use rusqlite::Connection;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted inference step
pub struct Step {
    pub delay: Duration,
    pub reply: Result<ChatResponse, String>,
}

impl Step {
    pub fn text(content: &str) -> Self {
        Self {
            delay: Duration::ZERO,
            reply: Ok(ChatResponse::text(content)),
        }
    }

    pub fn call(id: &str, name: &str, args: Value) -> Self {
        Self::calls(vec![ToolCall::new(id, name, args)])
    }

    pub fn calls(calls: Vec<ToolCall>) -> Self {
        Self {
            delay: Duration::ZERO,
            reply: Ok(ChatResponse::tool_calls(calls)),
        }
    }

    pub fn fail(message: &str) -> Self {
        Self {
            delay: Duration::ZERO,
            reply: Err(message.to_string()),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Provider replaying per-model scripts and recording every request.
/// Keying by model lets concurrent agents share one provider.
#[derive(Default)]
pub struct ScriptedProvider {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    fallback: Mutex<HashMap<String, ChatResponse>>,
    requests: Mutex<Vec<ChatParams>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, model: &str, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(model.to_string())
            .or_default()
            .extend(steps);
        self
    }

    /// Reply used once the model's script is empty
    pub fn repeat(self, model: &str, reply: ChatResponse) -> Self {
        self.fallback
            .lock()
            .unwrap()
            .insert(model.to_string(), reply);
        self
    }

    pub fn requests(&self) -> Vec<ChatParams> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_for(&self, model: &str) -> Vec<ChatParams> {
        self.requests()
            .into_iter()
            .filter(|p| p.model == model)
            .collect()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse, ProviderError> {
        let model = params.model.clone();
        self.requests.lock().unwrap().push(params);

        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&model)
            .and_then(|q| q.pop_front());

        match step {
            Some(step) => {
                if !step.delay.is_zero() {
                    tokio::time::sleep(step.delay).await;
                }
                step.reply.map_err(ProviderError::Api)
            }
            None => self
                .fallback
                .lock()
                .unwrap()
                .get(&model)
                .cloned()
                .ok_or_else(|| ProviderError::Api(format!("no script left for {}", model))),
        }
    }

    fn default_model(&self) -> String {
        "scripted".to_string()
    }

    fn is_configured(&self) -> bool {
        true
    }
}

/// Tool that sleeps, then echoes its arguments, tracking peak concurrency
pub struct ProbeTool {
    pub name: &'static str,
    pub delay: Duration,
    pub in_flight: Arc<AtomicUsize>,
    pub peak: Arc<AtomicUsize>,
}

impl ProbeTool {
    pub fn new(name: &'static str, delay: Duration) -> Self {
        Self {
            name,
            delay,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl ToolTrait for ProbeTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "Sleep, then echo the arguments"
    }

    fn parameters(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, args: Value) -> ToolOutcome {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        ToolOutcome::ok(json!({"tool": self.name, "args": args}))
    }
}

/// Demo database with a handful of projects
pub fn build_projects_db(path: &Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE projects (id INTEGER PRIMARY KEY, title TEXT NOT NULL, budget REAL);
         INSERT INTO projects VALUES
            (1, 'Atlas Data Platform', 8000),
            (2, 'Beacon Mobile App', 10000),
            (3, 'Comet Search Revamp', 12000),
            (4, 'Delta Billing Migration', 2500);",
    )
    .unwrap();
}

/// Base URL of a server that accepts connections and never answers
pub async fn silent_endpoint() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{}", addr)
}
