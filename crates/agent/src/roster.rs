//! Standard roster: database, web and calculator specialists under one
//! coordinator

use conductor_config::Config;
use conductor_provider::Provider;
use conductor_storage::Storage;
use std::sync::Arc;
use tracing::debug;

use crate::coordinator::Coordinator;
use crate::reasoning::{LoopSettings, ReasoningLoop};
use crate::subagent::{SubAgent, SubAgentTool};
use crate::tools::{CalculatorTool, StorageTool, ToolRegistry, WebSearchTool};
use crate::Result;

pub const SQL_AGENT: &str = "call_sql_agent";
pub const WEB_AGENT: &str = "call_web_agent";
pub const CALCULATOR_AGENT: &str = "call_calculator_agent";

pub const DATABASE_DIRECTIVE: &str = "\
You are an agent with read-only access to the company database.
Use your tools to answer the request you are given. Start by listing tables and \
inspecting columns when you are unsure of the schema, then filter or join to get \
exactly the rows that are needed.
If a tool returns an error, read it and retry with corrected arguments or another tool.
If the data cannot answer the request, say so plainly.
Give a useful and accurate answer that includes the relevant values.";

pub const WEB_DIRECTIVE: &str = "\
You are an agent with access to web search.
Use your tools to find the information you are asked for. Search results are long: \
extract only the fragments that answer the request.
If a search fails or returns nothing useful, try a rephrased query before giving up.
Give a useful and accurate answer and mention where the information came from.";

pub const CALCULATOR_DIRECTIVE: &str = "\
You are a calculation agent that evaluates arithmetic and provides the current date and time.
Compute the requested expressions exactly with your tools rather than by hand. \
Expressions may only use digits, + - * / ( ) . and spaces.
Give a useful and accurate answer.";

pub const COORDINATOR_DIRECTIVE: &str = "\
You are the coordinator of several specialist agents. Do not answer from memory: \
plan first, then use the agents to handle the user's request.
1. Work out what the user wants and break it into the separate pieces of information you need.
2. Give each agent call exactly one coherent sub-task. Do not bundle unrelated sub-tasks into one call.
3. Sub-tasks that do not depend on each other may be sent in the same step. If a sub-task \
needs another one's result, wait for that result before sending it.
4. Check every answer you receive. If it is incomplete or the agent reports it could not help, \
try another approach (a refined request, or another agent whose domain fits) before asking the user. \
Ask the user only when no agent can plausibly supply the information.
5. Respect each agent's domain. Do not send a database question to web search just because \
the first attempt failed.
6. Once you have enough information, stop calling agents and give a helpful, accurate final \
answer in the user's language.";

const SQL_AGENT_DESCRIPTION: &str =
    "Ask the database agent, which can query the company database (users, projects, departments, employees, clients, contracts).";
const WEB_AGENT_DESCRIPTION: &str = "Ask the web agent, which searches the internet.";
const CALCULATOR_AGENT_DESCRIPTION: &str =
    "Ask the calculator agent, which evaluates arithmetic and reports the current date and time.";

/// Composition root for the standard agents
pub struct Roster<P: Provider> {
    pub coordinator: Coordinator<P>,
    pub database: Arc<SubAgent<P>>,
    pub web: Arc<SubAgent<P>>,
    pub calculator: Arc<SubAgent<P>>,
}

impl<P: Provider + 'static> Roster<P> {
    pub fn from_config(provider: Arc<P>, config: &Config, storage: Storage) -> Result<Self> {
        let call_timeout = config.call_timeout();
        let agents = &config.agents;

        let database = Arc::new(SubAgent::new(ReasoningLoop::new(
            "database",
            provider.clone(),
            &agents.database.model,
            DATABASE_DIRECTIVE,
            StorageTool::registry(&storage)?,
            LoopSettings::from_profile(&agents.database, call_timeout),
        )));

        let mut web_tools = ToolRegistry::new();
        web_tools.register(WebSearchTool::from_config(config))?;
        let web = Arc::new(SubAgent::new(ReasoningLoop::new(
            "web",
            provider.clone(),
            &agents.web.model,
            WEB_DIRECTIVE,
            web_tools,
            LoopSettings::from_profile(&agents.web, call_timeout),
        )));

        let mut calculator_tools = ToolRegistry::new();
        for tool in CalculatorTool::ALL {
            calculator_tools.register(tool)?;
        }
        let calculator = Arc::new(SubAgent::new(ReasoningLoop::new(
            "calculator",
            provider.clone(),
            &agents.calculator.model,
            CALCULATOR_DIRECTIVE,
            calculator_tools,
            LoopSettings::from_profile(&agents.calculator, call_timeout),
        )));

        let coordinator_settings = LoopSettings {
            max_parallel_calls: config.dispatch.max_concurrent,
            ..LoopSettings::from_profile(&agents.coordinator, config.dispatch_timeout())
        };
        let coordinator = Coordinator::new(
            provider,
            &agents.coordinator.model,
            COORDINATOR_DIRECTIVE,
            vec![
                SubAgentTool::new(SQL_AGENT, SQL_AGENT_DESCRIPTION, database.clone()),
                SubAgentTool::new(WEB_AGENT, WEB_AGENT_DESCRIPTION, web.clone()),
                SubAgentTool::new(
                    CALCULATOR_AGENT,
                    CALCULATOR_AGENT_DESCRIPTION,
                    calculator.clone(),
                ),
            ],
            coordinator_settings,
        )?;

        for agent in [&database, &web, &calculator] {
            debug!("◆ {} TOOLS: {}", agent.name(), agent.tool_names().join(", "));
        }
        debug!(
            "◆ ROSTER READY: {}",
            coordinator.adapter_names().join(", ")
        );

        Ok(Self {
            coordinator,
            database,
            web,
            calculator,
        })
    }
}
