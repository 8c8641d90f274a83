//! Configuration management for Conductor
//!
//! Loads and saves the orchestrator's parameters: inference endpoints,
//! per-agent reasoning budgets, dispatch limits, storage and toolkit settings.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod paths;

pub use paths::{config_path, data_dir, database_path, expand_home, results_dir};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("CONFIG IO ERROR: {0}")]
    Io(#[from] std::io::Error),

    #[error("CONFIG PARSE ERROR: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CONFIG NOT FOUND: {0}")]
    NotFound(PathBuf),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Inference endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

/// All inference endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openrouter: ProviderConfig,
    #[serde(default)]
    pub openai: ProviderConfig,
    #[serde(default)]
    pub vllm: ProviderConfig,
    /// Wall-clock bound on one inference request
    #[serde(default = "default_inference_timeout")]
    pub timeout_secs: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openrouter: ProviderConfig::default(),
            openai: ProviderConfig::default(),
            vllm: ProviderConfig::default(),
            timeout_secs: default_inference_timeout(),
        }
    }
}

fn default_inference_timeout() -> u64 {
    120
}

/// Shortest timeout honored; a configured 0 would fail every call at once
const MIN_TIMEOUT_SECS: u64 = 1;

fn secs(value: u64) -> std::time::Duration {
    std::time::Duration::from_secs(value.max(MIN_TIMEOUT_SECS))
}

/// Reasoning budget and sampling parameters for one agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentProfile {
    pub model: String,
    #[serde(default = "default_sub_agent_steps")]
    pub max_steps: u32,
    #[serde(default = "default_parallel_calls")]
    pub max_parallel_calls: usize,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl AgentProfile {
    fn sub_agent() -> Self {
        Self {
            model: default_sub_agent_model(),
            max_steps: default_sub_agent_steps(),
            max_parallel_calls: default_parallel_calls(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }

    fn coordinator() -> Self {
        Self {
            model: default_coordinator_model(),
            max_steps: default_coordinator_steps(),
            ..Self::sub_agent()
        }
    }
}

fn default_coordinator_model() -> String {
    "google/gemini-2.5-pro".to_string()
}

fn default_sub_agent_model() -> String {
    "google/gemini-2.5-flash".to_string()
}

fn default_coordinator_steps() -> u32 {
    12
}

fn default_sub_agent_steps() -> u32 {
    8
}

fn default_parallel_calls() -> usize {
    4
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    4096
}

fn coordinator_profile() -> AgentProfile {
    AgentProfile::coordinator()
}

fn sub_agent_profile() -> AgentProfile {
    AgentProfile::sub_agent()
}

/// Profiles for the coordinator and each specialist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    #[serde(default = "coordinator_profile")]
    pub coordinator: AgentProfile,
    #[serde(default = "sub_agent_profile")]
    pub database: AgentProfile,
    #[serde(default = "sub_agent_profile")]
    pub web: AgentProfile,
    #[serde(default = "sub_agent_profile")]
    pub calculator: AgentProfile,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            coordinator: coordinator_profile(),
            database: sub_agent_profile(),
            web: sub_agent_profile(),
            calculator: sub_agent_profile(),
        }
    }
}

/// Coordinator dispatch limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default = "default_dispatch_timeout")]
    pub timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            timeout_secs: default_dispatch_timeout(),
        }
    }
}

fn default_max_concurrent() -> usize {
    5
}

fn default_dispatch_timeout() -> u64 {
    180
}

/// Demo database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            pool_size: default_pool_size(),
        }
    }
}

fn default_storage_path() -> String {
    "~/.conductor/data/data.db".to_string()
}

fn default_pool_size() -> u32 {
    8
}

/// SerpApi search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSearchConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_location")]
    pub location: String,
    #[serde(default = "default_hl")]
    pub hl: String,
    #[serde(default = "default_gl")]
    pub gl: String,
    #[serde(default = "default_engine")]
    pub engine: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            location: default_location(),
            hl: default_hl(),
            gl: default_gl(),
            engine: default_engine(),
            max_results: default_max_results(),
            endpoint: default_search_endpoint(),
        }
    }
}

fn default_location() -> String {
    "South Korea".to_string()
}

fn default_hl() -> String {
    "ko".to_string()
}

fn default_gl() -> String {
    "kr".to_string()
}

fn default_engine() -> String {
    "google_light".to_string()
}

fn default_max_results() -> usize {
    5
}

fn default_search_endpoint() -> String {
    "https://serpapi.com/search.json".to_string()
}

/// Web toolkit configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WebToolkitConfig {
    #[serde(default)]
    pub search: WebSearchConfig,
}

/// Toolkit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolkitConfig {
    #[serde(default)]
    pub web: WebToolkitConfig,
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            web: WebToolkitConfig::default(),
            call_timeout_secs: default_call_timeout(),
        }
    }
}

fn default_call_timeout() -> u64 {
    60
}

/// Evaluation harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    #[serde(default = "default_eval_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_sub_agent_model")]
    pub judge_model: String,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            concurrency: default_eval_concurrency(),
            judge_model: default_sub_agent_model(),
        }
    }
}

fn default_eval_concurrency() -> usize {
    5
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub toolkit: ToolkitConfig,
    #[serde(default)]
    pub eval: EvalConfig,
}

impl Config {
    /// Load from the default location
    pub async fn load() -> Result<Self> {
        let path = config_path();
        Self::load_from(&path).await
    }

    /// Load from specific location
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("◆ NO CONFIG AT {:?}, USING DEFAULTS", path);
            return Ok(Config::default());
        }

        debug!("◆ LOADING CONFIG FROM {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save to the default location
    pub async fn save(&self) -> Result<()> {
        let path = config_path();
        self.save_to(&path).await
    }

    /// Save to specific location
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        debug!("◆ WRITING CONFIG TO {:?}", path);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Resolved demo database path
    pub fn storage_path(&self) -> PathBuf {
        expand_home(&self.storage.path)
    }

    /// Inference API key: config first, then environment
    pub fn api_key(&self) -> Option<String> {
        let configured = [
            &self.providers.openrouter.api_key,
            &self.providers.openai.api_key,
            &self.providers.vllm.api_key,
        ];
        if let Some(key) = configured.into_iter().find(|k| !k.is_empty()) {
            return Some(key.clone());
        }

        ["OPENROUTER_API_KEY", "OPENAI_API_KEY"]
            .into_iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|k| !k.is_empty())
    }

    /// Inference API base URL
    pub fn api_base(&self) -> Option<String> {
        if !self.providers.openrouter.api_key.is_empty() {
            return self
                .providers
                .openrouter
                .api_base
                .clone()
                .or_else(|| Some("https://openrouter.ai/api/v1".to_string()));
        }

        if !self.providers.openai.api_key.is_empty() {
            return self.providers.openai.api_base.clone();
        }

        if let Some(ref api_base) = self.providers.vllm.api_base {
            if !api_base.is_empty() {
                return Some(api_base.clone());
            }
        }

        None
    }

    /// Verify inference access
    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    /// SerpApi key: config first, then `SERPAPI_API_KEY`
    pub fn search_api_key(&self) -> Option<String> {
        let key = &self.toolkit.web.search.api_key;
        if !key.is_empty() {
            return Some(key.clone());
        }
        std::env::var("SERPAPI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
    }

    /// Per-dispatch wall-clock timeout
    pub fn dispatch_timeout(&self) -> std::time::Duration {
        secs(self.dispatch.timeout_secs)
    }

    /// Per sub-agent tool call timeout
    pub fn call_timeout(&self) -> std::time::Duration {
        secs(self.toolkit.call_timeout_secs)
    }

    /// Per inference request timeout
    pub fn inference_timeout(&self) -> std::time::Duration {
        secs(self.providers.timeout_secs)
    }
}

/// Initialize config file and data directory
pub async fn init() -> Result<Config> {
    let config_path = config_path();

    if config_path.exists() {
        warn!("◆ CONFIG ALREADY PRESENT AT {:?}", config_path);
    } else {
        let config = Config::default();
        config.save().await?;
        info!("◆ CONFIG WRITTEN TO {:?}", config_path);
    }

    let config = Config::load().await?;
    if let Some(parent) = config.storage_path().parent() {
        tokio::fs::create_dir_all(parent).await?;
        info!("◆ DATA DIRECTORY READY AT {:?}", parent);
    }

    Ok(config)
}
