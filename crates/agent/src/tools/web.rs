//! Web search tool backed by SerpApi

use async_trait::async_trait;
use conductor_config::{Config, WebSearchConfig};
use conductor_provider::{object_schema, ParamSpec, ParamType};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

use super::{parse_args, ToolErrorKind, ToolOutcome, ToolTrait};

/// Google search through SerpApi
pub struct WebSearchTool {
    client: reqwest::Client,
    api_key: Option<String>,
    settings: WebSearchConfig,
}

impl WebSearchTool {
    pub fn new(api_key: Option<String>, settings: WebSearchConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.filter(|k| !k.is_empty()),
            settings,
        }
    }

    /// Create from config
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.search_api_key(), config.toolkit.web.search.clone())
    }

    async fn search(&self, args: SearchArgs) -> ToolOutcome {
        let Some(api_key) = self.api_key.as_deref() else {
            return ToolOutcome::error(
                ToolErrorKind::Resource,
                "SERPAPI_API_KEY not configured",
            );
        };

        let location = args.location.unwrap_or_else(|| self.settings.location.clone());
        let hl = args.hl.unwrap_or_else(|| self.settings.hl.clone());
        let gl = args.gl.unwrap_or_else(|| self.settings.gl.clone());
        debug!("◆ SEARCH {} [{} {}]", args.query, hl, gl);

        let response = self
            .client
            .get(&self.settings.endpoint)
            .query(&[
                ("q", args.query.as_str()),
                ("location", location.as_str()),
                ("hl", hl.as_str()),
                ("gl", gl.as_str()),
                ("engine", self.settings.engine.as_str()),
                ("google_domain", "google.com"),
                ("api_key", api_key),
            ])
            .timeout(Duration::from_secs(30))
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                return ToolOutcome::error(
                    ToolErrorKind::Resource,
                    format!("search request failed: {}", e),
                )
            }
        };

        let status = response.status();
        if !status.is_success() {
            return ToolOutcome::error(
                ToolErrorKind::Resource,
                format!("search API returned {}", status),
            );
        }

        match response.json::<Value>().await {
            Ok(data) => ToolOutcome::ok(self.trim(data)),
            Err(e) => ToolOutcome::error(
                ToolErrorKind::Resource,
                format!("unreadable search response: {}", e),
            ),
        }
    }

    /// Keep only the answer box and the top organic results
    fn trim(&self, data: Value) -> Value {
        let mut result = Map::new();
        if let Some(answer_box) = data.get("answer_box") {
            result.insert("answer_box".to_string(), answer_box.clone());
        }
        if let Some(Value::Array(organic)) = data.get("organic_results") {
            let top: Vec<Value> = organic
                .iter()
                .take(self.settings.max_results)
                .cloned()
                .collect();
            result.insert("organic_results".to_string(), Value::Array(top));
        }
        Value::Object(result)
    }
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
    location: Option<String>,
    hl: Option<String>,
    gl: Option<String>,
}

#[async_trait]
impl ToolTrait for WebSearchTool {
    fn name(&self) -> &str {
        "google_search"
    }

    fn description(&self) -> &str {
        "Search Google and return the answer box and top organic results."
    }

    fn parameters(&self) -> Value {
        object_schema(&[
            ParamSpec::required("query", ParamType::String, "Search query"),
            ParamSpec::optional("location", ParamType::String, "Search location, e.g. 'South Korea'"),
            ParamSpec::optional("hl", ParamType::String, "Interface language, e.g. 'ko'"),
            ParamSpec::optional("gl", ParamType::String, "Country code, e.g. 'kr'"),
        ])
    }

    async fn execute(&self, args: Value) -> ToolOutcome {
        match parse_args::<SearchArgs>(self.name(), args) {
            Ok(args) => self.search(args).await,
            Err(outcome) => outcome,
        }
    }
}
