//! Tools available to the analysis agents.
//!
//! A [`Tool`] takes JSON input and returns JSON output. [`ToolSet`] is the
//! name-indexed collection an agent is given for one call; it also produces
//! the [`ToolDefinition`]s sent to the model.

use async_trait::async_trait;
use llm::ToolDefinition;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors a tool can report. The agent turns them into tool messages so the
/// model can see what went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Tool execution failed: {0}")]
    Execution(String),
}

/// Tool trait for implementing agent tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name
    fn name(&self) -> &str;

    /// Get the tool description
    fn description(&self) -> &str;

    /// Get the input schema (optional)
    fn input_schema(&self) -> Option<Value> {
        None
    }

    /// Execute the tool with the given input
    async fn execute(&self, input: Value) -> Result<Value, ToolError>;
}

/// Named collection of tools handed to an agent.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions to bind on a chat request, ordered by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|tool| {
                let def = ToolDefinition::new(tool.name(), tool.description());
                match tool.input_schema() {
                    Some(schema) => def.with_parameters(schema),
                    None => def,
                }
            })
            .collect()
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, input: Value) -> Result<Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.execute(input).await
    }
}

impl std::fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSet").field("tools", &self.names()).finish()
    }
}

/// Searches the submitted document for passages relevant to a query.
///
/// Passages are paragraphs (blank-line separated). A document without blank
/// lines is split per line instead. Passages are ranked by how many distinct
/// query terms they contain; ties keep document order.
#[derive(Debug, Clone)]
pub struct DocumentLookupTool {
    passages: Vec<String>,
    top_k: usize,
}

impl DocumentLookupTool {
    pub const NAME: &'static str = "document_lookup";
    pub const DEFAULT_TOP_K: usize = 3;

    pub fn new(document: &str) -> Self {
        Self {
            passages: split_passages(document),
            top_k: Self::DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn passage_count(&self) -> usize {
        self.passages.len()
    }

    /// Best matching passages for `query`, most relevant first.
    pub fn search(&self, query: &str) -> Vec<&str> {
        let terms = terms(query);
        if terms.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, usize)> = self
            .passages
            .iter()
            .enumerate()
            .filter_map(|(index, passage)| {
                let words = terms_of(passage);
                let hits = terms.iter().filter(|t| words.contains(t.as_str())).count();
                (hits > 0).then_some((index, hits))
            })
            .collect();

        scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        scored
            .into_iter()
            .take(self.top_k)
            .map(|(index, _)| self.passages[index].as_str())
            .collect()
    }
}

#[async_trait]
impl Tool for DocumentLookupTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Search the submitted business document for passages relevant to a query. \
         Use it to ground answers about specific workflow steps, tools and metrics."
    }

    fn input_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "What to look for in the document"}
            },
            "required": ["query"]
        }))
    }

    async fn execute(&self, input: Value) -> Result<Value, ToolError> {
        let query = query_input(&input)?;

        let hits = self.search(query);
        if hits.is_empty() {
            return Ok(Value::String("No matching passages found in the document.".into()));
        }
        Ok(Value::String(hits.join("\n")))
    }
}

/// Searches Wikipedia through the MediaWiki `list=search` API.
///
/// Returns one `Page:`/`Summary:` block per article, best match first.
#[derive(Debug, Clone)]
pub struct WikipediaSearchTool {
    http: Client,
    url: String,
    top_k: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
    #[serde(default)]
    snippet: String,
}

impl WikipediaSearchTool {
    pub const NAME: &'static str = "wikipedia_search";
    pub const DEFAULT_URL: &'static str = "https://en.wikipedia.org/w/api.php";
    pub const DEFAULT_TOP_K: usize = 2;
    const NO_RESULTS: &'static str = "No good Wikipedia Search Result was found";

    pub fn new(timeout: Duration) -> Result<Self, ToolError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("workwise/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ToolError::Execution(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            http,
            url: Self::DEFAULT_URL.to_string(),
            top_k: Self::DEFAULT_TOP_K,
        })
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn search(&self, query: &str) -> Result<String, ToolError> {
        let limit = self.top_k.to_string();
        let response = self
            .http
            .get(&self.url)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("format", "json"),
                ("srsearch", query),
                ("srlimit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ToolError::Execution(format!("search request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ToolError::Execution(format!(
                "search returned HTTP {}",
                response.status().as_u16()
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ToolError::Execution(format!("unreadable search response: {}", e)))?;
        let hits = body.query.map(|q| q.search).unwrap_or_default();
        debug!(query, hits = hits.len(), "wikipedia search finished");
        Ok(format_hits(&hits, self.top_k))
    }
}

#[async_trait]
impl Tool for WikipediaSearchTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Search Wikipedia for general knowledge about companies, industries, \
         business practices and software tools. Input is a search query."
    }

    fn input_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "Search terms"}
            },
            "required": ["query"]
        }))
    }

    async fn execute(&self, input: Value) -> Result<Value, ToolError> {
        let query = query_input(&input)?;
        if query.trim().is_empty() {
            return Err(ToolError::InvalidInput("'query' must not be empty".into()));
        }
        self.search(query).await.map(Value::String)
    }
}

fn query_input(input: &Value) -> Result<&str, ToolError> {
    match input {
        Value::String(q) => Ok(q.as_str()),
        other => other
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidInput("'query' (string) is required".into())),
    }
}

fn markup_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]*>").expect("markup pattern is a valid regex"))
}

/// Snippets come back as HTML with `searchmatch` spans.
fn plain_text(snippet: &str) -> String {
    markup_pattern()
        .replace_all(snippet, "")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn format_hits(hits: &[SearchHit], top_k: usize) -> String {
    if hits.is_empty() {
        return WikipediaSearchTool::NO_RESULTS.to_string();
    }
    hits.iter()
        .take(top_k)
        .map(|hit| format!("Page: {}\nSummary: {}", hit.title, plain_text(&hit.snippet)))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn split_passages(document: &str) -> Vec<String> {
    let paragraphs: Vec<String> = document
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();

    if paragraphs.len() > 1 {
        return paragraphs;
    }

    document
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(str::to_lowercase)
}

fn terms(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    words(query).filter(|w| seen.insert(w.clone())).collect()
}

fn terms_of(passage: &str) -> HashSet<String> {
    words(passage).collect()
}
