//! Solana documentation MCP implementation.
//!
//! This module exposes three tools over MCP:
//!
//! - `get_latest_docs`: fetch one section of the Solana documentation site
//! - `search_docs`: search every page linked from the site's navigation
//! - `get_api_reference`: look up an item of the `solana_sdk` API on docs.rs
//!
//! Every successful call returns a pretty-printed JSON envelope stamped with
//! the time it was produced. Fetch and extraction failures come back as a
//! tool result flagged as an error; malformed arguments and unknown tool
//! names are protocol errors.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use solana_docs_mcp::fetcher::{FetcherConfig, HttpFetcher};
//! use solana_docs_mcp::mcp::{DocsSites, SolanaDocs};
//! use solana_docs_mcp::search::SearchOptions;
//!
//! fn example() -> anyhow::Result<()> {
//!     let fetcher = Arc::new(HttpFetcher::new(&FetcherConfig::default())?);
//!     let server = SolanaDocs::new(fetcher, DocsSites::default(), SearchOptions::default());
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use rmcp::handler::server::tool::cached_schema_for_type;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, ErrorCode, Implementation, JsonObject,
    ListToolsResult, PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::schemars;
use rmcp::service::RequestContext;
use rmcp::{Error as McpError, RoleServer, ServerHandler};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::docs_parser::{self, ExtractError, FULL_PAGE_LIMIT, SelectorRules};
use crate::fetcher::{FetchError, PageFetcher};
use crate::nav;
use crate::search::{self, DocSection, SearchOptions};

pub const DEFAULT_DOCS_BASE_URL: &str = "https://docs.solana.com";
pub const DEFAULT_API_BASE_URL: &str = "https://docs.rs/solana-sdk/latest/solana_sdk";

pub const GET_LATEST_DOCS: &str = "get_latest_docs";
pub const SEARCH_DOCS: &str = "search_docs";
pub const GET_API_REFERENCE: &str = "get_api_reference";

/// Failures reported inline in a tool result.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Failed to parse documentation: {0}")]
    Extract(#[from] ExtractError),

    #[error("Invalid documentation URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Remote origins the tools read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocsSites {
    docs_base_url: String,
    api_base_url: String,
}

impl DocsSites {
    pub fn new(docs_base_url: &str, api_base_url: &str) -> Self {
        Self {
            docs_base_url: docs_base_url.trim_end_matches('/').to_string(),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn docs_base_url(&self) -> &str {
        &self.docs_base_url
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn section_url(&self, section: &str) -> String {
        format!("{}/{}", self.docs_base_url, section.trim_start_matches('/'))
    }

    /// docs.rs paths are lower case, so the item is lower-cased first.
    pub fn api_item_url(&self, item: &str) -> String {
        format!("{}/{}", self.api_base_url, item.trim_start_matches('/').to_lowercase())
    }

    /// Base for resolving navigation hrefs. The trailing slash keeps relative
    /// hrefs under the docs path.
    fn docs_origin(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!("{}/", self.docs_base_url))
    }
}

impl Default for DocsSites {
    fn default() -> Self {
        Self::new(DEFAULT_DOCS_BASE_URL, DEFAULT_API_BASE_URL)
    }
}

/// Arguments that carry a single required, non-empty string.
trait ToolArguments: DeserializeOwned {
    const FIELD: &'static str;

    fn value(&self) -> &str;
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema, PartialEq, Eq)]
pub struct GetDocsRequest {
    #[schemars(description = "Documentation section path, e.g. 'cluster/overview'")]
    pub section: String,
}

impl ToolArguments for GetDocsRequest {
    const FIELD: &'static str = "section";

    fn value(&self) -> &str {
        &self.section
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema, PartialEq, Eq)]
pub struct SearchDocsRequest {
    #[schemars(description = "Text to search for, matched case-insensitively")]
    pub query: String,
}

impl ToolArguments for SearchDocsRequest {
    const FIELD: &'static str = "query";

    fn value(&self) -> &str {
        &self.query
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema, PartialEq, Eq)]
pub struct ApiReferenceRequest {
    #[schemars(description = "Item of the solana_sdk crate, e.g. 'pubkey' or 'transaction'")]
    pub item: String,
}

impl ToolArguments for ApiReferenceRequest {
    const FIELD: &'static str = "item";

    fn value(&self) -> &str {
        &self.item
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SearchResults {
    pub query: String,
    pub results: Vec<DocSection>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ApiReference {
    pub item: String,
    pub signature: String,
    pub documentation: String,
    pub url: String,
}

/// Success payload: the tool's fields plus an ISO-8601 timestamp.
#[derive(Debug, Serialize)]
struct Envelope<T> {
    #[serde(flatten)]
    body: T,
    timestamp: String,
}

fn parse_arguments<T: ToolArguments>(arguments: Option<JsonObject>) -> Result<T, McpError> {
    let arguments = serde_json::Value::Object(arguments.unwrap_or_default());
    let request: T = serde_json::from_value(arguments)
        .map_err(|e| McpError::invalid_params(format!("Invalid arguments: {e}"), None))?;

    if request.value().trim().is_empty() {
        return Err(McpError::invalid_params(
            format!("'{}' must be a non-empty string", T::FIELD),
            None,
        ));
    }
    Ok(request)
}

fn envelope<T: Serialize>(body: T) -> Result<CallToolResult, McpError> {
    let envelope = Envelope {
        body,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    };
    let text = serde_json::to_string_pretty(&envelope)
        .map_err(|e| McpError::internal_error(format!("Failed to serialize result: {e}"), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

fn respond<T: Serialize>(
    result: Result<T, ToolError>,
    action: &str,
) -> Result<CallToolResult, McpError> {
    match result {
        Ok(body) => envelope(body),
        Err(err) => {
            tracing::warn!("Error {}: {}", action, err);
            Ok(CallToolResult::error(vec![Content::text(format!("Error {action}: {err}"))]))
        }
    }
}

/// The documentation server: three tools over a shared page fetcher.
#[derive(Clone)]
pub struct SolanaDocs {
    fetcher: Arc<dyn PageFetcher>,
    sites: Arc<DocsSites>,
    search_options: SearchOptions,
}

impl SolanaDocs {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        sites: DocsSites,
        search_options: SearchOptions,
    ) -> Self {
        Self {
            fetcher,
            sites: Arc::new(sites),
            search_options,
        }
    }

    /// Fetches one documentation section.
    ///
    /// The section body is cut to 1000 characters.
    pub async fn get_latest_docs(&self, request: GetDocsRequest) -> Result<DocSection, ToolError> {
        let url = self.sites.section_url(&request.section);
        tracing::info!("Fetching docs section '{}' from {}", request.section, url);

        let markup = self.fetcher.fetch(&url).await?;
        let extracted = docs_parser::extract(&markup, &SelectorRules::docs_page())?;

        Ok(DocSection {
            title: extracted.title,
            content: docs_parser::truncate_with_ellipsis(&extracted.body, FULL_PAGE_LIMIT),
            url,
        })
    }

    /// Searches every internal page linked from the landing page.
    ///
    /// Only a failure to load the landing page itself is an error; pages
    /// that fail during the search are left out of the results.
    pub async fn search_docs(
        &self,
        request: SearchDocsRequest,
    ) -> Result<SearchResults, ToolError> {
        let origin = self.sites.docs_origin()?;
        let links = nav::enumerate(self.fetcher.as_ref(), self.sites.docs_base_url()).await?;

        let results = search::search(
            self.fetcher.clone(),
            &origin,
            &request.query,
            links,
            &self.search_options,
        )
        .await;
        tracing::info!("Search for '{}' matched {} pages", request.query, results.len());

        Ok(SearchResults {
            query: request.query,
            results,
        })
    }

    /// Looks up an item of the API reference.
    pub async fn get_api_reference(
        &self,
        request: ApiReferenceRequest,
    ) -> Result<ApiReference, ToolError> {
        let url = self.sites.api_item_url(&request.item);
        tracing::info!("Fetching API reference for '{}' from {}", request.item, url);

        let markup = self.fetcher.fetch(&url).await?;
        let extracted = docs_parser::extract(&markup, &SelectorRules::api_reference())?;

        Ok(ApiReference {
            item: request.item,
            signature: extracted.title,
            documentation: docs_parser::truncate_with_ellipsis(&extracted.body, FULL_PAGE_LIMIT),
            url,
        })
    }

    /// Definitions returned from `tools/list`.
    pub fn tools() -> Vec<Tool> {
        vec![
            Tool::new(
                GET_LATEST_DOCS,
                "Fetch a section of the latest Solana documentation",
                cached_schema_for_type::<GetDocsRequest>(),
            ),
            Tool::new(
                SEARCH_DOCS,
                "Search the Solana documentation for pages containing the query text",
                cached_schema_for_type::<SearchDocsRequest>(),
            ),
            Tool::new(
                GET_API_REFERENCE,
                "Look up an item in the solana_sdk API reference on docs.rs",
                cached_schema_for_type::<ApiReferenceRequest>(),
            ),
        ]
    }

    /// Routes a `tools/call` request. Arguments are validated before any
    /// network request is made.
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, McpError> {
        match name {
            GET_LATEST_DOCS => {
                let request = parse_arguments::<GetDocsRequest>(arguments)?;
                respond(self.get_latest_docs(request).await, "fetching documentation")
            }
            SEARCH_DOCS => {
                let request = parse_arguments::<SearchDocsRequest>(arguments)?;
                respond(self.search_docs(request).await, "searching documentation")
            }
            GET_API_REFERENCE => {
                let request = parse_arguments::<ApiReferenceRequest>(arguments)?;
                respond(self.get_api_reference(request).await, "fetching API reference")
            }
            unknown => {
                tracing::warn!("Call to unknown tool '{}'", unknown);
                Err(McpError::new(
                    ErrorCode::METHOD_NOT_FOUND,
                    format!("Unknown tool: {unknown}"),
                    None,
                ))
            }
        }
    }
}

impl ServerHandler for SolanaDocs {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "This server provides access to the Solana documentation. \
                Use 'get_latest_docs' to read a documentation section, \
                'search_docs' to find pages mentioning some text, and \
                'get_api_reference' to look up an item of the solana_sdk crate on docs.rs."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: PaginatedRequestParam,
        _: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            next_cursor: None,
            tools: Self::tools(),
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch(&request.name, request.arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingFetcher, docs_page};
    use serde_json::{Value, json};

    const DOCS: &str = "https://docs.example";
    const API: &str = "https://api.example/solana_sdk";

    fn server(fetcher: Arc<RecordingFetcher>) -> SolanaDocs {
        SolanaDocs::new(fetcher, DocsSites::new(DOCS, API), SearchOptions::default())
    }

    fn args(value: Value) -> Option<JsonObject> {
        value.as_object().cloned()
    }

    fn text(result: &CallToolResult) -> String {
        result.content[0].as_text().unwrap().text.clone()
    }

    fn payload(result: &CallToolResult) -> Value {
        assert_ne!(result.is_error, Some(true), "unexpected error: {}", text(result));
        serde_json::from_str(&text(result)).unwrap()
    }

    #[tokio::test]
    async fn test_get_latest_docs() {
        let body = "stake ".repeat(400);
        let fetcher = Arc::new(
            RecordingFetcher::default()
                .with_page(format!("{DOCS}/staking"), docs_page("Staking", &body)),
        );

        let result = server(fetcher.clone())
            .dispatch(GET_LATEST_DOCS, args(json!({ "section": "staking" })))
            .await
            .unwrap();
        let payload = payload(&result);

        assert_eq!(payload["title"], "Staking");
        assert_eq!(payload["url"], format!("{DOCS}/staking"));
        let content = payload["content"].as_str().unwrap();
        assert!(content.chars().count() <= FULL_PAGE_LIMIT + 3);
        assert!(content.ends_with("..."));
        let timestamp = payload["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
        assert_eq!(fetcher.requested(), vec![format!("{DOCS}/staking")]);
    }

    #[tokio::test]
    async fn test_get_latest_docs_fetch_failure_is_inline_error() {
        let fetcher = Arc::new(RecordingFetcher::default());

        let result = server(fetcher)
            .dispatch(GET_LATEST_DOCS, args(json!({ "section": "missing" })))
            .await
            .unwrap();

        assert_eq!(result.is_error, Some(true));
        let message = text(&result);
        assert!(message.starts_with("Error fetching documentation:"));
        assert!(message.contains("404"));
    }

    #[tokio::test]
    async fn test_search_docs() {
        let landing = r#"<html><body><nav>
            <a href="/validators">Validators</a>
            <a href="/broken">Broken</a>
            <a href="https://external.example/x">External</a>
            <a href="/clusters">Clusters</a>
            </nav></body></html>"#;
        let fetcher = Arc::new(
            RecordingFetcher::default()
                .with_page(DOCS, landing)
                .with_page(
                    format!("{DOCS}/validators"),
                    docs_page("Validators", "Running a Validator"),
                )
                .with_page(format!("{DOCS}/clusters"), docs_page("Clusters", "Devnet and testnet")),
        );

        let result = server(fetcher.clone())
            .dispatch(SEARCH_DOCS, args(json!({ "query": "VALIDATOR" })))
            .await
            .unwrap();
        let payload = payload(&result);

        assert_eq!(payload["query"], "VALIDATOR");
        let results = payload["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["title"], "Validators");
        assert_eq!(results[0]["url"], format!("{DOCS}/validators"));
        assert!(payload["timestamp"].is_string());

        let requested = fetcher.requested();
        assert_eq!(requested.len(), 4);
        assert!(!requested.iter().any(|url| url.contains("external.example")));
    }

    #[tokio::test]
    async fn test_search_docs_all_pages_failing() {
        let landing = r#"<html><body><nav>
            <a href="/a">A</a><a href="/b">B</a>
            </nav></body></html>"#;
        let fetcher = Arc::new(RecordingFetcher::default().with_page(DOCS, landing));

        let result = server(fetcher)
            .dispatch(SEARCH_DOCS, args(json!({ "query": "anything" })))
            .await
            .unwrap();

        assert_eq!(payload(&result)["results"], json!([]));
    }

    #[tokio::test]
    async fn test_search_docs_landing_failure_is_inline_error() {
        let result = server(Arc::new(RecordingFetcher::default()))
            .dispatch(SEARCH_DOCS, args(json!({ "query": "anything" })))
            .await
            .unwrap();

        assert_eq!(result.is_error, Some(true));
        assert!(text(&result).starts_with("Error searching documentation:"));
    }

    #[tokio::test]
    async fn test_get_api_reference_lowercases_item() {
        let page = r#"<html><body>
            <pre class="rust item-decl"><code>pub struct Pubkey(/* private fields */);</code></pre>
            <div class="docblock"><p>The address of a Solana account.</p></div>
            </body></html>"#;
        let fetcher =
            Arc::new(RecordingFetcher::default().with_page(format!("{API}/pubkey"), page));

        let result = server(fetcher.clone())
            .dispatch(GET_API_REFERENCE, args(json!({ "item": "PubKey" })))
            .await
            .unwrap();
        let payload = payload(&result);

        assert_eq!(fetcher.requested(), vec![format!("{API}/pubkey")]);
        assert_eq!(payload["item"], "PubKey");
        assert_eq!(payload["signature"], "pub struct Pubkey(/* private fields */);");
        assert_eq!(payload["documentation"], "The address of a Solana account.");
        assert_eq!(payload["url"], format!("{API}/pubkey"));
    }

    #[tokio::test]
    async fn test_missing_argument_is_invalid_params() {
        let fetcher = Arc::new(RecordingFetcher::default());
        let server = server(fetcher.clone());

        for (tool, arguments) in [
            (SEARCH_DOCS, None),
            (SEARCH_DOCS, args(json!({}))),
            (GET_LATEST_DOCS, args(json!({ "section": 42 }))),
            (GET_API_REFERENCE, args(json!({ "item": "" }))),
            (GET_API_REFERENCE, args(json!({ "item": null }))),
        ] {
            let err = server.dispatch(tool, arguments).await.unwrap_err();
            assert_eq!(err.code, ErrorCode::INVALID_PARAMS, "tool {tool}");
        }

        assert!(fetcher.requested().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tool_is_method_not_found() {
        let fetcher = Arc::new(RecordingFetcher::default());

        let err = server(fetcher.clone())
            .dispatch("get_validator_list", args(json!({ "query": "x" })))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::METHOD_NOT_FOUND);
        assert!(fetcher.requested().is_empty());
    }

    #[test]
    fn test_tool_definitions() {
        let tools = SolanaDocs::tools();
        let names = tools.iter().map(|t| t.name.as_ref()).collect::<Vec<_>>();
        assert_eq!(names, vec![GET_LATEST_DOCS, SEARCH_DOCS, GET_API_REFERENCE]);

        for (tool, field) in tools.iter().zip(["section", "query", "item"]) {
            let required = tool.input_schema.get("required").unwrap();
            assert_eq!(required, &json!([field]));
            assert_eq!(tool.input_schema["properties"][field]["type"], "string");
        }
    }

    #[test]
    fn test_docs_sites_urls() {
        let sites = DocsSites::new("https://docs.example/", API);
        assert_eq!(sites.section_url("cluster/overview"), "https://docs.example/cluster/overview");
        assert_eq!(sites.section_url("/cluster/overview"), "https://docs.example/cluster/overview");
        assert_eq!(sites.api_item_url("PubKey"), format!("{API}/pubkey"));

        let defaults = DocsSites::default();
        assert_eq!(defaults.docs_base_url(), DEFAULT_DOCS_BASE_URL);
        assert_eq!(defaults.api_base_url(), DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_server_info() {
        let info = server(Arc::new(RecordingFetcher::default())).get_info();
        assert!(info.capabilities.tools.is_some());
        assert!(info.instructions.unwrap().contains(SEARCH_DOCS));
    }
}
