use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, ValueEnum};

use solana_docs_mcp::fetcher::{DEFAULT_USER_AGENT, FetcherConfig, HttpFetcher};
use solana_docs_mcp::mcp::{DEFAULT_API_BASE_URL, DEFAULT_DOCS_BASE_URL, DocsSites, SolanaDocs};
use solana_docs_mcp::search::SearchOptions;
use solana_docs_mcp::server;

#[derive(Parser, Debug)]
#[command(version, about = "Solana Documentation MCP Server")]
struct Cli {
    /// Type of server to run
    #[arg(short, long, value_enum, default_value_t = ServerType::Stdio)]
    server_type: ServerType,

    /// Address for the SSE server
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    address: String,

    /// Origin of the documentation site used for sections and search
    #[arg(long, default_value = DEFAULT_DOCS_BASE_URL)]
    docs_base_url: String,

    /// Base URL of the solana_sdk API reference
    #[arg(long, default_value = DEFAULT_API_BASE_URL)]
    api_base_url: String,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// User-Agent header sent to the documentation sites
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    user_agent: String,

    /// Maximum number of pages fetched at once during a search (unbounded if unset)
    #[arg(long)]
    search_concurrency: Option<usize>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ServerType {
    /// Start an SSE server
    Sse,
    /// Start a stdio server
    Stdio,
}

impl Cli {
    fn build_service(&self) -> Result<SolanaDocs> {
        let fetcher = HttpFetcher::new(&FetcherConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            user_agent: self.user_agent.clone(),
        })?;
        let sites = DocsSites::new(&self.docs_base_url, &self.api_base_url);
        let search_options = SearchOptions {
            max_concurrency: self.search_concurrency,
        };
        Ok(SolanaDocs::new(Arc::new(fetcher), sites, search_options))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.server_type {
        ServerType::Sse => {
            server::init_sse_tracing();
            let docs = cli.build_service()?;
            server::start_sse_server(&cli.address, docs).await?;
        },
        ServerType::Stdio => {
            server::init_stdio_tracing();
            let docs = cli.build_service()?;
            server::start_stdio_server(docs).await?;
        },
    }

    Ok(())
}
