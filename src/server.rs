use rmcp::ServiceExt;
use rmcp::transport::sse_server::SseServer;
use rmcp::transport::stdio;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{self, layer::SubscriberExt, util::SubscriberInitExt};

use crate::mcp::SolanaDocs;

/// Logging for the SSE server: env-filtered, formatted to stdout.
pub fn init_sse_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".to_string().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Logging for the stdio server. Stdout carries the protocol, so logs go to
/// stderr without colors.
pub fn init_stdio_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".to_string().into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

// start sse server
pub async fn start_sse_server(addr: &str, docs: SolanaDocs) -> anyhow::Result<()> {
    tracing::info!("Starting SSE server on {}", addr);

    let ct = SseServer::serve(addr.parse()?)
        .await?
        .with_service(move || docs.clone());

    tokio::signal::ctrl_c().await?;
    tracing::info!("Interrupt received, shutting down");
    ct.cancel();
    Ok(())
}

/// Cancels `ct` once `signal` resolves successfully.
pub fn cancel_on<F>(ct: CancellationToken, signal: F) -> JoinHandle<()>
where
    F: Future<Output = std::io::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        match signal.await {
            Ok(()) => {
                tracing::info!("Interrupt received, closing transport");
                ct.cancel();
            }
            Err(e) => tracing::error!("Failed to listen for interrupt: {}", e),
        }
    })
}

// start stdio server
pub async fn start_stdio_server(docs: SolanaDocs) -> anyhow::Result<()> {
    tracing::info!("Starting MCP server on stdio");

    let ct = CancellationToken::new();
    let service = docs
        .serve_with_ct(stdio(), ct.clone())
        .await
        .inspect_err(|e| {
            tracing::error!("serving error: {:?}", e);
        })?;

    let interrupt = cancel_on(ct, tokio::signal::ctrl_c());
    let reason = service.waiting().await?;
    interrupt.abort();

    tracing::info!("MCP server stopped: {:?}", reason);
    Ok(())
}
