//! MCP server initialization for stdio and streamable HTTP transports.
//!
//! Provides [`serve_stdio`] and [`serve_http`] entry points that open spatial
//! memory, build the loop enhancer, and wire both into the MCP tool handler.

use crate::config::PokenavConfig;
use crate::navigation::enhancer::LoopEnhancer;
use crate::spatial::planner::Planner;
use crate::tools::PokenavTools;
use anyhow::Result;
use rmcp::ServiceExt;
use std::sync::{Arc, Mutex};

/// Shared setup: open the stores and build the enhancer.
///
/// Store failures do not abort startup; the planner comes up disabled and
/// every spatial tool answers with `success: false`.
fn setup_shared_state(
    config: PokenavConfig,
) -> (Arc<Mutex<Planner>>, Arc<Mutex<LoopEnhancer>>, Arc<PokenavConfig>) {
    let planner = Planner::open(&config);
    if planner.is_available() {
        tracing::info!(
            coordinates = %config.resolved_coordinate_db_path().display(),
            healing = %config.resolved_healing_db_path().display(),
            bookmarks = %config.resolved_bookmark_path().display(),
            "spatial stores ready"
        );
    }

    let enhancer = LoopEnhancer::from_config(&config);
    tracing::info!(
        method = %config.navigation.similarity_method,
        history = config.navigation.history_size,
        "loop enhancer ready"
    );

    (
        Arc::new(Mutex::new(planner)),
        Arc::new(Mutex::new(enhancer)),
        Arc::new(config),
    )
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: PokenavConfig) -> Result<()> {
    tracing::info!("starting pokenav MCP server on stdio");

    let (planner, enhancer, config) = setup_shared_state(config);

    let tools = PokenavTools::new(planner, enhancer, config);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}

/// Start the MCP server over streamable HTTP transport.
///
/// All sessions share one planner and one enhancer: the server assumes a
/// single agent.
pub async fn serve_http(config: PokenavConfig) -> Result<()> {
    let host = config.server.host.clone();
    let port = config.server.port;
    let bind_addr = format!("{host}:{port}");

    tracing::info!(addr = %bind_addr, "starting pokenav MCP server on HTTP");

    let (planner, enhancer, config) = setup_shared_state(config);

    let service = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || {
            Ok(PokenavTools::new(
                planner.clone(),
                enhancer.clone(),
                config.clone(),
            ))
        },
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "MCP server listening at http://{bind_addr}/mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}
