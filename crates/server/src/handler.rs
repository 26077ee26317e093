//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::{
    CacheClearParams, CatalogGetParams, CatalogListParams, CatalogNotifyParams, cache, catalog,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use storefront_client::CatalogStore;
use storefront_core::ChangeBroadcaster;

/// The main MCP server handler for storefront-mcp.
#[derive(Clone)]
pub struct CatalogServer {
    store: CatalogStore,
    broadcaster: Arc<ChangeBroadcaster>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl CatalogServer {
    /// Create a new server handler over a shared store and broadcaster.
    pub fn new(store: CatalogStore, broadcaster: Arc<ChangeBroadcaster>) -> Self {
        Self { store, broadcaster, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "List catalog categories, products or collections. Unfiltered lists are cached; filters, search and force always query the API."
    )]
    async fn catalog_list(&self, params: Parameters<CatalogListParams>) -> Result<CallToolResult, McpError> {
        catalog::list_impl(&self.store, params.0).await
    }

    #[tool(description = "Get a single category, product or collection by id.")]
    async fn catalog_get(&self, params: Parameters<CatalogGetParams>) -> Result<CallToolResult, McpError> {
        catalog::get_impl(&self.store, params.0).await
    }

    #[tool(description = "Get the category tree. Categories on parent cycles are promoted to roots and listed in broken_cycles.")]
    async fn catalog_tree(&self) -> Result<CallToolResult, McpError> {
        catalog::tree_impl(&self.store).await
    }

    /// Broadcast a catalog change.
    ///
    /// Invalidates local cache entries (a product change also drops categories)
    /// and notifies every other context sharing the change channel.
    #[tool(
        description = "Announce that catalog data changed. Drops cached entries here and in every other context on the change channel."
    )]
    async fn catalog_notify(&self, params: Parameters<CatalogNotifyParams>) -> Result<CallToolResult, McpError> {
        cache::notify_impl(&self.broadcaster, params.0).await
    }

    #[tool(description = "Clear cached catalog lists in this process, for one entity type or all of them.")]
    async fn cache_clear(&self, params: Parameters<CacheClearParams>) -> Result<CallToolResult, McpError> {
        cache::clear_impl(self.store.cache(), params.0).await
    }
}

impl ServerHandler for CatalogServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "storefront-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
