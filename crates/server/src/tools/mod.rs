//! MCP tool implementations.
//!
//! This module contains all tools exposed by the storefront-mcp server.

pub mod cache;
pub mod catalog;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use storefront_core::Error;

pub use cache::{CacheClearParams, CatalogNotifyParams};
pub use catalog::{CatalogGetParams, CatalogListParams};

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::time::Duration;

    use rmcp::model::CallToolResult;
    use serde::de::DeserializeOwned;
    use storefront_client::{CatalogStore, FetcherConfig, RemoteFetcher, StaticToken};
    use storefront_core::{CatalogCache, ChangeBroadcaster, MemoryChannel};

    /// Decode the JSON text content of a tool result.
    pub fn output<T: DeserializeOwned>(result: &CallToolResult) -> T {
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content");
        serde_json::from_str(text).unwrap()
    }

    pub fn store(base_url: String) -> CatalogStore {
        let config = FetcherConfig { base_url, ..Default::default() };
        let fetcher = RemoteFetcher::new(config, Arc::new(StaticToken::none())).unwrap();
        CatalogStore::new(fetcher, Arc::new(CatalogCache::new(Duration::from_secs(300))))
    }

    pub fn broadcaster(store: &CatalogStore) -> Arc<ChangeBroadcaster> {
        Arc::new(ChangeBroadcaster::new(store.cache().clone(), Arc::new(MemoryChannel::new())))
    }
}
