//! catalog_tree tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use storefront_client::CatalogStore;

use crate::tools::json_result;

/// Implementation of the catalog_tree tool.
///
/// Returns `{roots, broken_cycles}` for the current category list.
pub async fn tree_impl(store: &CatalogStore) -> Result<CallToolResult, McpError> {
    let tree = store.category_tree().await;
    if !tree.broken_cycles.is_empty() {
        tracing::warn!(categories = ?tree.broken_cycles, "category tree contains parent cycles");
    }
    json_result(&tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{output, store};
    use httpmock::Method::GET;
    use httpmock::MockServer;
    use serde_json::{Value, json};

    #[tokio::test]
    async fn test_tree_nests_children_and_reports_cycles() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/categories");
                then.status(200).json_body(json!([
                    {"id": 1, "name": "Bags"},
                    {"id": 2, "name": "Totes", "parent_id": 1},
                    {"id": 3, "name": "Loop A", "parent_id": 4},
                    {"id": 4, "name": "Loop B", "parent_id": 3}
                ]));
            })
            .await;

        let result = tree_impl(&store(server.base_url())).await.unwrap();
        let out: Value = output(&result);

        assert_eq!(out["roots"][0]["category"]["name"], "Bags");
        assert_eq!(out["roots"][0]["children"][0]["category"]["id"], "2");
        assert_eq!(out["roots"].as_array().unwrap().len(), 2);
        assert_eq!(out["broken_cycles"], json!(["3"]));
    }
}
