use serde::{Deserialize, Serialize};

use super::decode;
use super::images::fix_image_path;

/// A catalog category. `parent_id` links categories into a forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(deserialize_with = "decode::id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "decode::opt_text")]
    pub slug: Option<String>,
    #[serde(default, alias = "parentId", deserialize_with = "decode::opt_id")]
    pub parent_id: Option<String>,
    #[serde(default, deserialize_with = "decode::opt_text")]
    pub description: Option<String>,
    #[serde(default, alias = "imageUrl", deserialize_with = "image_path")]
    pub image_url: Option<String>,
    #[serde(default, alias = "productCount", deserialize_with = "decode::opt_count")]
    pub product_count: Option<i64>,
    #[serde(default, alias = "displayOrder", deserialize_with = "decode::opt_count")]
    pub display_order: Option<i64>,
}

fn image_path<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(decode::opt_text(deserializer)?.and_then(|p| fix_image_path(&p)))
}

impl Category {
    /// Whether this category sits at the top of the hierarchy.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}
