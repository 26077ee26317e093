use serde::{Deserialize, Serialize};

use super::decode;
use super::images::fix_image_path;

/// A curated collection of products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    #[serde(deserialize_with = "decode::id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "decode::opt_text")]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "decode::opt_text")]
    pub description: Option<String>,
    #[serde(default, alias = "imageUrl", deserialize_with = "image_path")]
    pub image_url: Option<String>,
    #[serde(default, alias = "productIds", deserialize_with = "decode::ids")]
    pub product_ids: Vec<String>,
    #[serde(default, alias = "isFeatured", alias = "is_featured", deserialize_with = "decode::flag")]
    pub featured: bool,
}

fn image_path<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(decode::opt_text(deserializer)?.and_then(|p| fix_image_path(&p)))
}

impl Collection {
    pub fn contains(&self, product_id: &str) -> bool {
        self.product_ids.iter().any(|id| id == product_id)
    }
}
