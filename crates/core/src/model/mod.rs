//! Catalog entities, change notifications and derived indices.

pub mod category;
pub mod collection;
pub mod decode;
pub mod hierarchy;
pub mod images;
pub mod product;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::Error;

pub use category::Category;
pub use collection::Collection;
pub use hierarchy::{CategoryNode, CategoryTree, Hierarchy, build_hierarchy, build_tree, product_counts};
pub use images::{PLACEHOLDER_IMAGE, ProductImages};
pub use product::{Product, UNCATEGORIZED};

/// Granularity at which catalog data is cached and invalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Category,
    Product,
    Collection,
}

impl EntityType {
    pub const ALL: [EntityType; 3] = [EntityType::Category, EntityType::Product, EntityType::Collection];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Category => "category",
            EntityType::Product => "product",
            EntityType::Collection => "collection",
        }
    }

    pub fn plural(self) -> &'static str {
        match self {
            EntityType::Category => "categories",
            EntityType::Product => "products",
            EntityType::Collection => "collections",
        }
    }

    /// Collection endpoint for this entity type, e.g. `/api/products`.
    pub fn api_path(self) -> String {
        format!("/api/{}", self.plural())
    }

    /// Cache entries to drop when this entity type changes.
    ///
    /// Product changes alter category product counts, so they also drop the
    /// category entry.
    pub fn invalidation_targets(self) -> &'static [EntityType] {
        match self {
            EntityType::Product => &[EntityType::Product, EntityType::Category],
            EntityType::Category => &[EntityType::Category],
            EntityType::Collection => &[EntityType::Collection],
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        EntityType::ALL
            .into_iter()
            .find(|kind| lowered == kind.as_str() || lowered == kind.plural())
            .ok_or_else(|| Error::InvalidInput(format!("unknown entity type: {s}")))
    }
}

/// Kind of mutation a change notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
}

impl ChangeAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeAction::Create => "create",
            ChangeAction::Update => "update",
            ChangeAction::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" | "created" => Ok(ChangeAction::Create),
            "update" | "updated" => Ok(ChangeAction::Update),
            "delete" | "deleted" => Ok(ChangeAction::Delete),
            _ => Err(Error::InvalidInput(format!("unknown change action: {s}"))),
        }
    }
}

/// A single catalog mutation, as carried over the change channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeNotification {
    pub entity_type: EntityType,
    pub action: ChangeAction,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Identifier of the publishing context, used to skip its own echo.
    #[serde(default)]
    pub origin: String,
}

impl ChangeNotification {
    pub fn new(entity_type: EntityType, action: ChangeAction, payload: serde_json::Value, origin: &str) -> Self {
        Self { entity_type, action, payload, timestamp: Utc::now(), origin: origin.to_string() }
    }
}

/// Behaviour shared by categories, products and collections.
pub trait CatalogEntity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: EntityType;

    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn slug(&self) -> Option<&str>;
}

impl CatalogEntity for Category {
    const KIND: EntityType = EntityType::Category;

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }
}

impl CatalogEntity for Product {
    const KIND: EntityType = EntityType::Product;

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }
}

impl CatalogEntity for Collection {
    const KIND: EntityType = EntityType::Collection;

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }
}
