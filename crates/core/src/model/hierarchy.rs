//! Category hierarchy indices.
//!
//! Everything here is recomputed from scratch from a category list; there is
//! no incremental maintenance.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{Category, Product};

/// `parent_id -> [child_id, ...]`, children in input order.
pub type Hierarchy = HashMap<String, Vec<String>>;

/// Build the parent-to-children index for a category list.
///
/// Root categories do not appear as children of anything. Parents that are
/// not in the list are kept as keys so dangling references stay visible.
pub fn build_hierarchy(categories: &[Category]) -> Hierarchy {
    let mut index: Hierarchy = HashMap::new();
    for category in categories {
        if let Some(parent) = &category.parent_id {
            index.entry(parent.clone()).or_default().push(category.id.clone());
        }
    }
    index
}

/// A category with its resolved children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryNode {
    pub category: Category,
    pub children: Vec<CategoryNode>,
}

/// Nested category tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryTree {
    pub roots: Vec<CategoryNode>,
    /// Categories promoted to roots because their parent chain loops.
    pub broken_cycles: Vec<String>,
}

impl CategoryTree {
    /// Number of categories placed in the tree.
    pub fn len(&self) -> usize {
        fn count(nodes: &[CategoryNode]) -> usize {
            nodes.iter().map(|n| 1 + count(&n.children)).sum()
        }
        count(&self.roots)
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Build a nested tree from a flat category list.
///
/// Categories without a parent, or whose parent is missing from the list,
/// become roots. Categories that can never be reached from a root sit on a
/// parent cycle; the first of them in input order is promoted to a root and
/// reported in [`CategoryTree::broken_cycles`], then the walk continues.
pub fn build_tree(categories: &[Category]) -> CategoryTree {
    let mut by_id: HashMap<&str, &Category> = HashMap::with_capacity(categories.len());
    for category in categories {
        by_id.entry(category.id.as_str()).or_insert(category);
    }
    let hierarchy = build_hierarchy(categories);

    let mut visited: HashSet<String> = HashSet::with_capacity(categories.len());
    let mut tree = CategoryTree::default();

    for category in categories {
        let dangling = match &category.parent_id {
            None => true,
            Some(parent) => parent != &category.id && !by_id.contains_key(parent.as_str()),
        };
        if dangling && let Some(node) = build_node(&category.id, &by_id, &hierarchy, &mut visited) {
            tree.roots.push(node);
        }
    }

    for category in categories {
        if visited.contains(&category.id) {
            continue;
        }
        tracing::warn!(
            category_id = %category.id,
            parent_id = ?category.parent_id,
            "category hierarchy cycle broken; promoting category to root"
        );
        tree.broken_cycles.push(category.id.clone());
        if let Some(node) = build_node(&category.id, &by_id, &hierarchy, &mut visited) {
            tree.roots.push(node);
        }
    }

    tree
}

fn build_node(
    id: &str, by_id: &HashMap<&str, &Category>, hierarchy: &Hierarchy, visited: &mut HashSet<String>,
) -> Option<CategoryNode> {
    let category = by_id.get(id)?;
    if !visited.insert(id.to_string()) {
        return None;
    }

    let children = hierarchy
        .get(id)
        .map(|ids| {
            ids.iter()
                .filter_map(|child| build_node(child, by_id, hierarchy, visited))
                .collect()
        })
        .unwrap_or_default();

    Some(CategoryNode { category: (*category).clone(), children })
}

/// Count products per category id. Products without a category are skipped.
pub fn product_counts(products: &[Product]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for product in products {
        if let Some(category) = &product.category_id {
            *counts.entry(category.clone()).or_insert(0) += 1;
        }
    }
    counts
}
