//! Product image normalization.
//!
//! Image data reaches the storefront in three shapes: a flat `image_url`
//! string, an array of `product_images` rows tagged `primary`/`gallery`, or an
//! already-normalized `{primary, gallery}` object. Each shape is decoded once
//! into [`ImageField`] and folded into a single [`ProductImages`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Image used when a product carries no usable primary image.
pub const PLACEHOLDER_IMAGE: &str = "/images/placeholder.jpg";

/// Canonical image set of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductImages {
    pub primary: String,
    pub gallery: Vec<String>,
}

impl Default for ProductImages {
    fn default() -> Self {
        Self { primary: PLACEHOLDER_IMAGE.to_string(), gallery: Vec::new() }
    }
}

/// One row of the `product_images` table as returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageRow {
    #[serde(default, alias = "imageType", alias = "type")]
    pub image_type: Option<String>,
    #[serde(default, alias = "imageUrl", alias = "url")]
    pub image_url: Option<String>,
}

/// Every image shape the API is known to send.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ImageField {
    Rows(Vec<ImageRow>),
    Normalized {
        #[serde(default)]
        primary: Option<String>,
        #[serde(default)]
        gallery: Vec<String>,
    },
    Flat(String),
}

/// Prefix relative paths with `/`; absolute URLs are left alone.
///
/// Returns `None` for blank input.
pub fn fix_image_path(raw: &str) -> Option<String> {
    let path = raw.trim();
    if path.is_empty() {
        return None;
    }

    let absolute = path.starts_with('/') || path.starts_with("data:") || path.contains("://");
    if absolute { Some(path.to_string()) } else { Some(format!("/{path}")) }
}

/// Fold the decoded image fields of a product into [`ProductImages`].
///
/// Precedence for the primary image: the row tagged `primary` (or the
/// `primary` field of a normalized object), then the flat `image_url`, then
/// [`PLACEHOLDER_IMAGE`].
pub fn normalize_images(fields: impl IntoIterator<Item = ImageField>, flat: Option<&str>) -> ProductImages {
    let mut primary: Option<String> = None;
    let mut gallery: Vec<String> = Vec::new();
    let mut flat_fallback = flat.and_then(fix_image_path);

    for field in fields {
        match field {
            ImageField::Rows(rows) => {
                for row in rows {
                    let Some(url) = row.image_url.as_deref().and_then(fix_image_path) else {
                        continue;
                    };
                    match row.image_type.as_deref().map(str::to_ascii_lowercase).as_deref() {
                        Some("primary") if primary.is_none() => primary = Some(url),
                        Some("gallery") => gallery.push(url),
                        _ => {}
                    }
                }
            }
            ImageField::Normalized { primary: p, gallery: g } => {
                if primary.is_none() {
                    primary = p.as_deref().and_then(fix_image_path);
                }
                gallery.extend(g.iter().filter_map(|url| fix_image_path(url)));
            }
            ImageField::Flat(url) => {
                if flat_fallback.is_none() {
                    flat_fallback = fix_image_path(&url);
                }
            }
        }
    }

    let mut seen = HashSet::new();
    gallery.retain(|url| seen.insert(url.clone()));

    ProductImages {
        primary: primary.or(flat_fallback).unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
        gallery,
    }
}
