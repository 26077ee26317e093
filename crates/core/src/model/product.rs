use serde::{Deserialize, Serialize};

use super::decode;
use super::images::{ImageField, ProductImages, normalize_images};

/// Label shown for products whose category cannot be resolved.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// A catalog product with its images in canonical form.
///
/// Decoded through [`RawProduct`] so every image shape the API sends ends up
/// as one [`ProductImages`]. The serialized form is itself a valid input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawProduct")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub sale_price: Option<f64>,
    pub category_id: Option<String>,
    pub category_name: Option<String>,
    pub stock: Option<i64>,
    pub trending: bool,
    pub best_seller: bool,
    pub new_arrival: bool,
    pub images: ProductImages,
}

/// Wire shape of a product row.
#[derive(Debug, Deserialize)]
pub struct RawProduct {
    #[serde(deserialize_with = "decode::id")]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default, deserialize_with = "decode::opt_text")]
    slug: Option<String>,
    #[serde(default, deserialize_with = "decode::opt_text")]
    description: Option<String>,
    #[serde(default, deserialize_with = "decode::opt_decimal")]
    price: Option<f64>,
    #[serde(default, alias = "salePrice", deserialize_with = "decode::opt_decimal")]
    sale_price: Option<f64>,
    #[serde(default, alias = "categoryId", deserialize_with = "decode::opt_id")]
    category_id: Option<String>,
    #[serde(default, alias = "categoryName", deserialize_with = "decode::opt_text")]
    category_name: Option<String>,
    #[serde(default, alias = "stockQuantity", alias = "stock_quantity", deserialize_with = "decode::opt_count")]
    stock: Option<i64>,
    #[serde(default, deserialize_with = "decode::flag")]
    trending: bool,
    #[serde(default, alias = "bestSeller", deserialize_with = "decode::flag")]
    best_seller: bool,
    #[serde(default, alias = "newArrival", deserialize_with = "decode::flag")]
    new_arrival: bool,
    #[serde(default, alias = "productImages")]
    product_images: Option<ImageField>,
    #[serde(default)]
    images: Option<ImageField>,
    #[serde(default, alias = "imageUrl", deserialize_with = "decode::opt_text")]
    image_url: Option<String>,
}

impl From<RawProduct> for Product {
    fn from(raw: RawProduct) -> Self {
        let images = normalize_images(raw.product_images.into_iter().chain(raw.images), raw.image_url.as_deref());

        Product {
            id: raw.id,
            name: raw.name,
            slug: raw.slug,
            description: raw.description,
            price: raw.price,
            sale_price: raw.sale_price,
            category_id: raw.category_id,
            category_name: raw.category_name,
            stock: raw.stock,
            trending: raw.trending,
            best_seller: raw.best_seller,
            new_arrival: raw.new_arrival,
            images,
        }
    }
}

impl Product {
    /// Price a shopper pays: the sale price when one is set below the list price.
    pub fn effective_price(&self) -> Option<f64> {
        match (self.price, self.sale_price) {
            (Some(price), Some(sale)) if sale < price => Some(sale),
            (None, Some(sale)) => Some(sale),
            (price, _) => price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::images::PLACEHOLDER_IMAGE;

    #[test]
    fn test_product_images_rows() {
        let json = r#"{
            "id": 12,
            "name": "Canvas Tote",
            "price": "24.50",
            "category_id": 4,
            "trending": 1,
            "product_images": [
                {"image_type": "primary", "image_url": "/a.jpg"},
                {"image_type": "gallery", "image_url": "b.jpg"}
            ]
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id, "12");
        assert_eq!(product.price, Some(24.5));
        assert_eq!(product.category_id.as_deref(), Some("4"));
        assert!(product.trending);
        assert!(!product.best_seller);
        assert_eq!(product.images.primary, "/a.jpg");
        assert_eq!(product.images.gallery, vec!["/b.jpg"]);
    }

    #[test]
    fn test_flat_image_url() {
        let json = r#"{"id": "p1", "name": "Mug", "imageUrl": "mug.png", "bestSeller": true}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.images.primary, "/mug.png");
        assert!(product.images.gallery.is_empty());
        assert!(product.best_seller);
    }

    #[test]
    fn test_no_images_uses_placeholder() {
        let product: Product = serde_json::from_str(r#"{"id": 1, "name": "Bare"}"#).unwrap();
        assert_eq!(product.images.primary, PLACEHOLDER_IMAGE);
    }

    #[test]
    fn test_three_shapes_agree() {
        let rows = r#"{"id": 1, "name": "x", "product_images": [
            {"image_type": "primary", "image_url": "a.jpg"},
            {"image_type": "gallery", "image_url": "b.jpg"}]}"#;
        let object = r#"{"id": 1, "name": "x", "images": {"primary": "/a.jpg", "gallery": ["b.jpg"]}}"#;
        let flat_with_gallery = r#"{"id": 1, "name": "x", "image_url": "/a.jpg", "images": {"gallery": ["/b.jpg"]}}"#;

        let a: Product = serde_json::from_str(rows).unwrap();
        let b: Product = serde_json::from_str(object).unwrap();
        let c: Product = serde_json::from_str(flat_with_gallery).unwrap();
        assert_eq!(a.images, b.images);
        assert_eq!(a.images, c.images);
    }

    #[test]
    fn test_serialized_form_reads_back() {
        let json = r#"{"id": 5, "name": "Lamp", "sale_price": 9.5, "price": 12,
                       "product_images": [{"image_type": "primary", "image_url": "lamp.jpg"}]}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        let stored = serde_json::to_string(&product).unwrap();
        let restored: Product = serde_json::from_str(&stored).unwrap();
        assert_eq!(product, restored);
    }

    #[test]
    fn test_effective_price() {
        let product: Product = serde_json::from_str(r#"{"id": 1, "price": 10, "sale_price": 8}"#).unwrap();
        assert_eq!(product.effective_price(), Some(8.0));

        let product: Product = serde_json::from_str(r#"{"id": 1, "price": 10, "sale_price": 12}"#).unwrap();
        assert_eq!(product.effective_price(), Some(10.0));

        let product: Product = serde_json::from_str(r#"{"id": 1}"#).unwrap();
        assert_eq!(product.effective_price(), None);
    }
}
