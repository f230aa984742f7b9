//! Products and vendor catalogs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use leafline_core::{EntityId, Price, ProductId};

/// A single SKU offered by a vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub vendor_id: EntityId,
    pub name: String,
    pub description: String,
    pub category: String,
    pub sub_category: String,
    pub is_medical: bool,
    pub price_per_unit: Price,
    pub available_units: u32,
    pub min_order_quantity: u32,
    pub max_order_quantity: u32,
    /// Link to the certificate of analysis.
    pub coa_link: String,
    /// Free-form lab and strain tags, e.g. `THC: 25%`, `Lab ID: 12345`.
    pub compliance_tags: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether `quantity` is orderable given quantity limits and stock.
    #[must_use]
    pub const fn accepts_quantity(&self, quantity: u32) -> bool {
        quantity >= self.min_order_quantity
            && quantity <= self.max_order_quantity
            && quantity <= self.available_units
    }
}

/// A logical view over a vendor's products.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub vendor_id: EntityId,
    pub total_products: usize,
    pub filter_applied: Option<String>,
    pub products: Vec<Product>,
}

impl Catalog {
    /// Build a catalog, keeping only products in `category` when given.
    ///
    /// Category matching is case-insensitive.
    #[must_use]
    pub fn build(vendor_id: EntityId, products: Vec<Product>, category: Option<&str>) -> Self {
        let filter = category.map(str::trim).filter(|c| !c.is_empty());
        let products: Vec<Product> = match filter {
            Some(c) => products
                .into_iter()
                .filter(|p| p.category.eq_ignore_ascii_case(c))
                .collect(),
            None => products,
        };

        Self {
            vendor_id,
            total_products: products.len(),
            filter_applied: filter.map(str::to_owned),
            products,
        }
    }

    /// A catalog with nothing listed.
    #[must_use]
    pub fn hidden(vendor_id: EntityId) -> Self {
        Self::build(vendor_id, Vec::new(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(vendor_id: EntityId, name: &str, category: &str) -> Product {
        Product {
            id: ProductId::generate(),
            vendor_id,
            name: name.to_string(),
            description: String::new(),
            category: category.to_string(),
            sub_category: String::new(),
            is_medical: true,
            price_per_unit: Price::from_cents(2_500),
            available_units: 100,
            min_order_quantity: 5,
            max_order_quantity: 50,
            coa_link: String::new(),
            compliance_tags: vec!["THC: 25%".to_string()],
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_accepts_quantity() {
        let p = product(EntityId::generate(), "Blue Dream", "Flower");
        assert!(p.accepts_quantity(5));
        assert!(p.accepts_quantity(50));
        assert!(!p.accepts_quantity(4));
        assert!(!p.accepts_quantity(51));
    }

    #[test]
    fn test_accepts_quantity_limited_by_stock() {
        let mut p = product(EntityId::generate(), "Blue Dream", "Flower");
        p.available_units = 10;
        assert!(!p.accepts_quantity(20));
    }

    #[test]
    fn test_build_filters_by_category() {
        let vendor = EntityId::generate();
        let products = vec![
            product(vendor, "Blue Dream", "Flower"),
            product(vendor, "Live Resin", "Concentrate"),
            product(vendor, "Sour Diesel", "flower"),
        ];

        let catalog = Catalog::build(vendor, products.clone(), Some("FLOWER"));
        assert_eq!(catalog.total_products, 2);
        assert_eq!(catalog.filter_applied.as_deref(), Some("FLOWER"));

        let all = Catalog::build(vendor, products, Some("  "));
        assert_eq!(all.total_products, 3);
        assert!(all.filter_applied.is_none());
    }
}
