//! Product catalog records exchanged between the workflow and the catalog
//! backend.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A product as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub brand: String,
    pub price: f64,
    pub stock_quantity: i64,
    pub min_stock_level: i64,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Product {
    pub fn stock_status(&self) -> StockStatus {
        if self.stock_quantity <= 0 {
            StockStatus::OutOfStock
        } else if self.stock_quantity < self.min_stock_level {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::InStock => "In Stock",
            Self::LowStock => "Low Stock",
            Self::OutOfStock => "Out of Stock",
        };
        f.write_str(label)
    }
}

/// Outcome of looking up one requested product name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LookupEntry {
    Found { product: Product },
    NotFound { name: String },
}

/// Result of an info lookup. Unresolvable names are reported, never raised.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductLookupReport {
    pub requested: Vec<String>,
    pub entries: Vec<LookupEntry>,
}

impl ProductLookupReport {
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.entries.iter().filter_map(|e| match e {
            LookupEntry::Found { product } => Some(product),
            LookupEntry::NotFound { .. } => None,
        })
    }

    pub fn not_found(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                LookupEntry::NotFound { name } => Some(name.as_str()),
                LookupEntry::Found { .. } => None,
            })
            .collect()
    }

    pub fn found_count(&self) -> usize {
        self.products().count()
    }
}

/// Price policy requested for a combo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceFilter {
    Cheapest,
    MostExpensive,
    Budget,
    Premium,
}

impl PriceFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cheapest => "cheapest",
            Self::MostExpensive => "most_expensive",
            Self::Budget => "budget",
            Self::Premium => "premium",
        }
    }
}

/// Filters for a combo search. Every filter is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComboQuery {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub product_types: Option<Vec<String>>,
    #[serde(default)]
    pub price_filter: Option<PriceFilter>,
    #[serde(default)]
    pub max_price: Option<f64>,
}

/// Summary of one product in a combo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboProduct {
    pub name: String,
    pub price: f64,
    pub category: String,
    pub brand: String,
}

impl From<&Product> for ComboProduct {
    fn from(p: &Product) -> Self {
        Self {
            name: p.name.clone(),
            price: p.price,
            category: p.category.clone(),
            brand: p.brand.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
    pub total: f64,
}

/// Which filters a combo search applied and what came out of it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComboDiagnostics {
    pub filters_applied: BTreeMap<String, serde_json::Value>,
    pub products_found: usize,
    pub price_range: Option<PriceRange>,
}

/// Result of a combo search. An empty product list is a valid outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComboReport {
    pub products: Vec<ComboProduct>,
    pub total_price: f64,
    pub diagnostics: ComboDiagnostics,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i64, min: i64) -> Product {
        Product {
            id: 1,
            name: "HyperX Alloy Origins".into(),
            category: "Keyboard".into(),
            brand: "HyperX".into(),
            price: 89.99,
            stock_quantity: stock,
            min_stock_level: min,
            tags: vec!["Gaming".into()],
        }
    }

    #[test]
    fn test_stock_status() {
        assert_eq!(product(0, 5).stock_status(), StockStatus::OutOfStock);
        assert_eq!(product(3, 5).stock_status(), StockStatus::LowStock);
        assert_eq!(product(5, 5).stock_status(), StockStatus::InStock);
    }

    #[test]
    fn test_lookup_report_partitions_entries() {
        let report = ProductLookupReport {
            requested: vec!["HyperX Alloy Origins".into(), "Nope 3000".into()],
            entries: vec![
                LookupEntry::Found {
                    product: product(10, 5),
                },
                LookupEntry::NotFound {
                    name: "Nope 3000".into(),
                },
            ],
        };
        assert_eq!(report.found_count(), 1);
        assert_eq!(report.not_found(), vec!["Nope 3000"]);
    }

    #[test]
    fn test_price_filter_wire_names() {
        let f: PriceFilter = serde_json::from_str("\"most_expensive\"").unwrap();
        assert_eq!(f, PriceFilter::MostExpensive);
        assert_eq!(PriceFilter::Cheapest.as_str(), "cheapest");
    }

    #[test]
    fn test_lookup_entry_tagged_by_status() {
        let entry = LookupEntry::NotFound {
            name: "Logi Mouse".into(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["status"], "not_found");
        assert_eq!(json["name"], "Logi Mouse");
    }
}
