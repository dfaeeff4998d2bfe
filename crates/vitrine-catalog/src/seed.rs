use serde::{Deserialize, Serialize};

use vitrine_core::error::{Result, VitrineError};

const BUNDLED_FIXTURE: &str = include_str!("../fixtures/catalog.toml");

/// A product to insert. Tags are created on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub brand: String,
    pub price: f64,
    #[serde(default)]
    pub stock_quantity: i64,
    #[serde(default)]
    pub min_stock_level: i64,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewProduct {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        brand: impl Into<String>,
        price: f64,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            brand: brand.into(),
            price,
            stock_quantity: 0,
            min_stock_level: 0,
            tags: Vec::new(),
        }
    }

    pub fn with_stock(mut self, quantity: i64, min_level: i64) -> Self {
        self.stock_quantity = quantity;
        self.min_stock_level = min_level;
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }
}

#[derive(Deserialize)]
struct Fixture {
    #[serde(default)]
    products: Vec<NewProduct>,
}

/// Parse a fixture document: a list of `[[products]]` tables.
pub fn parse_fixture(content: &str) -> Result<Vec<NewProduct>> {
    let fixture: Fixture =
        toml::from_str(content).map_err(|e| VitrineError::Config(format!("catalog fixture: {}", e)))?;
    Ok(fixture.products)
}

/// The computer-peripheral catalog shipped with the binary.
pub fn bundled_fixture() -> Result<Vec<NewProduct>> {
    parse_fixture(BUNDLED_FIXTURE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_bundled_fixture_parses() {
        let products = bundled_fixture().unwrap();
        assert!(products.len() >= 30);

        let names: HashSet<&str> = products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names.len(), products.len(), "product names must be unique");
        assert!(names.contains("Logitech G Pro X Superlight"));

        let out_of_stock = products.iter().filter(|p| p.stock_quantity == 0).count();
        assert_eq!(out_of_stock, 2);
        assert!(products
            .iter()
            .any(|p| p.stock_quantity > 0 && p.stock_quantity < p.min_stock_level));
    }

    #[test]
    fn test_missing_stock_fields_default_to_zero() {
        let products = parse_fixture(
            r#"
[[products]]
name = "Blue Yeti X"
category = "Microphone"
brand = "Blue"
price = 169.99
"#,
        )
        .unwrap();
        assert_eq!(products[0].stock_quantity, 0);
        assert!(products[0].tags.is_empty());
    }

    #[test]
    fn test_malformed_fixture_is_config_error() {
        let err = parse_fixture("[[products]]\nname = 3").unwrap_err();
        assert!(matches!(err, VitrineError::Config(_)));
    }
}
