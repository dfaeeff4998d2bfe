use serde_json::json;
use tracing::warn;

use vitrine_core::catalog::{
    ComboDiagnostics, ComboProduct, ComboQuery, ComboReport, PriceFilter, PriceRange, Product,
};
use vitrine_core::config::WorkflowConfig;

/// Price bounds for the `budget` and `premium` filters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComboPolicy {
    pub budget_ceiling: f64,
    pub premium_floor: f64,
}

impl Default for ComboPolicy {
    fn default() -> Self {
        Self::from(&WorkflowConfig::default())
    }
}

impl From<&WorkflowConfig> for ComboPolicy {
    fn from(w: &WorkflowConfig) -> Self {
        Self {
            budget_ceiling: w.budget_price_ceiling,
            premium_floor: w.premium_price_floor,
        }
    }
}

/// Apply a combo query to the full product list.
///
/// Filters run in a fixed order: stock, brand, tag, product type, max
/// price, then the price policy. `known_tags` decides whether an unknown
/// tag empties the result.
pub fn filter_combo(
    products: Vec<Product>,
    known_tags: &[String],
    query: &ComboQuery,
    policy: &ComboPolicy,
) -> ComboReport {
    let mut diagnostics = ComboDiagnostics::default();
    let mut products: Vec<Product> = products
        .into_iter()
        .filter(|p| p.stock_quantity > 0)
        .collect();

    if let Some(brand) = non_blank(&query.brand) {
        products.retain(|p| p.brand.eq_ignore_ascii_case(brand));
        diagnostics.filters_applied.insert("brand".into(), json!(brand));
    }

    if let Some(tag) = non_blank(&query.tag) {
        if known_tags.iter().any(|t| t == tag) {
            products.retain(|p| p.tags.iter().any(|t| t == tag));
            diagnostics.filters_applied.insert("tag".into(), json!(tag));
        } else {
            warn!(tag, "Combo tag not found in catalog");
            products.clear();
            diagnostics
                .filters_applied
                .insert("tag".into(), json!(format!("{} (not found)", tag)));
        }
    }

    let types: Vec<&str> = query
        .product_types
        .iter()
        .flatten()
        .map(String::as_str)
        .filter(|t| !t.trim().is_empty())
        .collect();
    if !types.is_empty() {
        products.retain(|p| types.iter().any(|t| p.category.eq_ignore_ascii_case(t)));
        diagnostics
            .filters_applied
            .insert("product_types".into(), json!(types));
    }

    if let Some(max) = query.max_price.filter(|m| *m > 0.0) {
        products.retain(|p| p.price <= max);
        diagnostics.filters_applied.insert("max_price".into(), json!(max));
    }

    if let Some(filter) = query.price_filter {
        diagnostics
            .filters_applied
            .insert("price_filter".into(), json!(filter.as_str()));
        products = apply_price_filter(products, filter, &types, policy);
    }

    let prices: Vec<f64> = products.iter().map(|p| p.price).collect();
    let total_price = prices.iter().fold(0.0, |acc, p| acc + p);
    diagnostics.products_found = products.len();
    if !prices.is_empty() {
        diagnostics.price_range = Some(PriceRange {
            min: prices.iter().copied().fold(f64::INFINITY, f64::min),
            max: prices.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            total: total_price,
        });
    }

    ComboReport {
        products: products.iter().map(ComboProduct::from).collect(),
        total_price,
        diagnostics,
    }
}

fn apply_price_filter(
    products: Vec<Product>,
    filter: PriceFilter,
    types: &[&str],
    policy: &ComboPolicy,
) -> Vec<Product> {
    match filter {
        PriceFilter::Cheapest => pick_per_type(products, types, |a, b| a.price < b.price),
        PriceFilter::MostExpensive => pick_per_type(products, types, |a, b| a.price > b.price),
        PriceFilter::Budget => products
            .into_iter()
            .filter(|p| p.price <= policy.budget_ceiling)
            .collect(),
        PriceFilter::Premium => products
            .into_iter()
            .filter(|p| p.price >= policy.premium_floor)
            .collect(),
    }
}

/// One product per requested type, or one overall when no types were given.
/// Ties keep the first product in catalog order.
fn pick_per_type(
    products: Vec<Product>,
    types: &[&str],
    better: impl Fn(&Product, &Product) -> bool,
) -> Vec<Product> {
    if types.is_empty() {
        return best_of(products.iter(), &better).into_iter().collect();
    }
    types
        .iter()
        .filter_map(|t| {
            best_of(
                products.iter().filter(|p| p.category.eq_ignore_ascii_case(t)),
                &better,
            )
        })
        .collect()
}

fn best_of<'a>(
    candidates: impl Iterator<Item = &'a Product>,
    better: &impl Fn(&Product, &Product) -> bool,
) -> Option<Product> {
    let mut best: Option<&Product> = None;
    for p in candidates {
        if best.map_or(true, |b| better(p, b)) {
            best = Some(p);
        }
    }
    best.cloned()
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
