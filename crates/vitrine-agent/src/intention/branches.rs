use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::info;

use vitrine_core::catalog::ComboQuery;
use vitrine_core::error::{Result, VitrineError};
use vitrine_core::traits::Catalog;

use super::models::{InfoIntention, WorkflowOutput};
use crate::graph::{ResolvedParams, Task};

fn branch_error(params: &ResolvedParams, err: VitrineError) -> VitrineError {
    VitrineError::BranchTask {
        node: params.owner().to_string(),
        message: err.to_string(),
    }
}

/// Looks up products by exact name. Takes `product_names` and a nullable
/// `completed_product_names`.
pub struct InfoLookupTask {
    catalog: Arc<dyn Catalog>,
}

impl InfoLookupTask {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }
}

impl Task<WorkflowOutput> for InfoLookupTask {
    fn name(&self) -> &str {
        "info_lookup"
    }

    fn run(&self, params: ResolvedParams) -> BoxFuture<'_, Result<WorkflowOutput>> {
        Box::pin(async move {
            let intention = InfoIntention {
                product_names: params.get("product_names")?,
                completed_product_names: params.get_opt("completed_product_names")?,
            };
            let names = intention.names_for_lookup();
            let report = self
                .catalog
                .lookup_products(names)
                .await
                .map_err(|e| branch_error(&params, e))?;
            info!(
                requested = report.requested.len(),
                found = report.found_count(),
                "Info lookup complete"
            );
            Ok(WorkflowOutput::Info(report))
        })
    }
}

/// Filters the catalog into a combo. Takes `tag`, `brand`,
/// `product_types`, `price_filter` and `max_price`, all nullable.
pub struct ComboSearchTask {
    catalog: Arc<dyn Catalog>,
}

impl ComboSearchTask {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }
}

impl Task<WorkflowOutput> for ComboSearchTask {
    fn name(&self) -> &str {
        "combo_search"
    }

    fn run(&self, params: ResolvedParams) -> BoxFuture<'_, Result<WorkflowOutput>> {
        Box::pin(async move {
            let query = ComboQuery {
                tag: params.get_opt("tag")?,
                brand: params.get_opt("brand")?,
                product_types: params.get_opt("product_types")?,
                price_filter: params.get_opt("price_filter")?,
                max_price: params.get_opt("max_price")?,
            };
            let report = self
                .catalog
                .search_combo(query)
                .await
                .map_err(|e| branch_error(&params, e))?;
            info!(
                products = report.products.len(),
                total_price = report.total_price,
                "Combo search complete"
            );
            Ok(WorkflowOutput::Combo(report))
        })
    }
}
