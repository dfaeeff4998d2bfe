use futures::future::BoxFuture;
use futures::stream::BoxStream;

use crate::config::ModelConfig;
use crate::error::Result;
use crate::types::*;

/// LLM client used by the classification step.
pub trait LlmClient: Send + Sync + 'static {
    /// Send a chat request and receive a stream of deltas.
    fn chat_stream(
        &self,
        config: &ModelConfig,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<BoxStream<'_, Result<StreamDelta>>>>;
}

/// Catalog backend: product lookups and combo searches.
pub trait Catalog: Send + Sync + 'static {
    /// Resolve each name to a product record or an explicit not-found entry.
    fn lookup_products(&self, names: Vec<String>) -> BoxFuture<'_, Result<ProductLookupReport>>;

    /// Filter in-stock products into a combo.
    fn search_combo(&self, query: ComboQuery) -> BoxFuture<'_, Result<ComboReport>>;

    /// All tag names, sorted.
    fn all_tags(&self) -> BoxFuture<'_, Result<Vec<String>>>;

    /// All product names.
    fn all_product_names(&self) -> BoxFuture<'_, Result<Vec<String>>>;
}
