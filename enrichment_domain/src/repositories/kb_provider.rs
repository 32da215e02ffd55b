use crate::error::EnrichmentError;
use async_trait::async_trait;
use std::collections::HashMap;

/// A successful knowledge-base lookup. `Lookup` returning `Ok(None)` is a
/// miss, not an error; errors are distinguished via `Err`.
#[derive(Debug, Clone, PartialEq)]
pub struct KbLookupResult {
    pub entity_id: String,
    pub canonical_name: String,
    pub definition: Option<String>,
    pub semantic_types: std::collections::HashSet<String>,
    pub relationships: HashMap<String, Vec<String>>,
}

/// Port for a single knowledge base in a fallback chain (§4.3).
#[async_trait]
pub trait KbProvider: Send + Sync {
    /// Stable id used in chain configuration and as the `kb_id` recorded on
    /// an enriched entity (e.g. `"umls"`, `"rxnorm"`).
    fn id(&self) -> &str;

    /// Looks up `text` of the given `entity_type`. `Ok(None)` is a miss;
    /// `Err` is a recoverable or transient failure that causes the caller to
    /// proceed to the next KB in the chain.
    async fn lookup(
        &self,
        text: &str,
        entity_type: &str,
    ) -> Result<Option<KbLookupResult>, EnrichmentError>;
}
