use async_trait::async_trait;
use enrichment_domain::error::EnrichmentError;
use enrichment_domain::repositories::{KbLookupResult, KbProvider};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Configures what `FakeKbProvider::lookup` does for a given input.
pub enum KbLookupBehavior {
    Hit(KbLookupResult),
    Miss,
    Timeout,
    Error(String),
}

/// A KB provider whose answer is fixed per `(text, entity_type)` key, with
/// any unlisted key defaulting to a miss. Records every call for assertions
/// about fallback-chain order.
pub struct FakeKbProvider {
    id: String,
    answers: HashMap<(String, String), KbLookupBehavior>,
    delay: std::time::Duration,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeKbProvider {
    pub fn new(id: impl Into<String>) -> Self {
        FakeKbProvider {
            id: id.into(),
            answers: HashMap::new(),
            delay: std::time::Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_answer(mut self, text: &str, entity_type: &str, behavior: KbLookupBehavior) -> Self {
        self.answers.insert((text.to_string(), entity_type.to_string()), behavior);
        self
    }

    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl KbProvider for FakeKbProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn lookup(
        &self,
        text: &str,
        entity_type: &str,
    ) -> Result<Option<KbLookupResult>, EnrichmentError> {
        self.calls.lock().push((text.to_string(), entity_type.to_string()));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.answers.get(&(text.to_string(), entity_type.to_string())) {
            Some(KbLookupBehavior::Hit(result)) => Ok(Some(result.clone())),
            Some(KbLookupBehavior::Miss) | None => Ok(None),
            Some(KbLookupBehavior::Timeout) => {
                tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                Ok(None)
            }
            Some(KbLookupBehavior::Error(reason)) => {
                Err(EnrichmentError::component_error(self.id.clone(), reason.clone()))
            }
        }
    }
}
