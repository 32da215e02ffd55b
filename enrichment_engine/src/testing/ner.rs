use async_trait::async_trait;
use enrichment_domain::error::EnrichmentError;
use enrichment_domain::repositories::{NerHit, NerModel};
use parking_lot::Mutex;

/// Always returns the same fixed set of hits, and records every call for
/// assertions about how many times (and with what text) it was invoked.
pub struct FakeNerModel {
    hits: Vec<NerHit>,
    f1: f64,
    latency_ms: f64,
    capabilities: Vec<String>,
    calls: Mutex<Vec<String>>,
    delay: Option<std::time::Duration>,
    fail: bool,
}

impl FakeNerModel {
    pub fn new(hits: Vec<NerHit>, f1: f64, latency_ms: f64) -> Self {
        FakeNerModel {
            hits,
            f1,
            latency_ms,
            capabilities: Vec::new(),
            calls: Mutex::new(Vec::new()),
            delay: None,
            fail: false,
        }
    }

    pub fn with_capabilities(mut self, capabilities: Vec<String>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing() -> Self {
        FakeNerModel { fail: true, ..FakeNerModel::new(Vec::new(), 0.0, 0.0) }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl NerModel for FakeNerModel {
    async fn extract(&self, text: &str) -> Result<Vec<NerHit>, EnrichmentError> {
        self.calls.lock().push(text.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(EnrichmentError::component_error("fake-ner", "simulated failure"));
        }
        Ok(self.hits.clone())
    }

    fn declared_capabilities(&self) -> &[String] {
        &self.capabilities
    }

    fn f1_for_domain(&self, _domain: Option<&str>) -> f64 {
        self.f1
    }

    fn observed_p95_latency_ms(&self) -> f64 {
        self.latency_ms
    }
}
