//! Concurrent span collection

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, warn};

use marcut_config::ProviderConfig;
use marcut_core::Span;

use crate::error::Result;
use crate::pattern::PatternProvider;
use crate::provider::SpanProvider;

/// How one provider fared for one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderReport {
    pub provider: String,
    pub spans: usize,
    pub elapsed_ms: u64,
    /// Failure or timeout; the provider contributed no spans
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Collected {
    /// Candidates from all providers, in provider registration order
    pub spans: Vec<Span>,
    pub reports: Vec<ProviderReport>,
}

/// The providers consulted for every document
pub struct ProviderSet {
    providers: Vec<Arc<dyn SpanProvider>>,
    timeout: Duration,
}

impl ProviderSet {
    pub fn new(timeout: Duration) -> Self {
        Self {
            providers: Vec::new(),
            timeout,
        }
    }

    /// Pattern provider (when it has rules) with the configured timeout
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let mut set = Self::new(Duration::from_secs(config.timeout_secs));
        let patterns = PatternProvider::from_config(config)?;
        if !patterns.rules().is_empty() {
            set.push(Arc::new(patterns));
        }
        Ok(set)
    }

    pub fn push(&mut self, provider: Arc<dyn SpanProvider>) {
        self.providers.push(provider);
    }

    pub fn with(mut self, provider: Arc<dyn SpanProvider>) -> Self {
        self.push(provider);
        self
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Run every provider concurrently and await all of them. A provider that
    /// fails or exceeds the timeout contributes zero spans.
    pub async fn collect(&self, text: &str, context: Option<&str>) -> Collected {
        let runs = self.providers.iter().map(|provider| async move {
            let started = Instant::now();
            let outcome = timeout(self.timeout, provider.spans(text, context)).await;
            (provider.name().to_string(), outcome, started.elapsed())
        });

        let mut collected = Collected::default();
        for (name, outcome, elapsed) in join_all(runs).await {
            let elapsed_ms = elapsed.as_millis() as u64;
            let (spans, error) = match outcome {
                Ok(Ok(spans)) => (spans, None),
                Ok(Err(e)) => {
                    warn!(provider = %name, "Provider failed: {:#}", e);
                    (Vec::new(), Some(format!("{e:#}")))
                }
                Err(_) => {
                    warn!(provider = %name, timeout_secs = self.timeout.as_secs(), "Provider timed out");
                    (Vec::new(), Some("timed out".to_string()))
                }
            };
            debug!(provider = %name, spans = spans.len(), elapsed_ms, "Provider finished");
            collected.reports.push(ProviderReport {
                provider: name,
                spans: spans.len(),
                elapsed_ms,
                error,
            });
            collected.spans.extend(spans);
        }
        collected
    }
}
