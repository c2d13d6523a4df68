//! Provider returning precomputed spans

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use marcut_core::{EntityLabel, Span, SpanSource};

use crate::error::Result;
use crate::provider::SpanProvider;

/// Wire form of an externally produced span; the label may be any alias
/// `EntityLabel` accepts.
#[derive(Debug, Deserialize)]
struct ExternalSpan {
    start: usize,
    end: usize,
    #[serde(default)]
    label: Option<String>,
    #[serde(default = "default_confidence")]
    confidence: f64,
}

fn default_confidence() -> f64 {
    0.5
}

/// Replays a fixed span list, e.g. spans produced by an out-of-process model
pub struct FixedProvider {
    name: String,
    spans: Vec<Span>,
}

impl FixedProvider {
    pub fn new(name: impl Into<String>, spans: Vec<Span>) -> Self {
        Self {
            name: name.into(),
            spans,
        }
    }

    /// Parse a JSON array of `{start, end, label, confidence}` objects.
    /// Entries with a missing or unknown label are dropped. Span text is
    /// filled in against the document when the spans are served.
    pub fn from_json(name: impl Into<String>, json: &str) -> Result<Self> {
        let name = name.into();
        let raw: Vec<ExternalSpan> = serde_json::from_str(json)?;
        let spans = raw
            .into_iter()
            .filter_map(|s| {
                let label = match s.label.as_deref().map(str::parse::<EntityLabel>) {
                    Some(Ok(label)) => label,
                    Some(Err(e)) => {
                        warn!(provider = %name, start = s.start, end = s.end, "Dropping span: {}", e);
                        return None;
                    }
                    None => {
                        warn!(provider = %name, start = s.start, end = s.end, "Dropping span without label");
                        return None;
                    }
                };
                Some(Span::new(
                    s.start,
                    s.end,
                    label,
                    s.confidence,
                    SpanSource::External,
                    String::new(),
                ))
            })
            .collect();
        Ok(Self::new(name, spans))
    }
}

#[async_trait]
impl SpanProvider for FixedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn spans(&self, text: &str, _context: Option<&str>) -> anyhow::Result<Vec<Span>> {
        Ok(self
            .spans
            .iter()
            .cloned()
            .map(|mut span| {
                if let Some(slice) = text.get(span.start..span.end) {
                    span.text = slice.to_string();
                }
                span
            })
            .collect())
    }
}
