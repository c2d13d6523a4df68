//! Span provider trait

use async_trait::async_trait;

use marcut_core::Span;

/// A source of candidate spans over the projected document text.
///
/// Offsets in the returned spans are byte offsets into `text`. Providers may
/// return overlapping or badly aligned spans; consolidation cleans them up.
#[async_trait]
pub trait SpanProvider: Send + Sync {
    /// Name used in logs and reports
    fn name(&self) -> &str;

    /// Candidate spans for `text`. `context` carries optional document-level
    /// hints such as a title or the parties of an agreement.
    async fn spans(&self, text: &str, context: Option<&str>) -> anyhow::Result<Vec<Span>>;
}
