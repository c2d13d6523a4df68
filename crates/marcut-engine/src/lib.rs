//! Per-document redaction pipeline
//!
//! Wires projection, span providers, consolidation, clustering and the
//! applicator together and records an audit trail of what was redacted.

pub mod audit;
pub mod error;

pub use audit::{AUDIT_TEXT_LIMIT, AuditEntry};
pub use error::{EngineError, Result};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use marcut_cluster::ClusterTable;
use marcut_config::Config;
use marcut_consolidate::{ConsolidationStats, Consolidator, ExclusionList};
use marcut_core::{Replacement, Span};
use marcut_docx::{
    ApplyOptions, ApplyStats, Document, RedactionApplicator, RevisionSummary, RevisionView,
    TextProjector, accept_revisions, has_revisions,
};
use marcut_providers::{ProviderReport, ProviderSet, SpanProvider};

/// Everything one run did to a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    /// blake3 of the projected text the spans index
    pub text_hash: String,
    pub text_len: usize,
    pub revisions_accepted: RevisionSummary,
    pub providers: Vec<ProviderReport>,
    pub consolidation: ConsolidationStats,
    pub apply: ApplyStats,
    pub spans: Vec<Span>,
    pub replacements: Vec<Replacement>,
    pub audit: Vec<AuditEntry>,
}

impl Outcome {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub struct RedactionEngine {
    providers: ProviderSet,
    consolidator: Consolidator,
    cluster_threshold: f64,
    apply_options: ApplyOptions,
    accept_existing: bool,
}

impl RedactionEngine {
    /// Engine with the configured pattern provider
    pub fn from_config(config: &Config) -> Result<Self> {
        let providers = ProviderSet::from_config(&config.providers)?;
        Self::with_providers(config, providers)
    }

    pub fn with_providers(config: &Config, providers: ProviderSet) -> Result<Self> {
        let consolidator = Consolidator::from_config(config)?;
        let tag_color = Some(config.tag_color.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        Ok(Self {
            providers,
            consolidator,
            cluster_threshold: config.cluster.threshold,
            apply_options: ApplyOptions {
                author: config.author.clone(),
                track_changes: config.track_changes,
                tag_color,
                timestamp: None,
            },
            accept_existing: true,
        })
    }

    pub fn add_provider(&mut self, provider: Arc<dyn SpanProvider>) {
        self.providers.push(provider);
    }

    /// Fixed revision date instead of the current time
    pub fn with_timestamp(mut self, timestamp: OffsetDateTime) -> Self {
        self.apply_options.timestamp = Some(timestamp);
        self
    }

    /// When disabled, documents with tracked changes are rejected instead of
    /// having their changes accepted first.
    pub fn accept_existing_revisions(mut self, accept: bool) -> Self {
        self.accept_existing = accept;
        self
    }

    pub fn exclusions_mut(&mut self) -> &mut ExclusionList {
        self.consolidator.exclusions_mut()
    }

    /// Redact `doc` in place.
    pub async fn redact(&mut self, doc: &mut Document, context: Option<&str>) -> Result<Outcome> {
        // 1. Only a broken tree is fatal, and it is reported before any change
        doc.validate()?;

        // 2. Pick up exclusion file edits; a failed reload keeps the current list
        match self.consolidator.exclusions_mut().refresh() {
            Ok(true) => debug!("Exclusion file reloaded"),
            Ok(false) => {}
            Err(e) => warn!("Keeping previous exclusions: {}", e),
        }

        // 3. Resolve tracked changes the document already carries
        let revisions_accepted = if has_revisions(doc) {
            if !self.accept_existing {
                return Err(EngineError::PendingRevisions);
            }
            accept_revisions(doc)
        } else {
            RevisionSummary::default()
        };

        // 4. Project
        let projection = TextProjector::new(RevisionView::Accepted).project(doc);
        let text = projection.text;
        let text_hash = blake3::hash(text.as_bytes()).to_hex().to_string();

        // 5. Candidates from every provider
        let collected = self.providers.collect(&text, context).await;

        // 6. Consolidate
        let consolidation = self.consolidator.consolidate(&text, collected.spans);
        let mut spans = consolidation.spans;

        // 7. Cluster
        ClusterTable::new(self.cluster_threshold).assign(&mut spans);

        // 8. Replacements
        let replacements: Vec<Replacement> = spans
            .iter()
            .map(|span| Replacement::derive(&text, span))
            .collect();

        // 9. Apply
        let mut applicator = RedactionApplicator::new(self.apply_options.clone());
        let apply = applicator.apply(doc, &projection.index, &replacements)?;

        let audit = spans.iter().map(AuditEntry::from).collect();
        info!(
            text_hash = %text_hash,
            spans = spans.len(),
            applied = apply.applied,
            skipped = apply.skipped,
            "Redacted document"
        );

        Ok(Outcome {
            text_hash,
            text_len: text.len(),
            revisions_accepted,
            providers: collected.reports,
            consolidation: consolidation.stats,
            apply,
            spans,
            replacements,
            audit,
        })
    }
}
