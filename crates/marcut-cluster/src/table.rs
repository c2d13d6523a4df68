//! Cluster table

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use marcut_core::{EntityLabel, Span};

use crate::similarity::{normalize, token_set_ratio};

pub const DEFAULT_THRESHOLD: f64 = 0.82;

/// Confidence added to a mention that joins an existing cluster
pub const AGREEMENT_BOOST: f64 = 0.05;

/// Outcome of linking one mention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub cluster_id: String,
    pub similarity: f64,
    pub is_new: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterEntry {
    pub id: String,
    pub label: EntityLabel,
    /// Normalized surfaces seen for this entity
    pub aliases: BTreeSet<String>,
    /// Normalized form of the first mention
    pub canonical: String,
}

/// Per-document entity identifiers
#[derive(Debug)]
pub struct ClusterTable {
    threshold: f64,
    clusters: Vec<ClusterEntry>,
    /// Exact-text identifiers for labels that are not clustered
    exact: HashMap<(EntityLabel, String), String>,
    counters: HashMap<EntityLabel, usize>,
}

impl Default for ClusterTable {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl ClusterTable {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            clusters: Vec::new(),
            exact: HashMap::new(),
            counters: HashMap::new(),
        }
    }

    pub fn clusters(&self) -> &[ClusterEntry] {
        &self.clusters
    }

    pub fn len(&self) -> usize {
        self.clusters.len() + self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identifier for a mention of `label` spelled `surface`
    pub fn link(&mut self, label: EntityLabel, surface: &str) -> Link {
        let surface = surface.trim();
        if !label.is_clustered() {
            return self.link_exact(label, surface);
        }

        let key = normalize(surface);
        if key.is_empty() {
            return self.link_exact(label, surface);
        }

        let mut best: Option<(usize, f64)> = None;
        for (i, cluster) in self.clusters.iter().enumerate() {
            if cluster.label != label {
                continue;
            }
            if cluster.aliases.contains(&key) {
                return Link {
                    cluster_id: cluster.id.clone(),
                    similarity: 1.0,
                    is_new: false,
                };
            }
            let score = cluster
                .aliases
                .iter()
                .map(|alias| token_set_ratio(&key, alias))
                .fold(0.0, f64::max);
            if best.is_none_or(|(_, b)| score > b) {
                best = Some((i, score));
            }
        }

        if let Some((i, score)) = best.filter(|&(_, score)| score >= self.threshold) {
            let cluster = &mut self.clusters[i];
            debug!(id = %cluster.id, alias = %key, score, "Linked mention to cluster");
            cluster.aliases.insert(key);
            return Link {
                cluster_id: cluster.id.clone(),
                similarity: score,
                is_new: false,
            };
        }

        let id = self.next_id(label);
        self.clusters.push(ClusterEntry {
            id: id.clone(),
            label,
            aliases: BTreeSet::from([key.clone()]),
            canonical: key,
        });
        Link {
            cluster_id: id,
            similarity: best.map_or(0.0, |(_, score)| score),
            is_new: true,
        }
    }

    /// Set `entity_id` on every span in order. Mentions that join an existing
    /// entity get their confidence raised by [`AGREEMENT_BOOST`].
    pub fn assign(&mut self, spans: &mut [Span]) -> Vec<Link> {
        spans
            .iter_mut()
            .map(|span| {
                let link = self.link(span.label, &span.text);
                if !link.is_new {
                    span.confidence = (span.confidence + AGREEMENT_BOOST).min(1.0);
                }
                span.entity_id = Some(link.cluster_id.clone());
                link
            })
            .collect()
    }

    fn link_exact(&mut self, label: EntityLabel, surface: &str) -> Link {
        let key = (label, surface.to_string());
        if let Some(id) = self.exact.get(&key) {
            return Link {
                cluster_id: id.clone(),
                similarity: 1.0,
                is_new: false,
            };
        }
        let id = self.next_id(label);
        self.exact.insert(key, id.clone());
        Link {
            cluster_id: id,
            similarity: 1.0,
            is_new: true,
        }
    }

    fn next_id(&mut self, label: EntityLabel) -> String {
        let counter = self.counters.entry(label).or_insert(0);
        *counter += 1;
        format!("{}_{}", label.as_str(), counter)
    }
}
