//! Accepting pre-existing tracked changes
//!
//! The applicator assumes a tree without revisions: its own markup must be the
//! only `w:ins`/`w:del` a reviewer sees. Documents that arrive with changes
//! are normalized here first.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::Document;
use crate::node::{NodeId, Tag};

/// Move ranges and formatting-change records, dropped outright
const MARKER_TAGS: [&str; 10] = [
    "w:moveFromRangeStart",
    "w:moveFromRangeEnd",
    "w:moveToRangeStart",
    "w:moveToRangeEnd",
    "w:rPrChange",
    "w:pPrChange",
    "w:sectPrChange",
    "w:tblPrChange",
    "w:tblGridChange",
    "w:tcPrChange",
];

/// Paragraph children that carry no content of their own
const METADATA_TAGS: [&str; 6] = [
    "w:pPr",
    "w:proofErr",
    "w:bookmarkStart",
    "w:bookmarkEnd",
    "w:commentRangeStart",
    "w:commentRangeEnd",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionSummary {
    /// `w:ins`/`w:moveTo` wrappers replaced by their content
    pub unwrapped: usize,
    /// `w:del`/`w:moveFrom` subtrees removed
    pub dropped: usize,
    pub markers: usize,
    /// Paragraphs left with nothing but deleted content
    pub paragraphs_removed: usize,
}

impl RevisionSummary {
    pub fn changed(&self) -> bool {
        self.unwrapped + self.dropped + self.markers + self.paragraphs_removed > 0
    }
}

enum Revision {
    Keep,
    Drop,
    Marker,
}

fn classify(tag: &Tag) -> Option<Revision> {
    match tag {
        Tag::Insertion | Tag::MoveTo => Some(Revision::Keep),
        Tag::Deletion | Tag::MoveFrom => Some(Revision::Drop),
        other if MARKER_TAGS.contains(&other.name()) => Some(Revision::Marker),
        _ => None,
    }
}

/// Whether any story of the document carries tracked changes
pub fn has_revisions(doc: &Document) -> bool {
    doc.content_roots()
        .into_iter()
        .flat_map(|root| doc.descendants(root))
        .any(|id| doc.tag(id).is_some_and(|t| classify(t).is_some()))
}

/// Accept every tracked change in the body and all readable parts.
pub fn accept_revisions(doc: &mut Document) -> RevisionSummary {
    let mut summary = RevisionSummary::default();
    let roots = doc.content_roots();

    // 1. Paragraphs that would be empty once deletions go
    let zombies: Vec<NodeId> = roots
        .iter()
        .flat_map(|&root| doc.descendants(root))
        .filter(|&id| doc.tag(id) == Some(&Tag::Paragraph) && only_deleted_content(doc, id))
        .collect();
    for paragraph in zombies {
        doc.detach(paragraph);
        summary.paragraphs_removed += 1;
    }

    // 2. Revision wrappers and markers
    let nodes: Vec<NodeId> = roots
        .iter()
        .flat_map(|&root| doc.descendants(root))
        .collect();
    for id in nodes {
        let Some(kind) = doc.tag(id).and_then(classify) else {
            continue;
        };
        match kind {
            Revision::Keep => {
                doc.unwrap_node(id);
                summary.unwrapped += 1;
            }
            Revision::Drop => {
                doc.detach(id);
                summary.dropped += 1;
            }
            Revision::Marker => {
                doc.detach(id);
                summary.markers += 1;
            }
        }
    }

    if summary.changed() {
        debug!(
            unwrapped = summary.unwrapped,
            dropped = summary.dropped,
            markers = summary.markers,
            paragraphs = summary.paragraphs_removed,
            "Accepted existing revisions"
        );
    }
    summary
}

fn only_deleted_content(doc: &Document, paragraph: NodeId) -> bool {
    let mut has_revision = false;
    for child in doc.children(paragraph) {
        let Some(tag) = doc.tag(child) else {
            continue;
        };
        if METADATA_TAGS.contains(&tag.name()) {
            continue;
        }
        match classify(tag) {
            Some(Revision::Drop) | Some(Revision::Marker) => has_revision = true,
            _ => return false,
        }
    }
    has_revision
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projector::TextProjector;

    #[test]
    fn test_accept_unwraps_insertions_and_drops_deletions() {
        let mut doc = Document::new();
        let p = doc.add_paragraph(doc.body());
        doc.add_run(p, "Keep ");
        let ins = doc.append_element(p, Tag::Insertion);
        doc.add_run(ins, "added ");
        let del = doc.append_element(p, Tag::Deletion);
        let dr = doc.append_element(del, Tag::Run);
        doc.set_run_text(dr, "removed ", true);
        let bold_run = doc.add_run(p, "end");
        doc.set_run_property(bold_run, "w:b", None);
        let rpr = doc.run_properties(bold_run).unwrap();
        doc.append_element(rpr, Tag::Other("w:rPrChange".into()));

        assert!(has_revisions(&doc));
        let summary = accept_revisions(&mut doc);

        assert_eq!(summary.unwrapped, 1);
        assert_eq!(summary.dropped, 1);
        assert_eq!(summary.markers, 1);
        assert!(!has_revisions(&doc));
        assert_eq!(TextProjector::default().project(&doc).text, "Keep added end\n");
    }

    #[test]
    fn test_paragraph_of_only_deletions_removed() {
        let mut doc = Document::new();
        let keep = doc.add_paragraph(doc.body());
        doc.add_run(keep, "Stay");
        let gone = doc.add_paragraph(doc.body());
        doc.append_element(gone, Tag::Other("w:pPr".into()));
        let del = doc.append_element(gone, Tag::Deletion);
        let dr = doc.append_element(del, Tag::Run);
        doc.set_run_text(dr, "Struck", true);

        let summary = accept_revisions(&mut doc);
        assert_eq!(summary.paragraphs_removed, 1);
        assert_eq!(TextProjector::default().project(&doc).text, "Stay\n");
    }

    #[test]
    fn test_clean_document_untouched() {
        let mut doc = Document::new();
        let p = doc.add_paragraph(doc.body());
        doc.add_run(p, "Nothing tracked");
        assert!(!has_revisions(&doc));
        assert!(!accept_revisions(&mut doc).changed());
    }

    #[test]
    fn test_revisions_in_parts_accepted() {
        let mut doc = Document::new();
        let header = doc.add_part(crate::document::PartKind::Header, "word/header1.xml");
        let root = doc.part_root(header).unwrap();
        let p = doc.add_paragraph(root);
        let ins = doc.append_element(p, Tag::Insertion);
        doc.add_run(ins, "Header text");

        assert!(has_revisions(&doc));
        assert_eq!(accept_revisions(&mut doc).unwrapped, 1);
        assert_eq!(doc.children(p).count(), 1);
    }
}
