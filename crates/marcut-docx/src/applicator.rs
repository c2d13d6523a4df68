//! Redaction applicator
//!
//! Burns replacements into the tree. Each touched run is split into
//! `pre | mid | post`: the run keeps `pre`, `mid` moves into a tracked
//! deletion, the tag goes into a tracked insertion after the run holding the
//! span start, and `post` follows as a plain run.

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use tracing::debug;

use marcut_core::{Replacement, Span};

use crate::document::Document;
use crate::error::Result;
use crate::node::{NodeId, Tag};
use crate::projector::PositionIndex;

/// Run properties that would hide or mask an inserted tag
const HIDING_PROPERTIES: [&str; 6] = [
    "w:vanish",
    "w:webHidden",
    "w:specVanish",
    "w:shd",
    "w:highlight",
    "w:effect",
];

#[derive(Debug, Clone)]
pub struct ApplyOptions {
    /// Author recorded on every revision
    pub author: String,
    /// `false` replaces text in place without revision markup
    pub track_changes: bool,
    /// Color forced on inserted tags, `None` keeps the source color
    pub tag_color: Option<String>,
    /// Revision date; current UTC time when unset
    pub timestamp: Option<OffsetDateTime>,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            author: "Marcut".to_string(),
            track_changes: true,
            tag_color: Some("FF0000".to_string()),
            timestamp: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyStats {
    pub applied: usize,
    pub skipped: usize,
    pub runs_touched: usize,
    /// Revision markers emitted by this call
    pub revisions: u32,
}

/// Byte range of one run covered by a replacement
#[derive(Debug, Clone, Copy)]
struct TouchedRun {
    run: NodeId,
    from: usize,
    to: usize,
}

pub struct RedactionApplicator {
    options: ApplyOptions,
    next_revision: u32,
}

impl RedactionApplicator {
    pub fn new(options: ApplyOptions) -> Self {
        Self {
            options,
            next_revision: 1,
        }
    }

    pub fn options(&self) -> &ApplyOptions {
        &self.options
    }

    /// Apply replacements computed against `index`, last one first so earlier
    /// run offsets stay valid.
    pub fn apply(
        &mut self,
        doc: &mut Document,
        index: &PositionIndex,
        replacements: &[Replacement],
    ) -> Result<ApplyStats> {
        let date = self
            .options
            .timestamp
            .unwrap_or_else(OffsetDateTime::now_utc)
            .to_offset(UtcOffset::UTC)
            .format(format_description!(
                "[year]-[month]-[day]T[hour]:[minute]:[second]Z"
            ))?;

        let mut ordered: Vec<&Replacement> = replacements.iter().collect();
        ordered.sort_by(|a, b| b.start.cmp(&a.start));

        let first_revision = self.next_revision;
        let mut consumed = vec![false; index.len()];
        let mut stats = ApplyStats::default();

        for rep in ordered {
            match self.apply_one(doc, index, rep, &mut consumed, &date) {
                Some(runs) => {
                    stats.applied += 1;
                    stats.runs_touched += runs;
                }
                None => {
                    debug!(start = rep.start, end = rep.end, tag = %rep.tag, "Skipping replacement");
                    stats.skipped += 1;
                }
            }
        }

        stats.revisions = self.next_revision - first_revision;
        debug!(
            applied = stats.applied,
            skipped = stats.skipped,
            revisions = stats.revisions,
            "Applied replacements"
        );
        Ok(stats)
    }

    /// Derive replacements from final spans and apply them
    pub fn apply_spans(
        &mut self,
        doc: &mut Document,
        text: &str,
        index: &PositionIndex,
        spans: &[Span],
    ) -> Result<ApplyStats> {
        let replacements: Vec<Replacement> = spans
            .iter()
            .map(|span| Replacement::derive(text, span))
            .collect();
        self.apply(doc, index, &replacements)
    }

    fn apply_one(
        &mut self,
        doc: &mut Document,
        index: &PositionIndex,
        rep: &Replacement,
        consumed: &mut [bool],
        date: &str,
    ) -> Option<usize> {
        let start = rep.start;
        let end = rep.end.min(index.len());
        if start >= end || consumed[start] {
            return None;
        }
        index.run_at(start)?;
        // Never reach into a range another replacement already took
        let end = (start..end).find(|&p| consumed[p]).unwrap_or(end);
        // A possessive suffix is consumed but stays in the document as plain text
        let cut = end.min(rep.end.saturating_sub(rep.suffix.len())).max(start + 1);

        let mut touched: Vec<TouchedRun> = Vec::new();
        for pos in start..cut {
            let Some((run, offset)) = index.run_at(pos) else {
                continue;
            };
            match touched.iter_mut().find(|t| t.run == run) {
                Some(t) => {
                    t.from = t.from.min(offset);
                    t.to = t.to.max(offset + 1);
                }
                None => touched.push(TouchedRun {
                    run,
                    from: offset,
                    to: offset + 1,
                }),
            }
        }
        consumed[start..end].iter_mut().for_each(|c| *c = true);

        for (i, t) in touched.iter().enumerate() {
            let lead = (i == 0).then_some(rep);
            self.rewrite_run(doc, *t, lead, date);
        }
        Some(touched.len())
    }

    fn rewrite_run(&mut self, doc: &mut Document, t: TouchedRun, lead: Option<&Replacement>, date: &str) {
        let original = doc.run_text(t.run);
        let (Some(pre), Some(mid), Some(post)) = (
            original.get(..t.from),
            original.get(t.from..t.to),
            original.get(t.to..),
        ) else {
            debug!(run = t.run, "Run text out of step with index");
            return;
        };
        let (pre, mid, post) = (pre.to_string(), mid.to_string(), post.to_string());
        let props = doc.run_properties(t.run);

        doc.set_run_text(t.run, &pre, false);
        let mut cursor = t.run;

        if self.options.track_changes {
            let del = self.revision(doc, Tag::Deletion, date);
            let deleted = doc.append_element(del, Tag::Run);
            if let Some(props) = props {
                let copy = doc.deep_clone(props);
                doc.append_child(deleted, copy);
            }
            doc.set_run_text(deleted, &mid, true);
            doc.insert_after(cursor, del);
            cursor = del;
        }

        if let Some(rep) = lead {
            let tag_run = self.tag_run(doc, &rep.tag, props);
            let node = if self.options.track_changes {
                let ins = self.revision(doc, Tag::Insertion, date);
                doc.append_child(ins, tag_run);
                ins
            } else {
                tag_run
            };
            doc.insert_after(cursor, node);
            cursor = node;
        }

        if !post.is_empty() {
            let plain = doc.create_element(Tag::Run);
            let attrs = doc.get_node(t.run).map(|n| n.attrs.clone()).unwrap_or_default();
            if let Some(node) = doc.get_node_mut(plain) {
                node.attrs = attrs;
            }
            if let Some(props) = props {
                let copy = doc.deep_clone(props);
                doc.append_child(plain, copy);
            }
            doc.set_run_text(plain, &post, false);
            doc.insert_after(cursor, plain);
        }
    }

    fn revision(&mut self, doc: &mut Document, tag: Tag, date: &str) -> NodeId {
        let id = doc.create_element(tag);
        doc.set_attr(id, "w:id", self.next_revision.to_string());
        doc.set_attr(id, "w:author", self.options.author.as_str());
        doc.set_attr(id, "w:date", date);
        self.next_revision += 1;
        id
    }

    fn tag_run(&self, doc: &mut Document, tag: &str, props: Option<NodeId>) -> NodeId {
        let run = doc.create_element(Tag::Run);
        if let Some(props) = props {
            let copy = doc.deep_clone(props);
            let recolor = self.options.tag_color.is_some();
            let stripped: Vec<NodeId> = doc
                .children(copy)
                .filter(|&c| {
                    doc.tag(c).is_some_and(|t| {
                        HIDING_PROPERTIES.contains(&t.name()) || (recolor && t.name() == "w:color")
                    })
                })
                .collect();
            for node in stripped {
                doc.detach(node);
            }
            doc.append_child(run, copy);
        }
        if let Some(color) = &self.options.tag_color {
            doc.set_run_property(run, "w:color", Some(color));
        }
        doc.set_run_text(run, tag, false);
        run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projector::{RevisionView, TextProjector};
    use marcut_core::{EntityLabel, SpanSource};
    use time::macros::datetime;

    fn options() -> ApplyOptions {
        ApplyOptions {
            timestamp: Some(datetime!(2026-01-02 03:04:05 UTC)),
            ..ApplyOptions::default()
        }
    }

    fn count(doc: &Document, tag: &Tag) -> usize {
        doc.descendants(doc.root())
            .filter(|&id| doc.tag(id) == Some(tag))
            .count()
    }

    fn text(doc: &Document, view: RevisionView) -> String {
        TextProjector::new(view).project(doc).text
    }

    fn replacement(start: usize, end: usize, tag: &str) -> Replacement {
        Replacement {
            start,
            end,
            tag: tag.to_string(),
            possessive: false,
            suffix: String::new(),
        }
    }

    #[test]
    fn test_single_run_redaction() {
        let mut doc = Document::new();
        let p = doc.add_paragraph(doc.body());
        doc.add_run(p, "Contact John Smith today");
        let projection = TextProjector::default().project(&doc);

        let mut applicator = RedactionApplicator::new(options());
        let stats = applicator
            .apply(&mut doc, &projection.index, &[replacement(8, 18, "[NAME_1]")])
            .unwrap();

        assert_eq!(stats.applied, 1);
        assert_eq!(stats.revisions, 2);
        assert_eq!(text(&doc, RevisionView::Accepted), "Contact [NAME_1] today\n");
        assert_eq!(text(&doc, RevisionView::Rejected), "Contact John Smith today\n");
        assert_eq!(text(&doc, RevisionView::Unmarked), "Contact  today\n");
    }

    #[test]
    fn test_span_across_runs_gets_one_insertion() {
        let mut doc = Document::new();
        let p = doc.add_paragraph(doc.body());
        doc.add_run(p, "Dear Jo");
        let link = doc.append_element(p, Tag::Hyperlink);
        doc.add_run(link, "hn Sm");
        doc.add_run(p, "ith, hello");
        let projection = TextProjector::default().project(&doc);

        let mut applicator = RedactionApplicator::new(options());
        let stats = applicator
            .apply(&mut doc, &projection.index, &[replacement(5, 15, "[NAME_1]")])
            .unwrap();

        assert_eq!(stats.runs_touched, 3);
        assert_eq!(count(&doc, &Tag::Insertion), 1);
        assert_eq!(count(&doc, &Tag::Deletion), 3);
        assert_eq!(text(&doc, RevisionView::Accepted), "Dear [NAME_1], hello\n");
        assert_eq!(text(&doc, RevisionView::Rejected), "Dear John Smith, hello\n");
    }

    #[test]
    fn test_multiple_replacements_in_one_run() {
        let mut doc = Document::new();
        let p = doc.add_paragraph(doc.body());
        doc.add_run(p, "Mail a@b.co or call 555-0100.");
        let projection = TextProjector::default().project(&doc);

        let mut applicator = RedactionApplicator::new(options());
        let reps = [
            replacement(5, 11, "[EMAIL_1]"),
            replacement(20, 28, "[PHONE_1]"),
        ];
        let stats = applicator.apply(&mut doc, &projection.index, &reps).unwrap();

        assert_eq!(stats.applied, 2);
        assert_eq!(
            text(&doc, RevisionView::Accepted),
            "Mail [EMAIL_1] or call [PHONE_1].\n"
        );
        assert_eq!(
            text(&doc, RevisionView::Rejected),
            "Mail a@b.co or call 555-0100.\n"
        );
    }

    #[test]
    fn test_possessive_suffix_reemitted() {
        let mut doc = Document::new();
        let p = doc.add_paragraph(doc.body());
        doc.add_run(p, "John's car");
        let projection = TextProjector::default().project(&doc);
        let span = Span::from_range(&projection.text, 0, 4, EntityLabel::Name, 0.9, SpanSource::Rule)
            .unwrap()
            .with_entity_id("NAME_1");

        let mut applicator = RedactionApplicator::new(options());
        applicator
            .apply_spans(&mut doc, &projection.text, &projection.index, &[span])
            .unwrap();

        assert_eq!(text(&doc, RevisionView::Accepted), "[NAME_1]'s car\n");
        assert_eq!(text(&doc, RevisionView::Unmarked), "'s car\n");
        assert_eq!(text(&doc, RevisionView::Rejected), "John's car\n");
    }

    #[test]
    fn test_revision_markup() {
        let mut doc = Document::new();
        let p = doc.add_paragraph(doc.body());
        doc.add_run(p, "Acme and Beta");
        let projection = TextProjector::default().project(&doc);

        let mut applicator = RedactionApplicator::new(options());
        let reps = [replacement(0, 4, "[ORG_1]"), replacement(9, 13, "[ORG_2]")];
        applicator.apply(&mut doc, &projection.index, &reps).unwrap();

        let mut ids: Vec<u32> = doc
            .descendants(doc.root())
            .filter(|&id| matches!(doc.tag(id), Some(Tag::Insertion | Tag::Deletion)))
            .map(|id| {
                assert_eq!(doc.attr(id, "w:author"), Some("Marcut"));
                assert_eq!(doc.attr(id, "w:date"), Some("2026-01-02T03:04:05Z"));
                doc.attr(id, "w:id").unwrap().parse().unwrap()
            })
            .collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_tag_formatting_strips_hiding_properties() {
        let mut doc = Document::new();
        let p = doc.add_paragraph(doc.body());
        let run = doc.add_run(p, "Secret");
        doc.set_run_property(run, "w:b", None);
        doc.set_run_property(run, "w:i", None);
        doc.set_run_property(run, "w:highlight", Some("black"));
        doc.set_run_property(run, "w:color", Some("000000"));
        doc.set_run_property(run, "w:vanish", None);
        let projection = TextProjector::default().project(&doc);

        let mut applicator = RedactionApplicator::new(options());
        applicator
            .apply(&mut doc, &projection.index, &[replacement(0, 6, "[NAME_1]")])
            .unwrap();

        let ins = doc
            .descendants(doc.root())
            .find(|&id| doc.tag(id) == Some(&Tag::Insertion))
            .unwrap();
        let tag_run = doc.children(ins).next().unwrap();
        let rpr = doc.run_properties(tag_run).unwrap();
        let props: Vec<(String, Option<String>)> = doc
            .children(rpr)
            .map(|c| {
                (
                    doc.tag(c).unwrap().name().to_string(),
                    doc.attr(c, "w:val").map(str::to_string),
                )
            })
            .collect();
        assert_eq!(
            props,
            vec![
                ("w:b".to_string(), None),
                ("w:i".to_string(), None),
                ("w:color".to_string(), Some("FF0000".to_string())),
            ]
        );

        // the deletion keeps the original formatting
        let del = doc
            .descendants(doc.root())
            .find(|&id| doc.tag(id) == Some(&Tag::Deletion))
            .unwrap();
        let del_run = doc.children(del).next().unwrap();
        let del_rpr = doc.run_properties(del_run).unwrap();
        assert_eq!(doc.children(del_rpr).count(), 4);
    }

    #[test]
    fn test_untracked_mode_rewrites_in_place() {
        let mut doc = Document::new();
        let p = doc.add_paragraph(doc.body());
        doc.add_run(p, "Contact John Smith today");
        let projection = TextProjector::default().project(&doc);

        let mut applicator = RedactionApplicator::new(ApplyOptions {
            track_changes: false,
            ..options()
        });
        let stats = applicator
            .apply(&mut doc, &projection.index, &[replacement(8, 18, "[NAME_1]")])
            .unwrap();

        assert_eq!(stats.revisions, 0);
        assert_eq!(count(&doc, &Tag::Insertion), 0);
        assert_eq!(count(&doc, &Tag::Deletion), 0);
        assert_eq!(text(&doc, RevisionView::Unmarked), "Contact [NAME_1] today\n");
    }

    #[test]
    fn test_post_run_keeps_source_attributes() {
        let mut doc = Document::new();
        let p = doc.add_paragraph(doc.body());
        let run = doc.add_run(p, "Jane wrote");
        doc.set_attr(run, "w:rsidR", "00AB12CD");
        let projection = TextProjector::default().project(&doc);

        let mut applicator = RedactionApplicator::new(options());
        applicator
            .apply(&mut doc, &projection.index, &[replacement(0, 4, "[NAME_1]")])
            .unwrap();

        let last = doc.children(p).last().unwrap();
        assert_eq!(doc.run_text(last), " wrote");
        assert_eq!(doc.attr(last, "w:rsidR"), Some("00AB12CD"));
    }

    #[test]
    fn test_unmappable_and_consumed_replacements_skipped() {
        let mut doc = Document::new();
        let p = doc.add_paragraph(doc.body());
        doc.add_run(p, "Alpha Beta");
        let projection = TextProjector::default().project(&doc);

        let mut applicator = RedactionApplicator::new(options());
        let reps = [
            // starts on the paragraph break
            replacement(10, 11, "[X]"),
            replacement(6, 10, "[NAME_1]"),
            // overlaps the range consumed by the previous one
            replacement(6, 8, "[NAME_2]"),
            replacement(40, 50, "[Y]"),
        ];
        let stats = applicator.apply(&mut doc, &projection.index, &reps).unwrap();

        assert_eq!(stats.applied, 1);
        assert_eq!(stats.skipped, 3);
        assert_eq!(text(&doc, RevisionView::Accepted), "Alpha [NAME_1]\n");
    }
}
