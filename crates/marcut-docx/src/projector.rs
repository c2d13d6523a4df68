//! Text projection
//!
//! Flattens every text-bearing story of a document into one string and
//! records, for each byte of that string, where it came from. The index is
//! what lets the applicator map a byte range back onto runs.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::document::{Document, PartId, PartKind};
use crate::node::{NodeId, Tag};

/// Which side of existing tracked changes the projection reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevisionView {
    /// Insertions read, deletions skipped (what a reader sees after accepting)
    #[default]
    Accepted,
    /// Deletions read, insertions skipped (text before the changes)
    Rejected,
    /// Neither side read
    Unmarked,
}

impl RevisionView {
    fn reads(self, tag: &Tag) -> bool {
        match tag {
            Tag::Insertion | Tag::MoveTo => self == RevisionView::Accepted,
            Tag::Deletion | Tag::MoveFrom => self == RevisionView::Rejected,
            _ => true,
        }
    }
}

/// Source of one byte of projected text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexEntry {
    Char {
        paragraph: NodeId,
        run: NodeId,
        /// Byte offset into the run's text
        offset: usize,
    },
    /// The `"\n"` closing a paragraph
    Break { paragraph: NodeId },
}

/// One entry per byte of projected text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionIndex {
    entries: Vec<IndexEntry>,
}

impl PositionIndex {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, pos: usize) -> Option<IndexEntry> {
        self.entries.get(pos).copied()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Run and run offset of a byte, `None` for paragraph breaks
    pub fn run_at(&self, pos: usize) -> Option<(NodeId, usize)> {
        match self.entries.get(pos)? {
            IndexEntry::Char { run, offset, .. } => Some((*run, *offset)),
            IndexEntry::Break { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Projection {
    pub text: String,
    pub index: PositionIndex,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TextProjector {
    view: RevisionView,
}

impl TextProjector {
    pub fn new(view: RevisionView) -> Self {
        Self { view }
    }

    pub fn view(&self) -> RevisionView {
        self.view
    }

    /// Project the body, then section headers and footers (each part once),
    /// then footnotes, then endnotes.
    pub fn project(&self, doc: &Document) -> Projection {
        let mut walker = Walker {
            doc,
            view: self.view,
            text: String::new(),
            entries: Vec::new(),
        };

        walker.block_container(doc.body());

        let mut seen: HashSet<PartId> = HashSet::new();
        for section in doc.sections() {
            for &part in section.headers.iter().chain(section.footers.iter()) {
                if seen.insert(part) {
                    walker.part(part);
                }
            }
        }

        for kind in [PartKind::Footnotes, PartKind::Endnotes] {
            for (id, part) in doc.parts().iter().enumerate() {
                if part.kind == kind {
                    walker.part(id);
                }
            }
        }

        debug!(
            bytes = walker.text.len(),
            view = ?self.view,
            "Projected document text"
        );

        Projection {
            text: walker.text,
            index: PositionIndex {
                entries: walker.entries,
            },
        }
    }
}

/// Complex field nesting: `true` once a field reached its `separate` mark
type FieldStack = Vec<bool>;

struct Walker<'d> {
    doc: &'d Document,
    view: RevisionView,
    text: String,
    entries: Vec<IndexEntry>,
}

impl<'d> Walker<'d> {
    fn part(&mut self, id: PartId) {
        let doc = self.doc;
        let Some(part) = doc.part(id) else {
            warn!(part = id, "Section references a missing part");
            return;
        };
        let Some(root) = part.root else {
            warn!(part = %part.name, "Skipping unreadable part");
            return;
        };

        match part.kind {
            PartKind::Header | PartKind::Footer => self.block_container(root),
            PartKind::Footnotes | PartKind::Endnotes => {
                for note in doc.children(root) {
                    if matches!(doc.node(note).tag, Tag::Footnote | Tag::Endnote) {
                        self.block_container(note);
                    }
                }
            }
        }
    }

    /// Body, cell, header, note or text-box content
    fn block_container(&mut self, id: NodeId) {
        let doc = self.doc;
        for child in doc.children(id) {
            let tag = &doc.node(child).tag;
            match tag {
                Tag::Paragraph => self.paragraph(child),
                Tag::Table => self.table(child),
                Tag::Sdt => {
                    if let Some(content) = doc.find_child(child, &Tag::SdtContent) {
                        self.block_container(content);
                    }
                }
                Tag::CustomXml => self.block_container(child),
                Tag::Insertion | Tag::MoveTo | Tag::Deletion | Tag::MoveFrom => {
                    if self.view.reads(tag) {
                        self.block_container(child);
                    }
                }
                _ => {}
            }
        }
    }

    /// Table or a row container wrapped in a content control
    fn table(&mut self, id: NodeId) {
        let doc = self.doc;
        for child in doc.children(id) {
            match &doc.node(child).tag {
                Tag::TableRow => self.row(child),
                Tag::Sdt => {
                    if let Some(content) = doc.find_child(child, &Tag::SdtContent) {
                        self.table(content);
                    }
                }
                Tag::CustomXml => self.table(child),
                _ => {}
            }
        }
    }

    fn row(&mut self, id: NodeId) {
        let doc = self.doc;
        for child in doc.children(id) {
            match &doc.node(child).tag {
                Tag::TableCell => self.block_container(child),
                Tag::Sdt => {
                    if let Some(content) = doc.find_child(child, &Tag::SdtContent) {
                        self.row(content);
                    }
                }
                Tag::CustomXml => self.row(child),
                _ => {}
            }
        }
    }

    fn paragraph(&mut self, id: NodeId) {
        let mut fields = FieldStack::new();
        self.inline_container(id, id, &mut fields);
        self.text.push('\n');
        self.entries.push(IndexEntry::Break { paragraph: id });
    }

    fn inline_container(&mut self, paragraph: NodeId, id: NodeId, fields: &mut FieldStack) {
        let doc = self.doc;
        for child in doc.children(id) {
            let tag = &doc.node(child).tag;
            match tag {
                Tag::Run => self.run(paragraph, child, fields),
                Tag::Hyperlink
                | Tag::SimpleField
                | Tag::SmartTag
                | Tag::CustomXml
                | Tag::SdtContent => self.inline_container(paragraph, child, fields),
                Tag::Sdt => {
                    if let Some(content) = doc.find_child(child, &Tag::SdtContent) {
                        self.inline_container(paragraph, content, fields);
                    }
                }
                Tag::Insertion | Tag::MoveTo | Tag::Deletion | Tag::MoveFrom => {
                    if self.view.reads(tag) {
                        self.inline_container(paragraph, child, fields);
                    }
                }
                Tag::Drawing | Tag::Pict | Tag::AlternateContent => self.text_boxes(child),
                _ => {}
            }
        }
    }

    fn run(&mut self, paragraph: NodeId, run: NodeId, fields: &mut FieldStack) {
        let doc = self.doc;
        // Offsets count every text child, shown or not, so they line up with
        // `Document::run_text`.
        let mut offset = 0;
        for child in doc.children(run) {
            let node = doc.node(child);
            match &node.tag {
                Tag::FieldChar => match node.attr("w:fldCharType") {
                    Some("begin") => fields.push(false),
                    Some("separate") => {
                        if let Some(top) = fields.last_mut() {
                            *top = true;
                        }
                    }
                    Some("end") => {
                        fields.pop();
                    }
                    _ => {}
                },
                Tag::Drawing | Tag::Pict | Tag::AlternateContent => self.text_boxes(child),
                _ => {
                    if let Some(piece) = doc.text_piece(child) {
                        if fields.iter().all(|shown| *shown) {
                            self.push_run_text(paragraph, run, offset, piece);
                        }
                        offset += piece.len();
                    }
                }
            }
        }
    }

    fn push_run_text(&mut self, paragraph: NodeId, run: NodeId, start: usize, piece: &str) {
        self.text.push_str(piece);
        self.entries
            .extend((0..piece.len()).map(|i| IndexEntry::Char {
                paragraph,
                run,
                offset: start + i,
            }));
    }

    /// Inline text-box stories found under a drawing, skipping fallbacks
    fn text_boxes(&mut self, id: NodeId) {
        let doc = self.doc;
        for child in doc.children(id) {
            match &doc.node(child).tag {
                Tag::Fallback => {}
                Tag::TextBoxContent => self.block_container(child),
                _ => self.text_boxes(child),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Section;

    fn project(doc: &Document) -> Projection {
        TextProjector::default().project(doc)
    }

    fn field_char(doc: &mut Document, parent: NodeId, kind: &str) {
        let run = doc.append_element(parent, Tag::Run);
        let fld = doc.append_element(run, Tag::FieldChar);
        doc.set_attr(fld, "w:fldCharType", kind);
    }

    #[test]
    fn test_paragraphs_and_index_align() {
        let mut doc = Document::new();
        let p1 = doc.add_paragraph(doc.body());
        let r1 = doc.add_run(p1, "Héllo ");
        let r2 = doc.add_run(p1, "world");
        let p2 = doc.add_paragraph(doc.body());
        doc.add_run(p2, "Bye");

        let projection = project(&doc);
        assert_eq!(projection.text, "Héllo world\nBye\n");
        assert_eq!(projection.index.len(), projection.text.len());
        assert_eq!(projection.index.run_at(0), Some((r1, 0)));
        // 'é' occupies two bytes of the run
        assert_eq!(projection.index.run_at(2), Some((r1, 2)));
        assert_eq!(projection.index.run_at(7), Some((r2, 0)));
        assert_eq!(
            projection.index.get(12),
            Some(IndexEntry::Break { paragraph: p1 })
        );
    }

    #[test]
    fn test_every_char_entry_maps_back_to_run_text() {
        let mut doc = Document::new();
        let p = doc.add_paragraph(doc.body());
        doc.add_run(p, "Tab\there");
        let link = doc.append_element(p, Tag::Hyperlink);
        doc.add_run(link, "linked");

        let projection = project(&doc);
        for (pos, entry) in projection.index.entries().iter().enumerate() {
            if let IndexEntry::Char { run, offset, .. } = entry {
                let run_text = doc.run_text(*run);
                assert_eq!(
                    run_text.as_bytes()[*offset],
                    projection.text.as_bytes()[pos]
                );
            }
        }
    }

    #[test]
    fn test_projection_is_idempotent() {
        let mut doc = Document::new();
        let p = doc.add_paragraph(doc.body());
        doc.add_run(p, "Same text");
        assert_eq!(project(&doc).text, project(&doc).text);
        assert_eq!(project(&doc).index, project(&doc).index);
    }

    #[test]
    fn test_tables_and_content_controls() {
        let mut doc = Document::new();
        let body = doc.body();
        let tbl = doc.append_element(body, Tag::Table);
        let tr = doc.append_element(tbl, Tag::TableRow);
        let tc = doc.append_element(tr, Tag::TableCell);
        let p = doc.add_paragraph(tc);
        doc.add_run(p, "cell");
        // nested table inside the cell
        let inner = doc.append_element(tc, Tag::Table);
        let inner_tr = doc.append_element(inner, Tag::TableRow);
        let inner_tc = doc.append_element(inner_tr, Tag::TableCell);
        let ip = doc.add_paragraph(inner_tc);
        doc.add_run(ip, "nested");

        let sdt = doc.append_element(body, Tag::Sdt);
        let content = doc.append_element(sdt, Tag::SdtContent);
        let sp = doc.add_paragraph(content);
        doc.add_run(sp, "control");

        assert_eq!(project(&doc).text, "cell\nnested\ncontrol\n");
    }

    #[test]
    fn test_complex_field_shows_result_only() {
        let mut doc = Document::new();
        let p = doc.add_paragraph(doc.body());
        doc.add_run(p, "See ");
        field_char(&mut doc, p, "begin");
        let instr = doc.append_element(p, Tag::Run);
        let instr_text = doc.create_text_element(Tag::Text, " HYPERLINK \"x\" ");
        doc.append_child(instr, instr_text);
        field_char(&mut doc, p, "separate");
        doc.add_run(p, "result");
        field_char(&mut doc, p, "end");
        doc.add_run(p, " done");

        assert_eq!(project(&doc).text, "See result done\n");
    }

    #[test]
    fn test_nested_field_in_instruction_is_hidden() {
        let mut doc = Document::new();
        let p = doc.add_paragraph(doc.body());
        field_char(&mut doc, p, "begin");
        field_char(&mut doc, p, "begin");
        doc.add_run(p, "inner code");
        field_char(&mut doc, p, "separate");
        doc.add_run(p, "inner result");
        field_char(&mut doc, p, "end");
        field_char(&mut doc, p, "separate");
        doc.add_run(p, "outer result");
        field_char(&mut doc, p, "end");

        assert_eq!(project(&doc).text, "outer result\n");
    }

    #[test]
    fn test_text_box_inlined_and_fallback_ignored() {
        let mut doc = Document::new();
        let p = doc.add_paragraph(doc.body());
        doc.add_run(p, "Before ");
        let run = doc.append_element(p, Tag::Run);
        let alt = doc.append_element(run, Tag::AlternateContent);
        let choice = doc.append_element(alt, Tag::Other("mc:Choice".into()));
        let drawing = doc.append_element(choice, Tag::Drawing);
        let txbx = doc.append_element(drawing, Tag::TextBoxContent);
        let bp = doc.add_paragraph(txbx);
        doc.add_run(bp, "boxed");
        let fallback = doc.append_element(alt, Tag::Fallback);
        let pict = doc.append_element(fallback, Tag::Pict);
        let dup = doc.append_element(pict, Tag::TextBoxContent);
        let dp = doc.add_paragraph(dup);
        doc.add_run(dp, "boxed");
        doc.add_run(p, "after");

        assert_eq!(project(&doc).text, "Before boxed\nafter\n");
    }

    #[test]
    fn test_parts_order_and_header_dedupe() {
        let mut doc = Document::new();
        let p = doc.add_paragraph(doc.body());
        doc.add_run(p, "Body");

        let header = doc.add_part(PartKind::Header, "word/header1.xml");
        let hroot = doc.part_root(header).unwrap();
        let hp = doc.add_paragraph(hroot);
        doc.add_run(hp, "Header");

        let footer = doc.add_part(PartKind::Footer, "word/footer1.xml");
        let froot = doc.part_root(footer).unwrap();
        let fp = doc.add_paragraph(froot);
        doc.add_run(fp, "Footer");

        let broken = doc.add_unreadable_part(PartKind::Header, "word/header2.xml");

        let notes = doc.add_part(PartKind::Footnotes, "word/footnotes.xml");
        let note = doc.add_note(notes, 1).unwrap();
        let np = doc.add_paragraph(note);
        doc.add_run(np, "Note");

        for _ in 0..2 {
            doc.add_section(Section {
                headers: vec![header, broken],
                footers: vec![footer],
            });
        }

        assert_eq!(project(&doc).text, "Body\nHeader\nFooter\nNote\n");
    }

    #[test]
    fn test_revision_views() {
        let mut doc = Document::new();
        let p = doc.add_paragraph(doc.body());
        doc.add_run(p, "Call ");
        let del = doc.append_element(p, Tag::Deletion);
        let dr = doc.append_element(del, Tag::Run);
        doc.set_run_text(dr, "Jane", true);
        let ins = doc.append_element(p, Tag::Insertion);
        doc.add_run(ins, "[NAME_1]");
        doc.add_run(p, " today");

        let text = |view| TextProjector::new(view).project(&doc).text;
        assert_eq!(text(RevisionView::Accepted), "Call [NAME_1] today\n");
        assert_eq!(text(RevisionView::Rejected), "Call Jane today\n");
        assert_eq!(text(RevisionView::Unmarked), "Call  today\n");
    }
}
