//! Document arena
//!
//! Nodes live in one `Vec` and reference each other by index. Removing a node
//! unlinks it from the tree; its slot stays allocated until the document is
//! dropped, so a `NodeId` handed out by a document is always valid for it.

use serde::{Deserialize, Serialize};

use crate::error::{DocxError, Result};
use crate::node::{NodeId, Tag, XmlNode};

/// Kinds of auxiliary parts that carry redactable text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartKind {
    Header,
    Footer,
    Footnotes,
    Endnotes,
}

impl PartKind {
    fn root_tag(self) -> Tag {
        match self {
            PartKind::Header => Tag::Header,
            PartKind::Footer => Tag::Footer,
            PartKind::Footnotes => Tag::Footnotes,
            PartKind::Endnotes => Tag::Endnotes,
        }
    }
}

/// Index into `Document::parts`
pub type PartId = usize;

#[derive(Debug, Clone)]
pub struct Part {
    pub kind: PartKind,
    /// Package name, e.g. `word/header1.xml`
    pub name: String,
    /// `None` when the part could not be read by the loader
    pub root: Option<NodeId>,
}

/// Header and footer references of one document section.
/// Several sections may point at the same part.
#[derive(Debug, Clone, Default)]
pub struct Section {
    pub headers: Vec<PartId>,
    pub footers: Vec<PartId>,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<XmlNode>,
    root: NodeId,
    body: NodeId,
    parts: Vec<Part>,
    sections: Vec<Section>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document with a `w:document/w:body` skeleton
    pub fn new() -> Self {
        let mut doc = Document {
            nodes: Vec::new(),
            root: 0,
            body: 0,
            parts: Vec::new(),
            sections: Vec::new(),
        };
        let root = doc.create_element(Tag::Document);
        let body = doc.create_element(Tag::Body);
        doc.append_child(root, body);
        doc.root = root;
        doc.body = body;
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Fail when the main story is not reachable from the root.
    pub fn validate(&self) -> Result<()> {
        let body = self.get_node(self.body).ok_or(DocxError::MissingBody)?;
        if body.tag != Tag::Body || body.parent != Some(self.root) {
            return Err(DocxError::MissingBody);
        }
        Ok(())
    }

    // =========================================================================
    // Node access
    // =========================================================================

    pub fn get_node(&self, id: NodeId) -> Option<&XmlNode> {
        self.nodes.get(id as usize)
    }

    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut XmlNode> {
        self.nodes.get_mut(id as usize)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn node(&self, id: NodeId) -> &XmlNode {
        &self.nodes[id as usize]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut XmlNode {
        &mut self.nodes[id as usize]
    }

    pub fn tag(&self, id: NodeId) -> Option<&Tag> {
        self.get_node(id).map(|n| &n.tag)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get_node(id).and_then(|n| n.attr(name))
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(node) = self.get_node_mut(id) {
            node.set_attr(name, value);
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id).and_then(|n| n.parent)
    }

    /// Iterate over children of a node
    pub fn children(&self, id: NodeId) -> ChildIter<'_> {
        let first = self.get_node(id).and_then(|n| n.first_child);
        ChildIter {
            doc: self,
            next: first,
        }
    }

    /// Iterate over all descendants of a node (depth-first, document order)
    pub fn descendants(&self, id: NodeId) -> DescendantIter<'_> {
        let mut stack = Vec::new();
        if let Some(node) = self.get_node(id) {
            let mut child_id = node.last_child;
            while let Some(cid) = child_id {
                stack.push(cid);
                child_id = self.get_node(cid).and_then(|n| n.prev_sibling);
            }
        }
        DescendantIter { doc: self, stack }
    }

    pub fn find_child(&self, id: NodeId, tag: &Tag) -> Option<NodeId> {
        self.children(id).find(|&c| self.node(c).tag == *tag)
    }

    // =========================================================================
    // Structural edits
    // =========================================================================

    /// Allocate an unlinked element
    pub fn create_element(&mut self, tag: Tag) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(XmlNode::element(tag));
        id
    }

    /// Allocate an unlinked text-bearing element (`w:t`, `w:delText`, ...)
    pub fn create_text_element(&mut self, tag: Tag, text: impl Into<String>) -> NodeId {
        let id = self.create_element(tag);
        self.node_mut(id).text = Some(text.into());
        id
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        let last = self.node(parent).last_child;
        {
            let node = self.node_mut(child);
            node.parent = Some(parent);
            node.prev_sibling = last;
            node.next_sibling = None;
        }
        match last {
            Some(last) => self.node_mut(last).next_sibling = Some(child),
            None => self.node_mut(parent).first_child = Some(child),
        }
        self.node_mut(parent).last_child = Some(child);
    }

    pub fn append_element(&mut self, parent: NodeId, tag: Tag) -> NodeId {
        let id = self.create_element(tag);
        self.append_child(parent, id);
        id
    }

    /// Link `node` as the next sibling of `anchor`
    pub fn insert_after(&mut self, anchor: NodeId, node: NodeId) {
        self.detach(node);
        let parent = self.node(anchor).parent;
        let next = self.node(anchor).next_sibling;
        {
            let n = self.node_mut(node);
            n.parent = parent;
            n.prev_sibling = Some(anchor);
            n.next_sibling = next;
        }
        self.node_mut(anchor).next_sibling = Some(node);
        match next {
            Some(next) => self.node_mut(next).prev_sibling = Some(node),
            None => {
                if let Some(parent) = parent {
                    self.node_mut(parent).last_child = Some(node);
                }
            }
        }
    }

    /// Link `node` as the previous sibling of `anchor`
    pub fn insert_before(&mut self, anchor: NodeId, node: NodeId) {
        self.detach(node);
        let parent = self.node(anchor).parent;
        let prev = self.node(anchor).prev_sibling;
        {
            let n = self.node_mut(node);
            n.parent = parent;
            n.prev_sibling = prev;
            n.next_sibling = Some(anchor);
        }
        self.node_mut(anchor).prev_sibling = Some(node);
        match prev {
            Some(prev) => self.node_mut(prev).next_sibling = Some(node),
            None => {
                if let Some(parent) = parent {
                    self.node_mut(parent).first_child = Some(node);
                }
            }
        }
    }

    /// Unlink a node (and its subtree) from its parent and siblings
    pub fn detach(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let n = self.node(id);
            (n.parent, n.prev_sibling, n.next_sibling)
        };
        match prev {
            Some(prev) => self.node_mut(prev).next_sibling = next,
            None => {
                if let Some(parent) = parent {
                    self.node_mut(parent).first_child = next;
                }
            }
        }
        match next {
            Some(next) => self.node_mut(next).prev_sibling = prev,
            None => {
                if let Some(parent) = parent {
                    self.node_mut(parent).last_child = prev;
                }
            }
        }
        let n = self.node_mut(id);
        n.parent = None;
        n.prev_sibling = None;
        n.next_sibling = None;
    }

    /// Replace a node by its children
    pub fn unwrap_node(&mut self, id: NodeId) {
        let children: Vec<NodeId> = self.children(id).collect();
        for child in children {
            self.insert_before(id, child);
        }
        self.detach(id);
    }

    /// Copy a subtree; the copy is unlinked
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let source = self.node(id);
        let mut copy = XmlNode::element(source.tag.clone());
        copy.attrs = source.attrs.clone();
        copy.text = source.text.clone();
        let copy_id = self.nodes.len() as NodeId;
        self.nodes.push(copy);

        let children: Vec<NodeId> = self.children(id).collect();
        for child in children {
            let child_copy = self.deep_clone(child);
            self.append_child(copy_id, child_copy);
        }
        copy_id
    }

    // =========================================================================
    // Parts and sections
    // =========================================================================

    pub fn add_part(&mut self, kind: PartKind, name: impl Into<String>) -> PartId {
        let root = self.create_element(kind.root_tag());
        self.parts.push(Part {
            kind,
            name: name.into(),
            root: Some(root),
        });
        self.parts.len() - 1
    }

    /// Register a part the loader could not read; it is skipped by every pass
    pub fn add_unreadable_part(&mut self, kind: PartKind, name: impl Into<String>) -> PartId {
        self.parts.push(Part {
            kind,
            name: name.into(),
            root: None,
        });
        self.parts.len() - 1
    }

    pub fn add_section(&mut self, section: Section) {
        self.sections.push(section);
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn part(&self, id: PartId) -> Option<&Part> {
        self.parts.get(id)
    }

    pub fn part_root(&self, id: PartId) -> Option<NodeId> {
        self.parts.get(id).and_then(|p| p.root)
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// The main story root followed by every readable part root
    pub fn content_roots(&self) -> Vec<NodeId> {
        std::iter::once(self.root)
            .chain(self.parts.iter().filter_map(|p| p.root))
            .collect()
    }

    /// Append a `w:footnote`/`w:endnote` to a notes part
    pub fn add_note(&mut self, part: PartId, note_id: i64) -> Result<NodeId> {
        let (kind, root) = match self.parts.get(part) {
            Some(Part {
                kind,
                root: Some(root),
                ..
            }) => (*kind, *root),
            _ => return Err(DocxError::UnknownPart(part)),
        };
        let tag = match kind {
            PartKind::Footnotes => Tag::Footnote,
            PartKind::Endnotes => Tag::Endnote,
            PartKind::Header | PartKind::Footer => {
                return Err(DocxError::UnexpectedNode {
                    id: root,
                    expected: "notes part",
                    found: self.node(root).tag.name().to_string(),
                });
            }
        };
        let note = self.append_element(root, tag);
        self.set_attr(note, "w:id", note_id.to_string());
        Ok(note)
    }

    // =========================================================================
    // Paragraphs and runs
    // =========================================================================

    pub fn add_paragraph(&mut self, parent: NodeId) -> NodeId {
        self.append_element(parent, Tag::Paragraph)
    }

    /// Append a run holding `text`; tabs and line breaks become `w:tab`/`w:br`
    pub fn add_run(&mut self, parent: NodeId, text: &str) -> NodeId {
        let run = self.append_element(parent, Tag::Run);
        self.set_run_text(run, text, false);
        run
    }

    pub fn run_properties(&self, run: NodeId) -> Option<NodeId> {
        self.find_child(run, &Tag::RunProperties)
    }

    /// Add a formatting element (`w:b`, `w:color`, ...) to a run, creating
    /// `w:rPr` as its first child when missing.
    pub fn set_run_property(&mut self, run: NodeId, name: &str, value: Option<&str>) -> NodeId {
        let rpr = match self.run_properties(run) {
            Some(rpr) => rpr,
            None => {
                let rpr = self.create_element(Tag::RunProperties);
                match self.node(run).first_child {
                    Some(first) => self.insert_before(first, rpr),
                    None => self.append_child(run, rpr),
                }
                rpr
            }
        };
        let prop = self.append_element(rpr, Tag::from_name(name));
        if let Some(value) = value {
            self.set_attr(prop, "w:val", value);
        }
        prop
    }

    /// Characters a run child contributes to the run's text
    pub(crate) fn text_piece(&self, id: NodeId) -> Option<&str> {
        let node = self.node(id);
        match node.tag {
            Tag::Text | Tag::DeletedText => Some(node.text.as_deref().unwrap_or_default()),
            Tag::Tab => Some("\t"),
            Tag::Break | Tag::CarriageReturn => Some("\n"),
            Tag::NoBreakHyphen => Some("-"),
            _ => None,
        }
    }

    /// Text of a run, live or deleted
    pub fn run_text(&self, run: NodeId) -> String {
        self.children(run)
            .filter_map(|c| self.text_piece(c))
            .collect()
    }

    /// Replace the text-bearing children of a run, keeping `w:rPr`, drawings
    /// and field characters where they are. New content takes the position of
    /// the first old text child. `deleted` writes `w:delText` instead of `w:t`.
    pub fn set_run_text(&mut self, run: NodeId, text: &str, deleted: bool) {
        let old: Vec<NodeId> = self
            .children(run)
            .filter(|&c| self.node(c).tag.is_run_text())
            .collect();
        let pieces = self.build_text_nodes(text, deleted);

        match old.first() {
            Some(&first) => {
                for piece in pieces {
                    self.insert_before(first, piece);
                }
            }
            None => {
                let mut cursor = self.run_properties(run);
                for piece in pieces {
                    match (cursor, self.node(run).first_child) {
                        (Some(prev), _) => self.insert_after(prev, piece),
                        (None, Some(first)) => self.insert_before(first, piece),
                        (None, None) => self.append_child(run, piece),
                    }
                    cursor = Some(piece);
                }
            }
        }

        for node in old {
            self.detach(node);
        }
    }

    fn build_text_nodes(&mut self, text: &str, deleted: bool) -> Vec<NodeId> {
        let text_tag = if deleted { Tag::DeletedText } else { Tag::Text };
        let mut nodes = Vec::new();
        let mut buf = String::new();

        for ch in text.chars() {
            let special = match ch {
                '\t' => Some(Tag::Tab),
                '\n' => Some(Tag::Break),
                _ => None,
            };
            match special {
                Some(tag) => {
                    if !buf.is_empty() {
                        let chunk = std::mem::take(&mut buf);
                        nodes.push(self.create_text_element(text_tag.clone(), chunk));
                    }
                    nodes.push(self.create_element(tag));
                }
                None => buf.push(ch),
            }
        }
        if !buf.is_empty() {
            nodes.push(self.create_text_element(text_tag, buf));
        }
        nodes
    }
}

/// Iterator over child nodes
pub struct ChildIter<'d> {
    doc: &'d Document,
    next: Option<NodeId>,
}

impl<'d> Iterator for ChildIter<'d> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.get_node(current).and_then(|n| n.next_sibling);
        Some(current)
    }
}

/// Iterator over descendant nodes (depth-first)
pub struct DescendantIter<'d> {
    doc: &'d Document,
    stack: Vec<NodeId>,
}

impl<'d> Iterator for DescendantIter<'d> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;

        // Push children in reverse so the first child is visited first
        if let Some(node) = self.doc.get_node(current) {
            let mut child_id = node.last_child;
            while let Some(id) = child_id {
                self.stack.push(id);
                child_id = self.doc.get_node(id).and_then(|n| n.prev_sibling);
            }
        }

        Some(current)
    }
}
