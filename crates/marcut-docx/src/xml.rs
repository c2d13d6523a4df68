//! XML serialization of arena subtrees

use std::borrow::Cow;
use std::fmt::Write;

use crate::document::Document;
use crate::node::{NodeId, Tag};

impl Document {
    /// Serialize a node and its subtree as WordprocessingML markup.
    /// Namespace declarations are the container writer's concern.
    pub fn to_xml(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    /// Serialize the main story
    pub fn document_xml(&self) -> String {
        self.to_xml(self.root())
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.get_node(id) else {
            return;
        };
        let name = node.tag.name();

        out.push('<');
        out.push_str(name);
        for (key, value) in &node.attrs {
            let _ = write!(out, " {}=\"{}\"", key, escape(value, true));
        }
        let preserve = matches!(
            node.tag,
            Tag::Text | Tag::DeletedText | Tag::InstrText
        ) && node.attr("xml:space").is_none();
        if preserve {
            out.push_str(" xml:space=\"preserve\"");
        }

        let text = node.text.as_deref().unwrap_or_default();
        if text.is_empty() && node.first_child.is_none() {
            out.push_str("/>");
            return;
        }

        out.push('>');
        out.push_str(&escape(text, false));
        for child in self.children(id) {
            self.write_node(child, out);
        }
        out.push_str("</");
        out.push_str(name);
        out.push('>');
    }
}

fn escape(value: &str, attribute: bool) -> Cow<'_, str> {
    let needs = |c: char| matches!(c, '&' | '<' | '>') || (attribute && c == '"');
    if !value.contains(needs) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' if attribute => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}
