//! WordprocessingML node representation
//!
//! Uses NodeId (u32) for compact node references into the document arena.

/// Compact node identifier (index into arena)
pub type NodeId = u32;

/// Element names the projector and applicator treat specially.
/// Everything else is carried through verbatim as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Document,
    Body,
    Header,
    Footer,
    Footnotes,
    Footnote,
    Endnotes,
    Endnote,
    Paragraph,
    Run,
    RunProperties,
    Text,
    DeletedText,
    InstrText,
    Tab,
    Break,
    CarriageReturn,
    NoBreakHyphen,
    Hyperlink,
    Insertion,
    Deletion,
    MoveFrom,
    MoveTo,
    SimpleField,
    FieldChar,
    Sdt,
    SdtContent,
    SmartTag,
    CustomXml,
    Table,
    TableRow,
    TableCell,
    Drawing,
    Pict,
    TextBoxContent,
    AlternateContent,
    Fallback,
    Other(String),
}

impl Tag {
    /// Qualified element name as written in the part
    pub fn name(&self) -> &str {
        match self {
            Tag::Document => "w:document",
            Tag::Body => "w:body",
            Tag::Header => "w:hdr",
            Tag::Footer => "w:ftr",
            Tag::Footnotes => "w:footnotes",
            Tag::Footnote => "w:footnote",
            Tag::Endnotes => "w:endnotes",
            Tag::Endnote => "w:endnote",
            Tag::Paragraph => "w:p",
            Tag::Run => "w:r",
            Tag::RunProperties => "w:rPr",
            Tag::Text => "w:t",
            Tag::DeletedText => "w:delText",
            Tag::InstrText => "w:instrText",
            Tag::Tab => "w:tab",
            Tag::Break => "w:br",
            Tag::CarriageReturn => "w:cr",
            Tag::NoBreakHyphen => "w:noBreakHyphen",
            Tag::Hyperlink => "w:hyperlink",
            Tag::Insertion => "w:ins",
            Tag::Deletion => "w:del",
            Tag::MoveFrom => "w:moveFrom",
            Tag::MoveTo => "w:moveTo",
            Tag::SimpleField => "w:fldSimple",
            Tag::FieldChar => "w:fldChar",
            Tag::Sdt => "w:sdt",
            Tag::SdtContent => "w:sdtContent",
            Tag::SmartTag => "w:smartTag",
            Tag::CustomXml => "w:customXml",
            Tag::Table => "w:tbl",
            Tag::TableRow => "w:tr",
            Tag::TableCell => "w:tc",
            Tag::Drawing => "w:drawing",
            Tag::Pict => "w:pict",
            Tag::TextBoxContent => "w:txbxContent",
            Tag::AlternateContent => "mc:AlternateContent",
            Tag::Fallback => "mc:Fallback",
            Tag::Other(name) => name,
        }
    }

    /// Map a qualified element name to a tag
    pub fn from_name(name: &str) -> Tag {
        match name {
            "w:document" => Tag::Document,
            "w:body" => Tag::Body,
            "w:hdr" => Tag::Header,
            "w:ftr" => Tag::Footer,
            "w:footnotes" => Tag::Footnotes,
            "w:footnote" => Tag::Footnote,
            "w:endnotes" => Tag::Endnotes,
            "w:endnote" => Tag::Endnote,
            "w:p" => Tag::Paragraph,
            "w:r" => Tag::Run,
            "w:rPr" => Tag::RunProperties,
            "w:t" => Tag::Text,
            "w:delText" => Tag::DeletedText,
            "w:instrText" => Tag::InstrText,
            "w:tab" => Tag::Tab,
            "w:br" => Tag::Break,
            "w:cr" => Tag::CarriageReturn,
            "w:noBreakHyphen" => Tag::NoBreakHyphen,
            "w:hyperlink" => Tag::Hyperlink,
            "w:ins" => Tag::Insertion,
            "w:del" => Tag::Deletion,
            "w:moveFrom" => Tag::MoveFrom,
            "w:moveTo" => Tag::MoveTo,
            "w:fldSimple" => Tag::SimpleField,
            "w:fldChar" => Tag::FieldChar,
            "w:sdt" => Tag::Sdt,
            "w:sdtContent" => Tag::SdtContent,
            "w:smartTag" => Tag::SmartTag,
            "w:customXml" => Tag::CustomXml,
            "w:tbl" => Tag::Table,
            "w:tr" => Tag::TableRow,
            "w:tc" => Tag::TableCell,
            "w:drawing" => Tag::Drawing,
            "w:pict" => Tag::Pict,
            "w:txbxContent" => Tag::TextBoxContent,
            "mc:AlternateContent" => Tag::AlternateContent,
            "mc:Fallback" => Tag::Fallback,
            other => Tag::Other(other.to_string()),
        }
    }

    /// Run children that carry characters of the run's text
    pub fn is_run_text(&self) -> bool {
        matches!(
            self,
            Tag::Text
                | Tag::DeletedText
                | Tag::Tab
                | Tag::Break
                | Tag::CarriageReturn
                | Tag::NoBreakHyphen
        )
    }
}

/// An element in the arena
#[derive(Debug, Clone)]
pub struct XmlNode {
    pub tag: Tag,
    /// Attributes in document order, names qualified (`w:val`)
    pub attrs: Vec<(String, String)>,
    /// Character content for text-bearing elements (`w:t`, `w:delText`, `w:instrText`)
    pub text: Option<String>,
    /// Parent node (None for part roots and detached nodes)
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
}

impl XmlNode {
    /// Create a new, unlinked element node
    pub fn element(tag: Tag) -> Self {
        XmlNode {
            tag,
            attrs: Vec::new(),
            text: None,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_name_round_trip() {
        for name in ["w:p", "w:r", "w:delText", "w:txbxContent", "mc:Fallback", "w:bookmarkStart"] {
            assert_eq!(Tag::from_name(name).name(), name);
        }
    }

    #[test]
    fn test_set_attr_replaces() {
        let mut node = XmlNode::element(Tag::Insertion);
        node.set_attr("w:id", "1");
        node.set_attr("w:id", "2");
        assert_eq!(node.attr("w:id"), Some("2"));
        assert_eq!(node.attrs.len(), 1);
    }
}
