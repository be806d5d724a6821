//! Minimal XML element tree with an indenting serializer.
//!
//! Only what the project file needs: elements, attributes in insertion
//! order, and leaf text. Parsing is done with `roxmltree`.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// A leaf element holding `text`.
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut element = Self::new(name);
        element.text = Some(text.into());
        element
    }

    /// An element holding one `<p>` per line of `text`.
    pub fn paragraphs(name: impl Into<String>, text: &str) -> Self {
        let mut element = Self::new(name);
        for line in text.split('\n') {
            element.push(Self::with_text("p", line));
        }
        element
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.push((name.into(), value.into()));
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(child);
    }

    /// Append a new empty child and return it.
    pub fn sub_element(&mut self, name: impl Into<String>) -> &mut XmlElement {
        self.children.push(Self::new(name));
        self.children
            .last_mut()
            .expect("child was just pushed")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> &[XmlElement] {
        &self.children
    }

    /// The first character in any name, attribute or text that XML 1.0
    /// cannot represent, with the name of the element holding it.
    pub fn find_invalid_char(&self) -> Option<(&str, char)> {
        let own = std::iter::once(self.name.as_str())
            .chain(self.attributes.iter().flat_map(|(n, v)| [n.as_str(), v.as_str()]))
            .chain(self.text.as_deref())
            .flat_map(str::chars)
            .find(|c| !is_xml_char(*c));
        match own {
            Some(c) => Some((self.name.as_str(), c)),
            None => self.children.iter().find_map(XmlElement::find_invalid_char),
        }
    }

    /// Serialize with one tab per nesting level and a trailing newline.
    pub fn to_indented_string(&self) -> String {
        let mut out = String::new();
        self.write_indented(&mut out, 0);
        out
    }

    fn write_indented(&self, out: &mut String, depth: usize) {
        let indent = "\t".repeat(depth);
        out.push_str(&indent);
        out.push('<');
        out.push_str(&self.name);
        for (name, value) in &self.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_attribute(value));
            out.push('"');
        }

        let text = self.text.as_deref().filter(|t| !t.is_empty());
        match (text, self.children.is_empty()) {
            (None, true) => out.push_str(" />\n"),
            (Some(text), true) => {
                out.push('>');
                out.push_str(&escape_text(text));
                out.push_str("</");
                out.push_str(&self.name);
                out.push_str(">\n");
            }
            (text, false) => {
                out.push('>');
                if let Some(text) = text {
                    out.push_str(&escape_text(text));
                }
                out.push('\n');
                for child in &self.children {
                    child.write_indented(out, depth + 1);
                }
                out.push_str(&indent);
                out.push_str("</");
                out.push_str(&self.name);
                out.push_str(">\n");
            }
        }
    }
}

/// The `Char` production of XML 1.0.
fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\t' | '\n' | '\r'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\r' => escaped.push_str("&#13;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\n' => escaped.push_str("&#10;"),
            '\r' => escaped.push_str("&#13;"),
            '\t' => escaped.push_str("&#9;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
