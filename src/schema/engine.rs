//! Document loading and the validation walk.
//!
//! The candidate document is parsed into an element tree first; syntax
//! errors surface as a [`TreeError`] with a 1-based line number. The walk
//! then matches the tree against the parsed schema and collects every
//! violation instead of stopping at the first.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::xsd::{Content, ElementDecl, Occurs, Schema, SimpleType};
use crate::core::Violation;

/// One element of the candidate document (or of the schema file itself).
#[derive(Debug, Clone)]
pub(super) struct XmlElement {
    /// Qualified name as written, prefix included.
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlElement>,
    /// 1-based line of the start tag.
    pub line: u64,
}

impl XmlElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A syntax-level failure: the input is not a well-formed XML document.
#[derive(Debug)]
pub(super) struct TreeError {
    pub message: String,
    pub line: u64,
}

/// Incremental newline counter; parser positions only move forward.
struct LineCounter {
    pos: usize,
    line: u64,
}

impl LineCounter {
    fn new() -> Self {
        Self { pos: 0, line: 1 }
    }

    fn advance(&mut self, xml: &str, to: u64) -> u64 {
        let to = usize::try_from(to).unwrap_or(usize::MAX).min(xml.len());
        if to > self.pos {
            let newlines = xml.as_bytes()[self.pos..to]
                .iter()
                .filter(|&&b| b == b'\n')
                .count();
            self.line += newlines as u64;
            self.pos = to;
        }
        self.line
    }
}

/// Parse `xml` into an element tree, rejecting anything not well-formed.
pub(super) fn load_tree(xml: &str) -> Result<XmlElement, TreeError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    reader.config_mut().check_end_names = true;

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;
    let mut lines = LineCounter::new();

    loop {
        let event = reader.read_event();
        // Position after the event: the line its tag ends on, which for
        // single-line tags is the line the tag sits on.
        let line = lines.advance(xml, reader.buffer_position());
        match event {
            Err(e) => {
                return Err(TreeError {
                    message: e.to_string(),
                    line,
                });
            }
            Ok(Event::Start(e)) => {
                let elem = open_element(&e, line)?;
                stack.push(elem);
            }
            Ok(Event::Empty(e)) => {
                let elem = open_element(&e, line)?;
                attach(&mut stack, &mut root, elem, line)?;
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(|e| TreeError {
                    message: e.to_string(),
                    line,
                })?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text);
                }
            }
            Ok(Event::End(_)) => {
                let elem = stack.pop().ok_or(TreeError {
                    message: "close tag without a matching open tag".into(),
                    line,
                })?;
                attach(&mut stack, &mut root, elem, line)?;
            }
            Ok(Event::Eof) => break,
            // Declaration, comments, processing instructions, CDATA.
            Ok(_) => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(TreeError {
            message: format!("element \"{}\" is never closed", open.name),
            line: open.line,
        });
    }
    root.ok_or(TreeError {
        message: "document contains no root element".into(),
        line: 1,
    })
}

fn open_element(e: &BytesStart<'_>, line: u64) -> Result<XmlElement, TreeError> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| TreeError {
            message: err.to_string(),
            line,
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| TreeError {
                message: err.to_string(),
                line,
            })?
            .into_owned();
        attrs.push((key, value));
    }
    Ok(XmlElement {
        name,
        attrs,
        text: String::new(),
        children: Vec::new(),
        line,
    })
}

fn attach(
    stack: &mut Vec<XmlElement>,
    root: &mut Option<XmlElement>,
    elem: XmlElement,
    line: u64,
) -> Result<(), TreeError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(elem);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(elem);
            Ok(())
        }
        None => Err(TreeError {
            message: "more than one root element".into(),
            line,
        }),
    }
}

/// Match the document tree against the schema, collecting all violations.
pub(super) fn validate_tree(schema: &Schema, doc: &XmlElement) -> Vec<Violation> {
    let mut out = Vec::new();

    if doc.name != schema.root.name {
        out.push(Violation::at_line(
            doc.name.clone(),
            format!("expected root element \"{}\"", schema.root.name),
            doc.line,
        ));
        return out;
    }
    match doc.attr("xmlns") {
        Some(ns) if ns == schema.target_namespace => {}
        Some(ns) => out.push(Violation::at_line(
            doc.name.clone(),
            format!(
                "wrong namespace \"{ns}\", expected \"{}\"",
                schema.target_namespace
            ),
            doc.line,
        )),
        None => out.push(Violation::at_line(
            doc.name.clone(),
            format!("missing namespace \"{}\"", schema.target_namespace),
            doc.line,
        )),
    }

    walk(&schema.root, doc, &doc.name, &mut out);
    out
}

fn walk(decl: &ElementDecl, node: &XmlElement, path: &str, out: &mut Vec<Violation>) {
    match &decl.content {
        Content::Simple(st) => {
            if let Some(child) = node.children.first() {
                out.push(Violation::at_line(
                    path.to_string(),
                    format!("simple element must not contain child \"{}\"", child.name),
                    child.line,
                ));
                return;
            }
            check_lexical(st, node.text.trim(), path, node.line, out);
        }
        Content::Sequence(decls) => {
            if !node.text.trim().is_empty() {
                out.push(Violation::at_line(
                    path.to_string(),
                    "unexpected text content",
                    node.line,
                ));
            }
            let mut idx = 0;
            for child_decl in decls {
                let child_path = format!("{path}/{}", child_decl.name);
                let mut count: u64 = 0;
                while idx < node.children.len() && node.children[idx].name == child_decl.name {
                    walk(child_decl, &node.children[idx], &child_path, out);
                    idx += 1;
                    count += 1;
                }
                if count < u64::from(child_decl.min) {
                    out.push(Violation::at_line(
                        child_path.clone(),
                        format!(
                            "expected at least {} occurrence(s), found {count}",
                            child_decl.min
                        ),
                        node.line,
                    ));
                }
                if let Occurs::Bounded(max) = child_decl.max {
                    if count > u64::from(max) {
                        out.push(Violation::at_line(
                            child_path,
                            format!("expected at most {max} occurrence(s), found {count}"),
                            node.line,
                        ));
                    }
                }
            }
            // Leftovers are either unknown or emitted out of sequence order.
            for extra in &node.children[idx..] {
                out.push(Violation::at_line(
                    format!("{path}/{}", extra.name),
                    "element not allowed here or out of order",
                    extra.line,
                ));
            }
        }
    }
}

fn check_lexical(st: &SimpleType, text: &str, path: &str, line: u64, out: &mut Vec<Violation>) {
    let ok = match st {
        SimpleType::String => true,
        SimpleType::Decimal => is_decimal(text),
        SimpleType::Integer => is_integer(text),
        SimpleType::NonNegativeInteger => !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()),
        SimpleType::Date => chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok(),
        SimpleType::DateTime => {
            chrono::NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S").is_ok()
        }
        SimpleType::Enumeration(values) => values.iter().any(|v| v == text),
    };
    if !ok {
        out.push(Violation::at_line(
            path.to_string(),
            format!("value \"{text}\" is not valid for {}", st.describe()),
            line,
        ));
    }
}

fn is_decimal(text: &str) -> bool {
    let body = text.strip_prefix(['+', '-']).unwrap_or(text);
    if body.is_empty() {
        return false;
    }
    let mut dots = 0;
    let mut digits = 0;
    for b in body.bytes() {
        match b {
            b'0'..=b'9' => digits += 1,
            b'.' => dots += 1,
            _ => return false,
        }
    }
    digits > 0 && dots <= 1
}

fn is_integer(text: &str) -> bool {
    let body = text.strip_prefix(['+', '-']).unwrap_or(text);
    !body.is_empty() && body.bytes().all(|b| b.is_ascii_digit())
}
