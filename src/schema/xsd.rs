//! Parser for the XSD subset the SAF-T schema uses: a single root element
//! declaration with inline anonymous complex types, `xs:sequence` content,
//! `minOccurs`/`maxOccurs`, the built-in simple types the file needs, and
//! inline string enumerations. Anything outside that subset is rejected at
//! load time, not silently skipped.

use super::engine::{XmlElement, load_tree};

/// Occurrence bound of a child element in a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Occurs {
    Bounded(u32),
    Unbounded,
}

/// A parsed element declaration.
#[derive(Debug, Clone)]
pub(super) struct ElementDecl {
    pub name: String,
    pub min: u32,
    pub max: Occurs,
    pub content: Content,
}

/// Element content model.
#[derive(Debug, Clone)]
pub(super) enum Content {
    Simple(SimpleType),
    Sequence(Vec<ElementDecl>),
}

/// The simple types the schema subset supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum SimpleType {
    String,
    Decimal,
    Integer,
    NonNegativeInteger,
    Date,
    DateTime,
    Enumeration(Vec<String>),
}

impl SimpleType {
    pub fn describe(&self) -> String {
        match self {
            Self::String => "xs:string".into(),
            Self::Decimal => "xs:decimal".into(),
            Self::Integer => "xs:integer".into(),
            Self::NonNegativeInteger => "xs:nonNegativeInteger".into(),
            Self::Date => "xs:date".into(),
            Self::DateTime => "xs:dateTime".into(),
            Self::Enumeration(values) => format!("enumeration [{}]", values.join(", ")),
        }
    }
}

/// A parsed schema: target namespace plus the single root declaration.
#[derive(Debug, Clone)]
pub(super) struct Schema {
    pub target_namespace: String,
    pub root: ElementDecl,
}

fn local(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

/// Parse a schema document. Errors are plain strings; the caller wraps them
/// as infrastructure failures.
pub(super) fn parse_schema(text: &str) -> Result<Schema, String> {
    let tree =
        load_tree(text).map_err(|e| format!("schema is not well-formed XML: {} (line {})", e.message, e.line))?;
    if local(&tree.name) != "schema" {
        return Err(format!("expected xs:schema root, found \"{}\"", tree.name));
    }
    let target_namespace = tree
        .attr("targetNamespace")
        .ok_or("schema has no targetNamespace")?
        .to_string();

    let mut roots = tree.children.iter().filter(|c| local(&c.name) == "element");
    let root_elem = roots.next().ok_or("schema declares no root element")?;
    if roots.next().is_some() {
        return Err("schema declares more than one root element".into());
    }

    Ok(Schema {
        target_namespace,
        root: parse_element(root_elem)?,
    })
}

fn parse_element(elem: &XmlElement) -> Result<ElementDecl, String> {
    let name = elem
        .attr("name")
        .ok_or_else(|| format!("xs:element without a name (line {})", elem.line))?
        .to_string();

    let min = match elem.attr("minOccurs") {
        None => 1,
        Some(v) => v
            .parse::<u32>()
            .map_err(|_| format!("invalid minOccurs \"{v}\" on \"{name}\""))?,
    };
    let max = match elem.attr("maxOccurs") {
        None => Occurs::Bounded(1),
        Some("unbounded") => Occurs::Unbounded,
        Some(v) => Occurs::Bounded(
            v.parse::<u32>()
                .map_err(|_| format!("invalid maxOccurs \"{v}\" on \"{name}\""))?,
        ),
    };

    let content = if let Some(type_name) = elem.attr("type") {
        Content::Simple(builtin_type(type_name, &name)?)
    } else if let Some(complex) = child(elem, "complexType") {
        let sequence = child(complex, "sequence")
            .ok_or_else(|| format!("complexType of \"{name}\" has no xs:sequence"))?;
        let mut children = Vec::new();
        for decl in &sequence.children {
            if local(&decl.name) != "element" {
                return Err(format!(
                    "unsupported particle \"{}\" in sequence of \"{name}\"",
                    decl.name
                ));
            }
            children.push(parse_element(decl)?);
        }
        Content::Sequence(children)
    } else if let Some(simple) = child(elem, "simpleType") {
        Content::Simple(parse_restriction(simple, &name)?)
    } else {
        return Err(format!("element \"{name}\" has no type information"));
    };

    Ok(ElementDecl {
        name,
        min,
        max,
        content,
    })
}

fn parse_restriction(simple: &XmlElement, owner: &str) -> Result<SimpleType, String> {
    let restriction = child(simple, "restriction")
        .ok_or_else(|| format!("simpleType of \"{owner}\" has no xs:restriction"))?;
    if restriction.attr("base").map(local) != Some("string") {
        return Err(format!(
            "simpleType of \"{owner}\" restricts an unsupported base"
        ));
    }
    let mut values = Vec::new();
    for facet in &restriction.children {
        if local(&facet.name) != "enumeration" {
            return Err(format!(
                "unsupported facet \"{}\" on \"{owner}\"",
                facet.name
            ));
        }
        values.push(
            facet
                .attr("value")
                .ok_or_else(|| format!("enumeration without a value on \"{owner}\""))?
                .to_string(),
        );
    }
    if values.is_empty() {
        return Err(format!("empty enumeration on \"{owner}\""));
    }
    Ok(SimpleType::Enumeration(values))
}

fn builtin_type(type_name: &str, owner: &str) -> Result<SimpleType, String> {
    match local(type_name) {
        "string" => Ok(SimpleType::String),
        "decimal" => Ok(SimpleType::Decimal),
        "integer" => Ok(SimpleType::Integer),
        "nonNegativeInteger" => Ok(SimpleType::NonNegativeInteger),
        "date" => Ok(SimpleType::Date),
        "dateTime" => Ok(SimpleType::DateTime),
        other => Err(format!("unsupported type \"{other}\" on \"{owner}\"")),
    }
}

fn child<'a>(elem: &'a XmlElement, local_name: &str) -> Option<&'a XmlElement> {
    elem.children.iter().find(|c| local(&c.name) == local_name)
}
