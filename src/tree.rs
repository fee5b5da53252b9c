use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::TreeError;
use crate::events::{Attribute, XmlEvent};
use crate::value::Value;

/// A namespace declared by a namespace-start event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceDecl {
    pub prefix: Option<String>,
    pub uri: String,
}

/// A single attribute attached to an element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementAttribute {
    pub namespace_prefix: Option<String>,
    pub namespace_uri: Option<String>,
    pub resource_id: Option<u32>,
    pub name: String,
    pub value: Value,
}

/// DOM-style element node built from the event stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub line: u32,
    pub namespace_prefix: Option<String>,
    pub namespace_uri: Option<String>,
    pub name: String,
    /// Namespaces that came into scope just before this element.
    pub namespaces: Vec<NamespaceDecl>,
    pub attributes: Vec<ElementAttribute>,
    pub children: Vec<Element>,
    pub text: Option<String>,
}

impl Element {
    /// Finds an attribute by `local` or `prefix:local` name.
    pub fn attribute(&self, name: &str) -> Option<&ElementAttribute> {
        let (prefix, local) = split_attribute_query(name);
        self.attributes.iter().find(|attr| {
            attr.name == local && (prefix.is_none() || attr.namespace_prefix.as_deref() == prefix)
        })
    }

    pub fn attribute_value(&self, name: &str) -> Option<&Value> {
        self.attribute(name).map(|attr| &attr.value)
    }

    pub fn find_child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }
}

fn split_attribute_query(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

fn resolve_prefix(scopes: &[NamespaceDecl], uri: Option<&str>) -> Option<String> {
    uri.and_then(|target| {
        scopes
            .iter()
            .rev()
            .find(|decl| decl.uri == target)
            .and_then(|decl| decl.prefix.clone())
    })
}

fn qualified(namespace_uri: Option<&str>, name: &str) -> String {
    match namespace_uri {
        Some(uri) => format!("{{{uri}}}{name}"),
        None => name.to_string(),
    }
}

pub(crate) fn build(document: &Document) -> Result<Element, TreeError> {
    let string = |line: u32, id: u32| {
        document
            .string(id)
            .map(str::to_string)
            .ok_or(TreeError::UnresolvedString {
                line,
                id: i64::from(id),
            })
    };

    let mut scopes: Vec<NamespaceDecl> = Vec::new();
    let mut pending: Vec<NamespaceDecl> = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    for event in document.events() {
        match event {
            XmlEvent::NamespaceStart {
                line,
                prefix_id,
                uri_id,
            } => {
                let uri = document
                    .resolve(*uri_id)
                    .ok_or(TreeError::UnresolvedString {
                        line: *line,
                        id: i64::from(*uri_id),
                    })?
                    .to_string();
                let decl = NamespaceDecl {
                    prefix: document.resolve(*prefix_id).map(str::to_string),
                    uri,
                };
                scopes.push(decl.clone());
                pending.push(decl);
            }
            XmlEvent::NamespaceEnd { line, uri_id, .. } => {
                let uri = document.resolve(*uri_id);
                match scopes.iter().rposition(|decl| Some(decl.uri.as_str()) == uri) {
                    Some(index) => {
                        scopes.remove(index);
                    }
                    None => {
                        return Err(TreeError::UnexpectedEnd {
                            line: *line,
                            name: uri.unwrap_or_default().to_string(),
                        })
                    }
                }
            }
            XmlEvent::TagStart {
                line,
                namespace_id,
                name_id,
                attributes,
            } => {
                let namespace_uri = document.resolve(*namespace_id).map(str::to_string);
                let mut element = Element {
                    line: *line,
                    namespace_prefix: resolve_prefix(&scopes, namespace_uri.as_deref()),
                    namespace_uri,
                    name: string(*line, *name_id)?,
                    namespaces: std::mem::take(&mut pending),
                    attributes: Vec::with_capacity(attributes.len()),
                    children: Vec::new(),
                    text: None,
                };
                for attribute in attributes {
                    element
                        .attributes
                        .push(build_attribute(document, &scopes, *line, attribute)?);
                }
                stack.push(element);
            }
            XmlEvent::TagEnd {
                line,
                namespace_id,
                name_id,
            } => {
                let found = qualified(document.resolve(*namespace_id), &string(*line, *name_id)?);
                let element = stack.pop().ok_or_else(|| TreeError::UnexpectedEnd {
                    line: *line,
                    name: found.clone(),
                })?;
                let expected = qualified(element.namespace_uri.as_deref(), &element.name);
                if expected != found {
                    return Err(TreeError::MismatchedEnd {
                        line: *line,
                        expected,
                        found,
                    });
                }
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(element);
                } else if root.is_some() {
                    return Err(TreeError::MultipleRoots { line: *line });
                } else {
                    root = Some(element);
                }
            }
            XmlEvent::Text { line, value_id } => {
                let text = string(*line, *value_id)?;
                if let Some(current) = stack.last_mut() {
                    current.text.get_or_insert_with(String::new).push_str(&text);
                }
            }
        }
    }

    if let Some(open) = stack.pop() {
        return Err(TreeError::Unclosed { name: open.name });
    }
    root.ok_or(TreeError::Empty)
}

fn build_attribute(
    document: &Document,
    scopes: &[NamespaceDecl],
    line: u32,
    attribute: &Attribute,
) -> Result<ElementAttribute, TreeError> {
    let name = document
        .string(attribute.name_id)
        .ok_or(TreeError::UnresolvedString {
            line,
            id: i64::from(attribute.name_id),
        })?
        .to_string();
    let namespace_uri = document.resolve(attribute.namespace_id).map(str::to_string);
    Ok(ElementAttribute {
        namespace_prefix: resolve_prefix(scopes, namespace_uri.as_deref()),
        namespace_uri,
        resource_id: document.resource_id(attribute.name_id).filter(|id| *id != 0),
        name,
        value: Value::from_attribute(attribute, document.string_pool()),
    })
}
