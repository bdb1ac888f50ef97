//! The selections document: the one piece of output this crate produces,
//! in a format governed by an external schema. Modelled as plain structs
//! deriving [`serde::Serialize`] and rendered with `quick-xml`'s
//! `serialize` feature. Only the *output* side is in scope; the
//! `Element`/XML *input* layer (feed parsing) stays an external
//! collaborator.

use serde::Serialize;
use std::collections::BTreeMap;

/// Attribute bag for one XML element. Keys are pre-prefixed with `@` by the
/// callers in `assembly.rs`, which is how `quick-xml`'s serde integration
/// distinguishes attributes from child elements when flattened into a
/// struct.
pub type XmlAttrs = BTreeMap<String, String>;

pub(crate) fn attr_map(raw: &BTreeMap<String, String>) -> XmlAttrs {
    raw.iter().map(|(k, v)| (format!("@{k}"), v.clone())).collect()
}

/// Root `<selections>` element.
#[derive(Debug, Clone, Serialize)]
#[serde(rename = "selections")]
pub struct SelectionsDocument {
    #[serde(rename = "@interface")]
    pub interface: String,
    #[serde(rename = "@command", skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(rename = "selection", default)]
    pub selections: Vec<Selection>,
}

impl SelectionsDocument {
    /// Renders the document to its external XML shape.
    pub fn to_xml(&self) -> Result<String, quick_xml::se::SeError> {
        quick_xml::se::to_string(self)
    }
}

/// One `<selection>` element: the chosen implementation for a single
/// participating interface.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Selection {
    #[serde(flatten)]
    pub attrs: XmlAttrs,
    #[serde(rename = "command", default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<CommandNode>,
    #[serde(rename = "binding", default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<BindingNode>,
    #[serde(rename = "requires", default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencyNode>,
    #[serde(rename = "manifest-digest", skip_serializing_if = "Option::is_none")]
    pub manifest_digest: Option<XmlAttrs>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CommandNode {
    #[serde(flatten)]
    pub attrs: XmlAttrs,
    #[serde(rename = "requires", default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencyNode>,
    #[serde(rename = "binding", default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<BindingNode>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BindingNode {
    #[serde(flatten)]
    pub attrs: XmlAttrs,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DependencyNode {
    #[serde(flatten)]
    pub attrs: XmlAttrs,
}
