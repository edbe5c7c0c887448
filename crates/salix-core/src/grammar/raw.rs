//! `node-types.json` ingestion.
//!
//! A grammar's `node-types.json` carries vocabulary metadata (named/extra
//! flags, fields, supertype relationships) that the parse tables alone do
//! not. [`LanguageBuilder::apply_node_types`] folds it into a grammar.
//!
//! [`LanguageBuilder::apply_node_types`]: super::LanguageBuilder::apply_node_types

use std::collections::HashMap;

/// Raw node definition from `node-types.json`.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RawNode {
    #[serde(rename = "type")]
    pub type_name: String,
    pub named: bool,
    #[serde(default)]
    pub root: bool,
    #[serde(default)]
    pub extra: bool,
    #[serde(default)]
    pub fields: HashMap<String, RawCardinality>,
    pub children: Option<RawCardinality>,
    pub subtypes: Option<Vec<RawTypeRef>>,
}

/// Cardinality constraints for a field or children slot.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RawCardinality {
    pub multiple: bool,
    pub required: bool,
    pub types: Vec<RawTypeRef>,
}

/// Reference to a node type.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RawTypeRef {
    #[serde(rename = "type")]
    pub type_name: String,
    pub named: bool,
}

/// Parse `node-types.json` content into raw nodes.
pub fn parse_node_types(json: &str) -> Result<Vec<RawNode>, serde_json::Error> {
    serde_json::from_str(json)
}
