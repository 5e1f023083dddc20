//! Catalog and group listing documents
//!
//! Decoding works on `serde_json::Value` rather than derived structs so that
//! one bad entry never rejects the whole document.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// A group entry in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRef {
    /// Group identifier, unique within one catalog
    pub id: String,

    /// Absolute URL or path relative to the catalog's directory
    pub path: String,
}

/// The top-level catalog document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDocument {
    pub groups: Vec<GroupRef>,
}

impl CatalogDocument {
    /// Decode a catalog, keeping every well-formed group in order
    ///
    /// A missing or non-array `groups` yields an empty catalog. Entries
    /// without a string `id` and `path` are skipped, as are repeats of an
    /// id already seen.
    pub fn from_value(value: &Value) -> Self {
        let Some(entries) = value.get("groups").and_then(Value::as_array) else {
            warn!("Catalog has no 'groups' array; treating as empty");
            return Self::default();
        };

        let mut seen = HashSet::new();
        let mut groups = Vec::with_capacity(entries.len());

        for (position, entry) in entries.iter().enumerate() {
            let id = entry.get("id").and_then(Value::as_str);
            let path = entry.get("path").and_then(Value::as_str);

            let (Some(id), Some(path)) = (id, path) else {
                warn!("Skipping catalog group #{} without string id/path", position);
                continue;
            };

            if !seen.insert(id.to_string()) {
                warn!("Skipping duplicate catalog group '{}'", id);
                continue;
            }

            groups.push(GroupRef {
                id: id.to_string(),
                path: path.to_string(),
            });
        }

        Self { groups }
    }

    /// Groups whose id is in `allowed`, or all of them when `allowed` is empty
    pub fn select(self, allowed: &[String]) -> Vec<GroupRef> {
        if allowed.is_empty() {
            return self.groups;
        }

        self.groups
            .into_iter()
            .filter(|g| allowed.iter().any(|a| a == &g.id))
            .collect()
    }
}

/// A group's listing document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupListing {
    pub modules: Vec<ModuleRecord>,
}

impl GroupListing {
    /// Decode a listing; a missing or mistyped `modules` gives no records
    pub fn from_value(value: Value) -> Self {
        let modules = match value {
            Value::Object(mut map) => match map.remove("modules") {
                Some(Value::Array(items)) => items,
                Some(other) => {
                    debug!("Listing 'modules' is {}, not an array", type_name(&other));
                    Vec::new()
                }
                None => {
                    debug!("Listing has no 'modules' field");
                    Vec::new()
                }
            },
            other => {
                debug!("Listing is {}, not an object", type_name(&other));
                Vec::new()
            }
        };

        let modules = modules
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(fields) => Some(ModuleRecord::new(fields)),
                other => {
                    debug!("Skipping non-object module entry ({})", type_name(&other));
                    None
                }
            })
            .collect();

        Self { modules }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// One searchable module
///
/// Only `id`, `name` and `tags` are interpreted. All other fields are opaque
/// and serialize back out exactly as received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleRecord {
    fields: Map<String, Value>,
}

impl ModuleRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// `id` as text; numbers and booleans are rendered, other types are empty
    pub fn id(&self) -> String {
        self.fields.get("id").map(scalar_text).unwrap_or_default()
    }

    pub fn name(&self) -> String {
        self.fields.get("name").map(scalar_text).unwrap_or_default()
    }

    /// String entries of `tags`, in order
    pub fn tags(&self) -> Vec<&str> {
        self.fields
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| tags.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Lowercased `"{id} {name} {tags...}"` used for query matching
    pub fn haystack(&self) -> String {
        format!("{} {} {}", self.id(), self.name(), self.tags().join(" ")).to_lowercase()
    }

    /// Copy of this record with `group` set, unless the record already has one
    pub fn annotated(&self, group_id: &str) -> Self {
        let mut fields = self.fields.clone();
        fields
            .entry("group")
            .or_insert_with(|| Value::String(group_id.to_string()));
        Self { fields }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}
