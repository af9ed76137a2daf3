// file: src/models/document.rs
// description: document extraction from records, including dotted relation paths
// reference: internal data structures

use crate::models::record::{Record, Related};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Searchable field values of one record, as sent to the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    pub fields: Map<String, Value>,
}

impl Document {
    /// Extract the given fields from a record. Dotted names walk relations.
    pub fn extract<'a, I>(record: &dyn Record, fields: I) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        let fields = fields
            .into_iter()
            .map(|field| {
                let value = if field.contains('.') {
                    let path: Vec<&str> = field.split('.').collect();
                    relation_value(record, &path)
                } else {
                    record.field(field).unwrap_or(Value::Null)
                };
                (field.clone(), value)
            })
            .collect();

        Self { fields }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Value at the end of a relation path; to-many hops collect into arrays
pub fn relation_value(record: &dyn Record, path: &[&str]) -> Value {
    match path {
        [] => Value::Null,
        [field] => record.field(field).unwrap_or(Value::Null),
        [relation, rest @ ..] => match record.related(relation) {
            Related::None => Value::Null,
            Related::One(related) => relation_value(related, rest),
            Related::Many(related) => Value::Array(
                related
                    .into_iter()
                    .map(|item| relation_value(item, rest))
                    .collect(),
            ),
        },
    }
}

/// Render a primary-key value as an engine document id
pub fn document_id(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}
