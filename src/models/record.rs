// file: src/models/record.rs
// description: record type descriptors and the record access trait implemented by the store
// reference: internal data structures

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Semantic type of a declared column in the originating store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Date,
    DateTime,
    Integer,
    Float,
    Boolean,
    Binary,
    Text,
    /// Any type name the mapper does not recognize
    Other(String),
}

impl FieldType {
    /// Parse a type name, accepting common SQL spellings. Never fails.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "date" => FieldType::Date,
            "datetime" | "timestamp" | "timestamptz" => FieldType::DateTime,
            "integer" | "int" | "bigint" | "biginteger" | "big_integer" | "smallint"
            | "smallinteger" | "small_integer" => FieldType::Integer,
            "float" | "double" | "real" => FieldType::Float,
            "boolean" | "bool" => FieldType::Boolean,
            "binary" | "largebinary" | "blob" | "bytes" => FieldType::Binary,
            "text" | "string" | "varchar" | "unicode" => FieldType::Text,
            _ => FieldType::Other(name.to_string()),
        }
    }
}

impl From<String> for FieldType {
    fn from(name: String) -> Self {
        FieldType::parse(&name)
    }
}

impl From<FieldType> for String {
    fn from(field_type: FieldType) -> Self {
        field_type.to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Date => write!(f, "date"),
            FieldType::DateTime => write!(f, "datetime"),
            FieldType::Integer => write!(f, "integer"),
            FieldType::Float => write!(f, "float"),
            FieldType::Boolean => write!(f, "boolean"),
            FieldType::Binary => write!(f, "binary"),
            FieldType::Text => write!(f, "text"),
            FieldType::Other(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

/// Static search descriptor of one record type.
///
/// Built once when the record type is registered and never probed again:
/// the index manager reads it a single time when the index is constructed.
///
/// ```
/// use search_mirror::{FieldType, RecordType};
///
/// let posts = RecordType::new("posts")
///     .column("id", FieldType::Integer)
///     .column("title", FieldType::Text)
///     .searchable(["title", "body", "author.name"])
///     .geo("location");
///
/// assert_eq!(posts.table, "posts");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordType {
    pub table: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub searchable: Vec<String>,
    #[serde(default)]
    pub geo: Vec<String>,
    /// Overrides the configured default primary-key field
    #[serde(default)]
    pub primary_key: Option<String>,
    /// Overrides the table name as index name
    #[serde(default)]
    pub index_name: Option<String>,
}

impl RecordType {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            searchable: Vec::new(),
            geo: Vec::new(),
            primary_key: None,
            index_name: None,
        }
    }

    pub fn column(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.columns.push(Column {
            name: name.into(),
            field_type,
        });
        self
    }

    pub fn searchable<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for field in fields {
            let field = field.into();
            if !self.searchable.contains(&field) {
                self.searchable.push(field);
            }
        }
        self
    }

    pub fn geo(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        if !self.geo.contains(&field) {
            self.geo.push(field);
        }
        self
    }

    pub fn primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = Some(field.into());
        self
    }

    pub fn index_name(mut self, name: impl Into<String>) -> Self {
        self.index_name = Some(name.into());
        self
    }

    pub fn column_type(&self, name: &str) -> Option<&FieldType> {
        self.columns
            .iter()
            .find(|column| column.name == name)
            .map(|column| &column.field_type)
    }
}

/// Records reachable from another record through a named relation
pub enum Related<'a> {
    None,
    One(&'a dyn Record),
    Many(Vec<&'a dyn Record>),
}

/// One instance of a record type, as seen by the indexer.
pub trait Record: Send + Sync {
    fn record_type(&self) -> &RecordType;

    /// Attribute value by column name; `None` when the attribute does not exist
    fn field(&self, name: &str) -> Option<Value>;

    fn related(&self, _relation: &str) -> Related<'_> {
        Related::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_parse() {
        assert_eq!(FieldType::parse("DateTime"), FieldType::DateTime);
        assert_eq!(FieldType::parse("bigint"), FieldType::Integer);
        assert_eq!(FieldType::parse("double"), FieldType::Float);
        assert_eq!(
            FieldType::parse("json"),
            FieldType::Other("json".to_string())
        );
    }

    #[test]
    fn test_record_type_builder_dedupes() {
        let record_type = RecordType::new("posts")
            .searchable(["title", "body", "title"])
            .geo("location")
            .geo("location");

        assert_eq!(record_type.searchable, vec!["title", "body"]);
        assert_eq!(record_type.geo, vec!["location"]);
        assert!(record_type.primary_key.is_none());
    }

    #[test]
    fn test_record_type_deserialize() {
        let json = serde_json::json!({
            "table": "shops",
            "columns": [{ "name": "opened", "type": "date" }],
            "searchable": ["name"],
            "geo": ["location"],
            "primary_key": "uid"
        });

        let record_type: RecordType = serde_json::from_value(json).unwrap();
        assert_eq!(record_type.column_type("opened"), Some(&FieldType::Date));
        assert_eq!(record_type.primary_key.as_deref(), Some("uid"));
        assert!(record_type.index_name.is_none());
    }
}
