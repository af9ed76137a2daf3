// file: src/index/schema.rs
// description: engine schema derivation from record type declarations
// reference: https://www.elastic.co/guide/en/elasticsearch/reference/current/mapping-types.html

use crate::models::{FieldType, RecordType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;

/// Field types declared in the engine mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineType {
    Keyword,
    Date,
    Integer,
    Float,
    Boolean,
    Binary,
    Text,
    GeoPoint,
}

impl fmt::Display for EngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineType::Keyword => "keyword",
            EngineType::Date => "date",
            EngineType::Integer => "integer",
            EngineType::Float => "float",
            EngineType::Boolean => "boolean",
            EngineType::Binary => "binary",
            EngineType::Text => "text",
            EngineType::GeoPoint => "geo_point",
        };
        f.write_str(name)
    }
}

impl EngineType {
    pub fn declaration(&self) -> Value {
        json!({ "type": self.to_string() })
    }
}

pub struct SchemaMapper<'a> {
    record_type: &'a RecordType,
    primary_key: &'a str,
}

impl<'a> SchemaMapper<'a> {
    pub fn new(record_type: &'a RecordType, primary_key: &'a str) -> Self {
        Self {
            record_type,
            primary_key,
        }
    }

    /// Map a semantic type to its engine type. The primary key is always a keyword.
    pub fn fields_map(field_type: &FieldType, primary: bool) -> EngineType {
        if primary {
            return EngineType::Keyword;
        }

        match field_type {
            FieldType::Date | FieldType::DateTime => EngineType::Date,
            FieldType::Integer => EngineType::Integer,
            FieldType::Float => EngineType::Float,
            FieldType::Boolean => EngineType::Boolean,
            FieldType::Binary => EngineType::Binary,
            FieldType::Text | FieldType::Other(_) => EngineType::Text,
        }
    }

    /// Geo-point declarations for every declared geo field
    pub fn geo_fields(&self) -> Map<String, Value> {
        self.record_type
            .geo
            .iter()
            .map(|field| (field.clone(), EngineType::GeoPoint.declaration()))
            .collect()
    }

    /// Full property map: primary key, searchable fields, then geo fields.
    /// Later entries win, so a geo field is always declared as geo-point.
    pub fn fields(&self) -> Map<String, Value> {
        let mut properties = Map::new();

        properties.insert(
            self.primary_key.to_string(),
            EngineType::Keyword.declaration(),
        );

        for field in &self.record_type.searchable {
            if field == self.primary_key {
                continue;
            }
            let engine_type = match self.record_type.column_type(field) {
                Some(field_type) if !field.contains('.') => Self::fields_map(field_type, false),
                _ => EngineType::Text,
            };
            properties.insert(field.clone(), engine_type.declaration());
        }

        properties.extend(self.geo_fields());
        properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_map_table() {
        let cases = [
            (FieldType::Date, EngineType::Date),
            (FieldType::DateTime, EngineType::Date),
            (FieldType::Boolean, EngineType::Boolean),
            (FieldType::Integer, EngineType::Integer),
            (FieldType::Float, EngineType::Float),
            (FieldType::Binary, EngineType::Binary),
            (FieldType::Text, EngineType::Text),
            (FieldType::Other("uuid".to_string()), EngineType::Text),
        ];

        for (field_type, expected) in cases {
            assert_eq!(SchemaMapper::fields_map(&field_type, false), expected);
        }
    }

    #[test]
    fn test_primary_key_is_always_keyword() {
        for field_type in [FieldType::Integer, FieldType::DateTime, FieldType::Text] {
            assert_eq!(
                SchemaMapper::fields_map(&field_type, true),
                EngineType::Keyword
            );
        }
    }

    #[test]
    fn test_fields_declares_geo_points() {
        let record_type = RecordType::new("shops")
            .searchable(["name"])
            .geo("location")
            .geo("depot");

        let mapper = SchemaMapper::new(&record_type, "id");
        let geo = mapper.geo_fields();
        assert_eq!(geo.len(), 2);
        assert_eq!(geo["location"], json!({ "type": "geo_point" }));
    }

    #[test]
    fn test_fields_full_mapping() {
        let record_type = RecordType::new("posts")
            .column("id", FieldType::Integer)
            .column("created", FieldType::DateTime)
            .column("views", FieldType::Integer)
            .column("location", FieldType::Text)
            .searchable(["id", "title", "created", "views", "author.name", "location"])
            .geo("location");

        let properties = SchemaMapper::new(&record_type, "id").fields();

        assert_eq!(properties["id"], json!({ "type": "keyword" }));
        assert_eq!(properties["title"], json!({ "type": "text" }));
        assert_eq!(properties["created"], json!({ "type": "date" }));
        assert_eq!(properties["views"], json!({ "type": "integer" }));
        assert_eq!(properties["author.name"], json!({ "type": "text" }));
        assert_eq!(properties["location"], json!({ "type": "geo_point" }));
    }

    #[test]
    fn test_engine_type_serde_names() {
        assert_eq!(serde_json::to_value(EngineType::GeoPoint).unwrap(), json!("geo_point"));
        assert_eq!(EngineType::Keyword.to_string(), "keyword");
    }
}
