// file: src/engine/flavor.rs
// description: engine API flavor resolved once from the engine version
// reference: https://www.elastic.co/guide/en/elasticsearch/reference/current/removal-of-types.html

use serde_json::{Map, Value, json};

/// Request shape supported by the connected engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineFlavor {
    /// Before 6.0: documents live under a named mapping type
    Typed,
    /// 6.x: a single `_doc` type, update still under the document path
    SingleType,
    /// 7.0 and later, and OpenSearch: no mapping types
    Typeless,
}

impl EngineFlavor {
    /// Pick a flavor from a version string such as `"7.17.3"`.
    /// Unparseable versions fall back to 6.x behaviour.
    pub fn from_version(version: &str) -> Self {
        let major = version
            .trim()
            .split('.')
            .next()
            .and_then(|major| major.parse::<u32>().ok());

        match major {
            Some(major) if major < 6 => EngineFlavor::Typed,
            Some(6) | None => EngineFlavor::SingleType,
            Some(_) => EngineFlavor::Typeless,
        }
    }

    /// Read the flavor from a `GET /` response body
    pub fn from_info(info: &Value) -> Self {
        let version = info.get("version");
        let distribution = version
            .and_then(|v| v.get("distribution"))
            .and_then(Value::as_str);

        if distribution == Some("opensearch") {
            return EngineFlavor::Typeless;
        }

        match version.and_then(|v| v.get("number")).and_then(Value::as_str) {
            Some(number) => Self::from_version(number),
            None => EngineFlavor::SingleType,
        }
    }

    fn type_segment<'a>(&self, doc_type: &'a str) -> &'a str {
        match self {
            EngineFlavor::Typed => doc_type,
            EngineFlavor::SingleType | EngineFlavor::Typeless => "_doc",
        }
    }

    pub fn document_path(&self, index: &str, doc_type: &str, id: &str) -> Vec<String> {
        vec![
            index.to_string(),
            self.type_segment(doc_type).to_string(),
            id.to_string(),
        ]
    }

    pub fn update_path(&self, index: &str, doc_type: &str, id: &str) -> Vec<String> {
        match self {
            EngineFlavor::Typeless => vec![index.to_string(), "_update".to_string(), id.to_string()],
            _ => {
                let mut segments = self.document_path(index, doc_type, id);
                segments.push("_update".to_string());
                segments
            }
        }
    }

    pub fn search_path(&self, index: &str, doc_type: &str) -> Vec<String> {
        match self {
            EngineFlavor::Typed => vec![
                index.to_string(),
                doc_type.to_string(),
                "_search".to_string(),
            ],
            _ => vec![index.to_string(), "_search".to_string()],
        }
    }

    /// Index creation body wrapping the field properties
    pub fn mappings_body(&self, doc_type: &str, properties: &Map<String, Value>) -> Value {
        let mapping = json!({ "properties": properties });
        match self {
            EngineFlavor::Typed => json!({ "mappings": { doc_type: mapping } }),
            EngineFlavor::SingleType => json!({ "mappings": { "_doc": mapping } }),
            EngineFlavor::Typeless => json!({ "mappings": mapping }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_version() {
        assert_eq!(EngineFlavor::from_version("5.6.16"), EngineFlavor::Typed);
        assert_eq!(EngineFlavor::from_version("6.8.23"), EngineFlavor::SingleType);
        assert_eq!(EngineFlavor::from_version("7.17.3"), EngineFlavor::Typeless);
        assert_eq!(EngineFlavor::from_version("8.11.0"), EngineFlavor::Typeless);
        assert_eq!(EngineFlavor::from_version("garbage"), EngineFlavor::SingleType);
    }

    #[test]
    fn test_from_info() {
        let info = json!({ "version": { "number": "7.10.2" } });
        assert_eq!(EngineFlavor::from_info(&info), EngineFlavor::Typeless);

        let opensearch = json!({ "version": { "number": "2.11.0", "distribution": "opensearch" } });
        assert_eq!(EngineFlavor::from_info(&opensearch), EngineFlavor::Typeless);

        assert_eq!(EngineFlavor::from_info(&json!({})), EngineFlavor::SingleType);
    }

    #[test]
    fn test_paths_per_flavor() {
        assert_eq!(
            EngineFlavor::Typed.document_path("posts", "msearch", "1"),
            vec!["posts", "msearch", "1"]
        );
        assert_eq!(
            EngineFlavor::SingleType.update_path("posts", "msearch", "1"),
            vec!["posts", "_doc", "1", "_update"]
        );
        assert_eq!(
            EngineFlavor::Typeless.update_path("posts", "msearch", "1"),
            vec!["posts", "_update", "1"]
        );
        assert_eq!(
            EngineFlavor::Typed.search_path("posts", "msearch"),
            vec!["posts", "msearch", "_search"]
        );
        assert_eq!(
            EngineFlavor::Typeless.search_path("posts", "msearch"),
            vec!["posts", "_search"]
        );
    }

    #[test]
    fn test_mappings_body() {
        let mut properties = Map::new();
        properties.insert("title".to_string(), json!({ "type": "text" }));

        assert_eq!(
            EngineFlavor::Typeless.mappings_body("msearch", &properties),
            json!({ "mappings": { "properties": { "title": { "type": "text" } } } })
        );
        assert_eq!(
            EngineFlavor::Typed.mappings_body("msearch", &properties),
            json!({ "mappings": { "msearch": { "properties": { "title": { "type": "text" } } } } })
        );
    }
}
