// file: src/query/translator.rs
// description: translation of search parameters into an engine query body
// reference: https://www.elastic.co/guide/en/elasticsearch/reference/current/query-dsl-query-string-query.html

use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use crate::index::Index;
use crate::utils::Validator;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operator {
    #[default]
    And,
    Or,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::And => "AND",
            Operator::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeoPoint {
    Geohash(String),
    LatLon { lat: f64, lon: f64 },
}

impl GeoPoint {
    fn validate(&self) -> Result<()> {
        match self {
            GeoPoint::Geohash(hash) => Validator::validate_geohash(hash),
            GeoPoint::LatLon { lat, lon } => Validator::validate_lat_lon(*lat, *lon),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeoFilter {
    pub point: GeoPoint,
    pub field: String,
    /// Radius such as `"10km"`; the translator default applies when unset
    pub distance: Option<String>,
}

impl GeoFilter {
    pub fn geohash(field: impl Into<String>, geohash: impl Into<String>) -> Self {
        Self {
            point: GeoPoint::Geohash(geohash.into()),
            field: field.into(),
            distance: None,
        }
    }

    pub fn lat_lon(field: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            point: GeoPoint::LatLon { lat, lon },
            field: field.into(),
            distance: None,
        }
    }

    pub fn within(mut self, distance: impl Into<String>) -> Self {
        self.distance = Some(distance.into());
        self
    }

    fn clause(&self, distance: &str) -> Value {
        let mut geo_distance = Map::new();
        geo_distance.insert("distance".to_string(), json!(distance));
        geo_distance.insert(self.field.clone(), json!(self.point));
        json!({ "geo_distance": geo_distance })
    }
}

/// Caller parameters of one search.
///
/// ```
/// use search_mirror::{GeoFilter, SearchParams};
///
/// let params = SearchParams::text("hello world")
///     .or()
///     .limit(20)
///     .rank_order()
///     .geo(GeoFilter::geohash("location", "u4pruydqqvj").within("5km"));
///
/// assert_eq!(params.limit, Some(20));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchParams {
    pub text: Option<String>,
    pub fields: Option<Vec<String>>,
    pub operator: Operator,
    pub limit: Option<usize>,
    pub rank_order: bool,
    pub geo: Option<GeoFilter>,
    /// Extra `query_string` options, merged over the generated ones
    pub options: Map<String, Value>,
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn or(mut self) -> Self {
        self.operator = Operator::Or;
        self
    }

    pub fn operator(mut self, operator: Operator) -> Self {
        self.operator = operator;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn rank_order(mut self) -> Self {
        self.rank_order = true;
        self
    }

    pub fn geo(mut self, filter: GeoFilter) -> Self {
        self.geo = Some(filter);
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    fn query_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|text| !text.trim().is_empty())
    }
}

pub struct QueryTranslator {
    geo_distance: String,
    geo_text_distance: String,
    unbounded_size: usize,
}

impl Default for QueryTranslator {
    fn default() -> Self {
        Self::new(&SearchConfig::default())
    }
}

impl QueryTranslator {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            geo_distance: config.geo_distance.clone(),
            geo_text_distance: config.geo_text_distance.clone(),
            unbounded_size: config.unbounded_size,
        }
    }

    /// Fields searched by the text clause. Geo fields never take part,
    /// even when the caller lists them; a caller list made only of geo
    /// fields falls back to the index's text fields.
    pub fn text_fields(index: &Index, params: &SearchParams) -> Vec<String> {
        let geo_field = params.geo.as_ref().map(|geo| geo.field.as_str());
        let keep = |fields: Vec<String>| -> Vec<String> {
            fields
                .into_iter()
                .filter(|field| !index.geo().contains(field) && Some(field.as_str()) != geo_field)
                .collect()
        };

        match params.fields.clone().map(&keep) {
            Some(fields) if !fields.is_empty() => fields,
            _ => keep(index.text_fields()),
        }
    }

    /// Build the request body for the index.
    pub fn translate(&self, index: &Index, params: &SearchParams) -> Result<Value> {
        let size = params.limit.unwrap_or(self.unbounded_size);

        let distance = match &params.geo {
            Some(geo) => {
                geo.point.validate()?;
                let distance = geo.distance.as_deref().map(str::trim);
                if let Some(distance) = distance {
                    Validator::validate_distance(distance)?;
                }
                distance
            }
            None => None,
        };

        let body = match (params.query_text(), &params.geo) {
            (Some(text), Some(geo)) => {
                let distance = distance.unwrap_or(&self.geo_text_distance);
                json!({
                    "query": {
                        "bool": {
                            "must": { "query_string": self.query_string(index, params, text)? },
                            "filter": geo.clause(distance),
                        }
                    },
                    "size": size,
                })
            }
            (None, Some(geo)) => {
                let distance = distance.unwrap_or(&self.geo_distance);
                json!({
                    "query": {
                        "bool": {
                            "must": { "match_all": {} },
                            "filter": geo.clause(distance),
                        }
                    },
                    "size": size,
                })
            }
            (Some(text), None) => json!({
                "query": { "query_string": self.query_string(index, params, text)? },
                "size": size,
            }),
            (None, None) => json!({
                "query": { "match_all": {} },
                "size": size,
            }),
        };

        Ok(body)
    }

    fn query_string(&self, index: &Index, params: &SearchParams, text: &str) -> Result<Value> {
        let fields = Self::text_fields(index, params);
        if fields.is_empty() {
            return Err(SearchError::Validation(format!(
                "Index {} has no text fields to search",
                index.name()
            )));
        }

        let mut query_string = Map::new();
        query_string.insert("fields".to_string(), json!(fields));
        query_string.insert("query".to_string(), json!(text));
        query_string.insert(
            "default_operator".to_string(),
            json!(params.operator.as_str()),
        );
        query_string.insert("analyze_wildcard".to_string(), json!(true));

        for (key, value) in &params.options {
            if key != "fields" && key != "query" {
                query_string.insert(key.clone(), value.clone());
            }
        }
        Ok(Value::Object(query_string))
    }
}
