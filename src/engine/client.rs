// file: src/engine/client.rs
// description: Elasticsearch HTTP client wrapper with flavor-aware request shaping
// reference: https://www.elastic.co/guide/en/elasticsearch/reference/current/rest-apis.html

use crate::config::EngineConfig;
use crate::engine::{EngineFlavor, SearchEngine};
use crate::error::{Result, SearchError};
use crate::models::{Document, Hit};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    hits: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score", default)]
    score: Option<f64>,
}

#[derive(Clone)]
pub struct ElasticsearchClient {
    http: Client,
    base_url: Url,
    flavor: EngineFlavor,
    doc_type: String,
    credentials: Option<(String, Option<String>)>,
}

impl ElasticsearchClient {
    /// Build a client and resolve the engine flavor: from `config.version`
    /// when set, otherwise with a single `GET /`.
    pub async fn connect(config: &EngineConfig, doc_type: &str) -> Result<Self> {
        info!("Connecting to search engine at {}", config.url);

        let mut client = Self::with_flavor(config, doc_type, EngineFlavor::SingleType)?;

        client.flavor = match config.version.as_deref() {
            Some(version) => EngineFlavor::from_version(version),
            None => {
                let info = client.info().await?;
                EngineFlavor::from_info(&info)
            }
        };

        info!("Search engine flavor: {:?}", client.flavor);
        Ok(client)
    }

    /// Build a client for a known flavor without contacting the engine
    pub fn with_flavor(config: &EngineConfig, doc_type: &str, flavor: EngineFlavor) -> Result<Self> {
        let base_url = Url::parse(&config.url)
            .map_err(|e| SearchError::Config(format!("Invalid engine url {}: {}", config.url, e)))?;

        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build()?;

        let credentials = config
            .username
            .clone()
            .map(|username| (username, config.password.clone()));

        Ok(Self {
            http,
            base_url,
            flavor,
            doc_type: doc_type.to_string(),
            credentials,
        })
    }

    pub fn flavor(&self) -> EngineFlavor {
        self.flavor
    }

    /// Engine info document (`GET /`)
    pub async fn info(&self) -> Result<Value> {
        let response = self.request(Method::GET, &[])?.send().await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    fn url(&self, segments: &[String]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SearchError::Config(format!("Engine url cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[String]) -> Result<RequestBuilder> {
        let url = self.url(segments)?;
        debug!("{} {}", method, url);

        let mut builder = self.http.request(method, url);
        if let Some((username, password)) = &self.credentials {
            builder = builder.basic_auth(username, password.as_ref());
        }
        Ok(builder)
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(SearchError::Engine {
            status: status.as_u16(),
            body,
        })
    }

    async fn check_document(response: Response, index: &str, id: &str) -> Result<()> {
        if response.status() == StatusCode::NOT_FOUND {
            return Err(SearchError::NotFound {
                index: index.to_string(),
                id: id.to_string(),
            });
        }
        Self::check(response).await.map(|_| ())
    }
}

#[async_trait]
impl SearchEngine for ElasticsearchClient {
    async fn index_exists(&self, index: &str) -> Result<bool> {
        let response = self
            .request(Method::HEAD, &[index.to_string()])?
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            _ => Self::check(response).await.map(|_| true),
        }
    }

    async fn create_index(&self, index: &str, properties: &Map<String, Value>) -> Result<()> {
        let body = self.flavor.mappings_body(&self.doc_type, properties);
        let response = self
            .request(Method::PUT, &[index.to_string()])?
            .json(&body)
            .send()
            .await?;

        match Self::check(response).await {
            Ok(_) => Ok(()),
            Err(SearchError::Engine { status: 400, body })
                if body.contains("resource_already_exists_exception")
                    || body.contains("index_already_exists_exception") =>
            {
                debug!("Index {} was created concurrently", index);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn delete_index(&self, index: &str) -> Result<()> {
        let response = self
            .request(Method::DELETE, &[index.to_string()])?
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }

    async fn refresh(&self, index: &str) -> Result<()> {
        let response = self
            .request(Method::POST, &[index.to_string(), "_refresh".to_string()])?
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }

    async fn index_document(&self, index: &str, id: &str, document: &Document) -> Result<()> {
        let path = self.flavor.document_path(index, &self.doc_type, id);
        let response = self.request(Method::PUT, &path)?.json(document).send().await?;
        Self::check(response).await.map(|_| ())
    }

    async fn update_document(&self, index: &str, id: &str, document: &Document) -> Result<()> {
        let path = self.flavor.update_path(index, &self.doc_type, id);
        let response = self
            .request(Method::POST, &path)?
            .json(&json!({ "doc": document }))
            .send()
            .await?;
        Self::check_document(response, index, id).await
    }

    async fn delete_document(&self, index: &str, id: &str) -> Result<()> {
        let path = self.flavor.document_path(index, &self.doc_type, id);
        let response = self.request(Method::DELETE, &path)?.send().await?;
        Self::check_document(response, index, id).await
    }

    async fn search(&self, index: &str, body: &Value) -> Result<Vec<Hit>> {
        let path = self.flavor.search_path(index, &self.doc_type);
        let response = self.request(Method::POST, &path)?.json(body).send().await?;
        let response = Self::check(response).await?;

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(format!("Failed to parse search response: {}", e)))?;

        let hits: Vec<Hit> = parsed
            .hits
            .hits
            .into_iter()
            .enumerate()
            .map(|(rank, hit)| Hit::new(hit.id, rank, hit.score))
            .collect();

        debug!("Search on {} returned {} hits", index, hits.len());
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> EngineConfig {
        EngineConfig {
            url: url.to_string(),
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_url_building_escapes_ids() {
        let client = ElasticsearchClient::with_flavor(
            &config("http://localhost:9200/"),
            "msearch",
            EngineFlavor::Typeless,
        )
        .unwrap();

        let path = client.flavor.document_path("posts", "msearch", "a/b c");
        let url = client.url(&path).unwrap();
        assert_eq!(url.as_str(), "http://localhost:9200/posts/_doc/a%2Fb%20c");
    }

    #[test]
    fn test_url_building_keeps_base_path() {
        let client = ElasticsearchClient::with_flavor(
            &config("http://proxy.local/es"),
            "msearch",
            EngineFlavor::Typeless,
        )
        .unwrap();

        let url = client.url(&["posts".to_string(), "_refresh".to_string()]).unwrap();
        assert_eq!(url.as_str(), "http://proxy.local/es/posts/_refresh");
    }

    #[test]
    fn test_invalid_url_is_config_error() {
        let result =
            ElasticsearchClient::with_flavor(&config("not a url"), "msearch", EngineFlavor::Typeless);
        assert!(matches!(result, Err(SearchError::Config(_))));
    }
}
