//! Elasticsearch sink.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use sla_indexing::{IndexingError, SinkDocument, TicketSink};
use sla_types::{IndexedTicket, Settings};

use crate::error::ClientError;
use crate::retry::RetryPolicy;

/// Configuration for [`ElasticSink`].
#[derive(Debug, Clone)]
pub struct ElasticConfig {
    /// Base URL (e.g. "http://localhost:9200")
    pub url: String,
    pub index: String,
    pub user: Option<String>,
    pub password: Option<SecretString>,
    /// Maximum documents read per snapshot
    pub snapshot_size: usize,
    pub timeout: Duration,
    /// Applied to snapshot reads only; failed writes are retried next cycle
    pub retry: RetryPolicy,
}

impl ElasticConfig {
    pub fn new(url: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            index: index.into(),
            user: None,
            password: None,
            snapshot_size: 10_000,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let elastic = &settings.elastic;
        let mut config = Self::new(&elastic.url, &elastic.index);
        config.user = elastic.user.clone().filter(|s| !s.is_empty());
        config.password = elastic.password.clone().map(SecretString::from);
        config.snapshot_size = elastic.snapshot_size;
        config.timeout = Duration::from_secs(elastic.timeout_secs);
        config
    }

    pub fn with_basic_auth(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(SecretString::from(password.into()));
        self
    }

    pub fn with_snapshot_size(mut self, size: usize) -> Self {
        self.snapshot_size = size;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Deserialize)]
struct Hits {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Deserialize)]
struct Hit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source")]
    source: IndexedTicket,
}

/// Search index holding one document per ticket, keyed by identity hash.
pub struct ElasticSink {
    client: Client,
    config: ElasticConfig,
}

impl ElasticSink {
    pub fn new(config: ElasticConfig) -> Result<Self, ClientError> {
        if config.url.is_empty() || config.index.is_empty() {
            return Err(ClientError::NotConfigured(
                "Elasticsearch URL and index are required".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn doc_url(&self, doc_id: &str) -> String {
        format!("{}/{}/_doc/{}", self.config.url, self.config.index, doc_id)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.user {
            Some(user) => request.basic_auth(
                user,
                self.config.password.as_ref().map(|p| p.expose_secret()),
            ),
            None => request,
        }
    }

    async fn search_once(&self) -> Result<Vec<SinkDocument>, ClientError> {
        let url = format!("{}/{}/_search", self.config.url, self.config.index);
        let response = self
            .authorize(self.client.get(&url))
            .query(&[("size", self.config.snapshot_size)])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(index = %self.config.index, "Index does not exist yet, empty snapshot");
            return Ok(Vec::new());
        }
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SearchResponse =
            serde_json::from_str(&body).map_err(|e| ClientError::Parse(e.to_string()))?;
        Ok(parsed
            .hits
            .hits
            .into_iter()
            .map(|hit| SinkDocument::new(hit.id, hit.source))
            .collect())
    }

    /// Read every document with the `_id` it is stored under.
    pub async fn search_all(&self) -> Result<Vec<SinkDocument>, ClientError> {
        let docs = self.config.retry.run("_search", || self.search_once()).await?;
        debug!(index = %self.config.index, count = docs.len(), "Read sink snapshot");
        Ok(docs)
    }

    pub async fn put_doc(&self, doc_id: &str, record: &IndexedTicket) -> Result<(), ClientError> {
        let response = self
            .authorize(self.client.put(self.doc_url(doc_id)))
            .json(record)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() >= 300 {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    pub async fn delete_doc(&self, doc_id: &str) -> Result<(), ClientError> {
        let response = self
            .authorize(self.client.delete(self.doc_url(doc_id)))
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() >= 300 && status != StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TicketSink for ElasticSink {
    async fn fetch_all(&self) -> Result<Vec<SinkDocument>, IndexingError> {
        self.search_all().await.map_err(ClientError::into_sink_error)
    }

    async fn upsert(&self, doc_id: &str, record: &IndexedTicket) -> Result<(), IndexingError> {
        self.put_doc(doc_id, record)
            .await
            .map_err(ClientError::into_sink_error)
    }

    async fn delete(&self, doc_id: &str) -> Result<(), IndexingError> {
        self.delete_doc(doc_id)
            .await
            .map_err(ClientError::into_sink_error)
    }

    fn name(&self) -> &str {
        &self.config.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_trims_trailing_slash() {
        let config = ElasticConfig::new("http://es:9200/", "tickets");
        assert_eq!(config.url, "http://es:9200");
        let sink = ElasticSink::new(config).unwrap();
        assert_eq!(sink.doc_url("abc"), "http://es:9200/tickets/_doc/abc");
    }

    #[test]
    fn test_missing_index_rejected() {
        let err = ElasticSink::new(ElasticConfig::new("http://es:9200", "")).err();
        assert!(matches!(err, Some(ClientError::NotConfigured(_))));
    }

    #[test]
    fn test_config_from_settings() {
        let mut settings = Settings::default();
        settings.elastic.url = "http://es:9200".to_string();
        settings.elastic.index = "itop".to_string();
        settings.elastic.user = Some("elastic".to_string());
        settings.elastic.password = Some("changeme".to_string());
        settings.elastic.snapshot_size = 500;

        let config = ElasticConfig::from_settings(&settings);
        assert_eq!(config.user.as_deref(), Some("elastic"));
        assert_eq!(config.password.as_ref().map(|p| p.expose_secret()), Some("changeme"));
        assert_eq!(config.snapshot_size, 500);
    }
}
