//! Elasticsearch-compatible REST engine.
//!
//! Transport failures (connect, DNS, timeout) map to
//! [`Error::EngineUnavailable`]; non-success statuses map to
//! [`Error::Engine`] carrying the engine's error type and reason.

use std::time::Duration;

use async_trait::async_trait;
use clipdex_core::{EngineConfig, Error, Result};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde_json::{Value, json};

use super::{Refresh, SearchEngine, keep_alive_param};
use crate::dsl::{SearchRequest, SearchResponse};

/// Replaces only the supplied top-level keys of the stored document.
const PARTIAL_UPDATE_SCRIPT: &str = "ctx._source.putAll(params.doc)";

/// REST client for an Elasticsearch-compatible engine.
pub struct HttpEngine {
    client: reqwest::Client,
    base_url: Url,
    credentials: Option<(String, String)>,
}

impl HttpEngine {
    /// Build a client from configuration.
    ///
    /// Does not contact the engine.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = reqwest::Client::builder().timeout(config.request_timeout());
        if config.accept_invalid_certs() && config.scheme == "https" {
            log::debug!(
                "Certificate validation relaxed for environment '{}'",
                config.environment
            );
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        let base_url = Url::parse(&config.base_url())
            .map_err(|e| Error::config(format!("Invalid engine URL: {e}")))?;

        Ok(Self {
            client,
            base_url,
            credentials: config
                .credentials()
                .map(|(user, pass)| (user.to_string(), pass.to_string())),
        })
    }

    /// Base URL requests are issued against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::config(format!("Engine URL {} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn url_with_query(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.url(segments)?;
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.credentials {
            Some((user, pass)) => builder.basic_auth(user, Some(pass)),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, operation: &str) -> Result<Response> {
        builder
            .send()
            .await
            .map_err(|e| Error::unavailable_with_source(format!("{operation} request failed"), e))
    }

    async fn json_body(response: Response, operation: &str) -> Result<Value> {
        let status = response.status();
        response.json::<Value>().await.map_err(|e| {
            Error::engine(
                status.as_u16(),
                format!("{operation}: unreadable response body: {e}"),
            )
        })
    }
}

/// Build an [`Error::Engine`] from a failed response.
async fn status_error(response: Response) -> Error {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Error::engine(status, error_reason(&body))
}

/// Extract `type: reason` from an engine error body.
fn error_reason(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };
    match &value["error"] {
        Value::Object(error) => {
            let kind = error.get("type").and_then(Value::as_str).unwrap_or("error");
            match error.get("reason").and_then(Value::as_str) {
                Some(reason) => format!("{kind}: {reason}"),
                None => kind.to_string(),
            }
        }
        Value::String(reason) => reason.clone(),
        _ => body.trim().to_string(),
    }
}

#[async_trait]
impl SearchEngine for HttpEngine {
    fn name(&self) -> &str {
        "http"
    }

    async fn ping(&self) -> Result<()> {
        let url = self.url(&[])?;
        let response = self.send(self.request(Method::GET, url), "ping").await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(status_error(response).await)
        }
    }

    async fn index_exists(&self, index: &str) -> Result<bool> {
        let url = self.url(&[index])?;
        let response = self
            .send(self.request(Method::HEAD, url), "index exists")
            .await?;
        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(status_error(response).await),
        }
    }

    async fn create_index(&self, index: &str, body: &Value) -> Result<bool> {
        let url = self.url(&[index])?;
        let response = self
            .send(self.request(Method::PUT, url).json(body), "create index")
            .await?;
        if response.status().is_success() {
            return Ok(true);
        }
        let err = status_error(response).await;
        let lost_race = matches!(
            &err,
            Error::Engine { reason, .. } if reason.starts_with("resource_already_exists_exception")
        );
        if lost_race { Ok(false) } else { Err(err) }
    }

    async fn index_document(
        &self,
        index: &str,
        id: &str,
        source: &Value,
        refresh: Refresh,
    ) -> Result<()> {
        let url = self.url_with_query(&[index, "_doc", id], &[("refresh", refresh.as_str())])?;
        let response = self
            .send(self.request(Method::PUT, url).json(source), "index document")
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(status_error(response).await)
        }
    }

    async fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>> {
        let url = self.url(&[index, "_doc", id])?;
        let response = self
            .send(self.request(Method::GET, url), "get document")
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let mut body = Self::json_body(response, "get document").await?;
                if body["found"] == json!(false) {
                    return Ok(None);
                }
                Ok(Some(body["_source"].take()))
            }
            _ => Err(status_error(response).await),
        }
    }

    async fn update_document(
        &self,
        index: &str,
        id: &str,
        fields: &Value,
        refresh: Refresh,
    ) -> Result<()> {
        let url =
            self.url_with_query(&[index, "_update", id], &[("refresh", refresh.as_str())])?;
        let body = json!({
            "script": {
                "source": PARTIAL_UPDATE_SCRIPT,
                "lang": "painless",
                "params": { "doc": fields },
            }
        });
        let response = self
            .send(self.request(Method::POST, url).json(&body), "update document")
            .await?;
        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(Error::not_found(id)),
            _ => Err(status_error(response).await),
        }
    }

    async fn search(&self, index: &str, request: &SearchRequest) -> Result<SearchResponse> {
        let url = self.url(&[index, "_search"])?;
        let response = self
            .send(
                self.request(Method::POST, url).json(&request.to_json()),
                "search",
            )
            .await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        SearchResponse::from_json(Self::json_body(response, "search").await?)
    }

    async fn open_scroll(
        &self,
        index: &str,
        request: &SearchRequest,
        keep_alive: Duration,
    ) -> Result<SearchResponse> {
        let scroll = keep_alive_param(keep_alive);
        let url = self.url_with_query(&[index, "_search"], &[("scroll", scroll.as_str())])?;
        let response = self
            .send(
                self.request(Method::POST, url).json(&request.to_json()),
                "open scroll",
            )
            .await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        SearchResponse::from_json(Self::json_body(response, "open scroll").await?)
    }

    async fn continue_scroll(
        &self,
        scroll_id: &str,
        keep_alive: Duration,
    ) -> Result<SearchResponse> {
        let url = self.url(&["_search", "scroll"])?;
        let body = json!({
            "scroll": keep_alive_param(keep_alive),
            "scroll_id": scroll_id,
        });
        let response = self
            .send(self.request(Method::POST, url).json(&body), "continue scroll")
            .await?;
        match response.status() {
            s if s.is_success() => {
                SearchResponse::from_json(Self::json_body(response, "continue scroll").await?)
            }
            StatusCode::NOT_FOUND => {
                let reason = error_reason(&response.text().await.unwrap_or_default());
                Err(Error::scroll(format!("cursor expired or unknown: {reason}")))
            }
            _ => Err(status_error(response).await),
        }
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<()> {
        let url = self.url(&["_search", "scroll"])?;
        let body = json!({ "scroll_id": [scroll_id] });
        let response = self
            .send(self.request(Method::DELETE, url).json(&body), "clear scroll")
            .await?;
        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(Error::scroll("cursor already released")),
            _ => Err(status_error(response).await),
        }
    }
}

impl std::fmt::Debug for HttpEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEngine")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.credentials.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_url_escapes_segments() {
        let engine = HttpEngine::new(&EngineConfig::default()).unwrap();
        let url = engine.url(&["clips", "_doc", "a/b c"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:9200/clips/_doc/a%2Fb%20c");
    }

    #[test]
    fn test_url_with_query() {
        let engine = HttpEngine::new(&EngineConfig::default()).unwrap();
        let url = engine
            .url_with_query(&["clips", "_search"], &[("scroll", "300s")])
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:9200/clips/_search?scroll=300s");
    }

    #[test]
    fn test_error_reason_structured() {
        let body = r#"{"error":{"type":"index_not_found_exception","reason":"no such index [clips]"},"status":404}"#;
        assert_eq!(
            error_reason(body),
            "index_not_found_exception: no such index [clips]"
        );
    }

    #[test]
    fn test_error_reason_plain() {
        assert_eq!(error_reason("Bad Gateway\n"), "Bad Gateway");
        assert_eq!(error_reason(r#"{"error":"boom"}"#), "boom");
    }

    #[test]
    fn test_debug_hides_credentials() {
        let config = EngineConfig {
            username: Some("elastic".to_string()),
            password: Some("secret".to_string()),
            ..Default::default()
        };
        let engine = HttpEngine::new(&config).unwrap();
        let debug = format!("{engine:?}");
        assert!(debug.contains("authenticated: true"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = EngineConfig {
            scheme: "gopher".to_string(),
            ..Default::default()
        };
        assert!(HttpEngine::new(&config).is_err());
    }
}
