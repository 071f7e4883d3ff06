use super::dsl::{
    classify_error, error_type, parse_scroll_page, parse_search_response, render_mapping,
    render_search,
};
use crate::config::SearchConfig;
use application::shared::SearchIndex;
use async_trait::async_trait;
use log::{debug, info};
use model::search::{IndexMapping, ScrollPage, SearchRequest, SearchResponse};
use model::IndexError;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::{json, Value};

/// Elasticsearch 兼容的 HTTP 索引适配器
///
/// 写操作都带 `refresh=true`，保证随后的读能看到刚写入的文档。
#[derive(Clone)]
pub struct ElasticSearchIndex {
    client: Client,
    base_url: String,
    credentials: Option<(String, String)>,
}

fn transport_err(e: reqwest::Error) -> IndexError {
    IndexError::Unavailable(e.to_string())
}

impl ElasticSearchIndex {
    pub fn new(config: &SearchConfig) -> Result<Self, IndexError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| IndexError::Unavailable(format!("failed to build http client: {}", e)))?;
        info!("search index client configured for {}", config.url);
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            credentials: config
                .credentials()
                .map(|(u, p)| (u.to_string(), p.to_string())),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}/{}", self.base_url, path));
        match &self.credentials {
            Some((user, password)) => builder.basic_auth(user, Some(password)),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<(StatusCode, Value), IndexError> {
        let response = builder.send().await.map_err(transport_err)?;
        let status = response.status();
        let text = response.text().await.map_err(transport_err)?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        Ok((status, body))
    }

    /// 发送请求，非 2xx 统一归类为 `IndexError`
    async fn send_ok(&self, builder: RequestBuilder, index: &str) -> Result<Value, IndexError> {
        let (status, body) = self.send(builder).await?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(classify_error(status.as_u16(), &body, index))
        }
    }
}

#[async_trait]
impl SearchIndex for ElasticSearchIndex {
    async fn exists(&self, index: &str) -> Result<bool, IndexError> {
        let (status, body) = self.send(self.request(Method::HEAD, index)).await?;
        match status {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            s => Err(classify_error(s.as_u16(), &body, index)),
        }
    }

    async fn create(&self, index: &str, mapping: &IndexMapping) -> Result<(), IndexError> {
        let builder = self
            .request(Method::PUT, index)
            .json(&render_mapping(mapping));
        let (status, body) = self.send(builder).await?;
        if status.is_success() {
            info!("index {} created", index);
            return Ok(());
        }
        // 并发启动时可能已被其他实例创建
        if error_type(&body) == Some("resource_already_exists_exception") {
            debug!("index {} already exists", index);
            return Ok(());
        }
        Err(classify_error(status.as_u16(), &body, index))
    }

    async fn index(&self, index: &str, id: &str, doc: &Value) -> Result<(), IndexError> {
        let builder = self
            .request(Method::PUT, &format!("{}/_doc/{}?refresh=true", index, id))
            .json(doc);
        self.send_ok(builder, index).await?;
        Ok(())
    }

    async fn update(&self, index: &str, id: &str, partial: &Value) -> Result<(), IndexError> {
        let builder = self
            .request(Method::POST, &format!("{}/_update/{}?refresh=true", index, id))
            .json(&json!({ "doc": partial }));
        let (status, body) = self.send(builder).await?;
        match status {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND if error_type(&body) != Some("index_not_found_exception") => {
                Err(IndexError::DocumentNotFound {
                    index: index.to_string(),
                    id: id.to_string(),
                })
            }
            s => Err(classify_error(s.as_u16(), &body, index)),
        }
    }

    async fn delete(&self, index: &str, id: &str) -> Result<bool, IndexError> {
        let builder = self.request(Method::DELETE, &format!("{}/_doc/{}?refresh=true", index, id));
        let (status, body) = self.send(builder).await?;
        match status {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND if error_type(&body) != Some("index_not_found_exception") => {
                Ok(false)
            }
            s => Err(classify_error(s.as_u16(), &body, index)),
        }
    }

    async fn get(&self, index: &str, id: &str) -> Result<Option<Value>, IndexError> {
        let builder = self.request(Method::GET, &format!("{}/_doc/{}", index, id));
        let (status, mut body) = self.send(builder).await?;
        match status {
            s if s.is_success() => Ok(body.get_mut("_source").map(Value::take)),
            StatusCode::NOT_FOUND if error_type(&body) != Some("index_not_found_exception") => {
                Ok(None)
            }
            s => Err(classify_error(s.as_u16(), &body, index)),
        }
    }

    async fn search(
        &self,
        index: &str,
        request: &SearchRequest,
    ) -> Result<SearchResponse, IndexError> {
        let builder = self
            .request(Method::POST, &format!("{}/_search", index))
            .json(&render_search(request));
        let body = self.send_ok(builder, index).await?;
        parse_search_response(body)
    }

    async fn open_scroll(
        &self,
        index: &str,
        request: &SearchRequest,
        keep_alive: &str,
    ) -> Result<ScrollPage, IndexError> {
        let builder = self
            .request(Method::POST, &format!("{}/_search?scroll={}", index, keep_alive))
            .json(&render_search(request));
        let body = self.send_ok(builder, index).await?;
        parse_scroll_page(body)
    }

    async fn scroll(&self, scroll_id: &str, keep_alive: &str) -> Result<ScrollPage, IndexError> {
        let builder = self
            .request(Method::POST, "_search/scroll")
            .json(&json!({ "scroll": keep_alive, "scroll_id": scroll_id }));
        let body = self.send_ok(builder, "_search/scroll").await?;
        parse_scroll_page(body)
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), IndexError> {
        let builder = self
            .request(Method::DELETE, "_search/scroll")
            .json(&json!({ "scroll_id": scroll_id }));
        let (status, body) = self.send(builder).await?;
        // 已过期的 scroll 返回 404
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(classify_error(status.as_u16(), &body, "_search/scroll"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use application::shared::IndexNames;
    use model::search::Query;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ElasticSearchIndex {
        ElasticSearchIndex::new(&SearchConfig {
            url: server.uri(),
            username: "".to_string(),
            password: "".to_string(),
            accept_invalid_certs: false,
            timeout: Duration::from_secs(5),
            indices: IndexNames::default(),
        })
        .unwrap()
    }

    fn index_missing() -> ResponseTemplate {
        ResponseTemplate::new(404).set_body_json(json!({
            "error": { "type": "index_not_found_exception", "reason": "no such index [songs]" },
            "status": 404
        }))
    }

    #[tokio::test]
    async fn test_exists() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/songs"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/playlist-info"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let es = client(&server);
        assert!(es.exists("songs").await.unwrap());
        assert!(!es.exists("playlist-info").await.unwrap());
    }

    #[tokio::test]
    async fn test_get_document_and_missing_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/songs/_doc/10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_index": "songs", "_id": "10", "found": true, "_source": { "title": "A" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/songs/_doc/11"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({ "_index": "songs", "_id": "11", "found": false })),
            )
            .mount(&server)
            .await;

        let es = client(&server);
        assert_eq!(es.get("songs", "10").await.unwrap(), Some(json!({ "title": "A" })));
        assert_eq!(es.get("songs", "11").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_index_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/songs/_search"))
            .respond_with(index_missing())
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/songs/_doc/1"))
            .respond_with(index_missing())
            .mount(&server)
            .await;

        let es = client(&server);
        let request = SearchRequest::new(Query::MatchAll, 10);
        assert_eq!(
            es.search("songs", &request).await,
            Err(IndexError::IndexMissing("songs".to_string()))
        );
        assert_eq!(
            es.get("songs", "1").await,
            Err(IndexError::IndexMissing("songs".to_string()))
        );
    }

    #[tokio::test]
    async fn test_update_missing_document() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/playlist-info/_update/5"))
            .and(query_param("refresh", "true"))
            .and(body_partial_json(json!({ "doc": { "songs": ["1"] } })))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "type": "document_missing_exception", "reason": "[5]: document missing" },
                "status": 404
            })))
            .mount(&server)
            .await;

        let es = client(&server);
        assert_eq!(
            es.update("playlist-info", "5", &json!({ "songs": ["1"] })).await,
            Err(IndexError::DocumentNotFound {
                index: "playlist-info".to_string(),
                id: "5".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_server_errors_are_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/songs/_doc/1"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server)
            .index("songs", "1", &json!({ "id": "1" }))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_delete_reports_previous_existence() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/playlist-info/_doc/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "deleted" })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/playlist-info/_doc/2"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "result": "not_found" })))
            .mount(&server)
            .await;

        let es = client(&server);
        assert!(es.delete("playlist-info", "1").await.unwrap());
        assert!(!es.delete("playlist-info", "2").await.unwrap());
    }

    #[tokio::test]
    async fn test_scroll_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/songs/_search"))
            .and(query_param("scroll", "1m"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_scroll_id": "s1",
                "hits": { "total": { "value": 1 }, "hits": [{ "_id": "1", "_score": 1.0, "_source": {} }] }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/_search/scroll"))
            .and(body_partial_json(json!({ "scroll_id": "s1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_scroll_id": "s1",
                "hits": { "total": { "value": 1 }, "hits": [] }
            })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/_search/scroll"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let es = client(&server);
        let first = es
            .open_scroll("songs", &SearchRequest::new(Query::MatchAll, 100), "1m")
            .await
            .unwrap();
        assert_eq!(first.hits.len(), 1);
        let next = es.scroll("s1", "1m").await.unwrap();
        assert!(next.hits.is_empty());
        assert!(es.clear_scroll("s1").await.is_ok());
    }
}
