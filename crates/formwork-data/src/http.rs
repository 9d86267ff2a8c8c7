//! REST data source
//!
//! | Operation | Request |
//! |-----------|---------|
//! | `find` | `GET {base}/{object}?filter[f]=v&sort=a,-b&top=&skip=&select=a,b&search=` |
//! | `find_one` | `GET {base}/{object}/{id}` |
//! | `create` | `POST {base}/{object}` |
//! | `update` | `PATCH {base}/{object}/{id}` |
//! | `delete` | `DELETE {base}/{object}/{id}` |
//!
//! Collection responses may be a bare array or wrapped as `{"data": [...]}` /
//! `{"value": [...]}`.

use async_trait::async_trait;
use formwork_config::DataSourceConfig;
use formwork_core::data_source::{
    DataSource, DataSourceError, DataSourceResult, Query, Record, SortOrder,
};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpDataSource {
    client: Client,
    base_url: Url,
    timeout: Duration,
    headers: BTreeMap<String, String>,
}

impl std::fmt::Debug for HttpDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Header values may carry credentials
        f.debug_struct("HttpDataSource")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl HttpDataSource {
    pub fn new(base_url: &str) -> DataSourceResult<Self> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> DataSourceResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            DataSourceError::invalid_data(format!("invalid base URL '{}': {}", base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(DataSourceError::invalid_data(format!(
                "base URL '{}' cannot have path segments",
                base_url
            )));
        }
        Ok(Self {
            client,
            base_url,
            timeout: DEFAULT_TIMEOUT,
            headers: BTreeMap::new(),
        })
    }

    /// Build from an `http` data source section
    pub fn from_config(config: &DataSourceConfig) -> DataSourceResult<Self> {
        match config {
            DataSourceConfig::Http {
                base_url,
                timeout_seconds,
                headers,
            } => {
                let mut source =
                    Self::new(base_url)?.with_timeout(Duration::from_secs(*timeout_seconds));
                source.headers = headers.clone();
                Ok(source)
            }
            _ => Err(DataSourceError::Unsupported(
                "HttpDataSource requires an http data source config".to_string(),
            )),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send `name: value` with every request
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_bearer_token(self, token: &str) -> Self {
        self.with_header("Authorization", format!("Bearer {}", token))
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn url(&self, segments: &[&str]) -> DataSourceResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DataSourceError::invalid_data("base URL cannot have path segments"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut request = self.client.request(method, url).timeout(self.timeout);
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        request
    }

    async fn send(&self, request: RequestBuilder) -> DataSourceResult<Response> {
        request.send().await.map_err(|e| self.transport_error(e))
    }

    fn transport_error(&self, error: reqwest::Error) -> DataSourceError {
        if error.is_timeout() {
            DataSourceError::Timeout {
                duration_ms: self.timeout.as_millis() as u64,
            }
        } else {
            DataSourceError::transport(error.to_string())
        }
    }

    async fn json(&self, response: Response) -> DataSourceResult<Value> {
        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Translate a [`Query`] to URL parameters
pub fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params = Vec::new();
    for (field, value) in &query.filter {
        let value = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        params.push((format!("filter[{}]", field), value));
    }
    if !query.sort.is_empty() {
        let sort = query
            .sort
            .iter()
            .map(|spec| match spec.order {
                SortOrder::Asc => spec.field.clone(),
                SortOrder::Desc => format!("-{}", spec.field),
            })
            .collect::<Vec<_>>()
            .join(",");
        params.push(("sort".to_string(), sort));
    }
    if let Some(top) = query.top {
        params.push(("top".to_string(), top.to_string()));
    }
    if let Some(skip) = query.skip {
        params.push(("skip".to_string(), skip.to_string()));
    }
    if let Some(select) = &query.select {
        params.push(("select".to_string(), select.join(",")));
    }
    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        params.push(("search".to_string(), search.to_string()));
    }
    params
}

/// Map a non-2xx response to a backend error, using the body's message
async fn backend_error(response: Response) -> DataSourceError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.as_str().or_else(|| e.get("message").and_then(Value::as_str)))
                .or_else(|| v.get("message").and_then(Value::as_str))
                .map(str::to_string)
        })
        .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    DataSourceError::Backend {
        status: Some(status.as_u16()),
        message,
    }
}

fn into_record(value: Value, context: &str) -> DataSourceResult<Record> {
    match value {
        Value::Object(map) => {
            // Single records may also arrive wrapped in `data`
            match map.get("data") {
                Some(Value::Object(inner)) if map.len() == 1 => Ok(inner.clone()),
                _ => Ok(map),
            }
        }
        other => Err(DataSourceError::invalid_data(format!(
            "{}: expected an object, got {}",
            context, other
        ))),
    }
}

fn into_records(value: Value, object: &str) -> DataSourceResult<Vec<Record>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data").or_else(|| map.remove("value")) {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(DataSourceError::invalid_data(format!(
                    "{}: expected an array of records",
                    object
                )))
            }
        },
        other => {
            return Err(DataSourceError::invalid_data(format!(
                "{}: expected an array of records, got {}",
                object, other
            )))
        }
    };
    items
        .into_iter()
        .map(|item| into_record(item, object))
        .collect()
}

#[async_trait]
impl DataSource for HttpDataSource {
    async fn find(&self, object: &str, query: &Query) -> DataSourceResult<Vec<Record>> {
        let url = self.url(&[object])?;
        tracing::debug!(%url, "GET collection");
        let response = self
            .send(self.request(Method::GET, url).query(&query_params(query)))
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(DataSourceError::NotFound(object.to_string())),
            status if status.is_success() => into_records(self.json(response).await?, object),
            _ => Err(backend_error(response).await),
        }
    }

    async fn find_one(&self, object: &str, id: &str) -> DataSourceResult<Option<Record>> {
        let url = self.url(&[object, id])?;
        let response = self.send(self.request(Method::GET, url)).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => match self.json(response).await? {
                Value::Null => Ok(None),
                value => into_record(value, object).map(Some),
            },
            _ => Err(backend_error(response).await),
        }
    }

    async fn create(&self, object: &str, data: Record) -> DataSourceResult<Record> {
        let url = self.url(&[object])?;
        let response = self
            .send(self.request(Method::POST, url).json(&data))
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(DataSourceError::NotFound(object.to_string())),
            status if status.is_success() => into_record(self.json(response).await?, object),
            _ => Err(backend_error(response).await),
        }
    }

    async fn update(&self, object: &str, id: &str, patch: Record) -> DataSourceResult<Record> {
        let url = self.url(&[object, id])?;
        let response = self
            .send(self.request(Method::PATCH, url).json(&patch))
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(DataSourceError::record_not_found(object, id)),
            status if status.is_success() => into_record(self.json(response).await?, object),
            _ => Err(backend_error(response).await),
        }
    }

    async fn delete(&self, object: &str, id: &str) -> DataSourceResult<bool> {
        let url = self.url(&[object, id])?;
        let response = self.send(self.request(Method::DELETE, url)).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            _ => Err(backend_error(response).await),
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formwork_core::data_source::SortOrder;
    use serde_json::json;

    #[test]
    fn test_query_params() {
        let query = Query::new()
            .filter_eq("status", "open")
            .filter_eq("priority", 2)
            .sort_by("due", SortOrder::Asc)
            .sort_by("created", SortOrder::Desc)
            .top(10)
            .skip(20)
            .select(["name", "due"])
            .search("lamp");
        assert_eq!(
            query_params(&query),
            vec![
                ("filter[priority]".to_string(), "2".to_string()),
                ("filter[status]".to_string(), "open".to_string()),
                ("sort".to_string(), "due,-created".to_string()),
                ("top".to_string(), "10".to_string()),
                ("skip".to_string(), "20".to_string()),
                ("select".to_string(), "name,due".to_string()),
                ("search".to_string(), "lamp".to_string()),
            ]
        );
        assert!(query_params(&Query::new()).is_empty());
    }

    #[test]
    fn test_url_building_encodes_segments() {
        let ds = HttpDataSource::new("http://localhost:9000/api/").unwrap();
        let url = ds.url(&["orders", "a/b c"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/api/orders/a%2Fb%20c");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpDataSource::new("not a url"),
            Err(DataSourceError::InvalidData(_))
        ));
        assert!(HttpDataSource::new("mailto:someone@example.com").is_err());
    }

    #[test]
    fn test_from_config() {
        let config = DataSourceConfig::Http {
            base_url: "https://api.example.com/v1".to_string(),
            timeout_seconds: 5,
            headers: BTreeMap::from([("X-Tenant".to_string(), "acme".to_string())]),
        };
        let ds = HttpDataSource::from_config(&config).unwrap();
        assert_eq!(ds.timeout, Duration::from_secs(5));
        assert_eq!(ds.headers.get("X-Tenant").map(String::as_str), Some("acme"));

        let wrong = DataSourceConfig::Static { path: None };
        assert!(HttpDataSource::from_config(&wrong).is_err());
    }

    #[test]
    fn test_collection_shapes() {
        assert_eq!(into_records(json!([{"id": 1}]), "x").unwrap().len(), 1);
        assert_eq!(into_records(json!({"data": [{"id": 1}]}), "x").unwrap().len(), 1);
        assert_eq!(into_records(json!({"value": []}), "x").unwrap().len(), 0);
        assert!(into_records(json!({"items": []}), "x").is_err());
        assert!(into_records(json!([1]), "x").is_err());
    }
}
