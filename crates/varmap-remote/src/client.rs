//! Blocking JSON client for the mapping backend.

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, Url};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, info_span, warn};

use varmap_model::{Row, RowKey};

use crate::config::RemoteConfig;
use crate::error::{RemoteError, Result};
use crate::rows::{row_to_json, rows_from_response};

const CLIENT_ID_HEADER: &str = "x-client-id";
const JSON: &str = "application/json";

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    project_id: &'a str,
    client_id: &'a str,
    dry_run: bool,
    rows: Vec<Value>,
}

#[derive(Debug, Serialize)]
struct DeleteRequest<'a> {
    project_id: &'a str,
    client_id: &'a str,
    row_keys: Vec<&'a str>,
}

#[derive(Debug)]
pub struct RemoteClient {
    client: Client,
    config: RemoteConfig,
}

impl RemoteClient {
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(JSON));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON));
        let client_id = HeaderValue::from_str(&config.client_id).map_err(|_| {
            RemoteError::NotConfigured(format!("invalid client id {:?}", config.client_id))
        })?;
        headers.insert(CLIENT_ID_HEADER, client_id);

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(RemoteConfig::from_env()?)
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.config.token)
    }

    fn parse_url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        Url::parse_with_params(&self.url(path), params)
            .map_err(|err| RemoteError::NotConfigured(format!("invalid base URL: {err}")))
    }

    /// Send `request` and decode the JSON body. An empty body is `{}`.
    fn send(&self, request: RequestBuilder) -> Result<Value> {
        let response = request.send()?;
        let status = response.status();
        let body = response.text()?;
        if status.as_u16() >= 400 {
            warn!(status = status.as_u16(), "remote call failed");
            return Err(RemoteError::Http {
                status: status.as_u16(),
                body,
            });
        }
        if body.trim().is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Probe `GET /health`.
    pub fn health(&self) -> Result<Value> {
        let url = self.parse_url("/health", &[])?;
        debug!(%url, "remote health check");
        self.send(self.request(Method::GET, url))
    }

    /// Rows stored for `project_id`.
    pub fn pull(&self, project_id: &str) -> Result<Vec<Row>> {
        let span = info_span!("remote_pull", project_id);
        let _guard = span.enter();

        let url = self.parse_url("/v1/mappings", &[("project_id", project_id)])?;
        let body = self.send(self.request(Method::GET, url))?;
        let rows = rows_from_response(&body);
        info!(row_count = rows.len(), "rows pulled");
        Ok(rows)
    }

    /// Create or update `rows`. With `dry_run` the backend only reports
    /// what it would do.
    pub fn upsert(&self, project_id: &str, rows: &[Row], dry_run: bool) -> Result<Value> {
        let span = info_span!("remote_upsert", project_id, dry_run);
        let _guard = span.enter();

        let payload = UpsertRequest {
            project_id,
            client_id: &self.config.client_id,
            dry_run,
            rows: rows.iter().map(row_to_json).collect(),
        };
        let url = self.parse_url("/v1/mappings:upsert", &[])?;
        let result = self.send(self.request(Method::POST, url).json(&payload))?;
        info!(row_count = rows.len(), "rows upserted");
        Ok(result)
    }

    pub fn delete(&self, project_id: &str, row_keys: &[RowKey]) -> Result<Value> {
        let span = info_span!("remote_delete", project_id);
        let _guard = span.enter();

        let payload = DeleteRequest {
            project_id,
            client_id: &self.config.client_id,
            row_keys: row_keys.iter().map(RowKey::as_str).collect(),
        };
        let url = self.parse_url("/v1/mappings:delete", &[])?;
        let result = self.send(self.request(Method::POST, url).json(&payload))?;
        info!(row_count = row_keys.len(), "rows deleted");
        Ok(result)
    }
}
