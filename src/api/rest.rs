//! HTTP client for the community REST API.
//!
//! Endpoints:
//! - `GET /v1/{types}/by/id?id=..&id=..` → `{ "<id>": { ...entity } }`
//! - `GET /v1/{types}/by/id/{relation}?id=<parent>&limit=N[&orderKey=..&orderDirection=..]`
//!   → `{ "items": [...], "hasMore": bool, "nextPage": "<url>" }`

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;

use super::{Page, ResourceApi};
use crate::config::ApiConfig;
use crate::schema::Schema;
use crate::types::EntityId;
use crate::{CacheError, Result};

/// Client for the community REST API.
#[derive(Clone)]
pub struct RestClient {
    http: Client,
    base_url: String,
    token: Option<String>,
    page_size: usize,
    schema: Arc<Schema>,
}

impl RestClient {
    /// Build a client from API settings; entity paths and relation ordering
    /// come from `schema`.
    pub fn new(config: &ApiConfig, schema: impl Into<Arc<Schema>>) -> Result<Self> {
        config.validate()?;
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CacheError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            page_size: config.page_size,
            schema: schema.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get(&self, url: &str) -> RequestBuilder {
        let request = self.http.get(url);
        match &self.token {
            Some(token) => request.header("Authorization", token),
            None => request,
        }
    }

    /// Resolve a `nextPage` cursor, which may be absolute or base-relative.
    fn resolve(&self, cursor: &str) -> String {
        if cursor.starts_with("http://") || cursor.starts_with("https://") {
            cursor.to_string()
        } else {
            format!("{}/{}", self.base_url, cursor.trim_start_matches('/'))
        }
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<reqwest::Response> {
        let response = request.send().await?;
        check_status(&response, what)?;
        Ok(response)
    }
}

#[async_trait]
impl ResourceApi for RestClient {
    async fn fetch_entities(&self, entity_type: &str, ids: &[EntityId]) -> Result<Vec<Value>> {
        let path = &self.schema.entity(entity_type)?.path;
        let url = format!("{}/v1/{path}/by/id", self.base_url);
        let query: Vec<(&str, String)> = ids.iter().map(|id| ("id", id.to_string())).collect();

        let response = self.send(self.get(&url).query(&query), &url).await?;
        let mut by_id: HashMap<String, Value> = response.json().await?;

        // Requested order first; anything keyed differently follows.
        let mut values: Vec<Value> = ids
            .iter()
            .filter_map(|id| by_id.remove(&id.to_string()))
            .collect();
        values.extend(by_id.into_values());
        Ok(values)
    }

    async fn fetch_relation_page(
        &self,
        entity_type: &str,
        id: &EntityId,
        relation: &str,
        cursor: Option<&str>,
    ) -> Result<Page> {
        let request = match cursor {
            Some(cursor) => self.get(&self.resolve(cursor)),
            None => {
                let path = &self.schema.entity(entity_type)?.path;
                let def = self.schema.relation(entity_type, relation)?;
                let url = format!("{}/v1/{path}/by/id/{relation}", self.base_url);
                let mut query = vec![
                    ("id", id.to_string()),
                    ("limit", self.page_size.to_string()),
                ];
                if let Some(order) = &def.order {
                    query.push(("orderKey", order.key.clone()));
                    query.push(("orderDirection", order.direction.as_str().to_string()));
                }
                self.get(&url).query(&query)
            }
        };

        let what = format!("{entity_type}/{id}/{relation}");
        let response = self.send(request, &what).await?;
        Ok(response.json().await?)
    }
}

fn check_status(response: &reqwest::Response, what: &str) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    match status.as_u16() {
        404 => Err(CacheError::NotFound(what.to_string())),
        429 => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs);
            Err(CacheError::RateLimited { retry_after })
        }
        code => Err(CacheError::Api {
            status: code,
            message: format!("request for {what} failed: {status}"),
        }),
    }
}
