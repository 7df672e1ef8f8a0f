use async_trait::async_trait;
use log::info;
use reqwest::{ Client as HttpClient, StatusCode };
use reqwest::header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION };
use std::time::Duration;

use super::{ BackendError, ChatBackend };
use crate::cli::Args;
use crate::models::wire::{ HistoryEntry, QueryRequest, QueryResponse };

pub struct HttpBackend {
    http: HttpClient,
    base_url: String,
}

impl HttpBackend {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        timeout: Duration
    ) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key {
            let value = HeaderValue::from_str(&format!("Bearer {}", key)).map_err(|e|
                BackendError::Config(format!("invalid API key: {}", e))
            )?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = HttpClient::builder().default_headers(headers).timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_args(args: &Args) -> Result<Self, BackendError> {
        Self::new(
            args.base_url.clone(),
            args.api_key.clone(),
            Duration::from_secs(args.timeout_secs)
        )
    }

    async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(BackendError::Status {
            status: status.as_u16(),
            body: if body.is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                body
            },
        })
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn query(
        &self,
        query: &str,
        conversation_id: Option<&str>
    ) -> Result<QueryResponse, BackendError> {
        let url = format!("{}/api/ask/query", self.base_url);
        let req = QueryRequest {
            query: query.to_string(),
            conversation_id: conversation_id.map(str::to_string),
        };

        let resp = self.http.post(&url).json(&req).send().await?;
        let resp = Self::check_status(resp).await?;
        let parsed = resp.json::<QueryResponse>().await?;
        info!(
            "Query answered: conversation={}, sources={}",
            parsed.conversation_id,
            parsed.sources.as_ref().map(Vec::len).unwrap_or(0)
        );
        Ok(parsed)
    }

    async fn fetch_session(
        &self,
        conversation_id: &str
    ) -> Result<Vec<HistoryEntry>, BackendError> {
        let url = format!("{}/api/ask/sessions/{}", self.base_url, conversation_id);

        let resp = self.http.get(&url).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(BackendError::Status {
                status: 404,
                body: format!("conversation '{}' not found", conversation_id),
            });
        }
        let resp = Self::check_status(resp).await?;
        let entries = resp.json::<Vec<HistoryEntry>>().await?;
        info!("Loaded {} stored messages for conversation {}", entries.len(), conversation_id);
        Ok(entries)
    }
}
