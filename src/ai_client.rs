// src/ai_client.rs
//
// HTTP client for the external AI backend service. All semantic work
// (document indexing, vector search, answer generation) happens on the other
// side of these calls; this side only forwards, retries, and times out.
// Every wrapped endpoint is idempotent upstream, so repeating a request on a
// transient failure is safe.

use std::time::Duration;

use reqwest::multipart;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::chat::MemoryMessage;
use crate::retry::retry_with_backoff;

// Query generation can run for minutes; the proxied maintenance calls are
// quick lookups.
const QUERY_TIMEOUT: Duration = Duration::from_secs(300);
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);
const PROXY_TIMEOUT: Duration = Duration::from_secs(10);

const QUERY_RETRIES: u32 = 2;
const UPLOAD_RETRIES: u32 = 1;
const PROXY_RETRIES: u32 = 2;
const INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Error)]
pub enum AiServiceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("AI service returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// The payload forwarded to the AI service's /api/query endpoint, carrying
/// the session's memory window as conversation context.
#[derive(Debug, Serialize)]
pub struct UpstreamQueryRequest<'a> {
    pub query: &'a str,
    pub org_query: &'a str,
    pub chat_id: &'a str,
    #[serde(rename = "userId")]
    pub user_id: i32,
    pub memory: &'a [MemoryMessage],
}

#[derive(Debug, Clone)]
pub struct AiServiceClient {
    client: Client,
    base_url: String,
}

impl AiServiceClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn query(
        &self,
        request: &UpstreamQueryRequest<'_>,
    ) -> Result<Value, AiServiceError> {
        let url = format!("{}/api/query", self.base_url);

        retry_with_backoff(
            || async {
                let response = self
                    .client
                    .post(&url)
                    .timeout(QUERY_TIMEOUT)
                    .json(request)
                    .send()
                    .await?;
                Self::read_json(response).await
            },
            QUERY_RETRIES,
            INITIAL_BACKOFF_MS,
        )
        .await
    }

    pub async fn upload_pdf(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        user_id: i32,
    ) -> Result<Value, AiServiceError> {
        let url = format!("{}/api/upload-pdf", self.base_url);

        retry_with_backoff(
            || {
                // Multipart forms are consumed on send, so each attempt
                // rebuilds one from the owned bytes.
                let form = multipart::Form::new()
                    .part(
                        "file",
                        multipart::Part::bytes(bytes.clone()).file_name(filename.to_string()),
                    )
                    .text("userId", user_id.to_string());
                let request = self.client.post(&url).timeout(UPLOAD_TIMEOUT).multipart(form);
                async move {
                    let response = request.send().await?;
                    Self::read_json(response).await
                }
            },
            UPLOAD_RETRIES,
            INITIAL_BACKOFF_MS,
        )
        .await
    }

    pub async fn search_pdfs(
        &self,
        search_query: Option<&str>,
        user_id: i32,
    ) -> Result<Value, AiServiceError> {
        let url = format!("{}/api/search-pdfs", self.base_url);

        retry_with_backoff(
            || {
                let mut request = self
                    .client
                    .get(&url)
                    .timeout(PROXY_TIMEOUT)
                    .query(&[("userId", user_id.to_string())]);
                if let Some(q) = search_query {
                    request = request.query(&[("search_query", q)]);
                }
                async move {
                    let response = request.send().await?;
                    Self::read_json(response).await
                }
            },
            PROXY_RETRIES,
            INITIAL_BACKOFF_MS,
        )
        .await
    }

    pub async fn delete_pdf(&self, pdf_name: &str, user_id: i32) -> Result<Value, AiServiceError> {
        let url = format!("{}/api/delete-pdf/{}", self.base_url, pdf_name);

        retry_with_backoff(
            || async {
                let response = self
                    .client
                    .delete(&url)
                    .timeout(PROXY_TIMEOUT)
                    .query(&[("userId", user_id.to_string())])
                    .send()
                    .await?;
                Self::read_json(response).await
            },
            PROXY_RETRIES,
            INITIAL_BACKOFF_MS,
        )
        .await
    }

    pub async fn update_pdf_info(
        &self,
        pdf_name: &str,
        new_info: &str,
        user_id: i32,
    ) -> Result<Value, AiServiceError> {
        let url = format!("{}/api/update-pdf-info/{}", self.base_url, pdf_name);

        retry_with_backoff(
            || async {
                let response = self
                    .client
                    .put(&url)
                    .timeout(PROXY_TIMEOUT)
                    .query(&[("new_info", new_info.to_string()), ("userId", user_id.to_string())])
                    .send()
                    .await?;
                Self::read_json(response).await
            },
            PROXY_RETRIES,
            INITIAL_BACKOFF_MS,
        )
        .await
    }

    pub async fn random_product_queries(&self) -> Result<Value, AiServiceError> {
        let url = format!("{}/api/random-product-queries", self.base_url);

        retry_with_backoff(
            || async {
                let response = self.client.get(&url).timeout(PROXY_TIMEOUT).send().await?;
                Self::read_json(response).await
            },
            PROXY_RETRIES,
            INITIAL_BACKOFF_MS,
        )
        .await
    }

    pub async fn generate_product_queries(
        &self,
        title: &str,
        info: &str,
    ) -> Result<Value, AiServiceError> {
        let url = format!("{}/api/generate-product-queries", self.base_url);

        retry_with_backoff(
            || async {
                let response = self
                    .client
                    .post(&url)
                    .timeout(PROXY_TIMEOUT)
                    .json(&serde_json::json!({"title": title, "info": info}))
                    .send()
                    .await?;
                Self::read_json(response).await
            },
            PROXY_RETRIES,
            INITIAL_BACKOFF_MS,
        )
        .await
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, AiServiceError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<Value>().await?)
    }
}
