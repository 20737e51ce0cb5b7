use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use super::{HealthStatus, MatchingBackend, PresignedUpload};
use crate::attachment::ImageAttachment;
use crate::config::Config;
use crate::product::Documents;

#[derive(Serialize)]
struct PresignRequest<'a> {
    #[serde(rename = "fileName")]
    file_name: &'a str,
    #[serde(rename = "fileType")]
    file_type: &'a str,
}

#[derive(Serialize)]
struct CaptionRequest<'a> {
    image_path: &'a str,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    user_query: &'a str,
    image_prompt: &'a str,
}

#[derive(Serialize)]
struct GenerationRequest<'a> {
    question: &'a str,
    reference: &'a str,
}

#[derive(Deserialize)]
struct TextResults {
    #[serde(default)]
    results: String,
}

#[derive(Deserialize)]
struct DocumentResults {
    results: Option<Box<RawValue>>,
}

#[derive(Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    response: String,
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        read_json(response, "/health").await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "POST");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", path))?;

        read_json(response, path).await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response, path: &str) -> Result<T> {
    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(anyhow!("Backend {} returned {}: {}", path, status, text));
    }

    response
        .json()
        .await
        .with_context(|| format!("Malformed response from {}", path))
}

#[async_trait]
impl MatchingBackend for BackendClient {
    async fn presign_upload(&self, file_name: &str, file_type: &str) -> Result<PresignedUpload> {
        self.post_json("/get-presigned-url", &PresignRequest { file_name, file_type })
            .await
    }

    async fn upload(&self, target: &PresignedUpload, image: &ImageAttachment) -> Result<()> {
        let response = self
            .client
            .put(&target.upload_url)
            .header("Content-Type", &image.content_type)
            .body(image.bytes.clone())
            .send()
            .await
            .context("Image upload failed")?;

        if !response.status().is_success() {
            return Err(anyhow!("Image upload returned {}", response.status()));
        }

        Ok(())
    }

    async fn caption_image(&self, image_path: &str) -> Result<String> {
        let res: TextResults = self
            .post_json("/image_captioning", &CaptionRequest { image_path })
            .await?;
        Ok(res.results)
    }

    async fn find_documents(&self, user_query: &str, image_prompt: &str) -> Result<Documents> {
        let res: DocumentResults = self
            .post_json("/finding_documents", &QueryRequest { user_query, image_prompt })
            .await?;

        let raw = res
            .results
            .map(|r| r.get().to_string())
            .unwrap_or_else(|| "[]".to_string());
        Documents::from_json(raw).context("Malformed response from /finding_documents")
    }

    async fn style_complement(&self, user_query: &str, image_prompt: &str) -> Result<String> {
        let res: TextResults = self
            .post_json("/style_complement", &QueryRequest { user_query, image_prompt })
            .await?;
        Ok(res.results)
    }

    async fn generate(&self, question: &str, reference: &str) -> Result<String> {
        let res: GenerationResponse = self
            .post_json("/generation", &GenerationRequest { question, reference })
            .await?;
        Ok(res.response)
    }
}
