//! Contract with the matching backend
//!
//! One method per endpoint. The pipeline is written against the trait so it
//! can be driven by the HTTP client in production and a scripted fake in tests.

pub mod http;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::attachment::ImageAttachment;
use crate::product::Documents;

pub use http::BackendClient;

/// Presigned upload target issued by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresignedUpload {
    #[serde(rename = "uploadURL")]
    pub upload_url: String,
    /// Storage key the caption endpoint reads the image from
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

#[async_trait]
pub trait MatchingBackend: Send + Sync {
    /// `POST /get-presigned-url`
    async fn presign_upload(&self, file_name: &str, file_type: &str) -> Result<PresignedUpload>;

    /// `PUT <uploadURL>` with the raw image body
    async fn upload(&self, target: &PresignedUpload, image: &ImageAttachment) -> Result<()>;

    /// `POST /image_captioning`, returns the caption text
    async fn caption_image(&self, image_path: &str) -> Result<String>;

    /// `POST /finding_documents`
    async fn find_documents(&self, user_query: &str, image_prompt: &str) -> Result<Documents>;

    /// `POST /style_complement`, returns the rewritten query
    async fn style_complement(&self, user_query: &str, image_prompt: &str) -> Result<String>;

    /// `POST /generation`; `reference` is the retrieval results JSON as received
    async fn generate(&self, question: &str, reference: &str) -> Result<String>;

    /// Upload an image through the presigned-URL flow, returning its storage key.
    async fn upload_image(&self, image: &ImageAttachment) -> Result<String> {
        let target = self
            .presign_upload(&image.file_name, &image.content_type)
            .await?;
        self.upload(&target, image).await?;
        Ok(target.key)
    }
}
