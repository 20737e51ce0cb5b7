//! Matching orchestration
//!
//! Turns a query (and optional image) into a deduplicated product list and a
//! natural-language reply. Every stage is awaited in turn and its output fed
//! verbatim to the next:
//!
//! ```text
//! [upload -> caption] -> [style complement] -> find documents -> generation
//! ```
//!
//! The bracketed stages only run when an image is attached or in style mode.
//! The first failing stage aborts the whole run.

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use crate::attachment::ImageAttachment;
use crate::backend::MatchingBackend;
use crate::mode::MatchMode;
use crate::product::{flatten_search_results, Product};

/// Progress indicator shown while a run is in flight. Carries no control logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchingStatus {
    #[default]
    Idle,
    AnalyzingImage,
    SearchingProducts,
    GeneratingResponse,
}

impl MatchingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchingStatus::Idle => "idle",
            MatchingStatus::AnalyzingImage => "analyzing-image",
            MatchingStatus::SearchingProducts => "searching-products",
            MatchingStatus::GeneratingResponse => "generating-response",
        }
    }

    pub fn label(&self, mode: MatchMode) -> &'static str {
        match (self, mode) {
            (MatchingStatus::AnalyzingImage, _) => "Analyzing your image",
            (MatchingStatus::SearchingProducts, MatchMode::Product) => "Finding products",
            (MatchingStatus::SearchingProducts, MatchMode::Style) => "Analyzing style",
            (MatchingStatus::GeneratingResponse, _) => "Writing a response",
            (MatchingStatus::Idle, _) => "",
        }
    }
}

/// Intermediate update from a running pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Status(MatchingStatus),
    /// Emitted as soon as retrieval finishes, before generation starts
    ProductsFound(Vec<Product>),
}

/// Receiver of pipeline progress.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: PipelineEvent);
}

impl ProgressSink for () {
    fn emit(&self, _event: PipelineEvent) {}
}

impl ProgressSink for mpsc::UnboundedSender<PipelineEvent> {
    fn emit(&self, event: PipelineEvent) {
        // The receiver going away just means nobody is watching anymore.
        let _ = self.send(event);
    }
}

/// Final result of a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub products: Vec<Product>,
    pub response: String,
}

/// Run one matching request end to end.
pub async fn run_matching<B, S>(
    backend: &B,
    mode: MatchMode,
    query: &str,
    image: Option<&ImageAttachment>,
    progress: &S,
) -> Result<MatchOutcome>
where
    B: MatchingBackend + ?Sized,
    S: ProgressSink + ?Sized,
{
    tracing::info!(mode = mode.as_str(), has_image = image.is_some(), "Starting match");

    let mut image_prompt = String::new();
    if let Some(image) = image {
        progress.emit(PipelineEvent::Status(MatchingStatus::AnalyzingImage));

        let key = backend
            .upload_image(image)
            .await
            .context("Image upload failed")?;
        tracing::debug!(%key, "Uploaded image");

        image_prompt = backend
            .caption_image(&key)
            .await
            .context("Image captioning failed")?;
    }

    progress.emit(PipelineEvent::Status(MatchingStatus::SearchingProducts));

    let documents = match mode {
        MatchMode::Product => backend
            .find_documents(query, &image_prompt)
            .await
            .context("Document search failed")?,
        MatchMode::Style => {
            let complement = backend
                .style_complement(query, &image_prompt)
                .await
                .context("Style complement failed")?;
            tracing::debug!(%complement, "Style complement");

            // The rewrite already folds in the caption.
            backend
                .find_documents(&complement, "")
                .await
                .context("Document search failed")?
        }
    };

    let products = flatten_search_results(&documents.groups);
    tracing::info!(groups = documents.groups.len(), products = products.len(), "Retrieved documents");
    progress.emit(PipelineEvent::ProductsFound(products.clone()));

    progress.emit(PipelineEvent::Status(MatchingStatus::GeneratingResponse));

    let response = backend
        .generate(query, &documents.raw)
        .await
        .context("Generation failed")?;

    let response = if response.trim().is_empty() {
        mode.fallback_response(products.len())
    } else {
        response
    };

    Ok(MatchOutcome { products, response })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::backend::PresignedUpload;
    use crate::product::{Documents, RawResult, SearchHit};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every call and fails at a chosen endpoint.
    #[derive(Default)]
    pub(crate) struct FakeBackend {
        pub calls: Mutex<Vec<String>>,
        pub fail_at: Option<&'static str>,
        pub generation: String,
    }

    impl FakeBackend {
        pub fn failing_at(endpoint: &'static str) -> Self {
            Self {
                fail_at: Some(endpoint),
                ..Default::default()
            }
        }

        fn record(&self, call: String) -> Result<()> {
            let endpoint = call.split(' ').next().unwrap_or_default().to_string();
            self.calls.lock().unwrap().push(call);
            if self.fail_at == Some(endpoint.as_str()) {
                return Err(anyhow!("{} unavailable", endpoint));
            }
            Ok(())
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    pub(crate) fn sample_documents() -> Documents {
        Documents {
            raw: serde_json::to_string(&sample_results()).unwrap(),
            groups: sample_results(),
        }
    }

    pub(crate) fn sample_results() -> Vec<RawResult> {
        vec![RawResult {
            search_term: "linen shirt".to_string(),
            search_results: vec![
                SearchHit {
                    score: 0.9,
                    id: "101.jpg".to_string(),
                    name: "Linen Shirt".to_string(),
                    description: "Breathable".to_string(),
                    price: "39.99".to_string(),
                },
                SearchHit {
                    score: 0.8,
                    id: "101.jpg".to_string(),
                    name: " linen shirt".to_string(),
                    description: "Breathable".to_string(),
                    price: "39.99".to_string(),
                },
            ],
        }]
    }

    #[async_trait]
    impl MatchingBackend for FakeBackend {
        async fn presign_upload(&self, file_name: &str, file_type: &str) -> Result<PresignedUpload> {
            self.record(format!("presign {} {}", file_name, file_type))?;
            Ok(PresignedUpload {
                upload_url: "http://storage.test/put".to_string(),
                key: format!("uploads/{}", file_name),
            })
        }

        async fn upload(&self, target: &PresignedUpload, image: &ImageAttachment) -> Result<()> {
            self.record(format!("upload {} {}", target.upload_url, image.bytes.len()))
        }

        async fn caption_image(&self, image_path: &str) -> Result<String> {
            self.record(format!("caption {}", image_path))?;
            Ok("a grey suit".to_string())
        }

        async fn find_documents(&self, user_query: &str, image_prompt: &str) -> Result<Documents> {
            self.record(format!("find {}|{}", user_query, image_prompt))?;
            Ok(sample_documents())
        }

        async fn style_complement(&self, user_query: &str, image_prompt: &str) -> Result<String> {
            self.record(format!("style {}|{}", user_query, image_prompt))?;
            Ok("[\"loafers\"]".to_string())
        }

        async fn generate(&self, question: &str, reference: &str) -> Result<String> {
            self.record(format!("generate {}|{}", question, reference.len()))?;
            Ok(self.generation.clone())
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<PipelineEvent>>);

    impl ProgressSink for Recorder {
        fn emit(&self, event: PipelineEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    fn image() -> ImageAttachment {
        ImageAttachment::new("look.png", "image/png", vec![1, 2, 3])
    }

    #[tokio::test]
    async fn test_product_mode_without_image() {
        let backend = FakeBackend {
            generation: "Linen is perfect for summer.".to_string(),
            ..Default::default()
        };
        let outcome = run_matching(&backend, MatchMode::Product, "summer shirt", None, &())
            .await
            .unwrap();

        assert_eq!(outcome.response, "Linen is perfect for summer.");
        assert_eq!(outcome.products.len(), 1);
        let calls = backend.calls();
        assert_eq!(calls[0], "find summer shirt|");
        assert!(calls[1].starts_with("generate summer shirt|"));
        assert_eq!(calls.len(), 2);
    }

    #[tokio::test]
    async fn test_image_is_uploaded_and_captioned_first() {
        let backend = FakeBackend::default();
        run_matching(&backend, MatchMode::Product, "match this", Some(&image()), &())
            .await
            .unwrap();

        let calls = backend.calls();
        assert_eq!(calls[0], "presign look.png image/png");
        assert_eq!(calls[1], "upload http://storage.test/put 3");
        assert_eq!(calls[2], "caption uploads/look.png");
        assert_eq!(calls[3], "find match this|a grey suit");
    }

    #[tokio::test]
    async fn test_style_mode_searches_with_rewritten_query() {
        let backend = FakeBackend::default();
        let outcome = run_matching(&backend, MatchMode::Style, "complete my look", Some(&image()), &())
            .await
            .unwrap();

        let calls = backend.calls();
        assert_eq!(calls[3], "style complete my look|a grey suit");
        assert_eq!(calls[4], "find [\"loafers\"]|");
        assert!(calls[5].starts_with("generate complete my look|"));
        assert_eq!(outcome.response, "Here's what I found for your style.");
    }

    #[tokio::test]
    async fn test_empty_generation_uses_product_fallback() {
        let backend = FakeBackend::default();
        let outcome = run_matching(&backend, MatchMode::Product, "shirt", None, &())
            .await
            .unwrap();
        assert_eq!(outcome.response, "Found 1 products matching your requirements:");
    }

    #[tokio::test]
    async fn test_status_sequence_and_early_products() {
        let backend = FakeBackend::default();
        let recorder = Recorder::default();

        run_matching(&backend, MatchMode::Product, "shirt", Some(&image()), &recorder)
            .await
            .unwrap();

        let events = recorder.0.lock().unwrap().clone();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], PipelineEvent::Status(MatchingStatus::AnalyzingImage));
        assert_eq!(events[1], PipelineEvent::Status(MatchingStatus::SearchingProducts));
        assert!(matches!(&events[2], PipelineEvent::ProductsFound(p) if p.len() == 1));
        assert_eq!(events[3], PipelineEvent::Status(MatchingStatus::GeneratingResponse));
    }

    #[tokio::test]
    async fn test_no_image_skips_analyzing_status() {
        let backend = FakeBackend::default();
        let (tx, mut rx) = mpsc::unbounded_channel();
        run_matching(&backend, MatchMode::Product, "shirt", None, &tx)
            .await
            .unwrap();

        assert_eq!(
            rx.recv().await,
            Some(PipelineEvent::Status(MatchingStatus::SearchingProducts))
        );
    }

    #[tokio::test]
    async fn test_failure_aborts_remaining_stages() {
        for endpoint in ["presign", "upload", "caption", "style", "find", "generate"] {
            let backend = FakeBackend::failing_at(endpoint);
            let result = run_matching(&backend, MatchMode::Style, "q", Some(&image()), &()).await;

            assert!(result.is_err(), "{} should fail the run", endpoint);
            let last = backend.calls().last().cloned().unwrap();
            assert!(last.starts_with(endpoint), "stopped at {} not {}", last, endpoint);
        }
    }

    #[tokio::test]
    async fn test_generation_receives_raw_reference_json() {
        // Unknown fields and number formatting must survive to generation.
        const RAW: &str = r#"[{"search_term":"","search_results":[{"score":0.90,"id":"a.jpg","name":"Shirt","extra":{"rank":1}},{"score":0.8,"id":"a.jpg","name":"shirt"}]}]"#;

        struct Capture(Mutex<String>);

        #[async_trait]
        impl MatchingBackend for Capture {
            async fn presign_upload(&self, _: &str, _: &str) -> Result<PresignedUpload> {
                Err(anyhow!("not used"))
            }
            async fn upload(&self, _: &PresignedUpload, _: &ImageAttachment) -> Result<()> {
                Err(anyhow!("not used"))
            }
            async fn caption_image(&self, _: &str) -> Result<String> {
                Err(anyhow!("not used"))
            }
            async fn find_documents(&self, _: &str, _: &str) -> Result<Documents> {
                Documents::from_json(RAW.to_string())
            }
            async fn style_complement(&self, _: &str, _: &str) -> Result<String> {
                Err(anyhow!("not used"))
            }
            async fn generate(&self, _: &str, reference: &str) -> Result<String> {
                *self.0.lock().unwrap() = reference.to_string();
                Ok("ok".to_string())
            }
        }

        let backend = Capture(Mutex::new(String::new()));
        run_matching(&backend, MatchMode::Product, "q", None, &()).await.unwrap();

        assert_eq!(*backend.0.lock().unwrap(), RAW);
    }
}
