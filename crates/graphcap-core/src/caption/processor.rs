//! Concurrent caption generation.
//!
//! The processor fans a batch of images out to one provider with bounded
//! concurrency (semaphore). Records are delivered via a callback as they
//! complete, enabling real-time JSONL streaming.

use super::retry;
use super::schema::{ArtCritique, GraphCaption};
use super::{CaptionKind, CaptionRecord};
use crate::error::{ProviderError, ProviderResult};
use crate::providers::{
    ImageInput, LlmClient, SamplingOptions, SchemaDescriptor, SchemaInput, StructuredCompletion,
};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Settings for one caption run.
#[derive(Debug, Clone)]
pub struct CaptionOptions {
    /// Caption schema and prompt
    pub kind: CaptionKind,
    /// Model to ask
    pub model: String,
    /// Sampling parameters forwarded to the provider
    pub sampling: SamplingOptions,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Maximum retries per image
    pub retry_attempts: u32,
    /// Base backoff delay in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for CaptionOptions {
    fn default() -> Self {
        Self {
            kind: CaptionKind::Graph,
            model: String::new(),
            sampling: SamplingOptions::default()
                .max_tokens(4096)
                .temperature(0.8)
                .top_p(0.9),
            max_concurrent: 3,
            timeout_ms: 120_000,
            retry_attempts: 3,
            retry_delay_ms: 1000,
        }
    }
}

/// Runs caption requests against a single provider.
pub struct CaptionProcessor {
    client: Arc<dyn LlmClient>,
    provider: String,
    options: CaptionOptions,
}

impl CaptionProcessor {
    pub fn new(client: Arc<dyn LlmClient>, provider: &str, options: CaptionOptions) -> Self {
        Self {
            client,
            provider: provider.to_string(),
            options,
        }
    }

    pub fn options(&self) -> &CaptionOptions {
        &self.options
    }

    /// Caption a batch of images.
    ///
    /// Spawns one tokio task per image, bounded by a semaphore. Calls
    /// `on_result` for each finished image, successful or not.
    ///
    /// Returns `(succeeded, failed)` counts.
    pub async fn process_batch<F>(&self, images: &[PathBuf], on_result: F) -> (usize, usize)
    where
        F: Fn(CaptionRecord) + Send + Sync + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrent.max(1)));
        let on_result = Arc::new(on_result);
        let mut handles = Vec::with_capacity(images.len());

        tracing::info!(
            "Captioning {} images with {} ({}, max {} concurrent)",
            images.len(),
            self.provider,
            self.options.model,
            self.options.max_concurrent
        );

        for image in images {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                tracing::warn!("Caption semaphore closed unexpectedly, stopping batch");
                break;
            };

            let client = self.client.clone();
            let provider = self.provider.clone();
            let options = self.options.clone();
            let on_result = on_result.clone();
            let image = image.clone();

            let handle = tokio::spawn(async move {
                let record = caption_single(client.as_ref(), &provider, &image, &options).await;
                let success = record.is_success();
                drop(permit);
                on_result(record);
                success
            });

            handles.push(handle);
        }

        let mut succeeded = 0usize;
        let mut failed = 0usize;

        for handle in handles {
            match handle.await {
                Ok(true) => succeeded += 1,
                Ok(false) => failed += 1,
                Err(e) => {
                    tracing::error!("Caption task panicked: {e}");
                    failed += 1;
                }
            }
        }

        (succeeded, failed)
    }
}

/// Caption one image with timeout and retry.
async fn caption_single(
    client: &dyn LlmClient,
    provider: &str,
    image: &Path,
    options: &CaptionOptions,
) -> CaptionRecord {
    let mut record = CaptionRecord {
        filename: image.display().to_string(),
        config_name: options.kind.config_name().to_string(),
        version: crate::VERSION.to_string(),
        model: options.model.clone(),
        provider: provider.to_string(),
        parsed: None,
        error: None,
    };

    let mut last_error = String::new();
    for attempt in 0..=options.retry_attempts {
        if attempt > 0 {
            let delay = retry::backoff_duration(attempt - 1, options.retry_delay_ms);
            tracing::debug!(
                "Retry {attempt}/{} for {:?} after {delay:?}",
                options.retry_attempts,
                image
            );
            tokio::time::sleep(delay).await;
        }

        match tokio::time::timeout(
            Duration::from_millis(options.timeout_ms),
            request_caption(client, image, options),
        )
        .await
        {
            Ok(Ok(parsed)) => {
                record.parsed = Some(parsed);
                return record;
            }
            Ok(Err(e)) => {
                last_error = e.to_string();
                if !retry::is_retryable(&e) {
                    break;
                }
            }
            Err(_) => {
                last_error = format!("Timeout after {}ms", options.timeout_ms);
            }
        }
    }

    tracing::error!("Caption failed: {:?} - {last_error}", image);
    record.error = Some(last_error);
    record
}

async fn request_caption(
    client: &dyn LlmClient,
    image: &Path,
    options: &CaptionOptions,
) -> ProviderResult<Value> {
    match options.kind {
        CaptionKind::Graph => vision_caption::<GraphCaption>(client, image, options).await,
        CaptionKind::Art => vision_caption::<ArtCritique>(client, image, options).await,
    }
}

async fn vision_caption<T: SchemaDescriptor + Serialize>(
    client: &dyn LlmClient,
    image: &Path,
    options: &CaptionOptions,
) -> ProviderResult<Value> {
    let caption = client
        .create_structured_vision_completion(
            options.kind.prompt(),
            ImageInput::from(image),
            SchemaInput::<T>::of(),
            &options.model,
            &options.sampling,
        )
        .await?
        .parsed()
        .ok_or(ProviderError::EmptyResponse)?;

    serde_json::to_value(caption).map_err(|e| ProviderError::Validation {
        message: e.to_string(),
        content: String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{BaseClient, ChatCompletion, ChatRequest, ContentPart, EncodedImage, ProviderKind};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    const GRAPH_REPLY: &str = r#"{
        "tags_list": [{"tag": "dog", "type": "entity", "confidence": 0.9}],
        "short_caption": "A dog.",
        "verification": "dog visible",
        "dense_caption": "A dog sits on grass."
    }"#;

    type ReplyFn = Box<dyn Fn(u32) -> ProviderResult<ChatCompletion> + Send + Sync>;

    /// A configurable mock client for testing processor behavior.
    ///
    /// Each call to `complete()` invokes the reply factory with the current
    /// call index, allowing different results per attempt.
    struct ScriptedClient {
        base: BaseClient,
        reply_fn: ReplyFn,
        call_count: Arc<AtomicU32>,
        delay: Option<Duration>,
        /// (in_flight, max_concurrent)
        in_flight: Option<(Arc<AtomicU32>, Arc<AtomicU32>)>,
    }

    fn completion(content: &str) -> ChatCompletion {
        serde_json::from_value(json!({
            "model": "mock-v1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
        }))
        .unwrap()
    }

    fn api_error(status: u16, body: &str) -> ProviderError {
        ProviderError::Api {
            status,
            body: body.to_string(),
        }
    }

    impl ScriptedClient {
        fn new(reply_fn: ReplyFn) -> Self {
            Self {
                base: BaseClient::new("http://mock", None),
                reply_fn,
                call_count: Arc::new(AtomicU32::new(0)),
                delay: None,
                in_flight: None,
            }
        }

        fn success(content: &str) -> Self {
            let content = content.to_string();
            Self::new(Box::new(move |_| Ok(completion(&content))))
        }

        fn failing(status: u16, body: &str) -> Self {
            let body = body.to_string();
            Self::new(Box::new(move |_| Err(api_error(status, &body))))
        }

        /// First call fails with `status`, later calls succeed.
        fn fail_then_succeed(status: u16, content: &str) -> Self {
            let content = content.to_string();
            Self::new(Box::new(move |idx| {
                if idx == 0 {
                    Err(api_error(status, "transient"))
                } else {
                    Ok(completion(&content))
                }
            }))
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn call_count_handle(&self) -> Arc<AtomicU32> {
            self.call_count.clone()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Vllm
        }

        fn base(&self) -> &BaseClient {
            &self.base
        }

        fn format_vision_content(&self, text: &str, image: &EncodedImage) -> Vec<ContentPart> {
            crate::providers::openai_vision_content(text, image)
        }

        async fn complete(&self, _request: ChatRequest) -> ProviderResult<ChatCompletion> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            if let Some((ref in_flight, ref max_concurrent)) = self.in_flight {
                let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_concurrent.fetch_max(current, Ordering::SeqCst);
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let result = (self.reply_fn)(idx);
            if let Some((ref in_flight, _)) = self.in_flight {
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }
            result
        }
    }

    /// Write `count` small image files and return the directory and paths.
    fn fixture_images(count: usize) -> (tempfile::TempDir, Vec<PathBuf>) {
        let dir = tempfile::tempdir().unwrap();
        let paths = (0..count)
            .map(|i| {
                let path = dir.path().join(format!("img_{i}.jpg"));
                std::fs::write(&path, [0xFF, 0xD8, 0xFF, i as u8]).unwrap();
                path
            })
            .collect();
        (dir, paths)
    }

    fn fast_options() -> CaptionOptions {
        CaptionOptions {
            model: "mock-vision".to_string(),
            max_concurrent: 4,
            timeout_ms: 5000,
            retry_attempts: 0,
            retry_delay_ms: 10,
            ..CaptionOptions::default()
        }
    }

    async fn run(
        client: ScriptedClient,
        images: &[PathBuf],
        options: CaptionOptions,
    ) -> (Vec<CaptionRecord>, (usize, usize)) {
        let records = Arc::new(std::sync::Mutex::new(Vec::new()));
        let records_clone = records.clone();
        let processor = CaptionProcessor::new(Arc::new(client), "local", options);
        let counts = processor
            .process_batch(images, move |r| records_clone.lock().unwrap().push(r))
            .await;
        let records = Arc::try_unwrap(records).unwrap().into_inner().unwrap();
        (records, counts)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_graph_caption_success() {
        let (_dir, images) = fixture_images(1);
        let (records, (succeeded, failed)) =
            run(ScriptedClient::success(GRAPH_REPLY), &images, fast_options()).await;

        assert_eq!((succeeded, failed), (1, 0));
        let record = &records[0];
        assert_eq!(record.config_name, "graph_caption");
        assert_eq!(record.provider, "local");
        assert_eq!(record.model, "mock-vision");
        assert_eq!(record.version, crate::VERSION);
        assert!(record.filename.ends_with("img_0.jpg"));
        let parsed = record.parsed.as_ref().unwrap();
        assert_eq!(parsed["short_caption"], "A dog.");
        assert_eq!(parsed["tags_list"][0]["type"], "entity");
        assert!(record.error.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_art_caption_success() {
        let (_dir, images) = fixture_images(1);
        let reply = r#"{"visual_elements": ["line"], "technical_elements": [],
            "style_elements": ["impressionism"], "formal_tenets": ["balance"], "opinion": "Calm."}"#;
        let options = CaptionOptions {
            kind: CaptionKind::Art,
            ..fast_options()
        };
        let (records, (succeeded, _)) = run(ScriptedClient::success(reply), &images, options).await;

        assert_eq!(succeeded, 1);
        assert_eq!(records[0].config_name, "art_critic");
        assert_eq!(records[0].parsed.as_ref().unwrap()["opinion"], "Calm.");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_malformed_reply_is_not_retried() {
        let (_dir, images) = fixture_images(1);
        let client = ScriptedClient::success("{\"short_caption\": ");
        let calls = client.call_count_handle();
        let options = CaptionOptions {
            retry_attempts: 3,
            ..fast_options()
        };
        let (records, (succeeded, failed)) = run(client, &images, options).await;

        assert_eq!((succeeded, failed), (0, 1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(records[0].error.as_ref().unwrap().contains("validation"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_retry_on_rate_limit() {
        let (_dir, images) = fixture_images(1);
        let client = ScriptedClient::fail_then_succeed(429, GRAPH_REPLY);
        let calls = client.call_count_handle();
        let options = CaptionOptions {
            retry_attempts: 1,
            ..fast_options()
        };
        let (_, (succeeded, failed)) = run(client, &images, options).await;

        assert_eq!((succeeded, failed), (1, 0));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_no_retry_on_auth_error() {
        let (_dir, images) = fixture_images(1);
        let client = ScriptedClient::failing(401, "unauthorized");
        let calls = client.call_count_handle();
        let options = CaptionOptions {
            retry_attempts: 3,
            ..fast_options()
        };
        let (records, (succeeded, failed)) = run(client, &images, options).await;

        assert_eq!((succeeded, failed), (0, 1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(records[0].error.as_ref().unwrap().contains("unauthorized"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_exhausts_retries() {
        let (_dir, images) = fixture_images(1);
        let client = ScriptedClient::failing(503, "unavailable");
        let calls = client.call_count_handle();
        let options = CaptionOptions {
            retry_attempts: 2,
            ..fast_options()
        };
        let (records, (_, failed)) = run(client, &images, options).await;

        assert_eq!(failed, 1);
        // 1 initial + 2 retries
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(records[0].error.as_ref().unwrap().contains("503"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_timeout() {
        let (_dir, images) = fixture_images(1);
        let client = ScriptedClient::success(GRAPH_REPLY).with_delay(Duration::from_secs(5));
        let options = CaptionOptions {
            timeout_ms: 50,
            ..fast_options()
        };
        let (records, (_, failed)) = run(client, &images, options).await;

        assert_eq!(failed, 1);
        assert!(records[0].error.as_ref().unwrap().contains("Timeout"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_missing_image_skips_request() {
        let client = ScriptedClient::success(GRAPH_REPLY);
        let calls = client.call_count_handle();
        let images = vec![PathBuf::from("/nonexistent/ghost.jpg")];
        let options = CaptionOptions {
            retry_attempts: 3,
            ..fast_options()
        };
        let (records, (succeeded, failed)) = run(client, &images, options).await;

        assert_eq!((succeeded, failed), (0, 1));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(records[0].error.as_ref().unwrap().contains("ghost.jpg"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_partial_failure() {
        let (_dir, mut images) = fixture_images(2);
        images.insert(1, PathBuf::from("/tmp/definitely_does_not_exist.jpg"));
        let (records, (succeeded, failed)) =
            run(ScriptedClient::success(GRAPH_REPLY), &images, fast_options()).await;

        assert_eq!((succeeded, failed), (2, 1));
        assert_eq!(records.len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_semaphore_bounds_concurrency() {
        let in_flight = Arc::new(AtomicU32::new(0));
        let max_concurrent = Arc::new(AtomicU32::new(0));
        let mut client = ScriptedClient::success(GRAPH_REPLY).with_delay(Duration::from_millis(200));
        client.in_flight = Some((in_flight, max_concurrent.clone()));

        let (_dir, images) = fixture_images(6);
        let options = CaptionOptions {
            max_concurrent: 2,
            ..fast_options()
        };
        let (_, (succeeded, failed)) = run(client, &images, options).await;

        assert_eq!((succeeded, failed), (6, 0));
        assert!(
            max_concurrent.load(Ordering::SeqCst) <= 2,
            "semaphore violated: max concurrent was {}",
            max_concurrent.load(Ordering::SeqCst)
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_empty_batch() {
        let client = ScriptedClient::success(GRAPH_REPLY);
        let calls = client.call_count_handle();
        let (records, counts) = run(client, &[], fast_options()).await;

        assert_eq!(counts, (0, 0));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(records.is_empty());
    }
}
