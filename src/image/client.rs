//! Two-phase image-service client: submit a prompt, fetch the finished image.

use super::{mime, ImageGenerationService};
use crate::models::{Config, GenerationParams, GenerationRequest, ServiceProtocol};
use crate::retry::{retry_transient, RetryPolicy};
use crate::{templates, Error, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info};

/// HTTP client for the image-synthesis service.
///
/// Protocol: `POST {endpoint}/prompt` submits the job. If the response already
/// carries an image reference the image is fetched straight away; otherwise
/// the job id is polled at `{endpoint}{status_path}/{job_id}` until the
/// reference appears or `poll_timeout` elapses. The image itself comes from
/// `GET {endpoint}/get_image/{reference}`.
pub struct ImageClient {
    http: Client,
    endpoint: String,
    protocol: ServiceProtocol,
    retry: RetryPolicy,
}

impl ImageClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let endpoint: String = endpoint.into();
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::generation(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            protocol: ServiceProtocol::default(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.endpoint.clone(), config.http_timeout)?
            .with_protocol(config.protocol.clone())
            .with_retry_policy(config.retry))
    }

    pub fn with_protocol(mut self, protocol: ServiceProtocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<Value> {
        let url = self.url("/prompt");
        let url = url.as_str();
        retry_transient(&self.retry, "submit", move || self.post_json(url, request)).await
    }

    async fn post_json(&self, url: &str, request: &GenerationRequest) -> Result<Value> {
        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error("submit", e))?;

        // The submit contract is exactly 200, not any 2xx.
        if response.status() != StatusCode::OK {
            return Err(status_error("submit", response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport_error("submit", e))?;
        serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse submit response: {}\nBody: {}", e, body);
            Error::generation(format!("Submit response is not valid JSON: {}", e))
        })
    }

    async fn get(&self, url: &str, stage: &'static str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(stage, e))?;

        if !response.status().is_success() {
            return Err(status_error(stage, response).await);
        }

        Ok(response
            .bytes()
            .await
            .map_err(|e| transport_error(stage, e))?
            .to_vec())
    }

    async fn resolve_reference(&self, submitted: &Value) -> Result<String> {
        if let Some(reference) = reference_at(submitted, &self.protocol.image_ref_pointer) {
            return Ok(reference);
        }

        let job_id = reference_at(submitted, &self.protocol.job_id_pointer).ok_or_else(|| {
            Error::generation(format!(
                "Response has neither an image reference at '{}' nor a job id at '{}'",
                self.protocol.image_ref_pointer, self.protocol.job_id_pointer
            ))
        })?;

        info!("Image job {} queued, polling for result", job_id);
        tokio::time::timeout(self.protocol.poll_timeout, self.poll(&job_id))
            .await
            .map_err(|_| {
                Error::generation(format!(
                    "Timed out after {:?} waiting for image job {}",
                    self.protocol.poll_timeout, job_id
                ))
            })?
    }

    async fn poll(&self, job_id: &str) -> Result<String> {
        let url = self.url(&format!(
            "{}/{}",
            self.protocol.status_path.trim_end_matches('/'),
            job_id
        ));
        let url = url.as_str();
        let pointer = templates::render(&self.protocol.status_ref_pointer, &[("job_id", job_id)]);
        let mut polls = 0u32;

        loop {
            polls += 1;
            let body = retry_transient(&self.retry, "poll", move || self.get(url, "poll")).await?;
            let status: Value = serde_json::from_slice(&body).map_err(|e| {
                Error::generation(format!("Status response for job {} is not valid JSON: {}", job_id, e))
            })?;

            if let Some(reference) = reference_at(&status, &pointer) {
                debug!("Job {} finished after {} polls", job_id, polls);
                return Ok(reference);
            }

            debug!("Job {} not ready after {} polls", job_id, polls);
            tokio::time::sleep(self.protocol.poll_interval).await;
        }
    }

    async fn fetch(&self, reference: &str) -> Result<Vec<u8>> {
        let url = self.url(&format!("/get_image/{}", reference));
        let url = url.as_str();
        retry_transient(&self.retry, "fetch", move || self.get(url, "fetch")).await
    }
}

#[async_trait]
impl ImageGenerationService for ImageClient {
    async fn generate_image(
        &self,
        prompt: &str,
        params: &GenerationParams,
        output_path: &Path,
    ) -> Result<PathBuf> {
        if prompt.trim().is_empty() {
            return Err(Error::generation("Prompt is empty"));
        }

        let request = GenerationRequest::new(prompt, params);
        info!("Submitting image generation request to {}", self.endpoint);
        let submitted = self.submit(&request).await?;

        let reference = self.resolve_reference(&submitted).await?;
        info!("Image ready at service reference {}", reference);

        let bytes = self.fetch(&reference).await?;
        debug!(
            "Downloaded {} bytes ({})",
            bytes.len(),
            mime::detect_image_format(&bytes).unwrap_or("unrecognized format")
        );

        if let Some(parent) = output_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(output_path, &bytes).await?;
        let absolute = std::path::absolute(output_path)?;
        info!("Saved image to {}", absolute.display());
        Ok(absolute)
    }
}

/// String or numeric value at `pointer`, ignoring empty strings.
fn reference_at(value: &Value, pointer: &str) -> Option<String> {
    match value.pointer(pointer)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn transport_error(stage: &str, e: reqwest::Error) -> Error {
    error!("[{}] Failed to reach image service: {}", stage, e);
    let message = format!("Image service unreachable during {}: {}", stage, e);
    if e.is_timeout() || e.is_connect() {
        Error::generation_transient(message)
    } else {
        Error::generation(message)
    }
}

async fn status_error(stage: &str, response: reqwest::Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    error!("[{}] Image service rejected request (status {}): {}", stage, status, body);

    let message = format!("Image service rejected {} (status {}): {}", stage, status, body);
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        Error::generation_transient(message)
    } else {
        Error::generation(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PNG_BYTES: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    fn fast_retry(max_attempts: usize) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    fn make_client(server: &MockServer) -> ImageClient {
        ImageClient::new(server.uri(), Duration::from_secs(5))
            .unwrap()
            .with_retry_policy(fast_retry(1))
    }

    fn fast_polling() -> ServiceProtocol {
        ServiceProtocol {
            poll_interval: Duration::from_millis(5),
            poll_timeout: Duration::from_millis(500),
            ..ServiceProtocol::default()
        }
    }

    async fn mount_image(server: &MockServer, reference: &str, bytes: &[u8]) {
        Mock::given(method("GET"))
            .and(path(format!("/get_image/{}", reference)))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes.to_vec()))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_generate_image_posts_request_and_saves_bytes_verbatim() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/prompt"))
            .and(body_json(serde_json::json!({
                "prompt": "flood in a realistic style",
                "width": 1024,
                "height": 1024,
                "steps": 20,
                "cfg_scale": 7.5,
                "sampler_name": "Euler a",
                "seed": -1
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "image_path": "out_0001.png" })),
            )
            .expect(1)
            .mount(&server)
            .await;
        mount_image(&server, "out_0001.png", &PNG_BYTES).await;

        let dir = tempdir().unwrap();
        let output = dir.path().join("generated_texture.png");

        let saved = make_client(&server)
            .generate_image("flood in a realistic style", &GenerationParams::default(), &output)
            .await
            .unwrap();

        assert!(saved.is_absolute());
        assert_eq!(std::fs::read(&saved).unwrap(), PNG_BYTES.to_vec());
    }

    #[tokio::test]
    async fn test_generate_image_creates_missing_parent_directories() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/prompt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "image_path": "out_0002.png" })),
            )
            .expect(1)
            .mount(&server)
            .await;
        mount_image(&server, "out_0002.png", &PNG_BYTES).await;

        let dir = tempdir().unwrap();
        let output = dir.path().join("nested").join("textures").join("tex.png");

        let saved = make_client(&server)
            .generate_image("flood in a realistic style", &GenerationParams::default(), &output)
            .await
            .unwrap();

        assert_eq!(saved, output);
        assert_eq!(std::fs::read(&output).unwrap(), PNG_BYTES.to_vec());
    }

    #[tokio::test]
    async fn test_non_200_submit_fails_without_writing_file() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/prompt"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad workflow"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let output = dir.path().join("generated_texture.png");

        let err = make_client(&server)
            .with_retry_policy(fast_retry(3))
            .generate_image("storm", &GenerationParams::default(), &output)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::GenerationService { .. }));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_non_200_success_status_is_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/prompt"))
            .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let err = make_client(&server)
            .generate_image("storm", &GenerationParams::default(), &dir.path().join("x.png"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::GenerationService { .. }));
    }

    #[tokio::test]
    async fn test_transient_submit_failure_is_retried() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/prompt"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/prompt"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "image_path": "a.png" })),
            )
            .mount(&server)
            .await;
        mount_image(&server, "a.png", &PNG_BYTES).await;

        let dir = tempdir().unwrap();
        let output = dir.path().join("a.png");

        make_client(&server)
            .with_retry_policy(fast_retry(3))
            .generate_image("storm", &GenerationParams::default(), &output)
            .await
            .unwrap();

        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_missing_reference_is_malformed_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/prompt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let output = dir.path().join("x.png");
        let err = make_client(&server)
            .generate_image("storm", &GenerationParams::default(), &output)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::GenerationService { .. }));
        assert!(err.to_string().contains("/image_path"));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_invalid_json_body_is_generation_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/prompt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let err = make_client(&server)
            .generate_image("storm", &GenerationParams::default(), &dir.path().join("x.png"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::GenerationService { .. }));
    }

    #[tokio::test]
    async fn test_configured_reference_pointer() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/prompt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "images": [{ "filename": "nested.png" }]
            })))
            .mount(&server)
            .await;
        mount_image(&server, "nested.png", &PNG_BYTES).await;

        let dir = tempdir().unwrap();
        let output = dir.path().join("nested.png");
        make_client(&server)
            .with_protocol(ServiceProtocol {
                image_ref_pointer: "/images/0/filename".to_string(),
                ..ServiceProtocol::default()
            })
            .generate_image("storm", &GenerationParams::default(), &output)
            .await
            .unwrap();

        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_queued_job_is_polled_until_ready() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/prompt"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "prompt_id": "job-7" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/history/job-7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/history/job-7"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "image_path": "job7.png" })),
            )
            .expect(1)
            .mount(&server)
            .await;
        mount_image(&server, "job7.png", &PNG_BYTES).await;

        let dir = tempdir().unwrap();
        let output = dir.path().join("job7.png");
        make_client(&server)
            .with_protocol(fast_polling())
            .generate_image("storm", &GenerationParams::default(), &output)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), PNG_BYTES.to_vec());
    }

    #[tokio::test]
    async fn test_status_pointer_can_reference_job_id() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/prompt"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "prompt_id": "abc" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/history/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "abc": { "outputs": { "image": "abc.png" } }
            })))
            .mount(&server)
            .await;
        mount_image(&server, "abc.png", &PNG_BYTES).await;

        let dir = tempdir().unwrap();
        let output = dir.path().join("abc.png");
        make_client(&server)
            .with_protocol(ServiceProtocol {
                status_ref_pointer: "/{{job_id}}/outputs/image".to_string(),
                ..fast_polling()
            })
            .generate_image("storm", &GenerationParams::default(), &output)
            .await
            .unwrap();

        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_polling_times_out() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/prompt"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "prompt_id": "slow" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/history/slow"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let output = dir.path().join("slow.png");
        let err = make_client(&server)
            .with_protocol(ServiceProtocol {
                poll_timeout: Duration::from_millis(60),
                ..fast_polling()
            })
            .generate_image("storm", &GenerationParams::default(), &output)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::GenerationService { .. }));
        assert!(err.to_string().contains("Timed out"));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_download_failure_is_generation_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/prompt"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "image_path": "gone.png" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/get_image/gone.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let output = dir.path().join("gone.png");
        let err = make_client(&server)
            .generate_image("storm", &GenerationParams::default(), &output)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::GenerationService { .. }));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_unreachable_service_is_generation_error() {
        let client = ImageClient::new("http://127.0.0.1:1", Duration::from_secs(2))
            .unwrap()
            .with_retry_policy(RetryPolicy::none());

        let dir = tempdir().unwrap();
        let err = client
            .generate_image("storm", &GenerationParams::default(), &dir.path().join("x.png"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::GenerationService { .. }));
    }

    #[tokio::test]
    async fn test_empty_prompt_is_rejected() {
        let client = ImageClient::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let dir = tempdir().unwrap();

        let err = client
            .generate_image(" ", &GenerationParams::default(), &dir.path().join("x.png"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::GenerationService { .. }));
    }

    #[test]
    fn test_reference_at_accepts_strings_and_numbers() {
        let value = serde_json::json!({ "a": "ref.png", "b": 42, "c": "", "d": null });

        assert_eq!(reference_at(&value, "/a"), Some("ref.png".to_string()));
        assert_eq!(reference_at(&value, "/b"), Some("42".to_string()));
        assert_eq!(reference_at(&value, "/c"), None);
        assert_eq!(reference_at(&value, "/d"), None);
        assert_eq!(reference_at(&value, "/missing"), None);
    }
}
