//! Data models and configuration
//!
//! Values handed from one pipeline stage to the next, the wire payload sent
//! to the image-generation service, and the run configuration.

use crate::retry::RetryPolicy;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

pub const DEFAULT_IMAGE_FILE: &str = "generated_texture.png";
pub const DEFAULT_SCRIPT_FILE: &str = "blender_script.py";
pub const SUMMARY_FILE: &str = "pipeline_run.json";

/// A candidate phrase and its relevance to the whole input text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredKeyword {
    pub phrase: String,
    pub score: f32,
}

/// Fixed generation parameters sent with every prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub cfg_scale: f64,
    pub sampler_name: String,
    /// `-1` lets the service choose the seed.
    pub seed: i64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
            steps: 20,
            cfg_scale: 7.5,
            sampler_name: "Euler a".to_string(),
            seed: -1,
        }
    }
}

/// Request body for `POST {endpoint}/prompt`.
#[derive(Debug, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub cfg_scale: f64,
    pub sampler_name: String,
    pub seed: i64,
}

impl GenerationRequest {
    pub fn new(prompt: &str, params: &GenerationParams) -> Self {
        Self {
            prompt: prompt.to_string(),
            width: params.width,
            height: params.height,
            steps: params.steps,
            cfg_scale: params.cfg_scale,
            sampler_name: params.sampler_name.clone(),
            seed: params.seed,
        }
    }
}

/// Outcome of a successful 3D application run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    pub executable: PathBuf,
    pub exit_code: i32,
}

/// Record of one completed pipeline run, saved next to the generated script.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub input_text: String,
    pub keywords: Vec<String>,
    pub prompt: String,
    pub image_path: PathBuf,
    pub script_path: PathBuf,
    pub executable: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProvider {
    /// Local feature-hashing model, no network access.
    Hashing,
    OpenAi,
}

impl FromStr for EmbeddingProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hashing" | "local" => Ok(Self::Hashing),
            "openai" => Ok(Self::OpenAi),
            other => Err(Error::Config(format!(
                "Unknown embedding provider '{}'. Expected 'hashing' or 'openai'",
                other
            ))),
        }
    }
}

/// How the image service announces results: where the image reference lives
/// in a response and, for queued jobs, where to poll.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceProtocol {
    /// JSON pointer to the image reference in the submit response.
    pub image_ref_pointer: String,
    /// JSON pointer to a job id, used when the submit response has no image yet.
    pub job_id_pointer: String,
    /// Path polled as `{status_path}/{job_id}`.
    pub status_path: String,
    /// JSON pointer to the image reference in a status response.
    /// `{{job_id}}` is replaced with the job id.
    pub status_ref_pointer: String,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
}

impl Default for ServiceProtocol {
    fn default() -> Self {
        Self {
            image_ref_pointer: "/image_path".to_string(),
            job_id_pointer: "/prompt_id".to_string(),
            status_path: "/history".to_string(),
            status_ref_pointer: "/image_path".to_string(),
            poll_interval: Duration::from_secs(1),
            poll_timeout: Duration::from_secs(300),
        }
    }
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: String,
    pub top_n: usize,
    pub output_dir: PathBuf,
    pub image_path: Option<PathBuf>,
    pub script_path: Option<PathBuf>,
    pub generation: GenerationParams,
    pub protocol: ServiceProtocol,
    pub http_timeout: Duration,
    pub retry: RetryPolicy,
    pub embedding_provider: EmbeddingProvider,
    pub embedding_model: String,
    pub openai_api_key: Option<String>,
    pub blender_path: Option<PathBuf>,
    pub blender_env_var: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8188".to_string(),
            top_n: 5,
            output_dir: PathBuf::from("."),
            image_path: None,
            script_path: None,
            generation: GenerationParams::default(),
            protocol: ServiceProtocol::default(),
            http_timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
            embedding_provider: EmbeddingProvider::Hashing,
            embedding_model: "text-embedding-3-small".to_string(),
            openai_api_key: None,
            blender_path: None,
            blender_env_var: "BLENDER_EXECUTABLE".to_string(),
        }
    }
}

impl Config {
    /// Load `.env` (if present) and read configuration from the environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup; unset keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let protocol = ServiceProtocol {
            image_ref_pointer: get("ASSET_FORGE_IMAGE_REF_POINTER")
                .unwrap_or(defaults.protocol.image_ref_pointer),
            job_id_pointer: get("ASSET_FORGE_JOB_ID_POINTER")
                .unwrap_or(defaults.protocol.job_id_pointer),
            status_path: get("ASSET_FORGE_STATUS_PATH").unwrap_or(defaults.protocol.status_path),
            status_ref_pointer: get("ASSET_FORGE_STATUS_REF_POINTER")
                .unwrap_or(defaults.protocol.status_ref_pointer),
            poll_interval: parse_var(&get, "ASSET_FORGE_POLL_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.protocol.poll_interval),
            poll_timeout: parse_var(&get, "ASSET_FORGE_POLL_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.protocol.poll_timeout),
        };

        let retry = RetryPolicy {
            max_attempts: parse_var(&get, "ASSET_FORGE_RETRY_ATTEMPTS")?
                .unwrap_or(defaults.retry.max_attempts),
            base_delay: parse_var(&get, "ASSET_FORGE_RETRY_BASE_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry.base_delay),
            max_delay: parse_var(&get, "ASSET_FORGE_RETRY_MAX_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry.max_delay),
        };

        let config = Self {
            endpoint: get("ASSET_FORGE_ENDPOINT").unwrap_or(defaults.endpoint),
            top_n: parse_var(&get, "ASSET_FORGE_TOP_N")?.unwrap_or(defaults.top_n),
            output_dir: get("ASSET_FORGE_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            image_path: None,
            script_path: None,
            generation: defaults.generation,
            protocol,
            http_timeout: parse_var(&get, "ASSET_FORGE_HTTP_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
            retry,
            embedding_provider: parse_var(&get, "EMBEDDING_PROVIDER")?
                .unwrap_or(defaults.embedding_provider),
            embedding_model: get("EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            openai_api_key: get("OPENAI_API_KEY"),
            blender_path: get("BLENDER_PATH").map(PathBuf::from),
            blender_env_var: defaults.blender_env_var,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_n == 0 {
            return Err(Error::Config("top_n must be at least 1".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config(
                "ASSET_FORGE_RETRY_ATTEMPTS must be at least 1".to_string(),
            ));
        }
        for (name, pointer) in [
            ("image reference pointer", &self.protocol.image_ref_pointer),
            ("job id pointer", &self.protocol.job_id_pointer),
            ("status reference pointer", &self.protocol.status_ref_pointer),
        ] {
            if !pointer.starts_with('/') {
                return Err(Error::Config(format!(
                    "{} '{}' must be a JSON pointer starting with '/'",
                    name, pointer
                )));
            }
        }
        Ok(())
    }

    pub fn image_output_path(&self) -> PathBuf {
        self.image_path
            .clone()
            .unwrap_or_else(|| self.output_dir.join(DEFAULT_IMAGE_FILE))
    }

    pub fn script_output_path(&self) -> PathBuf {
        self.script_path
            .clone()
            .unwrap_or_else(|| self.output_dir.join(DEFAULT_SCRIPT_FILE))
    }

    /// Run summary location, in the same directory as the scene script.
    pub fn summary_path(&self) -> PathBuf {
        self.script_output_path().with_file_name(SUMMARY_FILE)
    }
}

fn parse_var<T, G>(get: &G, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Invalid value '{}' for {}: {}", raw, key, e)))
        })
        .transpose()
}
