//! Pipeline orchestration: alert text to textured Blender asset.

use crate::embedding;
use crate::image::{ImageClient, ImageGenerationService};
use crate::keywords::KeywordExtractor;
use crate::models::{Config, RunSummary};
use crate::runner::{BlenderRunner, SceneRunner};
use crate::scene::SceneScriptGenerator;
use crate::Result;
use chrono::Utc;
use std::fs;
use tracing::{info, warn};
use uuid::Uuid;

/// Alert used when no input text is given.
pub const DEFAULT_ALERT_TEXT: &str = "지진 발생, 안전한 곳으로 대피하세요.";

/// Appended to the keywords to form the image prompt.
pub const STYLE_SUFFIX: &str = "in a realistic style";

/// Join keywords with single spaces and append [`STYLE_SUFFIX`].
pub fn build_prompt(keywords: &[String]) -> String {
    keywords
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(STYLE_SUFFIX))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs the four stages in order; any stage error ends the run.
pub struct Pipeline {
    extractor: KeywordExtractor,
    image_gen: Box<dyn ImageGenerationService>,
    scene: SceneScriptGenerator,
    runner: Box<dyn SceneRunner>,
    config: Config,
}

/// Injectable stage bundle used to construct [`Pipeline`] in tests/harnesses.
pub struct PipelineServices {
    pub extractor: KeywordExtractor,
    pub image_gen: Box<dyn ImageGenerationService>,
    pub scene: SceneScriptGenerator,
    pub runner: Box<dyn SceneRunner>,
}

impl Pipeline {
    /// Build a pipeline from concrete stage implementations.
    pub fn with_services(services: PipelineServices, config: Config) -> Self {
        Self {
            extractor: services.extractor,
            image_gen: services.image_gen,
            scene: services.scene,
            runner: services.runner,
            config,
        }
    }

    /// Build the real stages from configuration and create the output directory.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        fs::create_dir_all(&config.output_dir)?;
        info!("Using output directory: {}", config.output_dir.display());

        let extractor = KeywordExtractor::new(embedding::build_embedder(&config)?);
        let image_gen = Box::new(ImageClient::from_config(&config)?);
        let runner = Box::new(BlenderRunner::from_config(&config));

        Ok(Self::with_services(
            PipelineServices {
                extractor,
                image_gen,
                scene: SceneScriptGenerator::new(),
                runner,
            },
            config,
        ))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run every stage for `text` and record the outcome.
    pub async fn run(&self, text: &str) -> Result<RunSummary> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!("Starting pipeline run {}", run_id);

        let keywords = self.extractor.extract(text, self.config.top_n).await?;
        if keywords.is_empty() {
            warn!("No keywords extracted; prompt will contain only the style suffix");
        }
        info!("Extracted keywords: {:?}", keywords);

        let prompt = build_prompt(&keywords);
        info!("Prompt: {}", prompt);

        let image_path = self
            .image_gen
            .generate_image(
                &prompt,
                &self.config.generation,
                &self.config.image_output_path(),
            )
            .await?;
        info!("Generated texture at {}", image_path.display());

        let script_path = self
            .scene
            .build_script(&image_path, &self.config.script_output_path())?;

        let process = self.runner.run(&script_path).await?;

        let summary = RunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            input_text: text.to_string(),
            keywords,
            prompt,
            image_path,
            script_path,
            executable: process.executable,
        };

        let summary_path = self.config.summary_path();
        fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;
        info!("Saved run summary at {}", summary_path.display());

        Ok(summary)
    }
}
