use anyhow::Result;
use asset_forge::app::{Pipeline, DEFAULT_ALERT_TEXT};
use asset_forge::models::Config;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "asset-forge")]
#[command(about = "Turn a short alert into a textured Blender asset")]
struct CliArgs {
    /// Alert text to extract keywords from.
    #[arg(value_name = "TEXT", default_value = DEFAULT_ALERT_TEXT)]
    text: String,

    /// Number of keywords used in the prompt.
    #[arg(long, value_parser = parse_top_n)]
    top_n: Option<usize>,

    /// Directory for generated files.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Path for the downloaded texture (defaults to <output-dir>/generated_texture.png).
    #[arg(long)]
    image_out: Option<PathBuf>,

    /// Path for the scene script (defaults to <output-dir>/blender_script.py).
    #[arg(long)]
    script_out: Option<PathBuf>,

    /// Blender executable, checked before any other location.
    #[arg(long)]
    blender: Option<PathBuf>,

    /// Image-generation service base URL.
    #[arg(long)]
    endpoint: Option<String>,
}

impl CliArgs {
    /// Apply command-line overrides on top of environment configuration.
    fn apply(&self, config: &mut Config) {
        if let Some(top_n) = self.top_n {
            config.top_n = top_n;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(path) = &self.image_out {
            config.image_path = Some(path.clone());
        }
        if let Some(path) = &self.script_out {
            config.script_path = Some(path.clone());
        }
        if let Some(path) = &self.blender {
            config.blender_path = Some(path.clone());
        }
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
    }
}

fn parse_top_n(input: &str) -> std::result::Result<usize, String> {
    match input.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(format!(
            "Invalid top-n '{}'. Expected a positive integer",
            input
        )),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "asset_forge=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting asset-forge");

    let args = CliArgs::parse();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    args.apply(&mut config);

    let pipeline = match Pipeline::new(config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("Failed to initialize pipeline: {}", e);
            std::process::exit(1);
        }
    };

    tokio::select! {
        result = pipeline.run(&args.text) => match result {
            Ok(summary) => {
                info!(
                    "Pipeline completed successfully: {}",
                    summary.script_path.display()
                );
                Ok(())
            }
            Err(e) => {
                error!("Pipeline failed: {}", e);
                std::process::exit(1);
            }
        },
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, abandoning pipeline run");
            std::process::exit(130);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_top_n_valid() {
        assert_eq!(parse_top_n("5").unwrap(), 5);
    }

    #[test]
    fn test_parse_top_n_rejects_zero_and_garbage() {
        assert!(parse_top_n("0").unwrap_err().contains("positive integer"));
        assert!(parse_top_n("many").is_err());
    }

    #[test]
    fn test_default_text_is_original_alert() {
        let args = CliArgs::parse_from(["asset-forge"]);
        assert_eq!(args.text, DEFAULT_ALERT_TEXT);
    }

    #[test]
    fn test_cli_overrides_config() {
        let args = CliArgs::parse_from([
            "asset-forge",
            "Flood warning",
            "--top-n",
            "3",
            "--image-out",
            "/tmp/tex.png",
            "--blender",
            "/opt/blender/blender",
        ]);
        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(args.text, "Flood warning");
        assert_eq!(config.top_n, 3);
        assert_eq!(config.image_output_path(), PathBuf::from("/tmp/tex.png"));
        assert_eq!(config.blender_path, Some(PathBuf::from("/opt/blender/blender")));
    }
}
