//! Blender subprocess invocation.

use super::{ExecutableLocator, SceneRunner};
use crate::models::{Config, ProcessResult};
use crate::retry::{retry_transient, RetryPolicy};
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::info;

/// Runs scripts as `<blender> --background --python <script>`.
///
/// Output is not captured; the child inherits stdio. Only the exit status is
/// inspected.
pub struct BlenderRunner {
    locator: ExecutableLocator,
    retry: RetryPolicy,
}

impl BlenderRunner {
    pub fn new(locator: ExecutableLocator) -> Self {
        Self {
            locator,
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(ExecutableLocator::blender(
            config.blender_path.clone(),
            &config.blender_env_var,
        ))
        .with_retry_policy(config.retry)
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn invoke(&self, executable: &Path, script_path: &Path) -> Result<ProcessResult> {
        let status = Command::new(executable)
            .arg("--background")
            .arg("--python")
            .arg(script_path)
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| Error::Execution {
                status: format!("failed to start {}: {}", executable.display(), e),
                code: None,
            })?;

        match status.code() {
            Some(0) => Ok(ProcessResult {
                executable: executable.to_path_buf(),
                exit_code: 0,
            }),
            code => Err(Error::Execution {
                status: status.to_string(),
                code,
            }),
        }
    }
}

#[async_trait]
impl SceneRunner for BlenderRunner {
    async fn run(&self, script_path: &Path) -> Result<ProcessResult> {
        let executable = self.locator.locate()?;
        info!(
            "Running {} --background --python {}",
            executable.display(),
            script_path.display()
        );

        let executable = executable.as_path();
        let result = retry_transient(&self.retry, "blender", move || {
            self.invoke(executable, script_path)
        })
        .await?;

        info!("Blender finished successfully");
        Ok(result)
    }
}
