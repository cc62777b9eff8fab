//! External 3D application invocation
//!
//! Locates Blender and runs a generated scene script in background mode.

pub mod blender;
pub mod locator;
pub mod mock;

pub use blender::BlenderRunner;
pub use locator::{ExecutableLocator, LookupStrategy, WELL_KNOWN_BLENDER_PATHS};
pub use mock::MockSceneRunner;

use crate::models::ProcessResult;
use crate::Result;
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait SceneRunner: Send + Sync {
    /// Execute `script_path` to completion in the 3D application.
    async fn run(&self, script_path: &Path) -> Result<ProcessResult>;
}
