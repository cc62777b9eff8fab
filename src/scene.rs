//! Blender scene script generation
//!
//! Renders a fixed procedure: clear the scene, add one cube, create one
//! node-based material whose base colour comes from the generated image, and
//! attach it to the cube. Nothing is executed here.

use crate::{templates, Error, Result};
use std::path::{Path, PathBuf};
use tracing::info;

pub struct SceneScriptGenerator {
    template: String,
}

impl SceneScriptGenerator {
    pub fn new() -> Self {
        Self::with_template(templates::BLENDER_SCENE)
    }

    pub fn with_template(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Script text with `image_path` embedded as an absolute path literal.
    pub fn render(&self, image_path: &Path) -> Result<String> {
        let absolute = std::path::absolute(image_path)?;
        let path_str = absolute.to_str().ok_or_else(|| {
            Error::Invariant(format!(
                "Image path is not valid UTF-8: {}",
                absolute.display()
            ))
        })?;
        // JSON string escaping is also a valid Python string literal.
        let literal = serde_json::to_string(path_str)?;

        if let Some(placeholder) = templates::unknown_placeholder(&self.template, &["image_path"]) {
            return Err(Error::Invariant(format!(
                "Scene template has unresolved placeholder {}",
                placeholder
            )));
        }
        Ok(templates::render(&self.template, &[("image_path", &literal)]))
    }

    /// Write the rendered script to `output_script_path`, returning its absolute path.
    pub fn build_script(&self, image_path: &Path, output_script_path: &Path) -> Result<PathBuf> {
        let script = self.render(image_path)?;

        std::fs::write(output_script_path, script).map_err(|source| Error::ScriptWrite {
            path: output_script_path.to_path_buf(),
            source,
        })?;

        let absolute = std::path::absolute(output_script_path)?;
        info!("Wrote scene script to {}", absolute.display());
        Ok(absolute)
    }
}

impl Default for SceneScriptGenerator {
    fn default() -> Self {
        Self::new()
    }
}
