//! Scripted 3D application runner for tests.

use super::SceneRunner;
use crate::models::ProcessResult;
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Scene runner double that records the scripts it was asked to run.
#[derive(Clone)]
pub struct MockSceneRunner {
    scripts: Arc<Mutex<Vec<PathBuf>>>,
    exit_code: Arc<Mutex<i32>>,
    executable: PathBuf,
}

impl MockSceneRunner {
    pub fn new() -> Self {
        Self {
            scripts: Arc::new(Mutex::new(Vec::new())),
            exit_code: Arc::new(Mutex::new(0)),
            executable: PathBuf::from("/mock/bin/blender"),
        }
    }

    pub fn with_exit_code(self, code: i32) -> Self {
        *self.exit_code.lock().unwrap() = code;
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.scripts.lock().unwrap().len()
    }

    pub fn scripts(&self) -> Vec<PathBuf> {
        self.scripts.lock().unwrap().clone()
    }
}

impl Default for MockSceneRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SceneRunner for MockSceneRunner {
    async fn run(&self, script_path: &Path) -> Result<ProcessResult> {
        self.scripts.lock().unwrap().push(script_path.to_path_buf());

        let code = *self.exit_code.lock().unwrap();
        if code != 0 {
            return Err(Error::Execution {
                status: format!("exit status: {}", code),
                code: Some(code),
            });
        }

        Ok(ProcessResult {
            executable: self.executable.clone(),
            exit_code: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_scripts() {
        let runner = MockSceneRunner::new();

        runner.run(Path::new("/tmp/a.py")).await.unwrap();

        assert_eq!(runner.scripts(), vec![PathBuf::from("/tmp/a.py")]);
    }

    #[tokio::test]
    async fn test_mock_non_zero_exit() {
        let runner = MockSceneRunner::new().with_exit_code(2);

        let err = runner.run(Path::new("/tmp/a.py")).await.unwrap_err();
        assert!(matches!(err, Error::Execution { code: Some(2), .. }));
        assert_eq!(runner.get_call_count(), 1);
    }
}
