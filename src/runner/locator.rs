//! Discovery of an already-installed external executable.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Install locations checked when no other strategy finds Blender.
pub const WELL_KNOWN_BLENDER_PATHS: &[&str] = &[
    "/opt/homebrew/bin/blender",
    "/usr/local/bin/blender",
    "/snap/bin/blender",
    "/usr/bin/blender",
    "/Applications/Blender.app/Contents/MacOS/Blender",
];

/// One way of finding the executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupStrategy {
    /// A path supplied by the user.
    Explicit(PathBuf),
    /// A path stored in the named environment variable.
    EnvVar(String),
    /// A binary name searched for in `PATH`.
    SearchPath(String),
    /// Fixed install locations, in order.
    WellKnown(Vec<PathBuf>),
}

impl LookupStrategy {
    fn candidates(&self) -> Vec<PathBuf> {
        match self {
            Self::Explicit(path) => vec![path.clone()],
            Self::EnvVar(name) => std::env::var_os(name)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
                .into_iter()
                .collect(),
            Self::SearchPath(binary) => std::env::var_os("PATH")
                .map(|paths| {
                    std::env::split_paths(&paths)
                        .map(|dir| dir.join(binary_file_name(binary)))
                        .collect()
                })
                .unwrap_or_default(),
            Self::WellKnown(paths) => paths.clone(),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Explicit(path) => format!("explicit {}", path.display()),
            Self::EnvVar(name) => format!("${}", name),
            Self::SearchPath(binary) => format!("{} on PATH", binary),
            Self::WellKnown(paths) => paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

fn binary_file_name(binary: &str) -> String {
    if cfg!(windows) && Path::new(binary).extension().is_none() {
        format!("{}.exe", binary)
    } else {
        binary.to_string()
    }
}

/// Ordered list of lookup strategies; the first existing file wins.
#[derive(Debug, Clone)]
pub struct ExecutableLocator {
    strategies: Vec<LookupStrategy>,
}

impl ExecutableLocator {
    pub fn new(strategies: Vec<LookupStrategy>) -> Self {
        Self { strategies }
    }

    /// Explicit override, then `env_var`, then `PATH`, then well-known installs.
    pub fn blender(explicit: Option<PathBuf>, env_var: &str) -> Self {
        let mut strategies = Vec::new();
        if let Some(path) = explicit {
            strategies.push(LookupStrategy::Explicit(path));
        }
        strategies.push(LookupStrategy::EnvVar(env_var.to_string()));
        strategies.push(LookupStrategy::SearchPath("blender".to_string()));
        strategies.push(LookupStrategy::WellKnown(
            WELL_KNOWN_BLENDER_PATHS.iter().map(PathBuf::from).collect(),
        ));
        Self::new(strategies)
    }

    pub fn strategies(&self) -> &[LookupStrategy] {
        &self.strategies
    }

    pub fn locate(&self) -> Result<PathBuf> {
        for strategy in &self.strategies {
            for candidate in strategy.candidates() {
                if candidate.is_file() {
                    debug!("Found executable {} via {:?}", candidate.display(), strategy);
                    return Ok(candidate);
                }
                if matches!(strategy, LookupStrategy::Explicit(_) | LookupStrategy::EnvVar(_)) {
                    warn!("Configured executable {} does not exist", candidate.display());
                }
            }
        }

        let tried = self
            .strategies
            .iter()
            .map(LookupStrategy::describe)
            .collect::<Vec<_>>()
            .join("; ");
        Err(Error::ApplicationNotFound(tried))
    }
}
