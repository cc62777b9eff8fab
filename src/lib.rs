//! Alert-to-asset pipeline
//!
//! Extracts keywords from a short alert, asks an image-synthesis service for a
//! matching texture, and has Blender build a textured object from it.

pub mod app;
pub mod embedding;
pub mod error;
pub mod image;
pub mod keywords;
pub mod models;
pub mod retry;
pub mod runner;
pub mod scene;
pub mod semantic;
pub mod templates;

pub use error::{Error, Result};
