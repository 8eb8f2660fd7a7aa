//! Manifest parsing and batch build orchestration
//!
//! Parses assets.toml and bakes every listed scene.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::bake::{bake_scene, write_baked, BakeOptions};
use crate::scene::gltf::load_scene;

/// Root manifest structure
#[derive(Debug, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub scenes: HashMap<String, SceneEntry>,
}

#[derive(Debug, Deserialize, Default)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("assets/")
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SceneEntry {
    Simple(PathBuf),
    Detailed {
        path: PathBuf,
        #[serde(default)]
        frame_rate: Option<f32>,
    },
}

impl SceneEntry {
    pub fn path(&self) -> &Path {
        match self {
            SceneEntry::Simple(p) => p,
            SceneEntry::Detailed { path, .. } => path,
        }
    }

    pub fn frame_rate(&self) -> Option<f32> {
        match self {
            SceneEntry::Simple(_) => None,
            SceneEntry::Detailed { frame_rate, .. } => *frame_rate,
        }
    }
}

/// Load and parse a manifest file
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {:?}", path))?;
    let manifest: Manifest = toml::from_str(&content)
        .with_context(|| format!("Failed to parse manifest: {:?}", path))?;
    Ok(manifest)
}

/// Validate a manifest without building
pub fn validate(manifest: &Manifest) -> Result<()> {
    for (name, entry) in &manifest.scenes {
        if !entry.path().exists() {
            anyhow::bail!("Scene '{}' source not found: {:?}", name, entry.path());
        }
        if let Some(rate) = entry.frame_rate() {
            if !rate.is_finite() || rate <= 0.0 {
                anyhow::bail!("Scene '{}' has invalid frame rate {}", name, rate);
            }
        }
    }
    Ok(())
}

/// Bake all scenes from a manifest
pub fn build_all(manifest: &Manifest, output_override: Option<&Path>) -> Result<()> {
    let output_dir = output_override.unwrap_or(&manifest.output.dir);

    for (name, entry) in &manifest.scenes {
        tracing::info!("Baking scene: {} <- {:?}", name, entry.path());
        let mut source = load_scene(entry.path())?;
        // The manifest key names the scene so GUIDs stay stable if the
        // source file is moved or renamed.
        source.name = name.clone();

        let options = BakeOptions {
            frame_rate: entry.frame_rate().unwrap_or(BakeOptions::default().frame_rate),
        };
        let baked = bake_scene(&source, &options)?;
        write_baked(name, &baked, output_dir)?;
    }
    Ok(())
}
