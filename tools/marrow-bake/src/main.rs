//! marrow-bake - Marrow asset baking tool
//!
//! Converts source scenes (glTF/GLB) to runtime-ready binary assets
//! (.mskel, .manim, .mmesh)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use marrow_bake::scene::gltf::{list_contents, load_scene};
use marrow_bake::{bake, manifest, BakeOptions};
use marrow_common::{Asset, MARROW_ANIMATION_EXT, MARROW_MESH_EXT, MARROW_SKELETON_EXT};

#[derive(Parser)]
#[command(name = "marrow-bake")]
#[command(about = "Marrow asset baking tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build assets from a manifest file
    Build {
        /// Path to assets.toml manifest
        #[arg(default_value = "assets.toml")]
        manifest: PathBuf,

        /// Output directory (overrides manifest)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate manifest without building
    Check {
        /// Path to assets.toml manifest
        #[arg(default_value = "assets.toml")]
        manifest: PathBuf,
    },

    /// Bake a whole scene (skeleton + all clips + all meshes)
    Bake {
        /// Input glTF/GLB file
        input: PathBuf,

        /// Output directory (default: alongside the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Frame rate for clip resampling (default: 30)
        #[arg(short, long)]
        frame_rate: Option<f32>,

        /// List scene contents instead of baking
        #[arg(long)]
        list: bool,
    },

    /// Export only the skeleton from a scene
    Skeleton {
        /// Input glTF/GLB file
        input: PathBuf,

        /// Output .mskel file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export a single animation clip from a scene
    Animation {
        /// Input glTF/GLB file
        input: PathBuf,

        /// Output .manim file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Clip index (default: first clip)
        #[arg(short, long)]
        animation: Option<usize>,

        /// Frame rate for sampling (default: 30)
        #[arg(short, long)]
        frame_rate: Option<f32>,

        /// List available clips instead of exporting
        #[arg(long)]
        list: bool,
    },

    /// Export a single mesh from a scene
    Mesh {
        /// Input glTF/GLB file
        input: PathBuf,

        /// Output .mmesh file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Mesh index (default: first mesh)
        #[arg(short, long)]
        mesh: Option<usize>,

        /// List available meshes instead of exporting
        #[arg(long)]
        list: bool,
    },

    /// Inspect a baked asset file
    Info {
        /// Baked .mskel/.manim/.mmesh file
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build { manifest, output } => {
            tracing::info!("Building assets from {:?}", manifest);
            let config = manifest::load_manifest(&manifest)?;
            manifest::validate(&config)?;
            manifest::build_all(&config, output.as_deref())?;
            tracing::info!("Build complete!");
        }

        Commands::Check { manifest } => {
            tracing::info!("Checking manifest {:?}", manifest);
            let config = manifest::load_manifest(&manifest)?;
            manifest::validate(&config)?;
            tracing::info!("Manifest is valid!");
        }

        Commands::Bake {
            input,
            output,
            frame_rate,
            list,
        } => {
            if list {
                list_contents(&input)?;
            } else {
                let output = output
                    .or_else(|| input.parent().map(PathBuf::from))
                    .unwrap_or_else(|| PathBuf::from("."));
                tracing::info!("Baking {:?} -> {:?}", input, output);

                let source = load_scene(&input)?;
                let options = BakeOptions {
                    frame_rate: frame_rate.unwrap_or(BakeOptions::default().frame_rate),
                };
                let baked = bake::bake_scene(&source, &options)?;
                bake::write_baked(&source.name, &baked, &output)?;
                tracing::info!("Done!");
            }
        }

        Commands::Skeleton { input, output } => {
            let output = output.unwrap_or_else(|| input.with_extension(MARROW_SKELETON_EXT));
            tracing::info!("Exporting skeleton {:?} -> {:?}", input, output);

            let source = load_scene(&input)?;
            let bones = marrow_bake::build_bones(&source)?;
            let skeleton = bake::assemble_skeleton(&source.name, bones);
            std::fs::write(&output, skeleton.encode())
                .with_context(|| format!("Failed to write {:?}", output))?;
            tracing::info!("Exported skeleton: {} bones", skeleton.bone_count());
        }

        Commands::Animation {
            input,
            output,
            animation,
            frame_rate,
            list,
        } => {
            if list {
                list_contents(&input)?;
            } else {
                let output = output.unwrap_or_else(|| input.with_extension(MARROW_ANIMATION_EXT));
                tracing::info!("Exporting animation {:?} -> {:?}", input, output);

                let source = load_scene(&input)?;
                let bones = marrow_bake::build_bones(&source)?;
                let skeleton = bake::assemble_skeleton(&source.name, bones);

                let index = animation.unwrap_or(0);
                let clip = source
                    .clips
                    .get(index)
                    .with_context(|| format!("Clip index {} not found in {:?}", index, input))?;
                let frame_rate =
                    frame_rate.unwrap_or(BakeOptions::default().frame_rate);
                let baked = bake::bake_clip(clip, &skeleton, &source.name, frame_rate)?;
                std::fs::write(&output, baked.encode())
                    .with_context(|| format!("Failed to write {:?}", output))?;
                tracing::info!(
                    "Exported clip '{}': {} frames x {} tracks at {} fps ({:.2}s)",
                    clip.name,
                    baked.frame_count(),
                    baked.info.track_count,
                    baked.frame_rate(),
                    baked.duration()
                );
            }
        }

        Commands::Mesh {
            input,
            output,
            mesh,
            list,
        } => {
            if list {
                list_contents(&input)?;
            } else {
                let output = output.unwrap_or_else(|| input.with_extension(MARROW_MESH_EXT));
                tracing::info!("Exporting mesh {:?} -> {:?}", input, output);

                let source = load_scene(&input)?;
                let bones = marrow_bake::build_bones(&source)?;
                let skeleton = bake::assemble_skeleton(&source.name, bones);

                let index = mesh.unwrap_or(0);
                let source_mesh = source
                    .meshes
                    .get(index)
                    .with_context(|| format!("Mesh index {} not found in {:?}", index, input))?;
                let baked = bake::bake_mesh(source_mesh, &skeleton, &source.name)?;
                std::fs::write(&output, baked.encode())
                    .with_context(|| format!("Failed to write {:?}", output))?;
                tracing::info!(
                    "Exported mesh '{}': {} vertices, {} triangles",
                    source_mesh.name,
                    baked.info.num_vertices,
                    baked.triangle_count()
                );
            }
        }

        Commands::Info { input } => {
            let bytes = std::fs::read(&input)
                .with_context(|| format!("Failed to read {:?}", input))?;
            let asset = Asset::decode(&bytes)
                .with_context(|| format!("Failed to decode {:?}", input))?;
            print_info(&asset);
        }
    }

    Ok(())
}

fn print_info(asset: &Asset) {
    let header = asset.header();
    tracing::info!(
        "{:?} asset, guid {:016x}, version {}",
        asset.asset_type(),
        header.asset_guid,
        header.version
    );
    tracing::info!(
        "header {} bytes, payload {} bytes, content hash {:016x} ({})",
        header.header_size,
        header.data_size,
        header.content_hash,
        if asset.verify_content_hash() {
            "verified"
        } else {
            "MISMATCH"
        }
    );
    match asset {
        Asset::Skeleton(skeleton) => {
            tracing::info!("{} bones:", skeleton.bone_count());
            for (i, bone) in skeleton.bones.iter().enumerate() {
                tracing::info!("  [{}] '{}' parent {}", i, bone.name, bone.parent_index);
            }
        }
        Asset::Animation(animation) => {
            tracing::info!(
                "{} frames x {} tracks at {} fps ({:.2}s), skeleton {:016x}",
                animation.frame_count(),
                animation.info.track_count,
                animation.frame_rate(),
                animation.duration(),
                animation.info.target_skeleton_guid
            );
        }
        Asset::Mesh(mesh) => {
            tracing::info!(
                "{} vertices, {} triangles, skinned: {}, skeleton {:016x}",
                mesh.info.num_vertices,
                mesh.triangle_count(),
                mesh.skinned,
                mesh.skeleton_guid
            );
        }
    }
}
