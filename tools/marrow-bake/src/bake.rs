//! Bake orchestrator (scene source -> finished assets)
//!
//! The skeleton is built first since every other asset references it; clips
//! and meshes then fan out across worker threads, each task owning its own
//! buffers. A malformed clip or mesh only costs that one asset: the failure
//! is logged and its siblings keep going.

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

use marrow_common::{
    content_hash64, encode_bone_payload, encode_index_payload, encode_track_payload,
    encode_vertex_payload, guid64_from_name, normalize_name, Animation, AnimationHeader,
    AssetHeader, AssetType, Mesh, MeshHeader, Skeleton, SkeletonHeader, MARROW_ANIMATION_EXT,
    MARROW_MESH_EXT, MARROW_SKELETON_EXT,
};

use crate::animation::{resample_clip, DEFAULT_FRAME_RATE};
use crate::mesh::process_mesh;
use crate::scene::{SceneClip, SceneMesh, SceneSource};
use crate::skeleton::build_bones;

#[derive(Debug, Clone, Copy)]
pub struct BakeOptions {
    /// Output sampling rate for all clips
    pub frame_rate: f32,
}

impl Default for BakeOptions {
    fn default() -> Self {
        Self {
            frame_rate: DEFAULT_FRAME_RATE,
        }
    }
}

/// Everything baked from one scene source. Asset names are carried
/// alongside for file output.
#[derive(Debug, Clone)]
pub struct BakedScene {
    pub skeleton: Skeleton,
    pub animations: Vec<(String, Animation)>,
    pub meshes: Vec<(String, Mesh)>,
}

/// Bake a whole scene: skeleton, then all clips and meshes against it.
pub fn bake_scene(source: &SceneSource, options: &BakeOptions) -> Result<BakedScene> {
    let bones = build_bones(source)
        .with_context(|| format!("Failed to build skeleton from scene '{}'", source.name))?;
    let skeleton = assemble_skeleton(&source.name, bones);
    tracing::info!(
        "Skeleton '{}': {} bones (guid {:016x})",
        source.name,
        skeleton.bone_count(),
        skeleton.header.asset_guid
    );

    let clip_results: Vec<(&SceneClip, Result<Animation>)> = source
        .clips
        .par_iter()
        .map(|clip| (clip, bake_clip(clip, &skeleton, &source.name, options.frame_rate)))
        .collect();
    let mut animations = Vec::with_capacity(clip_results.len());
    for (clip, result) in clip_results {
        match result {
            Ok(animation) => {
                tracing::info!(
                    "Clip '{}': {} frames x {} tracks at {} fps",
                    clip.name,
                    animation.frame_count(),
                    animation.info.track_count,
                    animation.frame_rate()
                );
                animations.push((clip.name.clone(), animation));
            }
            Err(err) => tracing::warn!("Skipping clip '{}': {:#}", clip.name, err),
        }
    }

    let mesh_results: Vec<(&SceneMesh, Result<Mesh>)> = source
        .meshes
        .par_iter()
        .map(|mesh| (mesh, bake_mesh(mesh, &skeleton, &source.name)))
        .collect();
    let mut meshes = Vec::with_capacity(mesh_results.len());
    for (mesh, result) in mesh_results {
        match result {
            Ok(baked) => {
                tracing::info!(
                    "Mesh '{}': {} vertices, {} triangles",
                    mesh.name,
                    baked.info.num_vertices,
                    baked.triangle_count()
                );
                meshes.push((mesh.name.clone(), baked));
            }
            Err(err) => tracing::warn!("Skipping mesh '{}': {:#}", mesh.name, err),
        }
    }

    Ok(BakedScene {
        skeleton,
        animations,
        meshes,
    })
}

/// Wrap a bone array in a skeleton asset with its header and content hash.
pub fn assemble_skeleton(scene_name: &str, bones: Vec<marrow_common::Bone>) -> Skeleton {
    let payload = encode_bone_payload(&bones);
    let header = AssetHeader::new(
        guid64_from_name(scene_name),
        AssetType::Skeleton as u32,
        (AssetHeader::SIZE + SkeletonHeader::SIZE) as u32,
        payload.len() as u32,
        content_hash64(&payload),
    );
    Skeleton::new(header, bones)
}

/// Resample one clip and wrap it in an animation asset.
pub fn bake_clip(
    clip: &SceneClip,
    skeleton: &Skeleton,
    scene_name: &str,
    frame_rate: f32,
) -> Result<Animation> {
    let resampled = resample_clip(clip, skeleton, frame_rate)?;
    let payload = encode_track_payload(&resampled.tracks);
    let info = AnimationHeader::new(
        skeleton.header.asset_guid,
        resampled.frame_count,
        skeleton.bone_count() as u32,
        resampled.frame_rate,
        resampled.duration,
    );
    let header = AssetHeader::new(
        guid64_from_name(&format!("{}_{}", scene_name, clip.name)),
        AssetType::Animation as u32,
        (AssetHeader::SIZE + AnimationHeader::SIZE) as u32,
        payload.len() as u32,
        content_hash64(&payload),
    );
    Ok(Animation {
        header,
        info,
        tracks: resampled.tracks,
    })
}

/// Process one mesh and wrap it in a mesh asset.
pub fn bake_mesh(mesh: &SceneMesh, skeleton: &Skeleton, scene_name: &str) -> Result<Mesh> {
    let processed = process_mesh(mesh, skeleton)?;
    let vertex_block = encode_vertex_payload(&processed.vertices);
    let index_block = encode_index_payload(&processed.indices);
    let header = AssetHeader::new(
        guid64_from_name(&format!("{}_{}", scene_name, mesh.name)),
        AssetType::Mesh as u32,
        Mesh::PAYLOAD_OFFSET as u32,
        (vertex_block.len() + index_block.len()) as u32,
        marrow_common::combine_hash64(
            content_hash64(&vertex_block),
            content_hash64(&index_block),
        ),
    );
    Ok(Mesh {
        header,
        info: MeshHeader::new(
            processed.vertices.len() as u32,
            processed.indices.len() as u32,
            processed.aabb,
        ),
        skinned: true,
        skeleton_guid: skeleton.header.asset_guid,
        vertices: processed.vertices,
        indices: processed.indices,
    })
}

/// Write every baked asset under `dir`, one file per asset. Returns the
/// paths written.
pub fn write_baked(scene_name: &str, baked: &BakedScene, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {:?}", dir))?;

    let mut written = Vec::new();
    let stem = normalize_name(scene_name);

    let path = dir.join(format!("{}.{}", stem, MARROW_SKELETON_EXT));
    write_asset(&path, &baked.skeleton.encode())?;
    written.push(path);

    for (name, animation) in &baked.animations {
        let path = dir.join(format!("{}_{}.{}", stem, normalize_name(name), MARROW_ANIMATION_EXT));
        write_asset(&path, &animation.encode())?;
        written.push(path);
    }
    for (name, mesh) in &baked.meshes {
        let path = dir.join(format!("{}_{}.{}", stem, normalize_name(name), MARROW_MESH_EXT));
        write_asset(&path, &mesh.encode())?;
        written.push(path);
    }
    Ok(written)
}

fn write_asset(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("Failed to write {:?}", path))?;
    tracing::info!("Wrote {:?} ({} bytes)", path, bytes.len());
    Ok(())
}
