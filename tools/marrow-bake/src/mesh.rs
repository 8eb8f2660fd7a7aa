//! Skin processor (raw mesh + skeleton -> GPU-ready skinned vertices)
//!
//! Importers deliver weights per bone; the GPU wants them per vertex with a
//! fixed influence budget. This stage transposes the weight lists, truncates
//! to the strongest influences, renormalizes so every skinned vertex sums to
//! exactly 1.0, and accumulates the mesh bounds along the way.

use anyhow::{bail, Result};
use glam::{Vec2, Vec3};
use marrow_common::{normalize_name, Aabb, Skeleton, SkinVertex, MAX_BONE_INFLUENCES};
use smallvec::SmallVec;

use crate::scene::SceneMesh;

#[derive(Debug, Clone, Copy)]
struct BoneInfluence {
    index: u32,
    weight: f32,
}

type InfluenceList = SmallVec<[BoneInfluence; MAX_BONE_INFLUENCES]>;

/// Processed mesh data, not yet wrapped in an asset.
#[derive(Debug, Clone)]
pub struct ProcessedMesh {
    pub vertices: Vec<SkinVertex>,
    pub indices: Vec<u32>,
    pub aabb: Aabb,
}

/// Process one mesh against a skeleton.
///
/// A mesh without positions or without any skin bindings is malformed and
/// fails here; sibling meshes are unaffected. A binding that names a bone
/// the skeleton does not have is only logged, its weights dropped. A vertex
/// that ends up with no influences is a valid unskinned vertex (all slots
/// zero), not an error.
pub fn process_mesh(mesh: &SceneMesh, skeleton: &Skeleton) -> Result<ProcessedMesh> {
    if mesh.positions.is_empty() {
        bail!("Mesh '{}' has no positions", mesh.name);
    }
    if mesh.bindings.is_empty() {
        bail!("Mesh '{}' has no skin bindings", mesh.name);
    }
    if mesh.indices.len() % 3 != 0 {
        bail!(
            "Mesh '{}' has {} indices, not a triangle list",
            mesh.name,
            mesh.indices.len()
        );
    }

    let vertex_count = mesh.positions.len();
    let mut influences: Vec<InfluenceList> = vec![SmallVec::new(); vertex_count];
    for binding in &mesh.bindings {
        let normalized = normalize_name(&binding.bone_name);
        let Some(bone_index) = skeleton.bone_index(&normalized) else {
            tracing::warn!(
                "Mesh '{}' binds unknown bone '{}', dropping its weights",
                mesh.name,
                binding.bone_name
            );
            continue;
        };
        for &(vertex, weight) in &binding.weights {
            if weight == 0.0 {
                continue;
            }
            let Some(list) = influences.get_mut(vertex as usize) else {
                bail!(
                    "Mesh '{}': bone '{}' weights vertex {} out of range",
                    mesh.name,
                    binding.bone_name,
                    vertex
                );
            };
            list.push(BoneInfluence {
                index: bone_index as u32,
                weight,
            });
        }
    }

    let mut aabb = Aabb::EMPTY;
    let mut vertices = Vec::with_capacity(vertex_count);
    for (i, &position) in mesh.positions.iter().enumerate() {
        aabb.grow(position);

        resolve_influences(&mut influences[i], MAX_BONE_INFLUENCES);

        let mut vertex = SkinVertex {
            position: position.to_array(),
            normal: attr3(&mesh.normals, i),
            tangent: attr3(&mesh.tangents, i),
            uv: attr2(&mesh.uvs, i),
            ..SkinVertex::default()
        };
        for (slot, influence) in influences[i].iter().enumerate() {
            vertex.bone_indices[slot] = influence.index;
            vertex.bone_weights[slot] = influence.weight;
        }
        vertices.push(vertex);
    }

    Ok(ProcessedMesh {
        vertices,
        indices: mesh.indices.clone(),
        aabb,
    })
}

/// Stable descending sort by weight, truncate to the strongest `limit`
/// influences, renormalize the survivors to sum to exactly 1.0. A zero sum
/// leaves the list as-is (unskinned vertex).
fn resolve_influences(influences: &mut InfluenceList, limit: usize) {
    influences.sort_by(|a, b| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(core::cmp::Ordering::Equal)
    });
    influences.truncate(limit);
    let sum: f32 = influences.iter().map(|i| i.weight).sum();
    if sum > 0.0 {
        for influence in influences.iter_mut() {
            influence.weight /= sum;
        }
    }
}

fn attr3(values: &[Vec3], i: usize) -> [f32; 3] {
    values.get(i).copied().unwrap_or(Vec3::ZERO).to_array()
}

fn attr2(values: &[Vec2], i: usize) -> [f32; 2] {
    values.get(i).copied().unwrap_or(Vec2::ZERO).to_array()
}
