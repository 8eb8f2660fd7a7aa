//! Hierarchy flattener (scene node tree -> bone array)
//!
//! Two passes over the source tree. The first walks upward requirements:
//! a node is required if any skin weights target it or any descendant is
//! required. The second flattens top-down, emitting a bone for each
//! weighted, non-virtual node in pre-order so a parent index always refers
//! to an earlier entry. Unweighted nodes (helpers, group nodes, armature
//! roots) are not emitted: their local transforms fold into the next kept
//! bone's bind pose, and subtrees with no required node at all are skipped.
//!
//! FBX importers inject helper nodes (pre-rotation, pivots) tagged with a
//! marker substring; those never become bones, but their transforms still
//! participate in the fold.

use anyhow::{bail, Result};
use glam::Mat4;
use hashbrown::{HashMap, HashSet};
use marrow_common::{normalize_name, Bone, Transform, MAX_BONES};

use crate::scene::{SceneMesh, SceneNode, SceneSource};

/// Substring marking importer-generated helper nodes.
pub const VIRTUAL_NODE_MARKER: &str = "_$AssimpFbx$_";

/// Flatten the source hierarchy into an ordered bone array.
///
/// A scene with no weighted nodes at all is a hard import failure; there is
/// nothing a skeletal pipeline can do with it.
pub fn build_bones(source: &SceneSource) -> Result<Vec<Bone>> {
    let weighted = weighted_bone_names(&source.meshes);
    let required = mark_required(&source.root, &weighted);

    let bind_matrices = collect_bind_matrices(&source.meshes);

    let mut bones = Vec::new();
    flatten(
        &source.root,
        &required,
        -1,
        Mat4::IDENTITY,
        &weighted,
        &bind_matrices,
        &mut bones,
    )?;

    if bones.is_empty() {
        bail!("No bones found in scene '{}'", source.name);
    }
    Ok(bones)
}

/// Normalized names of every node that receives skin weights.
fn weighted_bone_names(meshes: &[SceneMesh]) -> HashSet<String> {
    let mut names = HashSet::new();
    for mesh in meshes {
        for binding in &mesh.bindings {
            if binding.weights.iter().any(|&(_, w)| w != 0.0) {
                names.insert(normalize_name(&binding.bone_name));
            }
        }
    }
    names
}

/// Inverse bind matrix per weighted node. First binding wins when several
/// meshes bind the same bone.
fn collect_bind_matrices(meshes: &[SceneMesh]) -> HashMap<String, Mat4> {
    let mut matrices = HashMap::new();
    for mesh in meshes {
        for binding in &mesh.bindings {
            matrices
                .entry(normalize_name(&binding.bone_name))
                .or_insert(binding.inverse_bind_matrix);
        }
    }
    matrices
}

/// Per-node requirement marks, shaped like the source tree. Keyed by
/// position rather than name so same-named nodes in different subtrees
/// never share status.
struct Requirement {
    required: bool,
    children: Vec<Requirement>,
}

/// Upward pass: a node is required if it is weighted or any descendant is.
/// Runs to completion before any flattening happens.
fn mark_required(node: &SceneNode, weighted: &HashSet<String>) -> Requirement {
    let children: Vec<Requirement> = node
        .children
        .iter()
        .map(|child| mark_required(child, weighted))
        .collect();
    let required = weighted.contains(&normalize_name(&node.name))
        || children.iter().any(|c| c.required);
    Requirement { required, children }
}

fn flatten(
    node: &SceneNode,
    requirement: &Requirement,
    parent: i32,
    accumulated: Mat4,
    weighted: &HashSet<String>,
    bind_matrices: &HashMap<String, Mat4>,
    bones: &mut Vec<Bone>,
) -> Result<()> {
    // A subtree that contains no weighted node contributes nothing.
    if !requirement.required {
        return Ok(());
    }
    let normalized = normalize_name(&node.name);
    let is_virtual = node.name.contains(VIRTUAL_NODE_MARKER);
    let total = accumulated * node.local_transform;

    let (child_parent, child_accumulated) = if !is_virtual && weighted.contains(&normalized) {
        if bones.len() >= MAX_BONES {
            bail!("Skeleton exceeds the {} bone limit", MAX_BONES);
        }
        let index = bones.len() as i32;
        bones.push(Bone {
            name: normalized.clone(),
            parent_index: parent,
            inverse_bind_matrix: bind_matrices
                .get(&normalized)
                .copied()
                .unwrap_or(Mat4::IDENTITY),
            local_bind_pose: Transform::from_matrix(&total),
        });
        (index, Mat4::IDENTITY)
    } else {
        (parent, total)
    };

    for (child, child_requirement) in node.children.iter().zip(&requirement.children) {
        flatten(
            child,
            child_requirement,
            child_parent,
            child_accumulated,
            weighted,
            bind_matrices,
            bones,
        )?;
    }
    Ok(())
}
