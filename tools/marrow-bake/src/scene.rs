//! Read-only scene source model
//!
//! The baking stages consume this data model and nothing else; whatever
//! loaded the scene (the bundled glTF front end, a test fixture) is out of
//! the picture once a [`SceneSource`] exists. Names are kept raw here;
//! normalization happens at the matching points in the pipeline.

use glam::{Mat4, Quat, Vec2, Vec3};

pub mod gltf;

/// An imported scene: node hierarchy, skinned meshes, animation clips.
#[derive(Debug, Clone)]
pub struct SceneSource {
    /// Source name, used to derive asset GUIDs
    pub name: String,
    pub root: SceneNode,
    pub meshes: Vec<SceneMesh>,
    pub clips: Vec<SceneClip>,
}

/// One node of the source hierarchy.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    /// Transform relative to the parent node
    pub local_transform: Mat4,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, local_transform: Mat4) -> Self {
        Self {
            name: name.into(),
            local_transform,
            children: Vec::new(),
        }
    }
}

/// Raw mesh data with per-bone weight lists, as importers deliver it.
#[derive(Debug, Clone)]
pub struct SceneMesh {
    pub name: String,
    pub positions: Vec<Vec3>,
    /// Empty or one entry per position
    pub normals: Vec<Vec3>,
    /// Empty or one entry per position
    pub tangents: Vec<Vec3>,
    /// Empty or one entry per position
    pub uvs: Vec<Vec2>,
    /// Triangle list, stride 3
    pub indices: Vec<u32>,
    pub bindings: Vec<SkinBinding>,
}

/// One bone's contribution to a mesh: bind matrix plus sparse weights.
#[derive(Debug, Clone)]
pub struct SkinBinding {
    pub bone_name: String,
    pub inverse_bind_matrix: Mat4,
    /// (vertex index, weight) pairs, unsorted, zero weights allowed
    pub weights: Vec<(u32, f32)>,
}

/// One animation clip in source time units (ticks).
#[derive(Debug, Clone)]
pub struct SceneClip {
    pub name: String,
    pub duration_ticks: f32,
    /// 0 means the source did not say; the resampler substitutes a default
    pub ticks_per_second: f32,
    pub channels: Vec<SceneChannel>,
}

/// Keyframes for a single target node. Any key list may be empty.
#[derive(Debug, Clone, Default)]
pub struct SceneChannel {
    /// Raw target node name, matched against bones after normalization
    pub target: String,
    pub position_keys: Vec<Vec3Key>,
    pub rotation_keys: Vec<QuatKey>,
    pub scale_keys: Vec<Vec3Key>,
}

impl SceneChannel {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }
}

/// Timestamped vector key (time in ticks).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3Key {
    pub time: f32,
    pub value: Vec3,
}

/// Timestamped rotation key (time in ticks).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuatKey {
    pub time: f32,
    pub value: Quat,
}
