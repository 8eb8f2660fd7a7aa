//! Shared types and utilities for the Marrow asset pipeline
//!
//! This crate provides everything shared between:
//! - `marrow-bake` (offline bake tool)
//! - runtime loaders that consume baked `.mskel`/`.manim`/`.mmesh` files
//!
//! # Modules
//!
//! - [`formats`] - Versioned binary asset formats (skeleton, animation, mesh)
//! - [`hash`] - 64-bit content hashing and name-derived GUIDs
//! - [`names`] - Bone/node name normalization
//! - [`transform`] - TRS transform and AABB math

pub mod formats;
pub mod hash;
pub mod names;
pub mod transform;

// Re-export commonly used format items
pub use formats::{
    encode_bone_payload, encode_index_payload, encode_track_payload, encode_vertex_payload,
    Animation, AnimationHeader, Asset, AssetHeader, AssetType, Bone, FormatError, Mesh,
    MeshHeader, Skeleton, SkeletonHeader, SkinVertex, FLAG_FIXED_BONE_NAMES,
    MARROW_ANIMATION_EXT, MARROW_MAGIC, MARROW_MESH_EXT, MARROW_SKELETON_EXT, MARROW_VERSION,
    MAX_BONES, MAX_BONE_INFLUENCES, MAX_BONE_NAME_LEN,
};

pub use hash::{combine_hash64, content_hash64, guid64_from_name};
pub use names::normalize_name;
pub use transform::{Aabb, Transform};
