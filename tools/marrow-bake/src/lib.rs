//! marrow-bake library
//!
//! Offline baking pipeline: imports a source scene (glTF), flattens its
//! node hierarchy into a skeleton, resamples animation clips to fixed-rate
//! transform tracks, processes skin weights into GPU-ready vertices, and
//! writes everything as hashed Marrow asset files.

pub mod animation;
pub mod bake;
pub mod manifest;
pub mod mesh;
pub mod scene;
pub mod skeleton;

pub use animation::{resample_clip, ResampledClip, DEFAULT_FRAME_RATE, DEFAULT_TICKS_PER_SECOND};
pub use bake::{bake_clip, bake_mesh, bake_scene, write_baked, BakeOptions, BakedScene};
pub use mesh::{process_mesh, ProcessedMesh};
pub use scene::{
    QuatKey, SceneChannel, SceneClip, SceneMesh, SceneNode, SceneSource, SkinBinding, Vec3Key,
};
pub use skeleton::{build_bones, VIRTUAL_NODE_MARKER};
