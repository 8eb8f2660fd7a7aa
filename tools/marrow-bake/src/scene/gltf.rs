//! glTF front end (.gltf/.glb -> [`SceneSource`])
//!
//! Thin adapter: it moves glTF data into the scene model and does nothing
//! else. glTF stores animation times in seconds, so clips come out with a
//! tick rate of 1.0 and the resampler treats ticks as seconds.

use anyhow::{Context, Result};
use glam::{Mat4, Quat, Vec2, Vec3};
use gltf::animation::util::ReadOutputs;
use hashbrown::HashMap;
use std::path::Path;

use super::{QuatKey, SceneChannel, SceneClip, SceneMesh, SceneNode, SceneSource, SkinBinding, Vec3Key};

/// Import a glTF/GLB file as a scene source.
pub fn load_scene(input: &Path) -> Result<SceneSource> {
    let (document, buffers, _images) =
        gltf::import(input).with_context(|| format!("Failed to load glTF: {:?}", input))?;

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .context("No scenes found in glTF file")?;

    // glTF allows multiple scene roots; the hierarchy passes want exactly
    // one, so multiple roots get a synthetic identity parent.
    let roots: Vec<gltf::Node> = scene.nodes().collect();
    let root = match roots.as_slice() {
        [only] => build_node(only),
        _ => {
            let mut root = SceneNode::new("scene_root", Mat4::IDENTITY);
            root.children = roots.iter().map(build_node).collect();
            root
        }
    };

    let mut meshes = Vec::new();
    for node in document.nodes() {
        let Some(mesh) = node.mesh() else { continue };
        for (prim_index, primitive) in mesh.primitives().enumerate() {
            meshes.push(load_primitive(&node, &mesh, &primitive, prim_index, &buffers));
        }
    }

    let clips = document
        .animations()
        .enumerate()
        .map(|(i, animation)| load_clip(&animation, i, &buffers))
        .collect();

    let name = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("scene")
        .to_string();

    Ok(SceneSource {
        name,
        root,
        meshes,
        clips,
    })
}

fn node_name(node: &gltf::Node) -> String {
    node.name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node_{}", node.index()))
}

fn build_node(node: &gltf::Node) -> SceneNode {
    let mut out = SceneNode::new(
        node_name(node),
        Mat4::from_cols_array_2d(&node.transform().matrix()),
    );
    out.children = node.children().map(|child| build_node(&child)).collect();
    out
}

fn load_primitive(
    node: &gltf::Node,
    mesh: &gltf::Mesh,
    primitive: &gltf::Primitive,
    prim_index: usize,
    buffers: &[gltf::buffer::Data],
) -> SceneMesh {
    let reader = primitive.reader(|buffer| Some(&*buffers[buffer.index()]));

    let positions: Vec<Vec3> = reader
        .read_positions()
        .map(|it| it.map(Vec3::from_array).collect())
        .unwrap_or_default();
    let normals: Vec<Vec3> = reader
        .read_normals()
        .map(|it| it.map(Vec3::from_array).collect())
        .unwrap_or_default();
    let tangents: Vec<Vec3> = reader
        .read_tangents()
        .map(|it| it.map(|t| Vec3::new(t[0], t[1], t[2])).collect())
        .unwrap_or_default();
    let uvs: Vec<Vec2> = reader
        .read_tex_coords(0)
        .map(|tc| tc.into_f32().map(Vec2::from_array).collect())
        .unwrap_or_default();
    let indices: Vec<u32> = reader
        .read_indices()
        .map(|it| it.into_u32().collect())
        .unwrap_or_default();

    let mut bindings = Vec::new();
    if let Some(skin) = node.skin() {
        let skin_reader = skin.reader(|buffer| Some(&*buffers[buffer.index()]));
        let ibms: Vec<Mat4> = skin_reader
            .read_inverse_bind_matrices()
            .map(|it| it.map(|m| Mat4::from_cols_array_2d(&m)).collect())
            .unwrap_or_default();

        bindings = skin
            .joints()
            .enumerate()
            .map(|(i, joint)| SkinBinding {
                bone_name: node_name(&joint),
                inverse_bind_matrix: ibms.get(i).copied().unwrap_or(Mat4::IDENTITY),
                weights: Vec::new(),
            })
            .collect();

        // Transpose per-vertex joint/weight quads into per-bone lists.
        if let (Some(joints), Some(weights)) = (reader.read_joints(0), reader.read_weights(0)) {
            for (vertex, (joint4, weight4)) in
                joints.into_u16().zip(weights.into_f32()).enumerate()
            {
                for k in 0..4 {
                    if weight4[k] == 0.0 {
                        continue;
                    }
                    if let Some(binding) = bindings.get_mut(joint4[k] as usize) {
                        binding.weights.push((vertex as u32, weight4[k]));
                    }
                }
            }
        }
    }

    let base_name = mesh
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| node_name(node));
    let name = if prim_index == 0 {
        base_name
    } else {
        format!("{}_{}", base_name, prim_index)
    };

    SceneMesh {
        name,
        positions,
        normals,
        tangents,
        uvs,
        indices,
        bindings,
    }
}

fn load_clip(
    animation: &gltf::Animation,
    index: usize,
    buffers: &[gltf::buffer::Data],
) -> SceneClip {
    let mut channels: Vec<SceneChannel> = Vec::new();
    let mut by_target: HashMap<usize, usize> = HashMap::new();
    let mut duration = 0.0f32;

    for channel in animation.channels() {
        let target_node = channel.target().node();
        let reader = channel.reader(|buffer| Some(&*buffers[buffer.index()]));
        let Some(inputs) = reader.read_inputs() else {
            continue;
        };
        let times: Vec<f32> = inputs.collect();
        if let Some(&last) = times.last() {
            duration = duration.max(last);
        }

        let slot = *by_target.entry(target_node.index()).or_insert_with(|| {
            channels.push(SceneChannel::new(node_name(&target_node)));
            channels.len() - 1
        });

        match reader.read_outputs() {
            Some(ReadOutputs::Translations(values)) => {
                channels[slot].position_keys = times
                    .iter()
                    .zip(values)
                    .map(|(&time, v)| Vec3Key {
                        time,
                        value: Vec3::from_array(v),
                    })
                    .collect();
            }
            Some(ReadOutputs::Rotations(values)) => {
                channels[slot].rotation_keys = times
                    .iter()
                    .zip(values.into_f32())
                    .map(|(&time, q)| QuatKey {
                        time,
                        value: Quat::from_array(q),
                    })
                    .collect();
            }
            Some(ReadOutputs::Scales(values)) => {
                channels[slot].scale_keys = times
                    .iter()
                    .zip(values)
                    .map(|(&time, v)| Vec3Key {
                        time,
                        value: Vec3::from_array(v),
                    })
                    .collect();
            }
            // Morph target weights are out of scope.
            _ => {}
        }
    }

    let name = animation
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("clip_{}", index));

    SceneClip {
        name,
        duration_ticks: duration,
        // glTF times are seconds.
        ticks_per_second: 1.0,
        channels,
    }
}

/// List skinned meshes and clips in a glTF file without baking anything.
pub fn list_contents(input: &Path) -> Result<()> {
    let scene = load_scene(input)?;

    tracing::info!("Contents of {:?}:", input);
    for (i, mesh) in scene.meshes.iter().enumerate() {
        tracing::info!(
            "  mesh [{}] '{}': {} vertices, {} indices, {} bound bones",
            i,
            mesh.name,
            mesh.positions.len(),
            mesh.indices.len(),
            mesh.bindings.len()
        );
    }
    for (i, clip) in scene.clips.iter().enumerate() {
        tracing::info!(
            "  clip [{}] '{}': {} channels, {:.2}s",
            i,
            clip.name,
            clip.channels.len(),
            clip.duration_ticks
        );
    }
    Ok(())
}
