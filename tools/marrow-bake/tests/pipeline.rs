//! End-to-end pipeline tests: synthetic scenes in, baked assets out.

use glam::{Mat4, Quat, Vec3};
use marrow_bake::{bake_scene, write_baked, BakeOptions};
use marrow_bake::{
    QuatKey, SceneChannel, SceneClip, SceneMesh, SceneNode, SceneSource, SkinBinding, Vec3Key,
};
use marrow_common::{guid64_from_name, Animation, Asset, Mesh, Skeleton};

/// root -> virtual FBX helper -> two weighted bones, one mesh, one clip.
fn rigged_scene() -> SceneSource {
    let mut hips = SceneNode::new("Hips", Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0)));
    hips.children.push(SceneNode::new(
        "Spine",
        Mat4::from_translation(Vec3::new(0.0, 0.5, 0.0)),
    ));
    let mut helper = SceneNode::new(
        "Hips_$AssimpFbx$_Translation",
        Mat4::from_translation(Vec3::new(0.0, 0.0, 2.0)),
    );
    helper.children.push(hips);
    let mut root = SceneNode::new("Armature", Mat4::IDENTITY);
    root.children.push(helper);

    let mesh = SceneMesh {
        name: "Body".to_string(),
        positions: vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 2.0, 0.0),
        ],
        normals: vec![Vec3::Y; 3],
        tangents: vec![],
        uvs: vec![],
        indices: vec![0, 1, 2],
        bindings: vec![
            SkinBinding {
                bone_name: "Hips".to_string(),
                inverse_bind_matrix: Mat4::from_translation(Vec3::new(0.0, -1.0, -2.0)),
                weights: vec![(0, 1.0), (1, 0.6), (2, 0.2)],
            },
            SkinBinding {
                bone_name: "Spine".to_string(),
                inverse_bind_matrix: Mat4::from_translation(Vec3::new(0.0, -1.5, -2.0)),
                weights: vec![(1, 0.4), (2, 0.8)],
            },
        ],
    };

    let mut channel = SceneChannel::new("Hips");
    channel.position_keys = vec![
        Vec3Key {
            time: 0.0,
            value: Vec3::new(0.0, 1.0, 2.0),
        },
        Vec3Key {
            time: 1.0,
            value: Vec3::new(0.0, 1.0, 4.0),
        },
    ];
    channel.rotation_keys = vec![
        QuatKey {
            time: 0.0,
            value: Quat::IDENTITY,
        },
        QuatKey {
            time: 1.0,
            value: Quat::from_rotation_y(1.0),
        },
    ];
    let clip = SceneClip {
        name: "walk".to_string(),
        duration_ticks: 1.0,
        ticks_per_second: 1.0,
        channels: vec![channel],
    };

    SceneSource {
        name: "hero".to_string(),
        root,
        meshes: vec![mesh],
        clips: vec![clip],
    }
}

#[test]
fn test_bake_whole_scene() {
    let source = rigged_scene();
    let baked = bake_scene(&source, &BakeOptions::default()).unwrap();

    // Virtual helper and unweighted armature root are gone; the helper's
    // translation is folded into the hips bind pose.
    let skeleton = &baked.skeleton;
    assert_eq!(skeleton.bone_count(), 2);
    assert_eq!(skeleton.bones[0].name, "hips");
    assert_eq!(skeleton.bones[0].parent_index, -1);
    let hips_bind = skeleton.bones[0].local_bind_pose.translation;
    assert!((hips_bind - Vec3::new(0.0, 1.0, 2.0)).length() < 1e-6);
    assert_eq!(skeleton.bones[1].name, "spine");
    assert_eq!(skeleton.bones[1].parent_index, 0);

    assert_eq!(skeleton.header.asset_guid, guid64_from_name("hero"));

    // One clip at 30 fps over 1s: 31 frames x 2 tracks.
    assert_eq!(baked.animations.len(), 1);
    let (clip_name, animation) = &baked.animations[0];
    assert_eq!(clip_name, "walk");
    assert_eq!(animation.frame_count(), 31);
    assert_eq!(animation.info.track_count, 2);
    assert_eq!(animation.tracks.len(), 31 * 2);
    assert_eq!(animation.info.target_skeleton_guid, skeleton.header.asset_guid);

    // First frame matches the first keys, last frame the last keys.
    let first = animation.transform_at(0, 0).unwrap();
    assert_eq!(first.translation, Vec3::new(0.0, 1.0, 2.0));
    let last = animation.transform_at(30, 0).unwrap();
    assert_eq!(last.translation, Vec3::new(0.0, 1.0, 4.0));
    // Unkeyed spine holds its bind pose on every frame.
    for frame in 0..31 {
        let spine = animation.transform_at(frame, 1).unwrap();
        assert_eq!(spine.translation, skeleton.bones[1].local_bind_pose.translation);
    }

    // The mesh comes out skinned against the skeleton, weights normalized.
    assert_eq!(baked.meshes.len(), 1);
    let (_, mesh) = &baked.meshes[0];
    assert!(mesh.skinned);
    assert_eq!(mesh.skeleton_guid, skeleton.header.asset_guid);
    assert_eq!(mesh.info.num_vertices, 3);
    for vertex in &mesh.vertices {
        let sum: f32 = vertex.bone_weights.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }
    // Vertex 2: hips 0.2 vs spine 0.8, strongest first.
    assert_eq!(mesh.vertices[2].bone_indices[0], 1);
    assert!((mesh.vertices[2].bone_weights[0] - 0.8).abs() < 1e-5);
}

#[test]
fn test_malformed_clip_does_not_sink_siblings() {
    let mut source = rigged_scene();
    source.clips.push(SceneClip {
        name: "broken".to_string(),
        duration_ticks: -1.0,
        ticks_per_second: 1.0,
        channels: vec![],
    });
    source.meshes.push(SceneMesh {
        name: "empty".to_string(),
        positions: vec![],
        normals: vec![],
        tangents: vec![],
        uvs: vec![],
        indices: vec![],
        bindings: vec![],
    });

    let baked = bake_scene(&source, &BakeOptions::default()).unwrap();
    assert_eq!(baked.animations.len(), 1);
    assert_eq!(baked.animations[0].0, "walk");
    assert_eq!(baked.meshes.len(), 1);
    assert_eq!(baked.meshes[0].0, "Body");
}

#[test]
fn test_scene_without_bones_fails_whole_bake() {
    let source = SceneSource {
        name: "empty".to_string(),
        root: SceneNode::new("root", Mat4::IDENTITY),
        meshes: vec![],
        clips: vec![],
    };
    assert!(bake_scene(&source, &BakeOptions::default()).is_err());
}

#[test]
fn test_baked_files_roundtrip_from_disk() {
    let source = rigged_scene();
    let baked = bake_scene(&source, &BakeOptions::default()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let written = write_baked(&source.name, &baked, dir.path()).unwrap();
    assert_eq!(written.len(), 3);

    for path in &written {
        let bytes = std::fs::read(path).unwrap();
        let asset = Asset::decode(&bytes).unwrap();
        assert!(asset.verify_content_hash(), "hash mismatch for {:?}", path);
    }

    let skel_bytes = std::fs::read(&written[0]).unwrap();
    let skeleton = Skeleton::decode(&skel_bytes).unwrap();
    assert_eq!(skeleton, baked.skeleton);
    // The name lookup is rebuilt from the decoded bone array.
    assert_eq!(skeleton.bone_index("spine"), Some(1));

    let anim_bytes = std::fs::read(&written[1]).unwrap();
    let animation = Animation::decode(&anim_bytes).unwrap();
    assert_eq!(animation, baked.animations[0].1);

    let mesh_bytes = std::fs::read(&written[2]).unwrap();
    let mesh = Mesh::decode(&mesh_bytes).unwrap();
    assert_eq!(mesh, baked.meshes[0].1);
}

#[test]
fn test_custom_frame_rate_changes_track_shape() {
    let source = rigged_scene();
    let options = BakeOptions { frame_rate: 60.0 };
    let baked = bake_scene(&source, &options).unwrap();
    let (_, animation) = &baked.animations[0];
    assert_eq!(animation.frame_count(), 61);
    assert_eq!(animation.tracks.len(), 61 * 2);
    assert_eq!(animation.frame_rate(), 60.0);
}
