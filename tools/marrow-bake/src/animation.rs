//! Animation resampler (keyframed channels -> fixed-rate transform tracks)
//!
//! Source clips carry sparse keyframes in ticks; the output is a dense
//! frame-major buffer with one local transform per bone per frame, so
//! playback never interpolates between keys again. Bones without a channel
//! hold their bind pose, which already contains the transforms of any
//! hierarchy nodes the flattener folded away.

use anyhow::{bail, Result};
use glam::{Quat, Vec3};
use hashbrown::HashMap;
use marrow_common::{normalize_name, Skeleton, Transform};

use crate::scene::{QuatKey, SceneChannel, SceneClip, Vec3Key};

/// Default output sampling rate (frames per second).
pub const DEFAULT_FRAME_RATE: f32 = 30.0;

/// Tick rate assumed when the source clip does not declare one.
pub const DEFAULT_TICKS_PER_SECOND: f32 = 25.0;

/// A resampled clip, not yet wrapped in an asset.
#[derive(Debug, Clone)]
pub struct ResampledClip {
    pub frame_count: u32,
    pub frame_rate: f32,
    /// Duration in seconds
    pub duration: f32,
    /// Frame-major: `tracks[frame * bone_count + bone]`
    pub tracks: Vec<Transform>,
}

/// Resample one clip against a skeleton at a fixed frame rate.
///
/// A clip with no channels at all is fine; every bone just holds its bind
/// pose for the whole duration. A non-positive or non-finite duration is a
/// malformed clip and fails here without touching sibling clips.
pub fn resample_clip(
    clip: &SceneClip,
    skeleton: &Skeleton,
    frame_rate: f32,
) -> Result<ResampledClip> {
    if !frame_rate.is_finite() || frame_rate <= 0.0 {
        bail!("Invalid frame rate {}", frame_rate);
    }

    let ticks_per_second = if clip.ticks_per_second > 0.0 {
        clip.ticks_per_second
    } else {
        DEFAULT_TICKS_PER_SECOND
    };
    let duration = clip.duration_ticks / ticks_per_second;
    if !duration.is_finite() || duration <= 0.0 {
        bail!("Clip '{}' has invalid duration {}", clip.name, duration);
    }

    // Inclusive of both endpoints: a 1s clip at 30 fps has 31 frames.
    let frame_count = (duration * frame_rate).floor() as u32 + 1;

    let channels: HashMap<String, &SceneChannel> = clip
        .channels
        .iter()
        .map(|c| (normalize_name(&c.target), c))
        .collect();

    let bone_count = skeleton.bone_count();
    let mut tracks = Vec::with_capacity(frame_count as usize * bone_count);
    for frame in 0..frame_count {
        // The final frame can land past the last key; clamp into the clip.
        let t_ticks = ((frame as f32 / frame_rate) * ticks_per_second).min(clip.duration_ticks);
        for bone in &skeleton.bones {
            let transform = match channels.get(bone.name.as_str()) {
                Some(channel) => evaluate_channel(channel, t_ticks, &bone.local_bind_pose),
                None => bone.local_bind_pose,
            };
            tracks.push(transform);
        }
    }

    Ok(ResampledClip {
        frame_count,
        frame_rate,
        duration,
        tracks,
    })
}

/// Sample all three key lists of a channel at one time. Each list falls
/// back to the matching bind-pose component when empty.
fn evaluate_channel(channel: &SceneChannel, t_ticks: f32, bind: &Transform) -> Transform {
    Transform {
        translation: sample_vec3(&channel.position_keys, t_ticks, bind.translation),
        rotation: sample_quat(&channel.rotation_keys, t_ticks, bind.rotation),
        scale: sample_vec3(&channel.scale_keys, t_ticks, bind.scale),
    }
}

/// Bracketing key pair for a sample time: the last key at or before `t` and
/// its successor. Returns the blend factor alongside.
fn bracket(times_len: usize, time_at: impl Fn(usize) -> f32, t: f32) -> (usize, usize, f32) {
    let mut i = 0;
    while i < times_len - 1 && time_at(i + 1) < t {
        i += 1;
    }
    if i >= times_len - 1 {
        return (times_len - 1, times_len - 1, 0.0);
    }
    let t0 = time_at(i);
    let t1 = time_at(i + 1);
    let factor = if t1 > t0 {
        ((t - t0) / (t1 - t0)).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (i, i + 1, factor)
}

fn sample_vec3(keys: &[Vec3Key], t: f32, fallback: Vec3) -> Vec3 {
    if keys.is_empty() {
        return fallback;
    }
    if t <= keys[0].time {
        return keys[0].value;
    }
    let (i0, i1, factor) = bracket(keys.len(), |i| keys[i].time, t);
    // Exact key values at key times, no float drift through the lerp.
    if factor <= 0.0 {
        return keys[i0].value;
    }
    if factor >= 1.0 {
        return keys[i1].value;
    }
    keys[i0].value.lerp(keys[i1].value, factor)
}

fn sample_quat(keys: &[QuatKey], t: f32, fallback: Quat) -> Quat {
    if keys.is_empty() {
        return fallback;
    }
    if t <= keys[0].time {
        return keys[0].value;
    }
    let (i0, i1, factor) = bracket(keys.len(), |i| keys[i].time, t);
    if factor <= 0.0 {
        return keys[i0].value;
    }
    if factor >= 1.0 {
        return keys[i1].value;
    }
    slerp(keys[i0].value, keys[i1].value, factor)
}

/// Shortest-path spherical interpolation with a lerp fallback for nearly
/// parallel quaternions.
fn slerp(a: Quat, b: Quat, t: f32) -> Quat {
    let mut dot = a.dot(b);
    let mut b = b;
    if dot < 0.0 {
        b = -b;
        dot = -dot;
    }

    if dot > 0.9995 {
        let lerped = Quat::from_xyzw(
            a.x + t * (b.x - a.x),
            a.y + t * (b.y - a.y),
            a.z + t * (b.z - a.z),
            a.w + t * (b.w - a.w),
        );
        return renormalize(lerped);
    }

    let theta_0 = dot.acos();
    let theta = theta_0 * t;
    let sin_theta = theta.sin();
    let sin_theta_0 = theta_0.sin();

    let s0 = theta.cos() - dot * sin_theta / sin_theta_0;
    let s1 = sin_theta / sin_theta_0;

    renormalize(Quat::from_xyzw(
        s0 * a.x + s1 * b.x,
        s0 * a.y + s1 * b.y,
        s0 * a.z + s1 * b.z,
        s0 * a.w + s1 * b.w,
    ))
}

fn renormalize(q: Quat) -> Quat {
    let len = q.length();
    if len > 0.0 {
        q * (1.0 / len)
    } else {
        Quat::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;
    use marrow_common::{AssetHeader, AssetType, Bone};

    fn two_bone_skeleton() -> Skeleton {
        let bones = vec![
            Bone {
                name: "root".to_string(),
                parent_index: -1,
                inverse_bind_matrix: Mat4::IDENTITY,
                local_bind_pose: Transform::IDENTITY,
            },
            Bone {
                name: "tip".to_string(),
                parent_index: 0,
                inverse_bind_matrix: Mat4::IDENTITY,
                local_bind_pose: Transform {
                    translation: Vec3::new(0.0, 1.0, 0.0),
                    rotation: Quat::IDENTITY,
                    scale: Vec3::ONE,
                },
            },
        ];
        Skeleton::new(AssetHeader::new(1, AssetType::Skeleton as u32, 96, 0, 0), bones)
    }

    fn keyed_clip() -> SceneClip {
        let mut channel = SceneChannel::new("root");
        channel.position_keys = vec![
            Vec3Key {
                time: 0.0,
                value: Vec3::ZERO,
            },
            Vec3Key {
                time: 1.0,
                value: Vec3::new(2.0, 0.0, 0.0),
            },
        ];
        SceneClip {
            name: "move".to_string(),
            duration_ticks: 1.0,
            ticks_per_second: 1.0,
            channels: vec![channel],
        }
    }

    #[test]
    fn test_frame_count_is_inclusive() {
        let skeleton = two_bone_skeleton();
        let out = resample_clip(&keyed_clip(), &skeleton, 30.0).unwrap();
        assert_eq!(out.frame_count, 31);
        assert_eq!(out.tracks.len(), 31 * 2);
    }

    #[test]
    fn test_exact_values_at_key_times() {
        let skeleton = two_bone_skeleton();
        // 2 fps over a 1s clip: frames land exactly on the two keys plus
        // the midpoint.
        let out = resample_clip(&keyed_clip(), &skeleton, 2.0).unwrap();
        assert_eq!(out.frame_count, 3);
        assert_eq!(out.tracks[0].translation, Vec3::ZERO);
        assert_eq!(out.tracks[2].translation, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(out.tracks[4].translation, Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_sample_clamps_outside_key_range() {
        let keys = vec![
            Vec3Key {
                time: 0.5,
                value: Vec3::ONE,
            },
            Vec3Key {
                time: 1.0,
                value: Vec3::splat(3.0),
            },
        ];
        assert_eq!(sample_vec3(&keys, 0.0, Vec3::ZERO), Vec3::ONE);
        assert_eq!(sample_vec3(&keys, 5.0, Vec3::ZERO), Vec3::splat(3.0));
    }

    #[test]
    fn test_unkeyed_bone_holds_bind_pose() {
        let skeleton = two_bone_skeleton();
        let out = resample_clip(&keyed_clip(), &skeleton, 30.0).unwrap();
        for frame in 0..out.frame_count as usize {
            let tip = &out.tracks[frame * 2 + 1];
            assert_eq!(tip.translation, Vec3::new(0.0, 1.0, 0.0));
        }
    }

    #[test]
    fn test_channelless_clip_is_all_bind_poses() {
        let skeleton = two_bone_skeleton();
        let clip = SceneClip {
            name: "static".to_string(),
            duration_ticks: 1.0,
            ticks_per_second: 1.0,
            channels: vec![],
        };
        let out = resample_clip(&clip, &skeleton, 30.0).unwrap();
        assert_eq!(out.frame_count, 31);
        for frame in 0..31 {
            assert_eq!(out.tracks[frame * 2], skeleton.bones[0].local_bind_pose);
            assert_eq!(out.tracks[frame * 2 + 1], skeleton.bones[1].local_bind_pose);
        }
    }

    #[test]
    fn test_zero_tick_rate_uses_default() {
        let skeleton = two_bone_skeleton();
        let mut clip = keyed_clip();
        clip.ticks_per_second = 0.0;
        clip.duration_ticks = DEFAULT_TICKS_PER_SECOND; // exactly one second
        let out = resample_clip(&clip, &skeleton, 30.0).unwrap();
        assert!((out.duration - 1.0).abs() < 1e-6);
        assert_eq!(out.frame_count, 31);
    }

    #[test]
    fn test_invalid_duration_rejected() {
        let skeleton = two_bone_skeleton();
        let mut clip = keyed_clip();
        clip.duration_ticks = 0.0;
        assert!(resample_clip(&clip, &skeleton, 30.0).is_err());
        clip.duration_ticks = f32::NAN;
        assert!(resample_clip(&clip, &skeleton, 30.0).is_err());
    }

    #[test]
    fn test_slerp_takes_shortest_path() {
        let a = Quat::from_rotation_y(0.2);
        let b = -Quat::from_rotation_y(0.4);
        let mid = slerp(a, b, 0.5);
        // Negated input must not send the blend the long way round.
        let expected = Quat::from_rotation_y(0.3);
        assert!(mid.dot(expected).abs() > 0.9999);
        assert!((mid.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_slerp_stays_unit_length_off_midpoint() {
        // A 1.2 rad spread keeps us on the spherical path, well away from
        // the lerp fallback.
        let a = Quat::from_rotation_y(0.0);
        let b = Quat::from_rotation_y(1.2);
        for &t in &[0.1, 0.25, 0.5, 0.75, 0.9] {
            let q = slerp(a, b, t);
            assert!((q.length() - 1.0).abs() < 1e-5, "t = {}", t);
        }
        // Constant angular velocity: t = 0.25 is a quarter of the arc.
        let q = slerp(a, b, 0.25);
        assert!(q.dot(Quat::from_rotation_y(0.3)).abs() > 0.9999);
    }
}
