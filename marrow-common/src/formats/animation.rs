//! Animation asset format (.manim)
//!
//! # Layout
//! ```text
//! 0x00: AssetHeader (64 bytes)
//! 0x40: AnimationHeader (32 bytes)
//! 0x60: track data, frame_count * track_count Transform records (40 bytes)
//! ```
//!
//! Track data is frame-major: `tracks[frame * track_count + bone_index]`.
//! `track_count` always equals the bone count of the target skeleton, and
//! the skeleton is referenced by value through `target_skeleton_guid`; a
//! loader must reject the clip if the GUID does not match the skeleton it
//! intends to play it on.

use super::{AssetHeader, FormatError};
use crate::transform::Transform;

/// Animation sub-header (32 bytes)
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct AnimationHeader {
    /// GUID of the skeleton this clip was resampled against
    pub target_skeleton_guid: u64,
    /// Number of output frames
    pub frame_count: u32,
    /// Tracks per frame (equals the target skeleton's bone count)
    pub track_count: u32,
    /// Output sampling rate in frames per second
    pub frame_rate: f32,
    /// Clip duration in seconds
    pub duration: f32,
    /// Reserved for future use
    pub reserved: [u32; 2],
}

impl AnimationHeader {
    pub const SIZE: usize = 32;

    pub fn new(
        target_skeleton_guid: u64,
        frame_count: u32,
        track_count: u32,
        frame_rate: f32,
        duration: f32,
    ) -> Self {
        Self {
            target_skeleton_guid,
            frame_count,
            track_count,
            frame_rate,
            duration,
            reserved: [0; 2],
        }
    }

    /// Write header to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..8].copy_from_slice(&self.target_skeleton_guid.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.frame_count.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.track_count.to_le_bytes());
        bytes[16..20].copy_from_slice(&self.frame_rate.to_le_bytes());
        bytes[20..24].copy_from_slice(&self.duration.to_le_bytes());
        bytes
    }

    /// Read header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        let mut guid = [0u8; 8];
        guid.copy_from_slice(&bytes[0..8]);
        Some(Self::new(
            u64::from_le_bytes(guid),
            u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
            f32::from_le_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]),
            f32::from_le_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]),
        ))
    }
}

/// Animation asset: resampled, frame-major local transform tracks.
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    pub header: AssetHeader,
    pub info: AnimationHeader,
    /// Flat buffer of length `frame_count * track_count`
    pub tracks: Vec<Transform>,
}

impl Animation {
    /// Local transform of one bone at one frame.
    pub fn transform_at(&self, frame: u32, track: u32) -> Option<&Transform> {
        if frame >= self.info.frame_count || track >= self.info.track_count {
            return None;
        }
        self.tracks
            .get((frame * self.info.track_count + track) as usize)
    }

    pub fn frame_count(&self) -> u32 {
        self.info.frame_count
    }

    pub fn duration(&self) -> f32 {
        self.info.duration
    }

    pub fn frame_rate(&self) -> f32 {
        self.info.frame_rate
    }

    /// Serialize the full file image.
    pub fn encode(&self) -> Vec<u8> {
        let payload = encode_track_payload(&self.tracks);
        let mut bytes =
            Vec::with_capacity(AssetHeader::SIZE + AnimationHeader::SIZE + payload.len());
        bytes.extend_from_slice(&self.header.to_bytes());
        bytes.extend_from_slice(&self.info.to_bytes());
        bytes.extend_from_slice(&payload);
        bytes
    }

    /// Decode an animation file image (common header already validated).
    pub(crate) fn decode_body(header: AssetHeader, bytes: &[u8]) -> Result<Self, FormatError> {
        let info = AnimationHeader::from_bytes(bytes.get(AssetHeader::SIZE..).unwrap_or(&[]))
            .ok_or(FormatError::Truncated)?;

        // Counts come straight off disk; size them with checked math so a
        // corrupt header is a hard error, never an overflow abort.
        let total = (info.frame_count as usize)
            .checked_mul(info.track_count as usize)
            .ok_or(FormatError::InvalidData("track count overflow"))?;
        let total_bytes = total
            .checked_mul(Transform::SIZE)
            .ok_or(FormatError::InvalidData("track count overflow"))?;
        let payload = header.payload_of(bytes)?;
        if payload.len() < total_bytes {
            return Err(FormatError::Truncated);
        }

        let mut tracks = Vec::with_capacity(total);
        for i in 0..total {
            let record = &payload[i * Transform::SIZE..(i + 1) * Transform::SIZE];
            tracks.push(Transform::from_bytes(record).ok_or(FormatError::Truncated)?);
        }

        Ok(Self {
            header,
            info,
            tracks,
        })
    }

    /// Decode a standalone animation file.
    pub fn decode(bytes: &[u8]) -> Result<Self, FormatError> {
        let header = AssetHeader::read_validated(bytes)?;
        if header.asset_type != super::AssetType::Animation as u32 {
            return Err(FormatError::InvalidData("not an animation asset"));
        }
        Self::decode_body(header, bytes)
    }
}

/// Serialize the track buffer alone; payload bytes and content-hash input.
pub fn encode_track_payload(tracks: &[Transform]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(tracks.len() * Transform::SIZE);
    for track in tracks {
        bytes.extend_from_slice(&track.to_bytes());
    }
    bytes
}
