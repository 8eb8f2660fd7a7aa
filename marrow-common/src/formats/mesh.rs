//! Mesh asset format (.mmesh)
//!
//! # Layout
//! ```text
//! 0x00: AssetHeader (64 bytes)
//! 0x40: MeshHeader (48 bytes): counts + AABB + reserved
//! 0x70: skinned u8, skeleton_guid u64
//! 0x79: vertex data (num_vertices * 108 bytes)
//! var:  index data (num_indices * 4 bytes, triangle list)
//! ```
//!
//! The skin flag/GUID trailer is counted as part of `header_size`;
//! `data_size` covers the vertex and index blocks only, matching what the
//! content hash is computed over.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use super::{AssetHeader, FormatError};
use crate::transform::Aabb;

/// GPU skinning influence limit per vertex.
pub const MAX_BONE_INFLUENCES: usize = 8;

/// Mesh sub-header (48 bytes)
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct MeshHeader {
    pub num_vertices: u32,
    pub num_indices: u32,
    /// Bounds over raw vertex positions
    pub aabb: Aabb,
    /// Reserved for future use
    pub reserved: [u32; 4],
}

impl MeshHeader {
    pub const SIZE: usize = 48;

    pub fn new(num_vertices: u32, num_indices: u32, aabb: Aabb) -> Self {
        Self {
            num_vertices,
            num_indices,
            aabb,
            reserved: [0; 4],
        }
    }

    /// Write header to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.num_vertices.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.num_indices.to_le_bytes());
        for (i, &f) in self.aabb.min.to_array().iter().enumerate() {
            bytes[8 + i * 4..12 + i * 4].copy_from_slice(&f.to_le_bytes());
        }
        for (i, &f) in self.aabb.max.to_array().iter().enumerate() {
            bytes[20 + i * 4..24 + i * 4].copy_from_slice(&f.to_le_bytes());
        }
        bytes
    }

    /// Read header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        let f = |off: usize| {
            f32::from_le_bytes([bytes[off], bytes[off + 1], bytes[off + 2], bytes[off + 3]])
        };
        Some(Self::new(
            u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            Aabb {
                min: Vec3::new(f(8), f(12), f(16)),
                max: Vec3::new(f(20), f(24), f(28)),
            },
        ))
    }
}

/// Skinned vertex record (108 bytes).
///
/// Weight slots sum to 1.0 whenever any influence exists; unused slots are
/// zero-weight/zero-index. Stored in descending weight order.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct SkinVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub uv: [f32; 2],
    pub bone_indices: [u32; MAX_BONE_INFLUENCES],
    pub bone_weights: [f32; MAX_BONE_INFLUENCES],
}

impl SkinVertex {
    pub const SIZE: usize = core::mem::size_of::<Self>();
}

impl Default for SkinVertex {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Mesh asset: vertices, triangle indices, bounds, optional skeleton link.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub header: AssetHeader,
    pub info: MeshHeader,
    pub skinned: bool,
    /// GUID of the skeleton the bone indices resolve against (0 = none)
    pub skeleton_guid: u64,
    pub vertices: Vec<SkinVertex>,
    /// Triangle list, stride 3
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Offset of the vertex block: both headers plus the skin trailer.
    pub const PAYLOAD_OFFSET: usize = AssetHeader::SIZE + MeshHeader::SIZE + 9;

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Serialize the full file image.
    pub fn encode(&self) -> Vec<u8> {
        let vertex_block = encode_vertex_payload(&self.vertices);
        let index_block = encode_index_payload(&self.indices);

        let mut bytes =
            Vec::with_capacity(Self::PAYLOAD_OFFSET + vertex_block.len() + index_block.len());
        bytes.extend_from_slice(&self.header.to_bytes());
        bytes.extend_from_slice(&self.info.to_bytes());
        bytes.push(self.skinned as u8);
        bytes.extend_from_slice(&self.skeleton_guid.to_le_bytes());
        bytes.extend_from_slice(&vertex_block);
        bytes.extend_from_slice(&index_block);
        bytes
    }

    /// Decode a mesh file image (common header already validated).
    pub(crate) fn decode_body(header: AssetHeader, bytes: &[u8]) -> Result<Self, FormatError> {
        let info = MeshHeader::from_bytes(bytes.get(AssetHeader::SIZE..).unwrap_or(&[]))
            .ok_or(FormatError::Truncated)?;

        let trailer_off = AssetHeader::SIZE + MeshHeader::SIZE;
        if bytes.len() < trailer_off + 9 {
            return Err(FormatError::Truncated);
        }
        let skinned = match bytes[trailer_off] {
            0 => false,
            1 => true,
            _ => return Err(FormatError::InvalidData("skin flag byte out of range")),
        };
        let mut guid = [0u8; 8];
        guid.copy_from_slice(&bytes[trailer_off + 1..trailer_off + 9]);
        let skeleton_guid = u64::from_le_bytes(guid);

        let payload = header.payload_of(bytes)?;
        let vertex_bytes = info.num_vertices as usize * SkinVertex::SIZE;
        let index_bytes = info.num_indices as usize * 4;
        if payload.len() < vertex_bytes + index_bytes {
            return Err(FormatError::Truncated);
        }

        let vertices: Vec<SkinVertex> = payload[..vertex_bytes]
            .chunks_exact(SkinVertex::SIZE)
            .map(bytemuck::pod_read_unaligned)
            .collect();

        let indices: Vec<u32> = payload[vertex_bytes..vertex_bytes + index_bytes]
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        Ok(Self {
            header,
            info,
            skinned,
            skeleton_guid,
            vertices,
            indices,
        })
    }

    /// Decode a standalone mesh file.
    pub fn decode(bytes: &[u8]) -> Result<Self, FormatError> {
        let header = AssetHeader::read_validated(bytes)?;
        if header.asset_type != super::AssetType::Mesh as u32 {
            return Err(FormatError::InvalidData("not a mesh asset"));
        }
        Self::decode_body(header, bytes)
    }
}

/// Serialize the vertex block; payload bytes and content-hash input.
pub fn encode_vertex_payload(vertices: &[SkinVertex]) -> Vec<u8> {
    bytemuck::cast_slice(vertices).to_vec()
}

/// Serialize the index block; payload bytes and content-hash input.
pub fn encode_index_payload(indices: &[u32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(indices.len() * 4);
    for i in indices {
        bytes.extend_from_slice(&i.to_le_bytes());
    }
    bytes
}
