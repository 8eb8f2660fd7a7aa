//! Marrow binary asset formats
//!
//! Every persisted asset starts with the same 64-byte [`AssetHeader`]
//! (magic, version, GUID, type tag, sizes, content hash), followed by a
//! type-specific sub-header and payload. The type tag drives dispatch; there
//! is no polymorphism in the format itself.
//!
//! All multi-byte fields are little-endian. Headers use explicit byte
//! serialization; the only variable-width spot in the whole format is the
//! length-prefixed bone name inside skeleton payloads.

pub mod animation;
pub mod header;
pub mod mesh;
pub mod skeleton;

pub use animation::{encode_track_payload, Animation, AnimationHeader};
pub use header::AssetHeader;
pub use mesh::{
    encode_index_payload, encode_vertex_payload, Mesh, MeshHeader, SkinVertex,
    MAX_BONE_INFLUENCES,
};
pub use skeleton::{
    encode_bone_payload, encode_legacy_bone_payload, Bone, Skeleton, SkeletonHeader, MAX_BONES,
    MAX_BONE_NAME_LEN,
};

use thiserror::Error;

/// File magic: "MRWA", validated before anything else on load.
pub const MARROW_MAGIC: u32 = u32::from_le_bytes(*b"MRWA");

/// Current format version.
pub const MARROW_VERSION: u32 = 1;

/// Header flag bit 0: skeleton bone records use the legacy fixed-width name
/// field (64 bytes, NUL-padded) instead of a length prefix, and carry no
/// local bind pose. Readable only; the writer always emits the current form.
pub const FLAG_FIXED_BONE_NAMES: u32 = 1 << 0;

/// File extensions for baked assets.
pub const MARROW_SKELETON_EXT: &str = "mskel";
pub const MARROW_ANIMATION_EXT: &str = "manim";
pub const MARROW_MESH_EXT: &str = "mmesh";

/// Asset type tag stored in [`AssetHeader::asset_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum AssetType {
    Skeleton = 1,
    Animation = 2,
    Mesh = 3,
}

impl AssetType {
    pub fn from_u32(tag: u32) -> Option<Self> {
        match tag {
            1 => Some(Self::Skeleton),
            2 => Some(Self::Animation),
            3 => Some(Self::Mesh),
            _ => None,
        }
    }
}

/// Hard failures of the load/save contract. No partial decode state is ever
/// produced; the first violation aborts the whole call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("bad file magic 0x{0:08x}, not a Marrow asset")]
    BadMagic(u32),
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u32),
    #[error("unknown asset type tag {0}")]
    UnknownAssetType(u32),
    #[error("unexpected end of data")]
    Truncated,
    #[error("invalid data: {0}")]
    InvalidData(&'static str),
}

/// A decoded asset of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Asset {
    Skeleton(Skeleton),
    Animation(Animation),
    Mesh(Mesh),
}

impl Asset {
    pub fn header(&self) -> &AssetHeader {
        match self {
            Asset::Skeleton(s) => &s.header,
            Asset::Animation(a) => &a.header,
            Asset::Mesh(m) => &m.header,
        }
    }

    pub fn guid(&self) -> u64 {
        self.header().asset_guid
    }

    pub fn asset_type(&self) -> AssetType {
        match self {
            Asset::Skeleton(_) => AssetType::Skeleton,
            Asset::Animation(_) => AssetType::Animation,
            Asset::Mesh(_) => AssetType::Mesh,
        }
    }

    pub fn file_extension(&self) -> &'static str {
        match self {
            Asset::Skeleton(_) => MARROW_SKELETON_EXT,
            Asset::Animation(_) => MARROW_ANIMATION_EXT,
            Asset::Mesh(_) => MARROW_MESH_EXT,
        }
    }

    /// Serialize the full file image: common header, sub-header, payload.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Asset::Skeleton(s) => s.encode(),
            Asset::Animation(a) => a.encode(),
            Asset::Mesh(m) => m.encode(),
        }
    }

    /// Validate the common header, then dispatch on the type tag.
    pub fn decode(bytes: &[u8]) -> Result<Self, FormatError> {
        let header = AssetHeader::read_validated(bytes)?;
        match AssetType::from_u32(header.asset_type) {
            Some(AssetType::Skeleton) => Ok(Asset::Skeleton(Skeleton::decode_body(header, bytes)?)),
            Some(AssetType::Animation) => {
                Ok(Asset::Animation(Animation::decode_body(header, bytes)?))
            }
            Some(AssetType::Mesh) => Ok(Asset::Mesh(Mesh::decode_body(header, bytes)?)),
            None => Err(FormatError::UnknownAssetType(header.asset_type)),
        }
    }

    /// Re-hash the payload and compare against the stored content hash.
    ///
    /// Not part of the load contract; callers opt in when they want the
    /// extra integrity check.
    pub fn verify_content_hash(&self) -> bool {
        let computed = match self {
            // Legacy skeletons were hashed over the fixed-name record
            // layout; re-encode in the form the flag says was stored.
            Asset::Skeleton(s) if s.header.flags & FLAG_FIXED_BONE_NAMES != 0 => {
                crate::hash::content_hash64(&encode_legacy_bone_payload(&s.bones))
            }
            Asset::Skeleton(s) => crate::hash::content_hash64(&encode_bone_payload(&s.bones)),
            Asset::Animation(a) => crate::hash::content_hash64(&encode_track_payload(&a.tracks)),
            Asset::Mesh(m) => crate::hash::combine_hash64(
                crate::hash::content_hash64(&encode_vertex_payload(&m.vertices)),
                crate::hash::content_hash64(&encode_index_payload(&m.indices)),
            ),
        };
        computed == self.header().content_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_is_ascii() {
        assert_eq!(&MARROW_MAGIC.to_le_bytes(), b"MRWA");
    }

    #[test]
    fn test_asset_type_roundtrip() {
        assert_eq!(AssetType::from_u32(1), Some(AssetType::Skeleton));
        assert_eq!(AssetType::from_u32(2), Some(AssetType::Animation));
        assert_eq!(AssetType::from_u32(3), Some(AssetType::Mesh));
        assert_eq!(AssetType::from_u32(0), None);
        assert_eq!(AssetType::from_u32(99), None);
    }

    #[test]
    fn test_decode_rejects_bad_magic() {
        let mut bytes = vec![0u8; AssetHeader::SIZE];
        bytes[0..4].copy_from_slice(&0xdead_beefu32.to_le_bytes());
        assert_eq!(Asset::decode(&bytes), Err(FormatError::BadMagic(0xdead_beef)));
    }

    #[test]
    fn test_decode_rejects_unknown_type_tag() {
        let header = AssetHeader::new(0, 7, 64, 0, 0);
        let bytes = header.to_bytes().to_vec();
        assert_eq!(Asset::decode(&bytes), Err(FormatError::UnknownAssetType(7)));
    }

    #[test]
    fn test_decode_rejects_truncated_header() {
        assert_eq!(
            Asset::decode(&[0u8; AssetHeader::SIZE - 1]),
            Err(FormatError::Truncated)
        );
    }
}
