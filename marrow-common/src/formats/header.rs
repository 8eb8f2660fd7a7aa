//! Common asset header, present verbatim at the start of every Marrow file
//!
//! # Layout (64 bytes, cache-line sized)
//! ```text
//! 0x00: magic u32          ("MRWA")
//! 0x04: version u32
//! 0x08: asset_guid u64
//! 0x10: asset_type u32
//! 0x14: flags u32
//! 0x18: header_size u32    (offset of the payload; readers jump via this,
//!                           never via struct sizes, so future versions can
//!                           grow the headers without breaking old readers)
//! 0x1C: data_size u32      (payload length in bytes)
//! 0x20: content_hash u64   (xxh64 of the payload, written once at bake time)
//! 0x28: reserved u32 x 6
//! ```
//!
//! The header is constructed in memory during baking, written once, and
//! never mutated after hashing.

use super::{FormatError, MARROW_MAGIC, MARROW_VERSION};

/// Common header shared by all asset kinds (64 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct AssetHeader {
    pub magic: u32,
    pub version: u32,
    pub asset_guid: u64,
    pub asset_type: u32,
    pub flags: u32,
    pub header_size: u32,
    pub data_size: u32,
    pub content_hash: u64,
    pub reserved: [u32; 6],
}

impl AssetHeader {
    pub const SIZE: usize = 64;

    pub fn new(
        asset_guid: u64,
        asset_type: u32,
        header_size: u32,
        data_size: u32,
        content_hash: u64,
    ) -> Self {
        Self {
            magic: MARROW_MAGIC,
            version: MARROW_VERSION,
            asset_guid,
            asset_type,
            flags: 0,
            header_size,
            data_size,
            content_hash,
            reserved: [0; 6],
        }
    }

    /// Write header to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.magic.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.version.to_le_bytes());
        bytes[8..16].copy_from_slice(&self.asset_guid.to_le_bytes());
        bytes[16..20].copy_from_slice(&self.asset_type.to_le_bytes());
        bytes[20..24].copy_from_slice(&self.flags.to_le_bytes());
        bytes[24..28].copy_from_slice(&self.header_size.to_le_bytes());
        bytes[28..32].copy_from_slice(&self.data_size.to_le_bytes());
        bytes[32..40].copy_from_slice(&self.content_hash.to_le_bytes());
        for (i, r) in self.reserved.iter().enumerate() {
            bytes[40 + i * 4..44 + i * 4].copy_from_slice(&r.to_le_bytes());
        }
        bytes
    }

    /// Read header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        let u32_at = |off: usize| {
            u32::from_le_bytes([bytes[off], bytes[off + 1], bytes[off + 2], bytes[off + 3]])
        };
        let u64_at = |off: usize| {
            let mut b = [0u8; 8];
            b.copy_from_slice(&bytes[off..off + 8]);
            u64::from_le_bytes(b)
        };
        let mut reserved = [0u32; 6];
        for (i, r) in reserved.iter_mut().enumerate() {
            *r = u32_at(40 + i * 4);
        }
        Some(Self {
            magic: u32_at(0),
            version: u32_at(4),
            asset_guid: u64_at(8),
            asset_type: u32_at(16),
            flags: u32_at(20),
            header_size: u32_at(24),
            data_size: u32_at(28),
            content_hash: u64_at(32),
            reserved,
        })
    }

    /// Parse and validate magic/version. The type tag is dispatched by the
    /// caller; everything else here is a hard failure.
    pub fn read_validated(bytes: &[u8]) -> Result<Self, FormatError> {
        let header = Self::from_bytes(bytes).ok_or(FormatError::Truncated)?;
        if header.magic != MARROW_MAGIC {
            return Err(FormatError::BadMagic(header.magic));
        }
        if header.version == 0 || header.version > MARROW_VERSION {
            return Err(FormatError::UnsupportedVersion(header.version));
        }
        if (header.header_size as usize) < Self::SIZE {
            return Err(FormatError::InvalidData("header size smaller than common header"));
        }
        Ok(header)
    }

    /// Payload slice of a full file image, located via `header_size` and
    /// bounded by `data_size`.
    pub fn payload_of<'a>(&self, bytes: &'a [u8]) -> Result<&'a [u8], FormatError> {
        let start = self.header_size as usize;
        let end = start
            .checked_add(self.data_size as usize)
            .ok_or(FormatError::InvalidData("payload range overflow"))?;
        if end > bytes.len() {
            return Err(FormatError::Truncated);
        }
        Ok(&bytes[start..end])
    }
}
