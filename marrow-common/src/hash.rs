//! 64-bit content hashing and name-derived GUIDs
//!
//! Every baked asset carries an xxh64 digest of its payload bytes in the
//! common header; the asset manager uses it for deduplication. Asset GUIDs
//! are derived from source names with the same primitive under a fixed seed,
//! so re-baking the same source always yields the same identity.

use xxhash_rust::xxh64::xxh64;

/// Seed for name-derived GUIDs, kept distinct from the content-hash seed so
/// a payload can never collide with its own identifier by construction.
const GUID_SEED: u64 = 0x4d41_5252_4f57_0001;

/// Digest of a payload byte buffer, stored in [`crate::AssetHeader::content_hash`].
pub fn content_hash64(data: &[u8]) -> u64 {
    xxh64(data, 0)
}

/// Stable 64-bit identifier derived from an asset name.
///
/// Returns 0 for an empty name; callers treat 0 as "no GUID".
pub fn guid64_from_name(name: &str) -> u64 {
    if name.is_empty() {
        return 0;
    }
    xxh64(name.as_bytes(), GUID_SEED)
}

/// Mix two digests into one (order-dependent).
///
/// Used for assets whose payload is hashed in separately-owned blocks,
/// e.g. a mesh's vertex and index buffers.
pub fn combine_hash64(a: u64, b: u64) -> u64 {
    a ^ (b
        .wrapping_add(0x9e37_79b9)
        .wrapping_add(a << 6)
        .wrapping_add(a >> 2))
}
