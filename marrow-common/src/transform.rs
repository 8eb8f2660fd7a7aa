//! TRS transform and axis-aligned bounding box types
//!
//! [`Transform`] is the 40-byte wire record shared by bone bind poses and
//! animation track samples: translation f32x3, rotation quaternion f32x4
//! (x, y, z, w), scale f32x3, little-endian.

use glam::{Mat4, Quat, Vec3};

/// Local translation/rotation/scale transform (40-byte wire record).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// Size of the wire record in bytes (12 + 16 + 12).
    pub const SIZE: usize = 40;

    /// Identity transform (no translation, no rotation, unit scale).
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Decompose an affine matrix into TRS.
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Recompose into an affine matrix (scale, then rotation, then translation).
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Write to raw bytes (40 bytes)
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        let t = self.translation.to_array();
        let r = self.rotation.to_array();
        let s = self.scale.to_array();
        for (i, &f) in t.iter().enumerate() {
            bytes[i * 4..(i + 1) * 4].copy_from_slice(&f.to_le_bytes());
        }
        for (i, &f) in r.iter().enumerate() {
            bytes[12 + i * 4..12 + (i + 1) * 4].copy_from_slice(&f.to_le_bytes());
        }
        for (i, &f) in s.iter().enumerate() {
            bytes[28 + i * 4..28 + (i + 1) * 4].copy_from_slice(&f.to_le_bytes());
        }
        bytes
    }

    /// Read from raw bytes (40 bytes)
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        let f = |off: usize| {
            f32::from_le_bytes([bytes[off], bytes[off + 1], bytes[off + 2], bytes[off + 3]])
        };
        Some(Self {
            translation: Vec3::new(f(0), f(4), f(8)),
            rotation: Quat::from_xyzw(f(12), f(16), f(20), f(24)),
            scale: Vec3::new(f(28), f(32), f(36)),
        })
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Axis-aligned bounding box accumulated over raw vertex positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Sentinel box that any grown point will replace.
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Component-wise min/max accumulation.
    pub fn grow(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// False until at least one point was grown.
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_roundtrip() {
        let t = Transform {
            translation: Vec3::new(1.0, -2.0, 3.5),
            rotation: Quat::from_rotation_y(0.7),
            scale: Vec3::new(2.0, 2.0, 0.5),
        };
        let bytes = t.to_bytes();
        assert_eq!(bytes.len(), Transform::SIZE);
        let parsed = Transform::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, t);
    }

    #[test]
    fn test_transform_from_short_bytes() {
        assert!(Transform::from_bytes(&[0u8; 39]).is_none());
    }

    #[test]
    fn test_identity_decompose() {
        let t = Transform::from_matrix(&Mat4::IDENTITY);
        assert_eq!(t, Transform::IDENTITY);
    }

    #[test]
    fn test_matrix_roundtrip() {
        let t = Transform {
            translation: Vec3::new(0.5, 1.5, -4.0),
            rotation: Quat::from_rotation_z(1.2),
            scale: Vec3::splat(3.0),
        };
        let back = Transform::from_matrix(&t.to_matrix());
        assert!((back.translation - t.translation).length() < 1e-5);
        assert!(back.rotation.dot(t.rotation).abs() > 1.0 - 1e-5);
        assert!((back.scale - t.scale).length() < 1e-5);
    }

    #[test]
    fn test_aabb_grow() {
        let mut aabb = Aabb::EMPTY;
        assert!(!aabb.is_valid());
        aabb.grow(Vec3::new(1.0, 2.0, 3.0));
        aabb.grow(Vec3::new(-1.0, 0.0, 5.0));
        assert!(aabb.is_valid());
        assert_eq!(aabb.min, Vec3::new(-1.0, 0.0, 3.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 2.0, 5.0));
    }
}
