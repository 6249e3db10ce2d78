//! Decode packed mesh data from Google Earth protobuf messages.
//!
//! This crate provides pure synchronous decoding functions for unpacking
//! mesh data from Google Earth's rocktree format. All functions are designed
//! to be called from any threading context - the library user controls
//! parallelism.
//!
//! # Design principles
//!
//! - **Synchronous**: No async, no threading primitives
//! - **User-controlled parallelism**: Client decides how to parallelize
//! - **Fallible**: Malformed buffers produce a [`DecodeError`], never a panic
//!
//! # Key functions
//!
//! - [`unpack_vertices`]: Delta-decode XYZ vertex positions
//! - [`unpack_tex_coords`]: Unpack UV texture coordinates
//! - [`unpack_indices`]: Decode varint-encoded triangle strip indices
//! - [`unpack_octant_mask_and_layer_bounds`]: Tag vertices with their octant
//! - [`unpack_for_normals`] / [`unpack_normals`]: Per-vertex normals
//! - [`unpack_path_and_flags`]: Extract octant path and flags from metadata
//! - [`decode_texture`]: Turn a texture payload into an image file

mod error;
mod varint;

pub mod indices;
pub mod normals;
pub mod octants;
pub mod path;
pub mod texcoords;
pub mod texture;
pub mod vertices;

pub use error::{DecodeError, DecodeResult};
pub use indices::unpack_indices;
pub use normals::{unpack_for_normals, unpack_normals};
pub use octants::unpack_octant_mask_and_layer_bounds;
pub use path::unpack_path_and_flags;
pub use texcoords::unpack_tex_coords;
pub use texture::{DecodedTexture, TextureFormat, decode_texture, is_bottom_up};
pub use varint::read_varint;
pub use vertices::unpack_vertices;

/// Packed vertex record (8 bytes per vertex).
///
/// Byte layout, in order:
/// - `x`, `y`, `z`: 8-bit position components (delta-decoded)
/// - `w`: Octant tag (which of 8 sub-octants this vertex belongs to)
/// - `uv`: little-endian 16-bit `u` followed by little-endian 16-bit `v`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct Vertex {
    pub x: u8,
    pub y: u8,
    pub z: u8,
    pub w: u8,
    pub uv: [u8; 4],
}

const _: () = assert!(std::mem::size_of::<Vertex>() == 8);

impl Vertex {
    /// Quantized texture `u` (`u_hi * 256 + u_lo`).
    #[must_use]
    pub fn u(self) -> u16 {
        u16::from_le_bytes([self.uv[0], self.uv[1]])
    }

    /// Quantized texture `v` (`v_hi * 256 + v_lo`).
    #[must_use]
    pub fn v(self) -> u16 {
        u16::from_le_bytes([self.uv[2], self.uv[3]])
    }

    pub fn set_uv(&mut self, u: u16, v: u16) {
        let [u_lo, u_hi] = u.to_le_bytes();
        let [v_lo, v_hi] = v.to_le_bytes();
        self.uv = [u_lo, u_hi, v_lo, v_hi];
    }
}

/// UV offset and scale for texture coordinate mapping.
///
/// A quantized coordinate maps to `(q + offset) * scale`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UvTransform {
    pub offset: glam::Vec2,
    pub scale: glam::Vec2,
}

/// Result of unpacking path and flags from node metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathAndFlags {
    /// Relative octant path string (e.g., "0123").
    pub path: String,
    /// Flags from the node metadata.
    pub flags: u32,
    /// Path level (1-4 for relative paths).
    pub level: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_uv_bytes_are_little_endian() {
        let mut vertex = Vertex::default();
        vertex.set_uv(0x1234, 0xabcd);
        assert_eq!(vertex.uv, [0x34, 0x12, 0xcd, 0xab]);
        assert_eq!(vertex.u(), 0x1234);
        assert_eq!(vertex.v(), 0xabcd);
    }
}
