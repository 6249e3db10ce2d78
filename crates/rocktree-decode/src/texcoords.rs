//! Texture coordinate unpacking.

use glam::Vec2;

use crate::error::{DecodeError, DecodeResult};
use crate::{UvTransform, Vertex};

/// Unpack texture coordinates into vertex array.
///
/// Input format: 4-byte header (`u_mod - 1`, `v_mod - 1` as little-endian
/// u16) followed by 4*N bytes of UV data laid out as
/// `[u_lo.., v_lo.., u_hi.., v_hi..]`. The UV values are delta-encoded with
/// modulo arithmetic.
///
/// # Arguments
///
/// * `packed` - The packed texture coordinate data
/// * `vertices` - Mutable slice of vertices to update
///
/// # Returns
///
/// The UV transform (offset and scale) matching the quantization.
pub fn unpack_tex_coords(packed: &[u8], vertices: &mut [Vertex]) -> DecodeResult<UvTransform> {
    let count = vertices.len();
    if packed.len() != 4 + 4 * count {
        return Err(DecodeError::InvalidLength {
            field: "texture_coordinates",
            expected: 4 + 4 * count,
            actual: packed.len(),
        });
    }

    let u_mod = 1 + u32::from(u16::from_le_bytes([packed[0], packed[1]]));
    let v_mod = 1 + u32::from(u16::from_le_bytes([packed[2], packed[3]]));
    let data = &packed[4..];

    let (mut u, mut v) = (0u32, 0u32);
    for (i, vertex) in vertices.iter_mut().enumerate() {
        u = (u + u32::from(data[i]) + (u32::from(data[2 * count + i]) << 8)) % u_mod;
        v = (v + u32::from(data[count + i]) + (u32::from(data[3 * count + i]) << 8)) % v_mod;
        vertex.set_uv(u as u16, v as u16);
    }

    Ok(UvTransform {
        offset: Vec2::splat(0.5),
        scale: Vec2::new(1.0 / u_mod as f32, 1.0 / v_mod as f32),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_modular_deltas() {
        let mut vertices = vec![Vertex::default(); 2];
        // u_mod = 1000, v_mod = 16.
        let packed = [
            0xe7, 0x03, 0x0f, 0x00, // header
            0x10, 0xf0, // u_lo
            0x05, 0x0c, // v_lo
            0x01, 0x02, // u_hi
            0x00, 0x00, // v_hi
        ];

        let transform = unpack_tex_coords(&packed, &mut vertices).unwrap();

        // 0x110 = 272, then (272 + 0x2f0) % 1000 = 24.
        assert_eq!(vertices[0].u(), 272);
        assert_eq!(vertices[1].u(), 24);
        // 5, then (5 + 12) % 16 = 1.
        assert_eq!(vertices[0].v(), 5);
        assert_eq!(vertices[1].v(), 1);
        assert_eq!(transform.offset, Vec2::splat(0.5));
        assert!((transform.scale.x - 0.001).abs() < 1e-9);
        assert!((transform.scale.y - 1.0 / 16.0).abs() < 1e-9);
    }

    #[test]
    fn length_must_match_vertex_count() {
        let mut vertices = vec![Vertex::default(); 3];
        assert_eq!(
            unpack_tex_coords(&[0; 8], &mut vertices),
            Err(DecodeError::InvalidLength {
                field: "texture_coordinates",
                expected: 16,
                actual: 8,
            })
        );
    }
}
