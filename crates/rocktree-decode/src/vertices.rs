//! Vertex unpacking.

use crate::Vertex;
use crate::error::{DecodeError, DecodeResult};

/// Unpack delta-encoded vertex positions.
///
/// Input format: 3*N bytes arranged as [X0,X1,...,Xn, Y0,Y1,...,Yn, Z0,Z1,...,Zn]
/// Each component is delta-encoded (cumulative sum, wrapping at 256).
///
/// Output: N vertices with x, y, z filled in (w and uv are zeroed).
pub fn unpack_vertices(packed: &[u8]) -> DecodeResult<Vec<Vertex>> {
    if packed.len() % 3 != 0 {
        return Err(DecodeError::Misaligned {
            field: "vertices",
            len: packed.len(),
            stride: 3,
        });
    }

    let count = packed.len() / 3;
    let (xs, rest) = packed.split_at(count);
    let (ys, zs) = rest.split_at(count);

    let (mut x, mut y, mut z) = (0u8, 0u8, 0u8);
    let vertices = xs
        .iter()
        .zip(ys)
        .zip(zs)
        .map(|((&dx, &dy), &dz)| {
            x = x.wrapping_add(dx);
            y = y.wrapping_add(dy);
            z = z.wrapping_add(dz);
            Vertex {
                x,
                y,
                z,
                ..Vertex::default()
            }
        })
        .collect();

    Ok(vertices)
}
