//! Octant mask and layer bounds unpacking.

use crate::Vertex;
use crate::error::{DecodeError, DecodeResult};
use crate::varint::read_varint;

/// Number of entries in a layer bounds array.
pub const LAYER_BOUNDS_LEN: usize = 10;

/// Unpack octant masks for vertices and compute layer bounds.
///
/// The packed data is a varint count followed by one varint per
/// (layer, octant) pair, giving how many consecutive strip entries belong
/// to it. Every vertex referenced by those entries gets `w = octant`.
/// Each group of 8 pairs starts a new layer; the layer bounds record the
/// strip offset at which each layer begins.
///
/// # Arguments
///
/// * `packed` - The `layer_and_octant_counts` data
/// * `indices` - The unpacked triangle strip indices
/// * `vertices` - Mutable slice of vertices to update
///
/// # Returns
///
/// Layer bounds array; unused trailing entries hold the total strip length.
pub fn unpack_octant_mask_and_layer_bounds(
    packed: &[u8],
    indices: &[u16],
    vertices: &mut [Vertex],
) -> DecodeResult<[usize; LAYER_BOUNDS_LEN]> {
    let mut offset = 0;
    let len = read_varint(packed, &mut offset)? as usize;

    let mut layer_bounds = [0; LAYER_BOUNDS_LEN];
    let mut layer = 0;
    let mut strip_pos = 0;
    let mut total = 0;

    for i in 0..len {
        if i % 8 == 0 {
            let bound = layer_bounds
                .get_mut(layer)
                .ok_or(DecodeError::IndexOutOfRange {
                    field: "layer_bounds",
                    index: layer,
                    len: LAYER_BOUNDS_LEN,
                })?;
            *bound = total;
            layer += 1;
        }

        let count = read_varint(packed, &mut offset)? as usize;
        let octant = (i & 7) as u8;
        for _ in 0..count {
            let vertex_index = *indices.get(strip_pos).ok_or(DecodeError::IndexOutOfRange {
                field: "indices",
                index: strip_pos,
                len: indices.len(),
            })?;
            strip_pos += 1;

            let vertices_len = vertices.len();
            let vertex = vertices.get_mut(usize::from(vertex_index)).ok_or(
                DecodeError::IndexOutOfRange {
                    field: "vertices",
                    index: usize::from(vertex_index),
                    len: vertices_len,
                },
            )?;
            vertex.w = octant;
        }
        total += count;
    }

    for bound in &mut layer_bounds[layer..] {
        *bound = total;
    }

    Ok(layer_bounds)
}
