//! Index unpacking.

use crate::error::{DecodeError, DecodeResult};
use crate::varint::read_varint;

/// Unpack varint-encoded triangle strip indices.
///
/// The buffer starts with the strip length, followed by one varint per
/// strip entry. Each entry is `zeros - value`, where `zeros` counts the
/// zero values seen so far, so a zero introduces the next new vertex.
///
/// The indices form a triangle strip, where degenerate triangles
/// (with repeated vertices) are used for strip restarts.
pub fn unpack_indices(packed: &[u8]) -> DecodeResult<Vec<u16>> {
    let mut offset = 0;
    let len = read_varint(packed, &mut offset)? as usize;

    // Every entry takes at least one byte.
    let mut strip = Vec::with_capacity(len.min(packed.len()));
    let mut zeros = 0u32;
    for _ in 0..len {
        let value = read_varint(packed, &mut offset)?;
        let index = zeros
            .checked_sub(value)
            .and_then(|index| u16::try_from(index).ok())
            .ok_or(DecodeError::IndexOutOfRange {
                field: "indices",
                index: value as usize,
                len: zeros as usize,
            })?;
        strip.push(index);
        if value == 0 {
            zeros += 1;
        }
    }

    Ok(strip)
}
