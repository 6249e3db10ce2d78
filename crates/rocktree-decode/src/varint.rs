//! Variable-length integer reading.

use crate::error::{DecodeError, DecodeResult};

/// Read a little-endian base-128 varint starting at `*offset`.
///
/// On success `offset` is advanced past the varint.
pub fn read_varint(data: &[u8], offset: &mut usize) -> DecodeResult<u32> {
    let start = *offset;
    let mut value = 0u32;
    let mut shift = 0u32;

    loop {
        if shift >= 32 {
            return Err(DecodeError::VarintOverflow { offset: start });
        }
        let byte = *data
            .get(*offset)
            .ok_or(DecodeError::UnexpectedEof { offset: *offset })?;
        *offset += 1;

        value |= u32::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}
