//! Normal vector unpacking.

use crate::error::{DecodeError, DecodeResult};

/// Widen a quantized component stored with `bits` bits.
fn expand_bits(value: i32, bits: i32) -> i32 {
    if bits <= 4 {
        return (value << bits) + (value & ((1 << bits) - 1));
    }
    if bits <= 6 {
        let r = 8 - bits;
        let shifted = value << bits;
        return shifted + (shifted >> r) + (shifted >> r >> r) + (shifted >> r >> r >> r);
    }
    -(value & 1)
}

fn to_byte(component: f64) -> u8 {
    component.round().clamp(0.0, 255.0) as u8
}

/// Decode one octahedron-encoded normal into 3 bytes centred on 127.
fn decode_octahedral(a: f64, f: f64) -> [u8; 3] {
    let (mut b, mut c) = (a, f);
    let mut g = b + c;
    let mut h = b - c;
    let mut sign = 1.0;

    if !((0.5..=1.5).contains(&g) && (-0.5..=0.5).contains(&h)) {
        sign = -1.0;
        if g <= 0.5 {
            b = 0.5 - f;
            c = 0.5 - a;
        } else if g >= 1.5 {
            b = 1.5 - f;
            c = 1.5 - a;
        } else if h <= -0.5 {
            b = f - 0.5;
            c = a + 0.5;
        } else {
            b = f + 0.5;
            c = a - 0.5;
        }
        g = b + c;
        h = b - c;
    }

    let x = (2.0 * g - 1.0)
        .min(3.0 - 2.0 * g)
        .min((2.0 * h + 1.0).min(1.0 - 2.0 * h))
        * sign;
    let y = 2.0 * b - 1.0;
    let z = 2.0 * c - 1.0;
    let m = 127.0 / (x * x + y * y + z * z).sqrt();

    [
        to_byte(m * x + 127.0),
        to_byte(m * y + 127.0),
        to_byte(m * z + 127.0),
    ]
}

/// Unpack normal data from `NodeData`'s `for_normals` field.
///
/// This produces a lookup table of 3-byte normals that can be
/// indexed by the mesh's normals field.
///
/// Input format: little-endian u16 count, one byte of bit depth, then
/// `count` first components followed by `count` second components.
///
/// # Returns
///
/// A vector of RGB normal values (3 bytes per normal).
pub fn unpack_for_normals(for_normals: &[u8]) -> DecodeResult<Vec<u8>> {
    if for_normals.len() < 3 {
        return Err(DecodeError::InvalidLength {
            field: "for_normals",
            expected: 3,
            actual: for_normals.len(),
        });
    }

    let count = usize::from(u16::from_le_bytes([for_normals[0], for_normals[1]]));
    let bits = i32::from(for_normals[2]);
    let data = &for_normals[3..];
    if data.len() != 2 * count {
        return Err(DecodeError::InvalidLength {
            field: "for_normals",
            expected: 3 + 2 * count,
            actual: for_normals.len(),
        });
    }

    let mut table = Vec::with_capacity(3 * count);
    for i in 0..count {
        let a = f64::from(expand_bits(i32::from(data[i]), bits)) / 255.0;
        let f = f64::from(expand_bits(i32::from(data[count + i]), bits)) / 255.0;
        table.extend_from_slice(&decode_octahedral(a, f));
    }

    Ok(table)
}

/// Unpack per-vertex normals using the normal lookup table.
///
/// # Arguments
///
/// * `mesh_normals` - The mesh's normals field: `count` low bytes followed
///   by `count` high bytes of indices into the lookup table
/// * `table` - The unpacked normal lookup table from [`unpack_for_normals`]
///
/// # Returns
///
/// A vector of RGBA normal values (4 bytes per vertex, A is padding).
pub fn unpack_normals(mesh_normals: &[u8], table: &[u8]) -> DecodeResult<Vec<u8>> {
    if mesh_normals.len() % 2 != 0 {
        return Err(DecodeError::Misaligned {
            field: "normals",
            len: mesh_normals.len(),
            stride: 2,
        });
    }

    let count = mesh_normals.len() / 2;
    let table_len = table.len() / 3;
    let mut normals = Vec::with_capacity(4 * count);
    for i in 0..count {
        let j = usize::from(u16::from_le_bytes([mesh_normals[i], mesh_normals[count + i]]));
        if j >= table_len {
            return Err(DecodeError::IndexOutOfRange {
                field: "normals",
                index: j,
                len: table_len,
            });
        }
        normals.extend_from_slice(&table[3 * j..3 * j + 3]);
        normals.push(0);
    }

    Ok(normals)
}
