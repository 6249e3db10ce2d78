//! Texture payload decoding.
//!
//! JPEG textures are passed through unchanged. DXT1 and crunched DXT1
//! textures are decompressed and re-encoded as BMP.

use std::io::Cursor;

use image::{ImageFormat, RgbImage};

use crate::error::{DecodeError, DecodeResult};

pub use rocktree_proto::texture::Format as TextureFormat;

/// Returns true if decoded images of this format are stored bottom-up, so
/// texture `v` coordinates must be flipped.
#[must_use]
pub fn is_bottom_up(format: TextureFormat) -> bool {
    matches!(format, TextureFormat::Dxt1 | TextureFormat::CrnDxt1)
}

/// Image file contents ready to be written next to a mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTexture {
    pub bytes: Vec<u8>,
    /// File extension without the dot (`jpg` or `bmp`).
    pub extension: &'static str,
}

/// Decode a texture payload into an image file.
///
/// # Arguments
///
/// * `format` - Encoding of `data`
/// * `width`, `height` - Texture dimensions in pixels
/// * `data` - The first entry of the texture's `data` field
pub fn decode_texture(
    format: TextureFormat,
    width: u32,
    height: u32,
    data: &[u8],
) -> DecodeResult<DecodedTexture> {
    let decode: fn(&[u8], usize, usize, &mut [u32]) -> Result<(), &'static str> = match format {
        TextureFormat::Jpg => {
            return Ok(DecodedTexture {
                bytes: data.to_vec(),
                extension: "jpg",
            });
        }
        TextureFormat::Dxt1 => texture2ddecoder::decode_bc1,
        TextureFormat::CrnDxt1 => texture2ddecoder::decode_crunch,
        other => return Err(DecodeError::UnsupportedTextureFormat(other as i32)),
    };

    let (w, h) = (width as usize, height as usize);
    let mut pixels = vec![0u32; w * h];
    decode(data, w, h, &mut pixels).map_err(|e| DecodeError::Texture(e.to_string()))?;

    encode_bmp(&pixels, width, height)
}

/// Encode BGRA pixels (as produced by `texture2ddecoder`) into a BMP file.
fn encode_bmp(pixels: &[u32], width: u32, height: u32) -> DecodeResult<DecodedTexture> {
    let rgb: Vec<u8> = pixels
        .iter()
        .flat_map(|pixel| {
            let [b, g, r, _a] = pixel.to_le_bytes();
            [r, g, b]
        })
        .collect();

    let image = RgbImage::from_raw(width, height, rgb).ok_or(DecodeError::InvalidLength {
        field: "texture",
        expected: (width * height * 3) as usize,
        actual: pixels.len() * 3,
    })?;

    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Bmp)
        .map_err(|e| DecodeError::Texture(e.to_string()))?;

    Ok(DecodedTexture {
        bytes: bytes.into_inner(),
        extension: "bmp",
    })
}
