//! Node data: decoded geometry for one octant.

use glam::{DMat4, Vec2};
use prost::Message;
use rocktree_decode::octants::LAYER_BOUNDS_LEN;
use rocktree_decode::{
    DecodedTexture, TextureFormat, UvTransform, Vertex, decode_texture, unpack_for_normals,
    unpack_indices, unpack_normals, unpack_octant_mask_and_layer_bounds, unpack_tex_coords,
    unpack_vertices,
};
use rocktree_proto as proto;

use crate::bulk::BulkMetadata;
use crate::error::{Error, Result};

/// Request for one node's geometry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeRequest {
    pub path: String,
    pub epoch: u32,
    pub texture_format: TextureFormat,
    pub imagery_epoch: Option<u32>,
}

impl NodeRequest {
    pub fn new(
        path: impl Into<String>,
        epoch: u32,
        texture_format: TextureFormat,
        imagery_epoch: Option<u32>,
    ) -> Self {
        Self {
            path: path.into(),
            epoch,
            texture_format,
            imagery_epoch,
        }
    }

    /// Build the request for the node at `index` of `bulk`.
    #[must_use]
    pub fn from_metadata(bulk: &BulkMetadata, index: usize) -> Option<Self> {
        bulk.node(index).map(|meta| {
            Self::new(
                meta.path.clone(),
                meta.epoch,
                meta.texture_format,
                meta.imagery_epoch,
            )
        })
    }
}

/// Encoded texture image attached to a mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Texture {
    fn from_proto(proto: &proto::Texture) -> Result<Self> {
        let raw = proto.format.ok_or(Error::MissingField("texture.format"))?;
        let format = TextureFormat::try_from(raw)
            .map_err(|_| rocktree_decode::DecodeError::UnsupportedTextureFormat(raw))?;
        let data = proto
            .data
            .first()
            .cloned()
            .ok_or(Error::MissingField("texture.data"))?;

        Ok(Self {
            format,
            width: proto.width(),
            height: proto.height(),
            data,
        })
    }

    /// Convert to an image file (JPEG passthrough, DXT variants to BMP).
    pub fn decode(&self) -> Result<DecodedTexture> {
        Ok(decode_texture(
            self.format,
            self.width,
            self.height,
            &self.data,
        )?)
    }
}

/// One textured triangle-strip mesh.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    /// Triangle strip indices into `vertices`.
    pub indices: Vec<u16>,
    /// Four bytes per vertex, present when the node ships a normal table.
    pub normals: Option<Vec<u8>>,
    /// Present when the mesh carries texture coordinates.
    pub uv_transform: Option<UvTransform>,
    /// Strip offset at which each octant layer starts.
    pub layer_bounds: Option<[usize; LAYER_BOUNDS_LEN]>,
    pub texture: Option<Texture>,
}

impl Mesh {
    fn from_proto(proto: &proto::Mesh, normal_table: Option<&[u8]>) -> Result<Self> {
        let mut vertices = unpack_vertices(proto.vertices.as_deref().unwrap_or_default())?;

        let uv_transform = match proto.texture_coordinates.as_deref() {
            Some(packed) => {
                let quantized = unpack_tex_coords(packed, &mut vertices)?;
                Some(match proto.uv_offset_and_scale[..] {
                    [u_off, v_off, u_scale, v_scale] => UvTransform {
                        offset: Vec2::new(u_off, v_off),
                        scale: Vec2::new(u_scale, v_scale),
                    },
                    _ => flip_v(quantized),
                })
            }
            None => None,
        };

        let indices = unpack_indices(proto.indices.as_deref().unwrap_or_default())?;

        let layer_bounds = proto
            .layer_and_octant_counts
            .as_deref()
            .map(|packed| unpack_octant_mask_and_layer_bounds(packed, &indices, &mut vertices))
            .transpose()?;

        let normals = match (proto.normals.as_deref(), normal_table) {
            (Some(packed), Some(table)) => Some(unpack_normals(packed, table)?),
            _ => None,
        };

        let texture = proto.texture.first().map(Texture::from_proto).transpose()?;

        Ok(Self {
            vertices,
            indices,
            normals,
            uv_transform,
            layer_bounds,
            texture,
        })
    }
}

/// Move the quantized origin to the top edge: `offset.y -= 1/scale.y`,
/// `scale.y = -scale.y`.
fn flip_v(mut transform: UvTransform) -> UvTransform {
    transform.offset.y -= 1.0 / transform.scale.y;
    transform.scale.y *= -1.0;
    transform
}

/// Decoded node payload.
#[derive(Debug, Clone)]
pub struct Node {
    pub path: String,
    pub meshes: Vec<Mesh>,
    /// Mesh space to globe space.
    pub matrix_globe_from_mesh: DMat4,
}

impl Node {
    /// Decode a `NodeData` message fetched for `path`.
    pub fn from_proto(proto: &proto::NodeData, path: impl Into<String>) -> Result<Self> {
        let matrix_globe_from_mesh = match proto.matrix_globe_from_mesh.len() {
            16 => DMat4::from_cols_slice(&proto.matrix_globe_from_mesh),
            _ => return Err(Error::MissingField("matrix_globe_from_mesh")),
        };

        let normal_table = proto
            .for_normals
            .as_deref()
            .map(unpack_for_normals)
            .transpose()?;

        let meshes = proto
            .meshes
            .iter()
            .map(|mesh| Mesh::from_proto(mesh, normal_table.as_deref()))
            .collect::<Result<_>>()?;

        Ok(Self {
            path: path.into(),
            meshes,
            matrix_globe_from_mesh,
        })
    }

    /// Decode a raw `NodeData` response body.
    pub fn from_bytes(bytes: &[u8], path: impl Into<String>) -> Result<Self> {
        let proto = proto::NodeData::decode(bytes)?;
        Self::from_proto(&proto, path)
    }
}
