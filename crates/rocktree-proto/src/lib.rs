//! Protobuf message types for the Google Earth rocktree protocol.
//!
//! Only the messages needed to walk bulk metadata and download node data
//! are declared here. Field numbers follow `rocktree.proto`; the schema is
//! proto2, so scalar fields are `Option`s and repeated scalars decode from
//! both packed and unpacked encodings.

#![allow(clippy::doc_markdown)]

/// Identifies a bulk or node by path and epoch.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NodeKey {
    #[prost(string, optional, tag = "1")]
    pub path: Option<String>,
    #[prost(uint32, optional, tag = "2")]
    pub epoch: Option<u32>,
}

/// Planet-level metadata, the entry point of every traversal.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PlanetoidMetadata {
    #[prost(message, optional, tag = "1")]
    pub root_node_metadata: Option<NodeMetadata>,
    #[prost(float, optional, tag = "2")]
    pub radius: Option<f32>,
    #[prost(float, optional, tag = "3")]
    pub min_terrain_altitude: Option<f32>,
    #[prost(float, optional, tag = "4")]
    pub max_terrain_altitude: Option<f32>,
}

/// A page of node metadata covering up to four octree levels below
/// `head_node_key.path`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BulkMetadata {
    #[prost(message, repeated, tag = "1")]
    pub node_metadata: Vec<NodeMetadata>,
    #[prost(message, optional, tag = "2")]
    pub head_node_key: Option<NodeKey>,
    #[prost(double, repeated, tag = "3")]
    pub head_node_center: Vec<f64>,
    #[prost(float, repeated, tag = "4")]
    pub meters_per_texel: Vec<f32>,
    #[prost(uint32, optional, tag = "5")]
    pub default_imagery_epoch: Option<u32>,
    #[prost(uint32, optional, tag = "6")]
    pub default_available_texture_formats: Option<u32>,
    #[prost(uint32, optional, tag = "7")]
    pub default_available_view_dependent_textures: Option<u32>,
    #[prost(uint32, optional, tag = "8")]
    pub default_available_view_dependent_texture_formats: Option<u32>,
}

/// Per-node entry of a [`BulkMetadata`] page.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NodeMetadata {
    /// Relative path (level 1-4) packed together with the node flags.
    #[prost(uint32, optional, tag = "1")]
    pub path_and_flags: Option<u32>,
    #[prost(uint32, optional, tag = "2")]
    pub epoch: Option<u32>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub oriented_bounding_box: Option<Vec<u8>>,
    #[prost(float, optional, tag = "4")]
    pub meters_per_texel: Option<f32>,
    /// Epoch of the bulk rooted at this node, if any.
    #[prost(uint32, optional, tag = "5")]
    pub bulk_metadata_epoch: Option<u32>,
    #[prost(double, repeated, tag = "6")]
    pub processing_oriented_bounding_box: Vec<f64>,
    #[prost(uint32, optional, tag = "7")]
    pub imagery_epoch: Option<u32>,
    #[prost(uint32, optional, tag = "8")]
    pub available_texture_formats: Option<u32>,
    #[prost(uint32, optional, tag = "9")]
    pub available_view_dependent_textures: Option<u32>,
    #[prost(uint32, optional, tag = "10")]
    pub available_view_dependent_texture_formats: Option<u32>,
}

/// Geometry payload of a single node.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NodeData {
    /// Column-major 4x4 transform from mesh space to globe space.
    #[prost(double, repeated, tag = "1")]
    pub matrix_globe_from_mesh: Vec<f64>,
    #[prost(message, repeated, tag = "2")]
    pub meshes: Vec<Mesh>,
    #[prost(uint32, repeated, tag = "3")]
    pub copyright_ids: Vec<u32>,
    #[prost(message, optional, tag = "4")]
    pub node_key: Option<NodeKey>,
    #[prost(double, repeated, tag = "5")]
    pub kml_bounding_box: Vec<f64>,
    #[prost(message, optional, tag = "6")]
    pub water_mesh: Option<Mesh>,
    #[prost(message, repeated, tag = "7")]
    pub overlay_surface_meshes: Vec<Mesh>,
    /// Shared normal lookup table referenced by [`Mesh::normals`].
    #[prost(bytes = "vec", optional, tag = "8")]
    pub for_normals: Option<Vec<u8>>,
}

/// Packed mesh buffers.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Mesh {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub vertices: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub texture_coords: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub indices: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub octant_ranges: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "5")]
    pub layer_counts: Option<Vec<u8>>,
    #[prost(message, repeated, tag = "6")]
    pub texture: Vec<Texture>,
    #[prost(bytes = "vec", optional, tag = "7")]
    pub texture_coordinates: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "8")]
    pub layer_and_octant_counts: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "9")]
    pub vertex_alphas: Option<Vec<u8>>,
    #[prost(float, repeated, tag = "10")]
    pub uv_offset_and_scale: Vec<f32>,
    #[prost(bytes = "vec", optional, tag = "11")]
    pub normals: Option<Vec<u8>>,
    #[prost(uint32, optional, tag = "12")]
    pub mesh_id: Option<u32>,
    #[prost(int64, repeated, tag = "13")]
    pub skirt_flags: Vec<i64>,
    #[prost(bytes = "vec", optional, tag = "16")]
    pub normals_dev: Option<Vec<u8>>,
}

/// Texture image attached to a mesh.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Texture {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub data: Vec<Vec<u8>>,
    #[prost(enumeration = "texture::Format", optional, tag = "2")]
    pub format: Option<i32>,
    #[prost(uint32, optional, tag = "3", default = "256")]
    pub width: Option<u32>,
    #[prost(uint32, optional, tag = "4", default = "256")]
    pub height: Option<u32>,
    #[prost(int32, optional, tag = "5")]
    pub view_direction: Option<i32>,
    #[prost(uint32, optional, tag = "6")]
    pub mesh_id: Option<u32>,
}

/// Nested types for [`Texture`].
pub mod texture {
    /// Texture encodings served by the NodeData endpoint.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Format {
        Jpg = 1,
        Dxt1 = 2,
        Etc1 = 3,
        Pvrtc2 = 4,
        Pvrtc4 = 5,
        CrnDxt1 = 6,
    }
}
