//! Wavefront OBJ/MTL output.
//!
//! Nodes are appended to a single `model.obj` with materials in
//! `model.mtl` and one image per textured mesh. Vertex, texture coordinate
//! and normal numbering is global across the file, so each node is rendered
//! and appended while holding the writer's lock.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use glam::DVec4;
use rocktree::{Mesh, Node};
use rocktree_decode::is_bottom_up;

use crate::error::ObjError;

pub const OBJ_FILE: &str = "model.obj";
pub const MTL_FILE: &str = "model.mtl";

/// Running totals of emitted `v`, `vt` and `vn` records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub vertices: usize,
    pub uvs: usize,
    pub normals: usize,
}

/// Rendered output for one node, written only once complete.
#[derive(Default)]
struct NodeOutput {
    obj: String,
    mtl: String,
    textures: Vec<(String, Vec<u8>)>,
}

/// Appends nodes to an OBJ model in a directory.
#[derive(Debug)]
pub struct ObjWriter {
    dir: PathBuf,
    counters: Mutex<Counters>,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ObjError + '_ {
    move |source| ObjError::Io {
        path: path.to_owned(),
        source,
    }
}

impl ObjWriter {
    /// Start a fresh model in `dir`, replacing any previous one.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, ObjError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(io_error(&dir))?;

        let obj_path = dir.join(OBJ_FILE);
        fs::write(&obj_path, format!("mtllib {MTL_FILE}\n")).map_err(io_error(&obj_path))?;
        let mtl_path = dir.join(MTL_FILE);
        fs::write(&mtl_path, "").map_err(io_error(&mtl_path))?;

        Ok(Self {
            dir,
            counters: Mutex::new(Counters::default()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn obj_path(&self) -> PathBuf {
        self.dir.join(OBJ_FILE)
    }

    pub fn counters(&self) -> Counters {
        *self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append every mesh of `node`, skipping triangles whose octant tag is in
    /// `exclude`.
    ///
    /// Nothing is written if any mesh fails to render.
    pub fn write_node(&self, path: &str, node: &Node, exclude: &[u8]) -> Result<(), ObjError> {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);

        let mut next = *counters;
        let mut output = NodeOutput::default();
        for (i, mesh) in node.meshes.iter().enumerate() {
            render_mesh(path, i, node, mesh, exclude, &mut next, &mut output)?;
        }

        for (name, bytes) in &output.textures {
            let texture_path = self.dir.join(name);
            fs::write(&texture_path, bytes).map_err(io_error(&texture_path))?;
        }
        append(&self.dir.join(OBJ_FILE), &output.obj)?;
        append(&self.dir.join(MTL_FILE), &output.mtl)?;

        *counters = next;
        Ok(())
    }
}

fn append(path: &Path, text: &str) -> Result<(), ObjError> {
    OpenOptions::new()
        .append(true)
        .open(path)
        .and_then(|mut file| file.write_all(text.as_bytes()))
        .map_err(io_error(path))
}

fn render_mesh(
    path: &str,
    mesh_index: usize,
    node: &Node,
    mesh: &Mesh,
    exclude: &[u8],
    counters: &mut Counters,
    output: &mut NodeOutput,
) -> Result<(), ObjError> {
    let name = format!("{path}_{mesh_index}");
    let material = format!("tex_{name}");
    let base = *counters;
    let obj = &mut output.obj;

    let normal_count = mesh.normals.as_ref().map(|normals| normals.len());
    if normal_count.is_some_and(|len| len != 4 * mesh.vertices.len()) {
        return Err(ObjError::NormalCountMismatch {
            node: path.to_owned(),
            mesh: mesh_index,
            normals: normal_count.unwrap_or_default() / 4,
            vertices: mesh.vertices.len(),
        });
    }

    let texture = match &mesh.texture {
        Some(texture) => {
            let decoded = texture.decode().map_err(|source| ObjError::Texture {
                node: path.to_owned(),
                mesh: mesh_index,
                source,
            })?;
            Some((texture.format, decoded))
        }
        None => None,
    };

    // Writing to a String cannot fail.
    if texture.is_some() {
        let _ = writeln!(obj, "usemtl {material}");
    }
    let _ = writeln!(obj, "o planet_{name}");

    let _ = writeln!(obj, "# vertices");
    let matrix = node.matrix_globe_from_mesh;
    for vertex in &mesh.vertices {
        let local = DVec4::new(
            f64::from(vertex.x),
            f64::from(vertex.y),
            f64::from(vertex.z),
            1.0,
        );
        let globe = matrix * local;
        let _ = writeln!(obj, "v {} {} {}", globe.x, globe.y, globe.z);
    }
    counters.vertices += mesh.vertices.len();

    if let Some(transform) = mesh.uv_transform {
        let flip = texture
            .as_ref()
            .is_some_and(|(format, _)| is_bottom_up(*format));
        let _ = writeln!(obj, "# UV");
        for vertex in &mesh.vertices {
            let u = (f64::from(vertex.u()) + f64::from(transform.offset.x))
                * f64::from(transform.scale.x);
            let v = (f64::from(vertex.v()) + f64::from(transform.offset.y))
                * f64::from(transform.scale.y);
            let v = if flip { 1.0 - v } else { v };
            let _ = writeln!(obj, "vt {u} {v}");
        }
        counters.uvs += mesh.vertices.len();
    }

    if let Some(normals) = &mesh.normals {
        let _ = writeln!(obj, "# Normals");
        for normal in normals.chunks_exact(4) {
            let [x, y, z] = [0, 1, 2].map(|i| i32::from(normal[i]) - 127);
            let _ = writeln!(obj, "vn {x} {y} {z}");
        }
        counters.normals += normals.len() / 4;
    }

    let _ = writeln!(obj, "# faces");
    let groups = triangle_groups(path, mesh_index, mesh, exclude)?;
    let has_uvs = mesh.uv_transform.is_some();
    let has_normals = mesh.normals.is_some();
    for triangle in groups.values().flatten() {
        let corners = triangle.map(|index| {
            let (v, t, n) = (
                index + 1 + base.vertices,
                index + 1 + base.uvs,
                index + 1 + base.normals,
            );
            match (has_uvs, has_normals) {
                (true, true) => format!("{v}/{t}/{n}"),
                (true, false) => format!("{v}/{t}"),
                (false, true) => format!("{v}//{n}"),
                (false, false) => format!("{v}"),
            }
        });
        let _ = writeln!(obj, "f {} {} {}", corners[0], corners[1], corners[2]);
    }

    if let Some((_, decoded)) = texture {
        let file = format!("{material}.{}", decoded.extension);
        let _ = write!(
            output.mtl,
            "newmtl {material}\nKd 1.000 1.000 1.000\nd 1.0\nillum 0\nmap_Kd {file}\n\n"
        );
        output.textures.push((file, decoded.bytes));
    }

    Ok(())
}

/// Strip triangles grouped by octant tag, excluded tags removed.
fn triangle_groups(
    path: &str,
    mesh_index: usize,
    mesh: &Mesh,
    exclude: &[u8],
) -> Result<BTreeMap<u8, Vec<[usize; 3]>>, ObjError> {
    let end = mesh.layer_bounds.map(|bounds| bounds[3]);
    let tag = |index: u16| {
        let index = usize::from(index);
        mesh.vertices
            .get(index)
            .map(|vertex| (index, vertex.w))
            .ok_or_else(|| ObjError::InvalidIndex {
                node: path.to_owned(),
                mesh: mesh_index,
                index,
                len: mesh.vertices.len(),
            })
    };

    let mut groups: BTreeMap<u8, Vec<[usize; 3]>> = BTreeMap::new();
    for (i, window) in mesh.indices.windows(3).enumerate() {
        if end == Some(i) {
            break;
        }
        let [a, b, c] = [window[0], window[1], window[2]];
        if a == b || a == c || b == c {
            continue;
        }

        let (a, wa) = tag(a)?;
        let (b, wb) = tag(b)?;
        let (c, wc) = tag(c)?;
        if wa != wb || wb != wc {
            return Err(ObjError::VertexLayerMismatch {
                node: path.to_owned(),
                mesh: mesh_index,
                strip_index: i,
            });
        }
        if exclude.contains(&wa) {
            continue;
        }

        let triangle = if i % 2 == 1 { [a, c, b] } else { [a, b, c] };
        groups.entry(wa).or_default().push(triangle);
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use glam::{DMat4, DVec3, Vec2};
    use rocktree::{Texture, TextureFormat, UvTransform};

    use super::*;
    use crate::testing::triangle_node;

    fn read(dir: &Path, name: &str) -> String {
        fs::read_to_string(dir.join(name)).unwrap()
    }

    fn lines<'a>(text: &'a str, prefix: &str) -> Vec<&'a str> {
        text.lines().filter(|line| line.starts_with(prefix)).collect()
    }

    #[test]
    fn create_starts_an_empty_model() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ObjWriter::create(dir.path().join("out")).unwrap();
        assert_eq!(read(writer.dir(), OBJ_FILE), "mtllib model.mtl\n");
        assert_eq!(read(writer.dir(), MTL_FILE), "");
        assert_eq!(writer.counters(), Counters::default());
    }

    #[test]
    fn writes_transformed_vertices_and_faces() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ObjWriter::create(dir.path()).unwrap();

        let mut node = triangle_node("21", &[0]);
        node.matrix_globe_from_mesh = DMat4::from_translation(DVec3::new(100.0, 0.0, 0.0));
        writer.write_node("21", &node, &[]).unwrap();

        let obj = read(dir.path(), OBJ_FILE);
        assert_eq!(
            lines(&obj, "v "),
            vec!["v 100 0 0", "v 101 1 0", "v 102 2 0"]
        );
        assert_eq!(lines(&obj, "f "), vec!["f 1 2 3"]);
        assert_eq!(lines(&obj, "o "), vec!["o planet_21_0"]);
        assert!(lines(&obj, "usemtl").is_empty());
        assert_eq!(writer.counters().vertices, 3);
    }

    #[test]
    fn indices_continue_across_nodes() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ObjWriter::create(dir.path()).unwrap();

        writer.write_node("21", &triangle_node("21", &[0, 1]), &[]).unwrap();
        writer.write_node("30", &triangle_node("30", &[2]), &[]).unwrap();

        let obj = read(dir.path(), OBJ_FILE);
        let counters = writer.counters();
        assert_eq!(counters.vertices, lines(&obj, "v ").len());
        assert_eq!(counters.vertices, 9);

        let faces = lines(&obj, "f ");
        // Second triangle of the first node sits at an odd strip position.
        assert_eq!(faces, vec!["f 1 2 3", "f 4 6 5", "f 7 8 9"]);
        for face in faces {
            for index in face.split_whitespace().skip(1) {
                let index: usize = index.parse().unwrap();
                assert!((1..=counters.vertices).contains(&index));
            }
        }
    }

    #[test]
    fn excluded_layers_are_dropped_and_groups_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ObjWriter::create(dir.path()).unwrap();

        writer
            .write_node("21", &triangle_node("21", &[5, 1, 3]), &[3])
            .unwrap();

        let obj = read(dir.path(), OBJ_FILE);
        // Layer 1 (vertices 4-6) before layer 5 (vertices 1-3).
        assert_eq!(lines(&obj, "f "), vec!["f 4 6 5", "f 1 2 3"]);
        assert_eq!(writer.counters().vertices, 9);
    }

    #[test]
    fn layer_bounds_stop_the_strip() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ObjWriter::create(dir.path()).unwrap();

        let mut node = triangle_node("21", &[0, 0]);
        node.meshes[0].layer_bounds = Some([0, 0, 0, 3, 8, 8, 8, 8, 8, 8]);
        writer.write_node("21", &node, &[]).unwrap();

        assert_eq!(lines(&read(dir.path(), OBJ_FILE), "f "), vec!["f 1 2 3"]);
    }

    #[test]
    fn layer_bounds_count_strip_windows() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ObjWriter::create(dir.path()).unwrap();

        let mut node = triangle_node("21", &[0, 0]);
        let mesh = &mut node.meshes[0];
        for vertex in &mut mesh.vertices {
            vertex.w = 0;
        }
        mesh.indices = vec![0, 1, 2, 3, 4, 5];
        mesh.layer_bounds = Some([0, 0, 0, 3, 6, 6, 6, 6, 6, 6]);
        writer.write_node("21", &node, &[]).unwrap();

        assert_eq!(
            lines(&read(dir.path(), OBJ_FILE), "f "),
            vec!["f 1 2 3", "f 2 4 3", "f 3 4 5"]
        );
    }

    #[test]
    fn layer_mismatch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ObjWriter::create(dir.path()).unwrap();

        let mut node = triangle_node("21", &[0]);
        node.meshes[0].vertices[2].w = 4;
        assert!(matches!(
            writer.write_node("21", &node, &[]),
            Err(ObjError::VertexLayerMismatch { strip_index: 0, .. })
        ));
        assert_eq!(read(dir.path(), OBJ_FILE), "mtllib model.mtl\n");
        assert_eq!(writer.counters(), Counters::default());
    }

    #[test]
    fn uvs_normals_and_materials() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ObjWriter::create(dir.path()).unwrap();

        writer.write_node("20", &triangle_node("20", &[0]), &[]).unwrap();

        let mut node = triangle_node("21", &[0]);
        let mesh = &mut node.meshes[0];
        for (i, vertex) in mesh.vertices.iter_mut().enumerate() {
            vertex.set_uv(i as u16, 2);
        }
        mesh.uv_transform = Some(UvTransform {
            offset: Vec2::new(0.0, 0.0),
            scale: Vec2::new(0.5, 0.25),
        });
        mesh.normals = Some(vec![127, 127, 254, 0, 0, 127, 127, 0, 127, 254, 127, 0]);
        mesh.texture = Some(Texture {
            format: TextureFormat::Jpg,
            width: 256,
            height: 256,
            data: vec![0xff, 0xd8, 0xff],
        });
        writer.write_node("21", &node, &[]).unwrap();

        let obj = read(dir.path(), OBJ_FILE);
        assert_eq!(lines(&obj, "vt "), vec!["vt 0 0.5", "vt 0.5 0.5", "vt 1 0.5"]);
        assert_eq!(
            lines(&obj, "vn "),
            vec!["vn 0 0 127", "vn -127 0 0", "vn 0 127 0"]
        );
        assert_eq!(lines(&obj, "usemtl"), vec!["usemtl tex_21_0"]);
        // Vertices continue after the first node; uv and normal numbering
        // starts fresh because the first node had neither.
        assert_eq!(lines(&obj, "f ").last().copied(), Some("f 4/1/1 5/2/2 6/3/3"));

        let mtl = read(dir.path(), MTL_FILE);
        assert!(mtl.contains("newmtl tex_21_0\n"));
        assert!(mtl.contains("map_Kd tex_21_0.jpg\n"));
        assert_eq!(fs::read(dir.path().join("tex_21_0.jpg")).unwrap(), vec![0xff, 0xd8, 0xff]);
        assert_eq!(
            writer.counters(),
            Counters {
                vertices: 6,
                uvs: 3,
                normals: 3,
            }
        );
    }

    #[test]
    fn bottom_up_textures_flip_v() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ObjWriter::create(dir.path()).unwrap();

        let mut node = triangle_node("21", &[0]);
        let mesh = &mut node.meshes[0];
        for vertex in &mut mesh.vertices {
            vertex.set_uv(0, 1);
        }
        mesh.uv_transform = Some(UvTransform {
            offset: Vec2::ZERO,
            scale: Vec2::new(1.0, 0.25),
        });
        mesh.texture = Some(Texture {
            format: TextureFormat::Dxt1,
            width: 4,
            height: 4,
            data: vec![0; 8],
        });
        writer.write_node("21", &node, &[]).unwrap();

        let obj = read(dir.path(), OBJ_FILE);
        assert_eq!(lines(&obj, "vt "), vec!["vt 0 0.75"; 3]);
        assert_eq!(lines(&obj, "f "), vec!["f 1/1 2/2 3/3"]);
        assert!(dir.path().join("tex_21_0.bmp").exists());
    }

    #[test]
    fn normals_without_uvs() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ObjWriter::create(dir.path()).unwrap();

        let mut node = triangle_node("21", &[0]);
        node.meshes[0].normals = Some(vec![127; 12]);
        writer.write_node("21", &node, &[]).unwrap();

        let obj = read(dir.path(), OBJ_FILE);
        assert_eq!(lines(&obj, "f "), vec!["f 1//1 2//2 3//3"]);
    }

    #[test]
    fn short_normal_table_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ObjWriter::create(dir.path()).unwrap();

        let mut node = triangle_node("21", &[0]);
        node.meshes[0].normals = Some(vec![127, 127, 254, 0]);
        assert!(matches!(
            writer.write_node("21", &node, &[]),
            Err(ObjError::NormalCountMismatch {
                normals: 1,
                vertices: 3,
                ..
            })
        ));
        assert_eq!(read(dir.path(), OBJ_FILE), "mtllib model.mtl\n");
        assert_eq!(writer.counters(), Counters::default());
    }

    #[test]
    fn out_of_range_indices_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ObjWriter::create(dir.path()).unwrap();

        let mut node = triangle_node("21", &[0]);
        node.meshes[0].vertices.truncate(2);
        assert!(matches!(
            writer.write_node("21", &node, &[]),
            Err(ObjError::InvalidIndex { index: 2, len: 2, .. })
        ));
    }

    #[test]
    fn vertex_records_are_not_shared_between_meshes() {
        let mut node = triangle_node("21", &[0]);
        node.meshes.push(node.meshes[0].clone());
        let dir = tempfile::tempdir().unwrap();
        let writer = ObjWriter::create(dir.path()).unwrap();
        writer.write_node("21", &node, &[]).unwrap();

        let obj = read(dir.path(), OBJ_FILE);
        assert_eq!(lines(&obj, "f "), vec!["f 1 2 3", "f 4 5 6"]);
        assert_eq!(lines(&obj, "o "), vec!["o planet_21_0", "o planet_21_1"]);
    }
}
