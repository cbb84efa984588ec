use crate::AssetError;
use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use std::path::Path;

/// Interleaved vertex as uploaded to the GPU: position then normal.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Triangle mesh with a single index stream.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Load a Wavefront OBJ file.
    ///
    /// Faces are triangulated and re-indexed into a single index stream. All
    /// objects in the file are merged into one mesh. Smooth normals are
    /// generated when the file has none.
    pub fn load_obj(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let (models, _materials) =
            tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS).map_err(|source| AssetError::Obj {
                path: path.to_path_buf(),
                source,
            })?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".into());

        let mut mesh = Self {
            name,
            ..Self::default()
        };
        let mut missing_normals = false;

        for model in &models {
            let m = &model.mesh;
            let base = mesh.vertices.len() as u32;
            let vertex_count = m.positions.len() / 3;
            let has_normals = m.normals.len() == m.positions.len();
            missing_normals |= !has_normals;

            for i in 0..vertex_count {
                let position = [m.positions[3 * i], m.positions[3 * i + 1], m.positions[3 * i + 2]];
                let normal = if has_normals {
                    [m.normals[3 * i], m.normals[3 * i + 1], m.normals[3 * i + 2]]
                } else {
                    [0.0; 3]
                };
                mesh.vertices.push(MeshVertex { position, normal });
            }
            mesh.indices.extend(m.indices.iter().map(|i| base + i));
        }

        if mesh.indices.is_empty() {
            return Err(AssetError::EmptyMesh(path.to_path_buf()));
        }
        if missing_normals {
            tracing::debug!(path = %path.display(), "generating smooth normals");
            mesh.generate_smooth_normals();
        }

        tracing::info!(
            path = %path.display(),
            vertices = mesh.vertices.len(),
            triangles = mesh.triangle_count(),
            "loaded mesh"
        );
        Ok(mesh)
    }

    /// Unit cube centered on the origin with flat face normals.
    pub fn unit_cube() -> Self {
        let p = 0.5_f32;
        let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
            ([0.0, 0.0, 1.0], [[-p, -p, p], [p, -p, p], [p, p, p], [-p, p, p]]),
            ([0.0, 0.0, -1.0], [[p, -p, -p], [-p, -p, -p], [-p, p, -p], [p, p, -p]]),
            ([1.0, 0.0, 0.0], [[p, -p, p], [p, -p, -p], [p, p, -p], [p, p, p]]),
            ([-1.0, 0.0, 0.0], [[-p, -p, -p], [-p, -p, p], [-p, p, p], [-p, p, -p]]),
            ([0.0, 1.0, 0.0], [[-p, p, p], [p, p, p], [p, p, -p], [-p, p, -p]]),
            ([0.0, -1.0, 0.0], [[-p, -p, -p], [p, -p, -p], [p, -p, p], [-p, -p, p]]),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, corners) in faces {
            let base = vertices.len() as u32;
            vertices.extend(corners.iter().map(|&position| MeshVertex { position, normal }));
            indices.extend([base, base + 1, base + 2, base + 2, base + 3, base]);
        }

        Self {
            name: "unit_cube".into(),
            vertices,
            indices,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Replace all normals with area-weighted vertex normals.
    pub fn generate_smooth_normals(&mut self) {
        let mut accum = vec![Vec3::ZERO; self.vertices.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let pa = Vec3::from(self.vertices[a].position);
            let pb = Vec3::from(self.vertices[b].position);
            let pc = Vec3::from(self.vertices[c].position);
            // Unnormalized cross product weights by triangle area.
            let n = (pb - pa).cross(pc - pa);
            accum[a] += n;
            accum[b] += n;
            accum[c] += n;
        }
        for (vertex, n) in self.vertices.iter_mut().zip(accum) {
            vertex.normal = n.try_normalize().unwrap_or(Vec3::Y).to_array();
        }
    }

    /// Vertex data as raw bytes for buffer upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_obj(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".obj").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_quad_and_triangulates() {
        let file = write_obj(
            "o quad\nv 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1 4//1\n",
        );
        let mesh = MeshData::load_obj(file.path()).unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert!(mesh.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn generates_normals_when_missing() {
        let file = write_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");
        let mesh = MeshData::load_obj(file.path()).unwrap();
        for v in &mesh.vertices {
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn merges_objects_with_offset_indices() {
        let file = write_obj(
            "o a\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\no b\nv 0 0 1\nv 1 0 1\nv 0 1 1\nf 4 5 6\n",
        );
        let mesh = MeshData::load_obj(file.path()).unwrap();
        assert_eq!(mesh.vertices.len(), 6);
        assert_eq!(mesh.triangle_count(), 2);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
        assert!(mesh.indices[3..].iter().all(|&i| i >= 3));
    }

    #[test]
    fn file_without_faces_is_rejected() {
        let file = write_obj("v 0 0 0\nv 1 0 0\n");
        let err = MeshData::load_obj(file.path()).unwrap_err();
        assert!(matches!(err, AssetError::EmptyMesh(_)));
    }

    #[test]
    fn missing_file_is_an_obj_error() {
        let err = MeshData::load_obj("/nonexistent/mesh.obj").unwrap_err();
        assert!(matches!(err, AssetError::Obj { .. }));
    }

    #[test]
    fn unit_cube_shape() {
        let cube = MeshData::unit_cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        assert_eq!(cube.vertex_bytes().len(), 24 * std::mem::size_of::<MeshVertex>());
    }
}
