/// Indexed triangle list in model space.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new() -> Self {
        Self::default()
    }

    /// UV sphere with `height_segments` latitude bands and `width_segments`
    /// longitude slices, poles on the Y axis.
    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let lon_segments = width_segments.max(3);
        let lat_segments = height_segments.max(2);

        let vertex_count = ((lat_segments + 1) * (lon_segments + 1)) as usize;
        let mut mesh = Self {
            positions: Vec::with_capacity(vertex_count),
            normals: Vec::with_capacity(vertex_count),
            indices: Vec::with_capacity((lat_segments * lon_segments * 6) as usize),
        };

        for lat in 0..=lat_segments {
            let v = lat as f32 / lat_segments as f32;
            let theta = v * std::f32::consts::PI;
            let (sin_t, cos_t) = theta.sin_cos();

            for lon in 0..=lon_segments {
                let u = lon as f32 / lon_segments as f32;
                let phi = u * std::f32::consts::TAU;
                let (sin_p, cos_p) = phi.sin_cos();

                let normal = [sin_t * cos_p, cos_t, sin_t * sin_p];
                mesh.push_vertex(normal.map(|c| c * radius), normal);
            }
        }

        let stride = lon_segments + 1;
        for lat in 0..lat_segments {
            for lon in 0..lon_segments {
                let i0 = lat * stride + lon;
                let i1 = i0 + 1;
                let i2 = i0 + stride;
                let i3 = i2 + 1;

                mesh.push_triangle(i0, i2, i1);
                mesh.push_triangle(i1, i2, i3);
            }
        }

        mesh
    }

    pub fn push_vertex(&mut self, position: [f32; 3], normal: [f32; 3]) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(position);
        self.normals.push(normal);
        index
    }

    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Appends another mesh, rebasing its indices.
    pub fn append(&mut self, other: &MeshData) {
        let base = self.positions.len() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }
}

#[cfg(test)]
mod tests {
    use super::MeshData;

    #[test]
    fn sphere_vertices_sit_on_radius() {
        let mesh = MeshData::sphere(105.0, 32, 32);
        assert_eq!(mesh.vertex_count(), 33 * 33);
        assert_eq!(mesh.triangle_count(), 32 * 32 * 2);
        for p in &mesh.positions {
            let r = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
            assert!((r - 105.0).abs() < 1e-3, "radius {r}");
        }
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertex_count()));
    }

    #[test]
    fn sphere_clamps_segment_counts() {
        let mesh = MeshData::sphere(1.0, 0, 0);
        assert_eq!(mesh.triangle_count(), 3 * 2 * 2);
    }

    #[test]
    fn append_rebases_indices() {
        let mut a = MeshData::new();
        a.push_vertex([0.0; 3], [0.0, 0.0, 1.0]);
        a.push_vertex([1.0, 0.0, 0.0], [0.0, 0.0, 1.0]);
        a.push_vertex([0.0, 1.0, 0.0], [0.0, 0.0, 1.0]);
        a.push_triangle(0, 1, 2);

        let b = a.clone();
        a.append(&b);
        assert_eq!(a.indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(a.vertex_count(), 6);
    }
}
