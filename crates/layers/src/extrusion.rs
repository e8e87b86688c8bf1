use earcutr::earcut;
use formats::Ring;
use foundation::math::{MercatorCoordinate, Vec2, mercator_z_from_altitude};
use gpu::MeshData;

/// Appends a prism for one polygon: a triangulated roof at `top_m` and one
/// wall quad per ring edge between `base_m` and `top_m`.
///
/// Rings are outer ring first, then holes. Degenerate rings add nothing.
/// Heights convert to mercator units at the origin's latitude, so roofs
/// stay level.
pub fn extrude_polygon(
    rings: &[Ring],
    base_m: f64,
    top_m: f64,
    origin: MercatorCoordinate,
    mesh: &mut MeshData,
) {
    let Some(outer) = rings.first() else {
        return;
    };
    if outer.len() < 3 {
        return;
    }

    let mut points: Vec<Vec2> = Vec::new();
    let mut coords_2d: Vec<f64> = Vec::new();
    let mut hole_indices: Vec<usize> = Vec::new();
    let mut ring_ranges: Vec<(usize, usize)> = Vec::new();

    for (ring_i, ring) in rings.iter().enumerate() {
        let mut ring_pts: Vec<Vec2> = ring
            .iter()
            .map(|p| {
                let m = MercatorCoordinate::from_lng_lat(p.0, 0.0);
                Vec2::new(m.x - origin.x, m.y - origin.y)
            })
            .collect();
        drop_closing_duplicate(&mut ring_pts);
        if ring_pts.len() < 3 {
            // A broken outer ring leaves nothing to cut holes from.
            if ring_i == 0 {
                return;
            }
            continue;
        }

        if ring_i > 0 {
            hole_indices.push(points.len());
        }
        let start = points.len();
        for p in ring_pts {
            coords_2d.push(p.x);
            coords_2d.push(p.y);
            points.push(p);
        }
        ring_ranges.push((start, points.len()));
    }

    let indices = match earcut(&coords_2d, &hole_indices, 2) {
        Ok(ix) => ix,
        Err(_) => return,
    };

    let lat = origin.to_lng_lat().lat;
    let z = |h: f64| (mercator_z_from_altitude(h, lat) - origin.z) as f32;
    let (base_z, top_z) = (z(base_m), z(top_m));
    let at = |p: &Vec2, z: f32| [p.x as f32, p.y as f32, z];

    let roof_base = mesh.vertex_count() as u32;
    for p in &points {
        mesh.push_vertex(at(p, top_z), [0.0, 0.0, 1.0]);
    }
    for tri in indices.chunks_exact(3) {
        mesh.push_triangle(
            roof_base + tri[0] as u32,
            roof_base + tri[1] as u32,
            roof_base + tri[2] as u32,
        );
    }

    if top_m <= base_m {
        return;
    }
    for (start, end) in ring_ranges {
        let ring = &points[start..end];
        for (i, a) in ring.iter().enumerate() {
            let b = &ring[(i + 1) % ring.len()];
            let edge = *b - *a;
            let len = edge.length();
            if len <= f64::EPSILON {
                continue;
            }
            let normal = [(edge.y / len) as f32, (-edge.x / len) as f32, 0.0];

            let v0 = mesh.push_vertex(at(a, base_z), normal);
            let v1 = mesh.push_vertex(at(b, base_z), normal);
            let v2 = mesh.push_vertex(at(a, top_z), normal);
            let v3 = mesh.push_vertex(at(b, top_z), normal);
            mesh.push_triangle(v0, v1, v2);
            mesh.push_triangle(v1, v3, v2);
        }
    }
}

fn drop_closing_duplicate(points: &mut Vec<Vec2>) {
    if let [first, .., last] = points.as_slice() {
        if (first.x - last.x).abs() < 1e-12 && (first.y - last.y).abs() < 1e-12 {
            points.pop();
        }
    }
}
