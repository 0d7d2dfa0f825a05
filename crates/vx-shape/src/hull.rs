//! Convex hull contour/area queries.
//!
//! The 2D path reduces the component's (x, y) cloud with a monotone chain
//! and walks the polygon for contour length and signed area. The 3D path
//! runs an incremental quickhull over the member voxels and accumulates
//! face areas for the surface plus the divergence-theorem volume estimate.

use std::collections::BTreeSet;

use vx_core::{Point3f, Vec3f};
use vx_label::Component;

use crate::error::HullError;

/// `(contour, area)` of the smallest convex envelope around the component:
/// polygon length and enclosed area in 2D, triangulated surface and volume
/// in 3D. The two are returned together because the 3D computation yields
/// them simultaneously.
///
/// Contractual fallbacks: a single voxel gives `(0, 1)`; a 3D cloud with
/// fewer than 4 points or a coplanar one gives `(size, size)`.
pub fn convex_area_and_volume(cc: &Component) -> (f64, f64) {
    let n = cc.size();
    if n == 1 {
        return (0.0, 1.0);
    }

    if cc.is_2d() {
        let mut points: Vec<(f64, f64)> =
            cc.iter().map(|p| (p.x as f64, p.y as f64)).collect();
        if points.len() > 4 {
            points = hull_2d(&points);
        }

        let mut contour = 0.0;
        let mut area = 0.0;
        let mut prev = points[points.len() - 1];
        for &p in &points {
            let (dx, dy) = (p.0 - prev.0, p.1 - prev.1);
            contour += (dx * dx + dy * dy).sqrt();
            area += p.0 * prev.1 - p.1 * prev.0;
            prev = p;
        }
        (contour, (area * 0.5).abs())
    } else {
        let points: Vec<Point3f> = cc.iter().map(Point3f::from).collect();
        match ConvexHull3::build(&points) {
            Ok(hull) => {
                let mut surface = 0.0;
                let mut volume = 0.0;
                for &[i1, i2, i3] in hull.faces() {
                    let p1 = points[i1];
                    let p2 = points[i2];
                    let p3 = points[i3];
                    let normal = (p2 - p1).cross(p3 - p1);
                    let face_area = normal.norm() * 0.5;
                    surface += face_area;
                    let unit = normal.normalize();
                    // Divergence form: the x moment of a triangle is its
                    // area times the vertex mean.
                    volume += face_area * unit.x * (p1.x + p2.x + p3.x) / 3.0;
                }
                (surface, volume.abs())
            }
            Err(_) => (n as f64, n as f64),
        }
    }
}

/// Monotone-chain convex hull, counter-clockwise, without collinear points.
pub fn hull_2d(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("finite coordinates"));
    sorted.dedup();
    if sorted.len() < 3 {
        return sorted;
    }

    let cross = |o: (f64, f64), a: (f64, f64), b: (f64, f64)| {
        (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
    };

    let mut lower: Vec<(f64, f64)> = Vec::new();
    for &p in &sorted {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<(f64, f64)> = Vec::new();
    for &p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Triangulated 3D convex hull over a point cloud.
#[derive(Debug, Clone)]
pub struct ConvexHull3 {
    faces: Vec<[usize; 3]>,
}

impl ConvexHull3 {
    /// Incremental quickhull. Fails on fewer than 4 points or a degenerate
    /// (collinear/coplanar) cloud.
    pub fn build(points: &[Point3f]) -> Result<Self, HullError> {
        if points.len() < 4 {
            return Err(HullError::InsufficientVertices);
        }

        let eps = scaled_epsilon(points);
        let [i0, i1, i2, i3] = initial_simplex(points, eps)?;
        let interior = Point3f::new(
            (points[i0].x + points[i1].x + points[i2].x + points[i3].x) / 4.0,
            (points[i0].y + points[i1].y + points[i2].y + points[i3].y) / 4.0,
            (points[i0].z + points[i1].z + points[i2].z + points[i3].z) / 4.0,
        );

        let mut faces = vec![
            HullFace::new(points, i0, i1, i2, interior),
            HullFace::new(points, i0, i1, i3, interior),
            HullFace::new(points, i0, i2, i3, interior),
            HullFace::new(points, i1, i2, i3, interior),
        ];

        for pi in 0..points.len() {
            if pi == i0 || pi == i1 || pi == i2 || pi == i3 {
                continue;
            }
            for face in &mut faces {
                if face.distance(points[pi]) > eps {
                    face.outside.push(pi);
                    break;
                }
            }
        }

        let mut pending: Vec<usize> = (0..faces.len()).collect();
        while let Some(fi) = pending.pop() {
            if !faces[fi].alive || faces[fi].outside.is_empty() {
                continue;
            }

            let apex = faces[fi]
                .outside
                .iter()
                .copied()
                .max_by(|&a, &b| {
                    faces[fi]
                        .distance(points[a])
                        .partial_cmp(&faces[fi].distance(points[b]))
                        .expect("finite distances")
                })
                .expect("non-empty outside set");
            let apex_point = points[apex];

            let visible: Vec<usize> = faces
                .iter()
                .enumerate()
                .filter(|(_, f)| f.alive && f.distance(apex_point) > eps)
                .map(|(i, _)| i)
                .collect();

            let mut visible_edges: BTreeSet<(usize, usize)> = BTreeSet::new();
            for &vi in &visible {
                for e in faces[vi].edges() {
                    visible_edges.insert(e);
                }
            }

            let mut orphans: Vec<usize> = Vec::new();
            for &vi in &visible {
                orphans.append(&mut faces[vi].outside);
                faces[vi].alive = false;
            }

            let mut new_faces: Vec<usize> = Vec::new();
            for &(a, b) in &visible_edges {
                // Horizon edges are those whose twin is not in the visible
                // patch.
                if visible_edges.contains(&(b, a)) {
                    continue;
                }
                let face = HullFace::new(points, a, b, apex, interior);
                new_faces.push(faces.len());
                faces.push(face);
            }

            for orphan in orphans {
                if orphan == apex {
                    continue;
                }
                for &nf in &new_faces {
                    if faces[nf].distance(points[orphan]) > eps {
                        faces[nf].outside.push(orphan);
                        break;
                    }
                }
            }

            pending.extend(new_faces);
        }

        let faces = faces
            .into_iter()
            .filter(|f| f.alive)
            .map(|f| f.verts)
            .collect();
        Ok(Self { faces })
    }

    /// Triangular faces as indices into the input point slice, wound
    /// counter-clockwise seen from outside.
    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }
}

#[derive(Debug, Clone)]
struct HullFace {
    verts: [usize; 3],
    normal: Vec3f,
    offset: f64,
    outside: Vec<usize>,
    alive: bool,
}

impl HullFace {
    /// Builds the face with its normal oriented away from `interior`.
    fn new(points: &[Point3f], a: usize, b: usize, c: usize, interior: Point3f) -> Self {
        let pa = points[a];
        let mut verts = [a, b, c];
        let mut normal = (points[b] - pa).cross(points[c] - pa);
        let mut offset = normal.dot(pa.coords());
        if normal.dot(interior.coords()) - offset > 0.0 {
            verts = [a, c, b];
            normal = -normal;
            offset = -offset;
        }
        Self {
            verts,
            normal,
            offset,
            outside: Vec::new(),
            alive: true,
        }
    }

    fn distance(&self, p: Point3f) -> f64 {
        self.normal.dot(p.coords()) - self.offset
    }

    fn edges(&self) -> [(usize, usize); 3] {
        let [a, b, c] = self.verts;
        [(a, b), (b, c), (c, a)]
    }
}

fn scaled_epsilon(points: &[Point3f]) -> f64 {
    let mut extent = 0.0f64;
    for p in points {
        extent = extent.max(p.x.abs()).max(p.y.abs()).max(p.z.abs());
    }
    1e-9 * (1.0 + extent)
}

fn initial_simplex(points: &[Point3f], eps: f64) -> Result<[usize; 4], HullError> {
    // Most separated pair among the six axis extremes.
    let mut extremes = [0usize; 6];
    for (i, p) in points.iter().enumerate() {
        if p.x < points[extremes[0]].x {
            extremes[0] = i;
        }
        if p.x > points[extremes[1]].x {
            extremes[1] = i;
        }
        if p.y < points[extremes[2]].y {
            extremes[2] = i;
        }
        if p.y > points[extremes[3]].y {
            extremes[3] = i;
        }
        if p.z < points[extremes[4]].z {
            extremes[4] = i;
        }
        if p.z > points[extremes[5]].z {
            extremes[5] = i;
        }
    }

    let (mut i0, mut i1) = (extremes[0], extremes[1]);
    let mut best = 0.0;
    for &a in &extremes {
        for &b in &extremes {
            let d = points[a].distance(points[b]);
            if d > best {
                best = d;
                (i0, i1) = (a, b);
            }
        }
    }
    if best <= eps {
        return Err(HullError::Degenerate);
    }

    // Farthest point from the line (i0, i1).
    let dir = (points[i1] - points[i0]).normalize();
    let mut i2 = i0;
    let mut best = 0.0;
    for (i, p) in points.iter().enumerate() {
        let rel = *p - points[i0];
        let off = (rel - dir * rel.dot(dir)).norm();
        if off > best {
            best = off;
            i2 = i;
        }
    }
    if best <= eps {
        return Err(HullError::Degenerate);
    }

    // Farthest point from the plane (i0, i1, i2).
    let normal = (points[i1] - points[i0])
        .cross(points[i2] - points[i0])
        .normalize();
    let mut i3 = i0;
    let mut best = 0.0;
    for (i, p) in points.iter().enumerate() {
        let off = (*p - points[i0]).dot(normal).abs();
        if off > best {
            best = off;
            i3 = i;
        }
    }
    if best <= eps {
        return Err(HullError::Degenerate);
    }

    Ok([i0, i1, i2, i3])
}
