use std::sync::OnceLock;

use vx_core::{Point3f, Point3i, Volume};

/// A materialized connected region.
///
/// Points are stored in raster-scan insertion order; that ordering is part of
/// the contract and downstream consumers may rely on it for deterministic
/// output. After materialization a component is read-only apart from its
/// time index.
#[derive(Debug, Clone, Default)]
pub struct Component {
    points: Vec<Point3i>,
    t: usize,
    on_edge_x: bool,
    on_edge_y: bool,
    on_edge_z: bool,
    mass_center: OnceLock<Point3f>,
    bounding_box: OnceLock<(Point3i, Point3i)>,
}

impl Component {
    pub(crate) fn with_capacity(
        capacity: usize,
        on_edge_x: bool,
        on_edge_y: bool,
        on_edge_z: bool,
    ) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            t: 0,
            on_edge_x,
            on_edge_y,
            on_edge_z,
            mass_center: OnceLock::new(),
            bounding_box: OnceLock::new(),
        }
    }

    /// Builds a component directly from a point list (raster order expected).
    /// Edge flags are not derivable from the points alone and default to
    /// false.
    pub fn from_points(points: Vec<Point3i>) -> Self {
        Self {
            points,
            ..Self::default()
        }
    }

    pub(crate) fn push_point(&mut self, p: Point3i) {
        self.points.push(p);
    }

    pub fn points(&self) -> &[Point3i] {
        &self.points
    }

    pub fn iter(&self) -> impl Iterator<Item = Point3i> + '_ {
        self.points.iter().copied()
    }

    pub fn size(&self) -> usize {
        self.points.len()
    }

    pub fn t(&self) -> usize {
        self.t
    }

    pub fn set_t(&mut self, t: usize) {
        self.t = t;
    }

    pub fn on_edge_x(&self) -> bool {
        self.on_edge_x
    }

    pub fn on_edge_y(&self) -> bool {
        self.on_edge_y
    }

    pub fn on_edge_z(&self) -> bool {
        self.on_edge_z
    }

    /// Mean of the member coordinates. Computed once, then cached.
    pub fn mass_center(&self) -> Point3f {
        *self.mass_center.get_or_init(|| {
            if self.points.is_empty() {
                return Point3f::default();
            }
            let mut cx = 0.0;
            let mut cy = 0.0;
            let mut cz = 0.0;
            for p in &self.points {
                cx += p.x as f64;
                cy += p.y as f64;
                cz += p.z as f64;
            }
            let n = self.points.len() as f64;
            Point3f::new(cx / n, cy / n, cz / n)
        })
    }

    /// Axis-aligned bounding box as `(min, max)` corners, inclusive.
    pub fn bounding_box(&self) -> (Point3i, Point3i) {
        *self.bounding_box.get_or_init(|| {
            let mut min = Point3i::new(i32::MAX, i32::MAX, i32::MAX);
            let mut max = Point3i::new(i32::MIN, i32::MIN, i32::MIN);
            for p in &self.points {
                min.x = min.x.min(p.x);
                min.y = min.y.min(p.y);
                min.z = min.z.min(p.z);
                max.x = max.x.max(p.x);
                max.y = max.y.max(p.y);
                max.z = max.z.max(p.z);
            }
            if self.points.is_empty() {
                (Point3i::default(), Point3i::default())
            } else {
                (min, max)
            }
        })
    }

    /// A component is 2D iff its bounding box is flat along z. This flag
    /// gates the dimensional branch in every descriptor.
    pub fn is_2d(&self) -> bool {
        let (min, max) = self.bounding_box();
        min.z == max.z
    }

    pub fn max_distance_to(&self, p: Point3f) -> f64 {
        self.points
            .iter()
            .map(|&q| Point3f::from(q).distance(p))
            .fold(0.0, f64::max)
    }

    pub fn min_distance_to(&self, p: Point3f) -> f64 {
        self.points
            .iter()
            .map(|&q| Point3f::from(q).distance(p))
            .fold(f64::INFINITY, f64::min)
    }

    /// Sphere centered at the mass center enclosing every member voxel.
    pub fn bounding_sphere(&self) -> (Point3f, f64) {
        let center = self.mass_center();
        (center, self.max_distance_to(center))
    }

    /// Tight bounding-box slab with member voxels set to 1, plus the slab
    /// origin in volume coordinates.
    pub fn to_mask(&self) -> (Volume<u8>, Point3i) {
        let (min, max) = self.bounding_box();
        let w = (max.x - min.x + 1) as usize;
        let h = (max.y - min.y + 1) as usize;
        let d = (max.z - min.z + 1) as usize;

        let mut mask = Volume::new_fill(w, h, d, 0u8);
        for p in &self.points {
            let idx = mask.index_of(
                (p.x - min.x) as usize,
                (p.y - min.y) as usize,
                (p.z - min.z) as usize,
            );
            mask.data_mut()[idx] = 1;
        }
        (mask, min)
    }
}
