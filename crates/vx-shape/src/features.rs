//! Per-component feature rows for tabular export.
//!
//! The row schema matches the external spreadsheet collaborator: positions
//! and sizes are scaled by the grid resolution, and z-bearing moments are
//! absent for 2D components.

use serde::Serialize;
use vx_label::Component;

use crate::descriptor::{eccentricity, ellipse_dimensions, hull_ratio, sphericity};
use crate::hull::convex_area_and_volume;
use crate::moments::central_moment;
use crate::perimeter::perimeter;

/// Physical grid resolution: pixel sizes along each axis and the time
/// interval between frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Resolution {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub dt: f64,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            x: 1.0,
            y: 1.0,
            z: 1.0,
            dt: 1.0,
        }
    }
}

impl Resolution {
    pub fn voxel_volume(&self) -> f64 {
        self.x * self.y * self.z
    }
}

/// One exported feature row. `None` cells are the z-bearing moments of 2D
/// components, left empty in tabular output.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureRow {
    pub index: usize,
    pub time: f64,
    pub center_x: f64,
    pub center_y: f64,
    pub center_z: f64,
    pub perimeter: f64,
    pub area: f64,
    pub sphericity: f64,
    pub major_axis: f64,
    pub minor_axis: f64,
    pub minor_z_axis: f64,
    pub eccentricity: f64,
    pub hull_fill_ratio: f64,
    pub m100: f64,
    pub m010: f64,
    pub m001: Option<f64>,
    pub m110: f64,
    pub m101: Option<f64>,
    pub m011: Option<f64>,
    pub m111: Option<f64>,
    pub m200: f64,
    pub m020: f64,
    pub m002: Option<f64>,
    pub m220: f64,
    pub m202: Option<f64>,
    pub m022: Option<f64>,
    pub m222: Option<f64>,
    pub convex_perimeter: f64,
    pub convex_volume: f64,
}

impl FeatureRow {
    /// Column names, in cell order.
    pub const HEADER: [&'static str; 29] = [
        "#",
        "t",
        "x",
        "y",
        "z",
        "perimeter",
        "area",
        "sphericity",
        "major axis",
        "minor axis",
        "minor Z axis",
        "eccentricity",
        "hull fill ratio",
        "M100",
        "M010",
        "M001",
        "M110",
        "M101",
        "M011",
        "M111",
        "M200",
        "M020",
        "M002",
        "M220",
        "M202",
        "M022",
        "M222",
        "convex perimeter",
        "convex volume",
    ];
}

pub fn feature_row(cc: &Component, index: usize, res: &Resolution) -> FeatureRow {
    let is_2d = cc.is_2d();
    let center = cc.mass_center();
    let radii = ellipse_dimensions(cc);
    let (convex_perimeter, convex_volume) = convex_area_and_volume(cc);

    let m3 = |p, q, r| {
        if is_2d {
            None
        } else {
            Some(central_moment(cc, p, q, r))
        }
    };

    FeatureRow {
        index,
        time: cc.t() as f64 * res.dt,
        center_x: center.x * res.x,
        center_y: center.y * res.y,
        center_z: center.z * res.z,
        perimeter: perimeter(cc),
        area: cc.size() as f64 * res.voxel_volume(),
        sphericity: sphericity(cc),
        major_axis: radii[0],
        minor_axis: radii[1],
        minor_z_axis: radii[2],
        eccentricity: eccentricity(cc),
        hull_fill_ratio: hull_ratio(cc),
        m100: central_moment(cc, 1, 0, 0),
        m010: central_moment(cc, 0, 1, 0),
        m001: m3(0, 0, 1),
        m110: central_moment(cc, 1, 1, 0),
        m101: m3(1, 0, 1),
        m011: m3(0, 1, 1),
        m111: m3(1, 1, 1),
        m200: central_moment(cc, 2, 0, 0),
        m020: central_moment(cc, 0, 2, 0),
        m002: m3(0, 0, 2),
        m220: central_moment(cc, 2, 2, 0),
        m202: m3(2, 0, 2),
        m022: m3(0, 2, 2),
        m222: m3(2, 2, 2),
        convex_perimeter,
        convex_volume,
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use vx_core::Point3i;
    use vx_label::Component;

    use super::{FeatureRow, Resolution, feature_row};

    fn flat_square() -> Component {
        let mut pts = Vec::new();
        for y in 0..6 {
            for x in 0..6 {
                pts.push(Point3i::new(x, y, 2));
            }
        }
        Component::from_points(pts)
    }

    fn small_ball() -> Component {
        let mut pts = Vec::new();
        for z in 0..4 {
            for y in 0..4 {
                for x in 0..4 {
                    pts.push(Point3i::new(x, y, z));
                }
            }
        }
        Component::from_points(pts)
    }

    #[test]
    fn flat_components_omit_z_moments() {
        let row = feature_row(&flat_square(), 1, &Resolution::default());

        assert!(row.m001.is_none());
        assert!(row.m101.is_none());
        assert!(row.m011.is_none());
        assert!(row.m111.is_none());
        assert!(row.m002.is_none());
        assert!(row.m202.is_none());
        assert!(row.m022.is_none());
        assert!(row.m222.is_none());

        // In-plane cells are still populated.
        assert_relative_eq!(row.m100, 0.0, epsilon = 1e-9);
        assert!(row.m200 > 0.0);
        assert_eq!(row.minor_z_axis, 0.0);
    }

    #[test]
    fn volumetric_components_fill_every_moment_cell() {
        let row = feature_row(&small_ball(), 3, &Resolution::default());
        assert!(row.m002.is_some());
        assert!(row.m222.is_some());
        assert_eq!(row.index, 3);
    }

    #[test]
    fn resolution_scales_positions_and_area() {
        let mut cc = flat_square();
        cc.set_t(4);
        let res = Resolution {
            x: 0.5,
            y: 2.0,
            z: 3.0,
            dt: 0.1,
        };
        let row = feature_row(&cc, 1, &res);

        assert_relative_eq!(row.time, 0.4);
        assert_relative_eq!(row.center_x, 2.5 * 0.5);
        assert_relative_eq!(row.center_y, 2.5 * 2.0);
        assert_relative_eq!(row.center_z, 2.0 * 3.0);
        assert_relative_eq!(row.area, 36.0 * 3.0);
    }

    #[test]
    fn header_matches_the_row_width() {
        assert_eq!(FeatureRow::HEADER.len(), 29);
    }
}
