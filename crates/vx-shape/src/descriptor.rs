//! Scalar descriptors combining the fit, hull and perimeter primitives.
//! Every routine branches once on the component's 2D/3D flag and never
//! raises on well-formed input; numerical pathologies surface as sentinel
//! values (NaN radii, 0 for a collapsed hull, a clamp at 1 for sphericity).

use std::f64::consts::PI;

use vx_label::Component;

use crate::ellipse::{fit_ellipse_2d, fit_ellipsoid_3d};
use crate::hull::convex_area_and_volume;
use crate::perimeter::perimeter;

/// Fitted radii as `[major, minor, minor_z]`, sorted descending. The third
/// entry is 0 for 2D components; fit failures yield NaN radii.
pub fn ellipse_dimensions(cc: &Component) -> [f64; 3] {
    if cc.is_2d() {
        match fit_ellipse_2d(cc) {
            Ok(e) => {
                let (a, b) = e.radii;
                if a >= b { [a, b, 0.0] } else { [b, a, 0.0] }
            }
            Err(_) => [f64::NAN; 3],
        }
    } else {
        match fit_ellipsoid_3d(cc) {
            Ok(e) => {
                let mut radii = e.radii;
                radii.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
                radii
            }
            Err(_) => [f64::NAN; 3],
        }
    }
}

/// Ratio of the second-largest to the largest fitted radius, at most 1.
/// Returns 0 when the major radius is 0 and NaN when the fit failed.
pub fn eccentricity(cc: &Component) -> f64 {
    let radii = ellipse_dimensions(cc);
    if radii[0] == 0.0 {
        0.0
    } else {
        radii[1] / radii[0]
    }
}

/// Dimension-normalized area-to-perimeter ratio, 1 for a perfect disk or
/// sphere and clamped there against digitization overshoot.
pub fn sphericity(cc: &Component) -> f64 {
    let dim = if cc.is_2d() { 2.0 } else { 3.0 };
    let area = cc.size() as f64;
    let peri = perimeter(cc);
    if peri <= 0.0 {
        return 0.0;
    }

    let sph = (PI.powf(1.0 / dim) / peri) * (area * dim * 2.0).powf((dim - 1.0) / dim);
    sph.min(1.0)
}

/// Ratio of the component size to its convex hull volume, clamped to 1;
/// 0 for a collapsed hull.
pub fn hull_ratio(cc: &Component) -> f64 {
    let (_, volume) = convex_area_and_volume(cc);
    if volume == 0.0 {
        0.0
    } else {
        (cc.size() as f64 / volume).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use vx_core::Point3i;
    use vx_label::Component;

    use super::{eccentricity, ellipse_dimensions, hull_ratio, sphericity};

    fn disc(cx: i32, cy: i32, r: i32) -> Component {
        let mut pts = Vec::new();
        for y in (cy - r)..=(cy + r) {
            for x in (cx - r)..=(cx + r) {
                let (dx, dy) = (x - cx, y - cy);
                if dx * dx + dy * dy <= r * r {
                    pts.push(Point3i::new(x, y, 0));
                }
            }
        }
        Component::from_points(pts)
    }

    fn ball(c: i32, r: i32) -> Component {
        let mut pts = Vec::new();
        for z in (c - r)..=(c + r) {
            for y in (c - r)..=(c + r) {
                for x in (c - r)..=(c + r) {
                    let (dx, dy, dz) = (x - c, y - c, z - c);
                    if dx * dx + dy * dy + dz * dz <= r * r {
                        pts.push(Point3i::new(x, y, z));
                    }
                }
            }
        }
        Component::from_points(pts)
    }

    #[test]
    fn disc_circularity_is_near_one() {
        let cc = disc(20, 20, 12);
        let sph = sphericity(&cc);
        assert!(sph > 0.85 && sph <= 1.0, "sphericity {sph}");
    }

    #[test]
    fn ball_sphericity_is_near_one() {
        let cc = ball(12, 9);
        let sph = sphericity(&cc);
        assert!(sph > 0.8 && sph <= 1.0, "sphericity {sph}");
    }

    #[test]
    fn elongated_box_has_low_sphericity_and_eccentricity() {
        let mut pts = Vec::new();
        for y in 0..3 {
            for x in 0..30 {
                pts.push(Point3i::new(x, y, 0));
            }
        }
        let cc = Component::from_points(pts);

        assert!(sphericity(&cc) < 0.7);

        let ecc = eccentricity(&cc);
        assert!(ecc.is_finite());
        assert!(ecc < 0.35, "eccentricity {ecc}");
    }

    #[test]
    fn circle_eccentricity_is_near_one() {
        let ecc = eccentricity(&disc(15, 15, 10));
        assert_relative_eq!(ecc, 1.0, epsilon = 0.05);
    }

    #[test]
    fn dimensions_of_flat_components_have_zero_z() {
        let dims = ellipse_dimensions(&disc(15, 15, 8));
        assert!(dims[0] >= dims[1]);
        assert_eq!(dims[2], 0.0);
    }

    #[test]
    fn failed_fits_surface_as_nan() {
        let cc = Component::from_points(vec![
            Point3i::new(0, 0, 0),
            Point3i::new(1, 0, 0),
            Point3i::new(2, 0, 0),
        ]);
        let dims = ellipse_dimensions(&cc);
        assert!(dims.iter().all(|d| d.is_nan()));
        assert!(eccentricity(&cc).is_nan());
    }

    #[test]
    fn convex_component_hull_ratio_is_clamped_to_one() {
        let cc = disc(10, 10, 6);
        assert_relative_eq!(hull_ratio(&cc), 1.0);

        // A plus-shape is far from convex.
        let mut pts = Vec::new();
        for i in -6..=6 {
            pts.push(Point3i::new(10 + i, 10, 0));
            if i != 0 {
                pts.push(Point3i::new(10, 10 + i, 0));
            }
        }
        let cc = Component::from_points(pts);
        let ratio = hull_ratio(&cc);
        assert!(ratio > 0.0 && ratio < 0.7, "ratio {ratio}");
    }

    #[test]
    fn single_voxel_descriptor_sentinels() {
        let cc = Component::from_points(vec![Point3i::new(2, 2, 0)]);
        // Hull volume fallback is 1, so the fill ratio saturates.
        assert_relative_eq!(hull_ratio(&cc), 1.0);
        let sph = sphericity(&cc);
        assert!(sph > 0.0 && sph <= 1.0);
    }
}
