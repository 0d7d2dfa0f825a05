use vx_label::Component;

/// Central geometric moment `M_pqr` about the mass center. The z order is
/// ignored for 2D components.
pub fn central_moment(cc: &Component, p: u32, q: u32, r: u32) -> f64 {
    let center = cc.mass_center();
    if cc.is_2d() {
        cc.iter()
            .map(|pt| {
                (pt.x as f64 - center.x).powi(p as i32) * (pt.y as f64 - center.y).powi(q as i32)
            })
            .sum()
    } else {
        cc.iter()
            .map(|pt| {
                (pt.x as f64 - center.x).powi(p as i32)
                    * (pt.y as f64 - center.y).powi(q as i32)
                    * (pt.z as f64 - center.z).powi(r as i32)
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use vx_core::Point3i;
    use vx_label::Component;

    use super::central_moment;

    fn square(side: i32) -> Component {
        let mut pts = Vec::new();
        for y in 0..side {
            for x in 0..side {
                pts.push(Point3i::new(x, y, 0));
            }
        }
        Component::from_points(pts)
    }

    #[test]
    fn first_order_central_moments_vanish() {
        let cc = square(5);
        assert_abs_diff_eq!(central_moment(&cc, 1, 0, 0), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(central_moment(&cc, 0, 1, 0), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn symmetric_square_has_equal_variances_and_no_covariance() {
        let cc = square(5);
        let m200 = central_moment(&cc, 2, 0, 0);
        let m020 = central_moment(&cc, 0, 2, 0);
        assert_relative_eq!(m200, m020, epsilon = 1e-9);
        // Sum over x of (x - 2)^2 is 10, times 5 rows.
        assert_relative_eq!(m200, 50.0, epsilon = 1e-9);
        assert_abs_diff_eq!(central_moment(&cc, 1, 1, 0), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn z_order_is_ignored_for_flat_components() {
        let cc = square(3);
        // With the z factor active this would be zero for r = 1.
        assert_relative_eq!(
            central_moment(&cc, 2, 0, 7),
            central_moment(&cc, 2, 0, 0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn three_dimensional_moments_use_all_axes() {
        let mut pts = Vec::new();
        for z in 0..3 {
            for y in 0..3 {
                for x in 0..3 {
                    pts.push(Point3i::new(x, y, z));
                }
            }
        }
        let cc = Component::from_points(pts);
        let m002 = central_moment(&cc, 0, 0, 2);
        // Sum over z of (z - 1)^2 is 2, times 9 columns.
        assert_relative_eq!(m002, 18.0, epsilon = 1e-9);
    }
}
