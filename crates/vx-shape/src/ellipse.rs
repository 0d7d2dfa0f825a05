//! Direct algebraic ellipse and ellipsoid fitting.
//!
//! The 2D path is the direct least-squares conic fit over centered design
//! matrices, solved through the permuted 3x3 pencil whose unique
//! constraint-positive eigenvector is the ellipse. The 3D path is the
//! generalized least-squares quadric fit followed by an eigendecomposition
//! of the centered quadric; radii are reciprocal square roots of the
//! eigenvalues.
//!
//! Both fits operate on the raw member voxels of a component, not on a
//! contour; callers wanting boundary fits can pass a contour component.

use nalgebra::linalg::Schur;
use nalgebra::{DMatrix, DVector, Matrix3, Matrix4, Vector3};
use vx_core::{Point3f, Vec3f};
use vx_label::Component;

use crate::error::FitError;

/// Fitted 2D ellipse: `ax^2 + bxy + cy^2 + dx + fy + g = 0` with the
/// 6-vector normalized to unit Frobenius norm.
#[derive(Debug, Clone, PartialEq)]
pub struct Ellipse2 {
    pub center: (f64, f64),
    /// Semi-axes `(a_len, b_len)` in pencil order (not sorted).
    pub radii: (f64, f64),
    /// Orientation of the first axis, in radians.
    pub phi: f64,
    pub equation: [f64; 6],
}

/// Fitted 3D ellipsoid in eigen order (radii unsorted, paired with axes).
#[derive(Debug, Clone, PartialEq)]
pub struct Ellipsoid3 {
    pub center: Point3f,
    pub radii: [f64; 3],
    pub axes: [Vec3f; 3],
    /// The 9 quadric coefficients `(x^2, y^2, z^2, 2xy, 2xz, 2yz, 2x, 2y,
    /// 2z)` of the least-squares solve.
    pub equation: [f64; 9],
}

pub fn fit_ellipse_2d(cc: &Component) -> Result<Ellipse2, FitError> {
    let n = cc.size();
    if n < 6 {
        return Err(FitError::TooFewPoints { needed: 6, got: n });
    }

    let center = cc.mass_center();
    let mut d1 = DMatrix::<f64>::zeros(n, 3);
    let mut d2 = DMatrix::<f64>::zeros(n, 3);
    for (i, p) in cc.iter().enumerate() {
        let x = p.x as f64 - center.x;
        let y = p.y as f64 - center.y;
        d1[(i, 0)] = x * x;
        d1[(i, 1)] = x * y;
        d1[(i, 2)] = y * y;
        d2[(i, 0)] = x;
        d2[(i, 1)] = y;
        d2[(i, 2)] = 1.0;
    }

    let s1 = d1.transpose() * &d1;
    let s2 = d1.transpose() * &d2;
    let s3 = d2.transpose() * &d2;

    let t = -(s3
        .lu()
        .solve(&s2.transpose())
        .ok_or(FitError::DegenerateShape)?);
    let m = s1 + &s2 * &t;

    // Permuted pencil; its constraint-positive eigenvector is the conic.
    let pencil = Matrix3::new(
        m[(2, 0)] / 2.0,
        m[(2, 1)] / 2.0,
        m[(2, 2)] / 2.0,
        -m[(1, 0)],
        -m[(1, 1)],
        -m[(1, 2)],
        m[(0, 0)] / 2.0,
        m[(0, 1)] / 2.0,
        m[(0, 2)] / 2.0,
    );

    // The pencil is not symmetric: the ellipse eigenvalue is real but the
    // other two may form a complex pair, so the real ones are filtered out
    // of the Schur spectrum.
    let schur = Schur::try_new(pencil, 1.0e-12, 500).ok_or(FitError::DegenerateShape)?;
    let eigenvalues = schur.complex_eigenvalues();

    let mut conic: Option<Vector3<f64>> = None;
    for i in 0..3 {
        let lambda = eigenvalues[i];
        if lambda.im.abs() > 1.0e-9 * (1.0 + lambda.re.abs()) {
            continue;
        }
        let v = null_vector(&(pencil - Matrix3::identity() * lambda.re));
        if 4.0 * v[0] * v[2] - v[1] * v[1] > 0.0 {
            conic = Some(v);
            break;
        }
    }
    let mut v = conic.ok_or(FitError::DegenerateShape)?;
    // Canonical sign: positive leading coefficients (a and c share the sign
    // of their sum for any real ellipse).
    if v[0] + v[2] < 0.0 {
        v = -v;
    }

    let lower = &t * DVector::from_column_slice(v.as_slice());
    let mut ell = [v[0], v[1], v[2], lower[0], lower[1], lower[2]];

    // Undo the centering shift.
    let (cx0, cy0) = (center.x, center.y);
    let a4 = ell[3] - 2.0 * ell[0] * cx0 - ell[1] * cy0;
    let a5 = ell[4] - 2.0 * ell[2] * cy0 - ell[1] * cx0;
    let a6 = ell[5] + ell[0] * cx0 * cx0 + ell[2] * cy0 * cy0 + ell[1] * cx0 * cy0
        - ell[3] * cx0
        - ell[4] * cy0;
    ell[3] = a4;
    ell[4] = a5;
    ell[5] = a6;

    let norm = ell.iter().map(|c| c * c).sum::<f64>().sqrt();
    for c in &mut ell {
        *c /= norm;
    }

    geometric_parameters(&ell)
}

/// Conic 6-vector to center, semi-axes and orientation.
fn geometric_parameters(ell: &[f64; 6]) -> Result<Ellipse2, FitError> {
    let a = ell[0];
    let b = ell[1] / 2.0;
    let c = ell[2];
    let d = ell[3] / 2.0;
    let f = ell[4] / 2.0;
    let g = ell[5];

    let den = b * b - a * c;
    if den == 0.0 {
        return Err(FitError::DegenerateShape);
    }
    let cx = (c * d - b * f) / den;
    let cy = (a * f - b * d) / den;

    let delta = 2.0 * (a * f * f + c * d * d + g * b * b - 2.0 * b * d * f - a * c * g);
    let root = ((a - c) * (a - c) + 4.0 * b * b).sqrt();
    let ra2 = delta / (den * (root - (a + c)));
    let rb2 = delta / (den * (-root - (a + c)));
    if ra2 <= 0.0 || rb2 <= 0.0 {
        return Err(FitError::DegenerateShape);
    }

    let phi = if b == 0.0 {
        if a <= c { 0.0 } else { std::f64::consts::FRAC_PI_2 }
    } else if a < c {
        (2.0 * b / (a - c)).atan() / 2.0
    } else if a > c {
        (2.0 * b / (a - c)).atan() / 2.0 + std::f64::consts::FRAC_PI_2
    } else {
        0.0
    };

    Ok(Ellipse2 {
        center: (cx, cy),
        radii: (ra2.sqrt(), rb2.sqrt()),
        phi,
        equation: *ell,
    })
}

/// Largest cross product of two rows of a (near-)singular matrix spans its
/// null space.
fn null_vector(m: &Matrix3<f64>) -> Vector3<f64> {
    let r0 = m.row(0).transpose();
    let r1 = m.row(1).transpose();
    let r2 = m.row(2).transpose();

    let candidates = [r0.cross(&r1), r1.cross(&r2), r0.cross(&r2)];
    let mut best = candidates[0];
    for c in &candidates[1..] {
        if c.norm() > best.norm() {
            best = *c;
        }
    }
    best.normalize()
}

pub fn fit_ellipsoid_3d(cc: &Component) -> Result<Ellipsoid3, FitError> {
    let n = cc.size();
    if n < 9 {
        return Err(FitError::TooFewPoints { needed: 9, got: n });
    }

    let mut d = DMatrix::<f64>::zeros(n, 9);
    for (i, p) in cc.iter().enumerate() {
        let x = p.x as f64;
        let y = p.y as f64;
        let z = p.z as f64;
        d[(i, 0)] = x * x;
        d[(i, 1)] = y * y;
        d[(i, 2)] = z * z;
        d[(i, 3)] = 2.0 * x * y;
        d[(i, 4)] = 2.0 * x * z;
        d[(i, 5)] = 2.0 * y * z;
        d[(i, 6)] = 2.0 * x;
        d[(i, 7)] = 2.0 * y;
        d[(i, 8)] = 2.0 * z;
    }

    let dt = d.transpose();
    let rhs = &dt * DVector::from_element(n, 1.0);
    // Rank-deficient normal equations mean a flat cloud (e.g. a single
    // plane); the deficiency is detected through singular values rather
    // than LU pivots, which can miss it in floating point.
    let normal = &dt * &d;
    let svd = normal.svd(true, true);
    let tol = svd.singular_values.max() * 1e-10;
    if svd.rank(tol) < 9 {
        return Err(FitError::DegenerateShape);
    }
    let v = svd
        .solve(&rhs, tol)
        .map_err(|_| FitError::DegenerateShape)?;

    let a4 = Matrix4::new(
        v[0], v[3], v[4], v[6], //
        v[3], v[1], v[5], v[7], //
        v[4], v[5], v[2], v[8], //
        v[6], v[7], v[8], -1.0,
    );

    let a33 = a4.fixed_view::<3, 3>(0, 0).into_owned();
    let center = (-a33).try_inverse().ok_or(FitError::DegenerateShape)?
        * Vector3::new(v[6], v[7], v[8]);

    let mut t4 = Matrix4::<f64>::identity();
    t4[(3, 0)] = center[0];
    t4[(3, 1)] = center[1];
    t4[(3, 2)] = center[2];
    let r = t4 * a4 * t4.transpose();
    let r33 = r[(3, 3)];
    if r33 == 0.0 {
        return Err(FitError::DegenerateShape);
    }

    let eigen = (r.fixed_view::<3, 3>(0, 0).into_owned() * (-1.0 / r33)).symmetric_eigen();

    let mut radii = [0.0; 3];
    let mut axes = [Vec3f::default(); 3];
    for i in 0..3 {
        // Non-positive eigenvalues surface as NaN radii.
        radii[i] = (1.0 / eigen.eigenvalues[i]).sqrt();
        let col = eigen.eigenvectors.column(i);
        axes[i] = Vec3f::new(col[0], col[1], col[2]);
    }

    let mut equation = [0.0; 9];
    equation.copy_from_slice(v.as_slice());

    Ok(Ellipsoid3 {
        center: Point3f::new(center[0], center[1], center[2]),
        radii,
        axes,
        equation,
    })
}
