use thiserror::Error;

/// Failure modes of the ellipse and ellipsoid fits. Neither is fatal:
/// wrapper routines surface them as NaN radii.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FitError {
    #[error("too few points for the fit: need at least {needed}, got {got}")]
    TooFewPoints { needed: usize, got: usize },

    /// Singular system, typically a flat or collapsed point cloud.
    #[error("degenerate shape: the fitted system is singular")]
    DegenerateShape,
}

/// Failure modes of the 3D convex hull construction. The area/volume
/// routine maps both to its contractual fallback values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HullError {
    #[error("need at least 4 points to build a 3D hull")]
    InsufficientVertices,

    #[error("points are collinear or coplanar")]
    Degenerate,
}
