//! Shape descriptors for labeled voxel components.
//!
//! Every routine here is a pure function of a [`vx_label::Component`]:
//! perimeter/surface estimation, direct ellipse and ellipsoid fits, convex
//! hull contour/area, central moments, sphericity, eccentricity and the
//! tabular feature rows. Descriptors branch once on the component's 2D/3D
//! flag; the 2D path never touches z moments or z neighbors.

mod descriptor;
mod ellipse;
mod error;
mod features;
mod hull;
mod moments;
mod perimeter;

pub use descriptor::{eccentricity, ellipse_dimensions, hull_ratio, sphericity};
pub use ellipse::{Ellipse2, Ellipsoid3, fit_ellipse_2d, fit_ellipsoid_3d};
pub use error::{FitError, HullError};
pub use features::{FeatureRow, Resolution, feature_row};
pub use hull::{ConvexHull3, convex_area_and_volume, hull_2d};
pub use moments::central_moment;
pub use perimeter::{SurfaceOutline, perimeter, perimeter_detailed};
