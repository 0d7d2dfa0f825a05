//! Umbrella crate for the `voxel-regions` workspace.
//!
//! Re-exports the container, labeling and descriptor crates and adds the
//! per-sequence pipeline: frame-parallel extraction over a time series and
//! comparator-driven relabeling.

mod pipeline;

pub use pipeline::{SeriesExtraction, SortOrder, extract_series, relabel_sorted};
pub use vx_core::*;
pub use vx_label::*;
pub use vx_shape::*;
