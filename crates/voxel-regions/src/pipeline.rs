//! Per-sequence extraction pipeline.
//!
//! Frames label independently: each time point owns its arena and output
//! grid, so a task-per-frame dispatch is safe and no state is shared across
//! frames. Cancellation, if a caller needs it, fits between frames only;
//! there are no suspension points within one.

use rayon::prelude::*;
use tracing::debug;
use vx_core::{Volume, VoxelScalar};
use vx_label::{Component, ExtractionConfig, LabelError, extract_components};

/// Labeled output of a time series: one id grid and one component list per
/// frame, components in ascending final-id order.
#[derive(Debug, Clone)]
pub struct SeriesExtraction {
    pub labeled: Vec<Volume<u32>>,
    pub frames: Vec<Vec<Component>>,
}

impl SeriesExtraction {
    pub fn total_components(&self) -> usize {
        self.frames.iter().map(Vec::len).sum()
    }
}

/// Optional relabeling order applied before emission. Depth compares mass
/// center z coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Arbitrary,
    DepthAscending,
    DepthDescending,
}

/// Labels every frame of a series.
///
/// All frames must share the first frame's dimensions. The z-edge discard
/// is suppressed automatically for single-slice series, where it would
/// otherwise remove every component.
pub fn extract_series<T: VoxelScalar + Sync>(
    frames: &[Volume<T>],
    cfg: &ExtractionConfig,
) -> Result<SeriesExtraction, LabelError> {
    if frames.is_empty() {
        return Err(LabelError::EmptyInput);
    }
    cfg.validate()?;

    let dims = frames[0].dims();
    for frame in frames {
        if frame.dims() != dims {
            return Err(LabelError::ShapeMismatch {
                expected: dims,
                actual: frame.dims(),
            });
        }
    }

    let mut cfg = cfg.clone();
    if frames[0].depth() <= 1 {
        cfg.no_edge_z = false;
    }

    let per_frame: Vec<(Volume<u32>, Vec<Component>)> = frames
        .par_iter()
        .enumerate()
        .map(|(t, frame)| {
            let mut labels = Volume::new_fill(frame.width(), frame.height(), frame.depth(), 0u32);
            let mut components = extract_components(frame, &cfg, &mut labels)?;
            for component in &mut components {
                component.set_t(t);
            }
            Ok((labels, components))
        })
        .collect::<Result<_, LabelError>>()?;

    let mut labeled = Vec::with_capacity(per_frame.len());
    let mut components = Vec::with_capacity(per_frame.len());
    for (grid, frame_components) in per_frame {
        labeled.push(grid);
        components.push(frame_components);
    }

    let extraction = SeriesExtraction {
        labeled,
        frames: components,
    };
    debug!(
        frames = extraction.frames.len(),
        components = extraction.total_components(),
        "series extraction finished"
    );
    Ok(extraction)
}

/// Reorders each frame's components by the given criterion and rewrites the
/// id grids to match, keeping ids dense `1..=K` per frame.
pub fn relabel_sorted(extraction: &mut SeriesExtraction, order: SortOrder) {
    if order == SortOrder::Arbitrary {
        return;
    }

    for (grid, components) in extraction.labeled.iter_mut().zip(&mut extraction.frames) {
        components.sort_by(|a, b| {
            let (za, zb) = (a.mass_center().z, b.mass_center().z);
            let ordering = za.partial_cmp(&zb).unwrap_or(std::cmp::Ordering::Equal);
            match order {
                SortOrder::DepthAscending => ordering,
                SortOrder::DepthDescending => ordering.reverse(),
                SortOrder::Arbitrary => std::cmp::Ordering::Equal,
            }
        });

        grid.fill(0);
        let (w, h) = (grid.width(), grid.height());
        let data = grid.data_mut();
        for (i, component) in components.iter().enumerate() {
            let id = (i + 1) as u32;
            for p in component.iter() {
                data[(p.z as usize * h + p.y as usize) * w + p.x as usize] = id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use vx_core::Volume;
    use vx_label::{ExtractionConfig, LabelError};

    use super::{SortOrder, extract_series, relabel_sorted};

    fn cube_frame(side: usize, cube: usize, offset: usize) -> Volume<u8> {
        let mut vol = Volume::new_fill(side, side, side, 0u8);
        for z in offset..offset + cube {
            for y in offset..offset + cube {
                for x in offset..offset + cube {
                    *vol.get_mut(x, y, z).expect("in bounds") = 1;
                }
            }
        }
        vol
    }

    #[test]
    fn solid_cube_round_trip() {
        let s = 5usize;
        let frame = cube_frame(9, s, 2);
        let extraction =
            extract_series(&[frame], &ExtractionConfig::default()).expect("extraction");

        assert_eq!(extraction.frames[0].len(), 1);
        let cc = &extraction.frames[0][0];
        assert_eq!(cc.size(), s * s * s);
        assert!(!cc.on_edge_x() && !cc.on_edge_y() && !cc.on_edge_z());

        let (min, max) = cc.bounding_box();
        let diagonal = vx_core::Point3f::from(max).distance(min.into());
        assert_relative_eq!(diagonal, (s as f64 - 1.0) * 3.0f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn frames_label_independently_and_carry_t() {
        let frames = vec![
            cube_frame(8, 2, 1),
            cube_frame(8, 2, 4),
            Volume::new_fill(8, 8, 8, 0u8),
        ];
        let extraction =
            extract_series(&frames, &ExtractionConfig::default()).expect("extraction");

        assert_eq!(extraction.frames.len(), 3);
        assert_eq!(extraction.frames[0].len(), 1);
        assert_eq!(extraction.frames[1].len(), 1);
        assert!(extraction.frames[2].is_empty());
        assert_eq!(extraction.frames[0][0].t(), 0);
        assert_eq!(extraction.frames[1][0].t(), 1);
        assert_eq!(extraction.total_components(), 2);
    }

    #[test]
    fn single_slice_series_suppresses_z_discard() {
        let frame = Volume::from_vec(4, 4, 1, vec![1u8; 16]).expect("valid volume");
        let cfg = ExtractionConfig {
            no_edge_z: true,
            ..ExtractionConfig::default()
        };
        let extraction = extract_series(&[frame], &cfg).expect("extraction");
        assert_eq!(extraction.frames[0].len(), 1);
    }

    #[test]
    fn empty_series_is_fatal() {
        let err = extract_series::<u8>(&[], &ExtractionConfig::default()).unwrap_err();
        assert_eq!(err, LabelError::EmptyInput);
    }

    #[test]
    fn mismatched_frames_are_rejected() {
        let frames = vec![
            Volume::new_fill(4, 4, 2, 0u8),
            Volume::new_fill(4, 4, 3, 0u8),
        ];
        let err = extract_series(&frames, &ExtractionConfig::default()).unwrap_err();
        assert!(matches!(err, LabelError::ShapeMismatch { .. }));
    }

    #[test]
    fn sorted_relabel_orders_ids_by_depth() {
        // Two blobs on different slices; raster order finds the shallow one
        // first.
        let mut vol = Volume::new_fill(6, 6, 6, 0u8);
        for y in 0..2 {
            for x in 0..2 {
                *vol.get_mut(x, y, 1).expect("in bounds") = 1;
                *vol.get_mut(x + 3, y + 3, 4).expect("in bounds") = 1;
            }
        }
        let mut extraction =
            extract_series(&[vol], &ExtractionConfig::default()).expect("extraction");

        relabel_sorted(&mut extraction, SortOrder::DepthDescending);
        let components = &extraction.frames[0];
        assert_eq!(components.len(), 2);
        assert!(components[0].mass_center().z > components[1].mass_center().z);

        // The grid ids follow the new order and stay dense.
        let grid = &extraction.labeled[0];
        assert_eq!(grid.get(3, 3, 4), Some(&1));
        assert_eq!(grid.get(0, 0, 1), Some(&2));

        relabel_sorted(&mut extraction, SortOrder::DepthAscending);
        let grid = &extraction.labeled[0];
        assert_eq!(grid.get(0, 0, 1), Some(&1));
        assert_eq!(grid.get(3, 3, 4), Some(&2));

        // The voxel-to-component bijection survives the relabel.
        let components = &extraction.frames[0];
        for (i, component) in components.iter().enumerate() {
            for p in component.iter() {
                assert_eq!(
                    extraction.labeled[0].get(p.x as usize, p.y as usize, p.z as usize),
                    Some(&((i + 1) as u32))
                );
            }
        }
    }
}
