//! Three-pass connected component extraction.
//!
//! Pass 1 raster-scans the volume (z, then y, then x), assigns provisional
//! labels from the backward half of the 26-connectivity stencil and records
//! equivalences in the arena. Pass 2 resolves equivalences from the highest
//! id down, applies the size and edge filters and assigns dense final ids.
//! Pass 3 rewrites the label grid to final ids and materializes component
//! point lists in raster order.
//!
//! Connectivity is 26-connected in 3D (8-connected for single-slice input);
//! other topologies are out of scope.

use tracing::debug;
use vx_core::{Point3i, Volume, VoxelScalar};

use crate::arena::LabelArena;
use crate::component::Component;
use crate::error::LabelError;

/// How the reference value is interpreted when deciding which voxels are
/// candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    /// The reference value is the background; every other intensity is
    /// foreground, regardless of intensity variations.
    BackgroundAll,
    /// The reference value is the background, and touching voxels only join
    /// the same component when their intensities match.
    BackgroundLabeled,
    /// Only voxels equal to the reference value are foreground.
    ExactValue,
    /// The grid already carries per-region integer tags; interpreted as
    /// [`ExtractionMode::BackgroundLabeled`] with a reference value of 0.
    RegionOfInterest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionConfig {
    pub mode: ExtractionMode,
    /// Reference value; interpretation depends on `mode`.
    pub value: f64,
    /// Inclusive size bounds.
    pub min_size: usize,
    pub max_size: usize,
    /// Discard components touching the respective grid boundary. Callers
    /// must suppress `no_edge_z` for single-slice input (every voxel of a
    /// depth-1 grid is on the z edge); the sequence pipeline does this
    /// automatically.
    pub no_edge_x: bool,
    pub no_edge_y: bool,
    pub no_edge_z: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            mode: ExtractionMode::BackgroundAll,
            value: 0.0,
            min_size: 1,
            max_size: usize::MAX,
            no_edge_x: false,
            no_edge_y: false,
            no_edge_z: false,
        }
    }
}

impl ExtractionConfig {
    pub fn validate(&self) -> Result<(), LabelError> {
        if self.max_size < 1 || self.min_size > self.max_size {
            return Err(LabelError::InvalidBounds {
                min: self.min_size,
                max: self.max_size,
            });
        }
        Ok(())
    }

    /// Region-of-interest input is pre-tagged, so it reduces to the
    /// intensity-preserving mode over a zero background.
    fn effective(&self) -> (ExtractionMode, f64) {
        match self.mode {
            ExtractionMode::RegionOfInterest => (ExtractionMode::BackgroundLabeled, 0.0),
            mode => (mode, self.value),
        }
    }
}

/// Labels one frame and materializes its components.
///
/// `labels_out` must have the input's dimensions and be zero-filled by the
/// caller; no clearing is performed here so that callers can manage grid
/// reuse themselves. On success it holds the dense final ids (background 0)
/// and the returned components are in ascending final-id order.
pub fn extract_components<T: VoxelScalar>(
    input: &Volume<T>,
    cfg: &ExtractionConfig,
    labels_out: &mut Volume<u32>,
) -> Result<Vec<Component>, LabelError> {
    cfg.validate()?;
    if input.is_empty() {
        return Err(LabelError::EmptyInput);
    }
    if labels_out.dims() != input.dims() {
        return Err(LabelError::ShapeMismatch {
            expected: input.dims(),
            actual: labels_out.dims(),
        });
    }

    let (width, height, depth) = input.dims();
    let plane = width * height;
    let (mode, value) = cfg.effective();
    let exact = mode == ExtractionMode::ExactValue;
    let labeled = mode == ExtractionMode::BackgroundLabeled;
    // Degenerate 1-wide rows/columns fall back to the bounds-checked gather;
    // the unrolled switch assumes width >= 2 and height >= 2.
    let thin = width < 2 || height < 2;

    let mut arena = LabelArena::with_capacity(input.len() / 2);
    let mut neighbors = [0u32; 13];

    let in_data = input.data();
    let out_data = labels_out.data_mut();

    // Pass 1: provisional labels from the backward neighborhood.
    for z in 0..depth {
        let on_edge_z = z == 0 || z + 1 == depth;
        let (head, tail) = out_data.split_at_mut(z * plane);
        let current = &mut tail[..plane];
        let upper: &[u32] = if z == 0 {
            &[]
        } else {
            &head[(z - 1) * plane..]
        };
        let in_slice = &in_data[z * plane..(z + 1) * plane];

        for y in 0..height {
            let on_edge_y = y == 0 || y + 1 == height;
            for x in 0..width {
                let o = y * width + x;
                let p = in_slice[o].as_f64();

                // Candidate test: ExactValue keeps matches, the background
                // modes keep everything else.
                if exact != (p == value) {
                    continue;
                }
                let on_edge_x = x == 0 || x + 1 == width;

                let count = if thin {
                    backward_neighbors_thin(current, upper, x, y, width, height, &mut neighbors)
                } else {
                    backward_neighbors(current, upper, o, x, y, width, height, &mut neighbors)
                };

                // Minimum qualifying neighbor label, if any.
                let mut chosen = u32::MAX;
                for &nl in &neighbors[..count] {
                    if nl == 0 {
                        continue;
                    }
                    if labeled && arena.get(nl).image_value != p {
                        continue;
                    }
                    if nl < chosen {
                        chosen = nl;
                    }
                }

                if chosen == u32::MAX {
                    chosen = arena.alloc(p)?;
                } else {
                    // Union every other qualifying neighbor towards the
                    // chosen label. Chains always point higher ids at lower
                    // ones; when the neighbor's canonical is already lower,
                    // the chosen label's chain attaches upward instead. The
                    // union happens at the canonical level on both sides so
                    // that a voxel bridging two classes keeps them
                    // transitively merged.
                    for &nl in &neighbors[..count] {
                        if nl <= chosen {
                            continue;
                        }
                        if labeled && arena.get(nl).image_value != p {
                            continue;
                        }
                        let neighbor_root = arena.resolve(nl);
                        let chosen_root = arena.resolve(chosen);
                        if neighbor_root == chosen_root {
                            continue;
                        }
                        if chosen_root < neighbor_root {
                            let r = arena.get_mut(neighbor_root);
                            r.target_ref = Some(chosen_root);
                            r.target_id = chosen_root;
                        } else {
                            let r = arena.get_mut(chosen_root);
                            r.target_ref = Some(neighbor_root);
                            r.target_id = neighbor_root;
                        }
                    }
                }

                current[o] = chosen;
                let record = arena.get_mut(chosen);
                record.size += 1;
                record.on_edge_x |= on_edge_x;
                record.on_edge_y |= on_edge_y;
                record.on_edge_z |= on_edge_z;
            }
        }
    }

    // Pass 2: resolve equivalences from the top. When a canonical label is
    // reached, every higher child has already folded its size and edge flags
    // into it.
    let highest = arena.highest_id();
    let mut components: Vec<Component> = Vec::new();
    let mut discarded = 0usize;
    let mut final_count: u32 = 0;

    for id in (1..=highest).rev() {
        let target = arena.get(id).target_id;
        if target < id {
            let (size, ex, ey, ez) = {
                let child = arena.get(id);
                (child.size, child.on_edge_x, child.on_edge_y, child.on_edge_z)
            };
            let parent = arena.get_mut(target);
            parent.size += size;
            parent.on_edge_x |= ex;
            parent.on_edge_y |= ey;
            parent.on_edge_z |= ez;
            arena.get_mut(id).target_ref = Some(target);
        } else {
            let record = arena.get(id);
            let size_ok = record.size >= cfg.min_size && record.size <= cfg.max_size;
            let edge_ok = !((cfg.no_edge_x && record.on_edge_x)
                || (cfg.no_edge_y && record.on_edge_y)
                || (cfg.no_edge_z && record.on_edge_z));

            if size_ok && edge_ok {
                final_count += 1;
                let component = Component::with_capacity(
                    record.size,
                    record.on_edge_x,
                    record.on_edge_y,
                    record.on_edge_z,
                );
                components.push(component);
                arena.get_mut(id).target_id = final_count;
            } else {
                discarded += 1;
                arena.get_mut(id).target_id = 0;
            }
        }
    }

    // Pass 3: rewrite to final ids and collect points in raster order.
    let mut o = 0usize;
    for z in 0..depth {
        for y in 0..height {
            for x in 0..width {
                let provisional = out_data[o];
                if provisional != 0 {
                    let final_id = arena.resolve(provisional);
                    out_data[o] = final_id;
                    if final_id != 0 {
                        components[(final_id - 1) as usize].push_point(Point3i::new(
                            x as i32, y as i32, z as i32,
                        ));
                    }
                }
                o += 1;
            }
        }
    }

    debug!(
        provisional = highest,
        emitted = components.len(),
        discarded,
        "extracted connected components"
    );

    Ok(components)
}

/// Backward 13-neighborhood of the 26-connectivity stencil, unrolled over
/// the nine boundary cases (three y-positions by three x-positions on
/// slices z > 0, plus the z == 0 slice cases). Assumes `w >= 2 && h >= 2`;
/// a bounds-checked loop would be correct everywhere but measurably slower
/// on this hot path.
#[allow(clippy::too_many_arguments)]
#[inline]
fn backward_neighbors(
    current: &[u32],
    upper: &[u32],
    o: usize,
    x: usize,
    y: usize,
    w: usize,
    h: usize,
    out: &mut [u32; 13],
) -> usize {
    if upper.is_empty() {
        // First slice: only in-plane backward neighbors exist.
        if y == 0 {
            if x == 0 {
                0
            } else {
                out[0] = current[o - 1];
                1
            }
        } else {
            let north = o - w;
            if x == 0 {
                out[0] = current[north];
                out[1] = current[north + 1];
                2
            } else if x + 1 == w {
                out[0] = current[north - 1];
                out[1] = current[north];
                out[2] = current[o - 1];
                3
            } else {
                out[0] = current[north - 1];
                out[1] = current[north];
                out[2] = current[north + 1];
                out[3] = current[o - 1];
                4
            }
        }
    } else if y == 0 {
        let south = o + w;
        if x == 0 {
            out[0] = upper[o];
            out[1] = upper[o + 1];
            out[2] = upper[south];
            out[3] = upper[south + 1];
            4
        } else if x + 1 == w {
            out[0] = upper[o - 1];
            out[1] = upper[o];
            out[2] = upper[south - 1];
            out[3] = upper[south];
            out[4] = current[o - 1];
            5
        } else {
            out[0] = upper[o - 1];
            out[1] = upper[o];
            out[2] = upper[o + 1];
            out[3] = upper[south - 1];
            out[4] = upper[south];
            out[5] = upper[south + 1];
            out[6] = current[o - 1];
            7
        }
    } else if y + 1 == h {
        let north = o - w;
        if x == 0 {
            out[0] = upper[north];
            out[1] = upper[north + 1];
            out[2] = upper[o];
            out[3] = upper[o + 1];
            out[4] = current[north];
            out[5] = current[north + 1];
            6
        } else if x + 1 == w {
            out[0] = upper[north - 1];
            out[1] = upper[north];
            out[2] = upper[o - 1];
            out[3] = upper[o];
            out[4] = current[north - 1];
            out[5] = current[north];
            out[6] = current[o - 1];
            7
        } else {
            out[0] = upper[north - 1];
            out[1] = upper[north];
            out[2] = upper[north + 1];
            out[3] = upper[o - 1];
            out[4] = upper[o];
            out[5] = upper[o + 1];
            out[6] = current[north - 1];
            out[7] = current[north];
            out[8] = current[north + 1];
            out[9] = current[o - 1];
            10
        }
    } else {
        let north = o - w;
        let south = o + w;
        if x == 0 {
            out[0] = upper[north];
            out[1] = upper[north + 1];
            out[2] = upper[o];
            out[3] = upper[o + 1];
            out[4] = upper[south];
            out[5] = upper[south + 1];
            out[6] = current[north];
            out[7] = current[north + 1];
            8
        } else if x + 1 == w {
            out[0] = upper[north - 1];
            out[1] = upper[north];
            out[2] = upper[o - 1];
            out[3] = upper[o];
            out[4] = upper[south - 1];
            out[5] = upper[south];
            out[6] = current[north - 1];
            out[7] = current[north];
            out[8] = current[o - 1];
            9
        } else {
            out[0] = upper[north - 1];
            out[1] = upper[north];
            out[2] = upper[north + 1];
            out[3] = upper[o - 1];
            out[4] = upper[o];
            out[5] = upper[o + 1];
            out[6] = upper[south - 1];
            out[7] = upper[south];
            out[8] = upper[south + 1];
            out[9] = current[north - 1];
            out[10] = current[north];
            out[11] = current[north + 1];
            out[12] = current[o - 1];
            13
        }
    }
}

/// Raster-backward offsets of the 26-connectivity stencil: the full upper
/// slice ring plus the already-visited part of the current slice.
const BACKWARD_STENCIL: [(isize, isize, isize); 13] = [
    (-1, -1, -1),
    (0, -1, -1),
    (1, -1, -1),
    (-1, 0, -1),
    (0, 0, -1),
    (1, 0, -1),
    (-1, 1, -1),
    (0, 1, -1),
    (1, 1, -1),
    (-1, -1, 0),
    (0, -1, 0),
    (1, -1, 0),
    (-1, 0, 0),
];

/// Bounds-checked gather for degenerate grids (width or height of 1).
#[inline]
fn backward_neighbors_thin(
    current: &[u32],
    upper: &[u32],
    x: usize,
    y: usize,
    w: usize,
    h: usize,
    out: &mut [u32; 13],
) -> usize {
    let mut count = 0;
    for &(dx, dy, dz) in &BACKWARD_STENCIL {
        let nx = x as isize + dx;
        let ny = y as isize + dy;
        if nx < 0 || ny < 0 || nx >= w as isize || ny >= h as isize {
            continue;
        }
        let no = ny as usize * w + nx as usize;
        out[count] = if dz < 0 {
            if upper.is_empty() {
                continue;
            }
            upper[no]
        } else {
            current[no]
        };
        count += 1;
    }
    count
}
