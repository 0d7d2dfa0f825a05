/// Scalar voxel types accepted as labeling input.
///
/// Candidate predicates and the intensity-preserving extraction mode compare
/// voxel values in `f64`, so every supported scalar converts losslessly (or
/// with the usual `f32` widening) to `f64`.
pub trait VoxelScalar: Copy {
    fn as_f64(self) -> f64;
}

impl VoxelScalar for u8 {
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl VoxelScalar for u16 {
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl VoxelScalar for u32 {
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl VoxelScalar for i32 {
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl VoxelScalar for f32 {
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl VoxelScalar for f64 {
    fn as_f64(self) -> f64 {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::VoxelScalar;

    #[test]
    fn conversions_preserve_value() {
        assert_eq!(200u8.as_f64(), 200.0);
        assert_eq!(40_000u16.as_f64(), 40_000.0);
        assert_eq!(3_000_000u32.as_f64(), 3_000_000.0);
        assert_eq!((-17i32).as_f64(), -17.0);
        assert_eq!(1.5f32.as_f64(), 1.5);
        assert_eq!(2.25f64.as_f64(), 2.25);
    }
}
