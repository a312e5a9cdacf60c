use crate::{error::PreprocessError, lie_group, point3d};
use nalgebra as na;
use rayon::prelude::*;

/// Scan preprocessing backend: built once from the range/deskew/thread
/// parameters, then fed one frame at a time.
pub trait PreprocessingEngine: Sized {
    type Error;

    fn new(
        max_range: f64,
        min_range: f64,
        deskew: bool,
        max_num_threads: usize,
    ) -> Result<Self, Self::Error>;

    /// `timestamps` holds one stamp per point, or nothing when the frame has
    /// no per-point timing.
    fn preprocess(
        &self,
        frame: &[na::Vector3<f64>],
        timestamps: &[f64],
        relative_motion: &na::Isometry3<f64>,
    ) -> Result<Vec<na::Vector3<f64>>, Self::Error>;
}

pub struct NativePreprocessor {
    max_range: f64,
    min_range: f64,
    deskew: bool,
    pool: rayon::ThreadPool,
}

impl PreprocessingEngine for NativePreprocessor {
    type Error = PreprocessError;

    fn new(
        max_range: f64,
        min_range: f64,
        deskew: bool,
        max_num_threads: usize,
    ) -> Result<Self, PreprocessError> {
        // rayon treats 0 as "pick for me"
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(max_num_threads)
            .build()?;
        Ok(NativePreprocessor {
            max_range,
            min_range,
            deskew,
            pool,
        })
    }

    fn preprocess(
        &self,
        frame: &[na::Vector3<f64>],
        timestamps: &[f64],
        relative_motion: &na::Isometry3<f64>,
    ) -> Result<Vec<na::Vector3<f64>>, PreprocessError> {
        if self.deskew && !timestamps.is_empty() && timestamps.len() != frame.len() {
            return Err(PreprocessError::TimestampMismatch {
                points: frame.len(),
                timestamps: timestamps.len(),
            });
        }
        Ok(self.pool.install(|| {
            if self.deskew && !timestamps.is_empty() {
                let deskewed = deskew_scan(frame, timestamps, relative_motion);
                point3d::clip_point_cloud_by_distance(&deskewed, self.min_range, self.max_range)
            } else {
                point3d::clip_point_cloud_by_distance(frame, self.min_range, self.max_range)
            }
        }))
    }
}

/// Moves every point to where it would have been seen at the end of the scan.
///
/// Stamps are normalized to [0, 1] over the frame; a frame whose stamps are all
/// equal is returned as is.
pub fn deskew_scan(
    frame: &[na::Vector3<f64>],
    timestamps: &[f64],
    relative_motion: &na::Isometry3<f64>,
) -> Vec<na::Vector3<f64>> {
    let min_time = timestamps.iter().copied().fold(f64::INFINITY, f64::min);
    let max_time = timestamps.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max_time - min_time;
    if !(span > 0.0) {
        return frame.to_vec();
    }
    frame
        .par_iter()
        .zip(timestamps.par_iter())
        .map(|(pt, stamp)| {
            let t = (stamp - min_time) / span;
            let pose = lie_group::scale(relative_motion, t - 1.0);
            pose.transform_point(&na::Point3::from(*pt)).coords
        })
        .collect()
}

/// Vertical angle calibration for KITTI scans; not meant for other datasets.
pub fn correct_kitti_scan(frame: &[na::Vector3<f64>]) -> Vec<na::Vector3<f64>> {
    let vertical_angle_offset = 0.205_f64.to_radians();
    frame
        .par_iter()
        .map(|pt| {
            let axis = pt.cross(&na::Vector3::z());
            match na::Unit::try_new(axis, f64::EPSILON) {
                Some(axis) => na::Rotation3::from_axis_angle(&axis, vertical_angle_offset) * *pt,
                // on the z axis
                None => *pt,
            }
        })
        .collect()
}
