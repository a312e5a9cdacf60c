use nalgebra as na;
use rayon::prelude::*;
use std::collections::HashMap;

pub type Voxel = na::Vector3<i32>;

/// Keeps one point per occupied voxel; which one survives is unspecified.
pub fn voxel_downsample(point_cloud: &[na::Vector3<f64>], voxel_size: f64) -> Vec<na::Vector3<f64>> {
    let grid: HashMap<Voxel, na::Vector3<f64>> = point_cloud
        .par_iter()
        .map(|pt| (point_to_voxel(pt, voxel_size), *pt))
        .collect();
    grid.into_values().collect()
}

pub fn point_to_voxel(point: &na::Vector3<f64>, voxel_size: f64) -> Voxel {
    Voxel::new(
        (point.x / voxel_size).floor() as i32,
        (point.y / voxel_size).floor() as i32,
        (point.z / voxel_size).floor() as i32,
    )
}
