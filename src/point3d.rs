use crate::error::PcdIoError;
use nalgebra as na;
use pcd_rs::{PcdDeserialize, PcdSerialize};
use rayon::prelude::*;
use std::path::Path;

/// A 3D point that can cross the preprocessing boundary.
pub trait Point3: Sized {
    fn to_na_vec_f64(&self) -> na::Vector3<f64>;
    fn from_na_vec_f64(v: &na::Vector3<f64>) -> Self;
}

impl Point3 for [f64; 3] {
    fn to_na_vec_f64(&self) -> na::Vector3<f64> {
        na::Vector3::new(self[0], self[1], self[2])
    }
    fn from_na_vec_f64(v: &na::Vector3<f64>) -> Self {
        [v.x, v.y, v.z]
    }
}

impl Point3 for [f32; 3] {
    fn to_na_vec_f64(&self) -> na::Vector3<f64> {
        na::Vector3::new(self[0] as f64, self[1] as f64, self[2] as f64)
    }
    fn from_na_vec_f64(v: &na::Vector3<f64>) -> Self {
        [v.x as f32, v.y as f32, v.z as f32]
    }
}

impl Point3 for na::Vector3<f64> {
    fn to_na_vec_f64(&self) -> na::Vector3<f64> {
        *self
    }
    fn from_na_vec_f64(v: &na::Vector3<f64>) -> Self {
        *v
    }
}

impl Point3 for na::Point3<f64> {
    fn to_na_vec_f64(&self) -> na::Vector3<f64> {
        self.coords
    }
    fn from_na_vec_f64(v: &na::Vector3<f64>) -> Self {
        na::Point3::from(*v)
    }
}

/// Lidar return as stored in PCD files.
#[derive(PcdDeserialize, Debug, Clone, Copy)]
pub struct Point3d {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub intensity: f32,
}

impl Point3d {
    pub fn xyz(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

/// Plain xyz record used when writing preprocessed frames.
#[derive(PcdSerialize, Debug, Clone, Copy, PartialEq)]
pub struct PointXyz {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<[f32; 3]> for PointXyz {
    fn from(p: [f32; 3]) -> Self {
        PointXyz {
            x: p[0],
            y: p[1],
            z: p[2],
        }
    }
}

pub fn read_pcd_to_points(pcd_path: &Path) -> Result<Vec<Point3d>, PcdIoError> {
    let reader = pcd_rs::Reader::open(pcd_path)?;
    let points: pcd_rs::anyhow::Result<Vec<Point3d>> = reader.collect();
    Ok(points?)
}

pub fn write_points_to_pcd(pcd_path: &Path, points: &[PointXyz]) -> Result<(), PcdIoError> {
    let mut writer: pcd_rs::Writer<PointXyz, _> = pcd_rs::WriterInit {
        width: points.len() as u64,
        height: 1,
        viewpoint: Default::default(),
        data_kind: pcd_rs::DataKind::Ascii,
        schema: None,
    }
    .create(pcd_path)?;
    for pt in points {
        writer.push(pt)?;
    }
    writer.finish()?;
    Ok(())
}

/// Keeps points whose range lies strictly between the bounds, in input order.
pub fn clip_point_cloud_by_distance(
    point_cloud: &[na::Vector3<f64>],
    min_distance: f64,
    max_distance: f64,
) -> Vec<na::Vector3<f64>> {
    let min2 = min_distance * min_distance;
    let max2 = max_distance * max_distance;
    point_cloud
        .par_iter()
        .filter_map(|pt| {
            let s = pt.norm_squared();
            if s <= min2 || s >= max2 {
                None
            } else {
                Some(*pt)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_is_strict_and_ordered() {
        let points = vec![
            na::Vector3::new(0.5, 0.0, 0.0),
            na::Vector3::new(3.0, 0.0, 0.0),
            na::Vector3::new(1.0, 0.0, 0.0),
            na::Vector3::new(0.0, 2.0, 0.0),
            na::Vector3::new(0.0, 0.0, 10.0),
        ];
        let clipped = clip_point_cloud_by_distance(&points, 1.0, 10.0);
        assert_eq!(
            clipped,
            vec![na::Vector3::new(3.0, 0.0, 0.0), na::Vector3::new(0.0, 2.0, 0.0)]
        );
    }

    #[test]
    fn test_clip_empty() {
        assert!(clip_point_cloud_by_distance(&[], 0.0, 100.0).is_empty());
    }

    #[test]
    fn test_point3_conversions() {
        let p = [1.0f32, -2.0, 3.5];
        let v = p.to_na_vec_f64();
        assert_eq!(v, na::Vector3::new(1.0, -2.0, 3.5));
        assert_eq!(<[f32; 3]>::from_na_vec_f64(&v), p);
        assert_eq!(na::Point3::from_na_vec_f64(&v), na::Point3::new(1.0, -2.0, 3.5));
    }

    #[test]
    fn test_pcd_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.pcd");
        let points = vec![
            PointXyz::from([1.0, 2.0, 3.0]),
            PointXyz::from([-1.5, 0.25, 8.0]),
        ];
        write_points_to_pcd(&path, &points).unwrap();
        let reader = pcd_rs::Reader::<PointXyzRead, _>::open(&path).unwrap();
        let read: Vec<PointXyzRead> = reader.collect::<pcd_rs::anyhow::Result<_>>().unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read[1].x, -1.5);
        assert_eq!(read[1].y, 0.25);
        assert_eq!(read[1].z, 8.0);
    }

    #[test]
    fn test_read_pcd_with_intensity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.pcd");
        std::fs::write(
            &path,
            "# .PCD v0.7 - Point Cloud Data file format\n\
             VERSION 0.7\n\
             FIELDS x y z intensity\n\
             SIZE 4 4 4 4\n\
             TYPE F F F F\n\
             COUNT 1 1 1 1\n\
             WIDTH 2\n\
             HEIGHT 1\n\
             VIEWPOINT 0 0 0 1 0 0 0\n\
             POINTS 2\n\
             DATA ascii\n\
             1.0 2.0 3.0 10.0\n\
             -1.5 0.25 8.0 20.0\n",
        )
        .unwrap();
        let points = read_pcd_to_points(&path).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].xyz(), [1.0, 2.0, 3.0]);
        assert_eq!(points[1].xyz(), [-1.5, 0.25, 8.0]);
        assert_eq!(points[1].intensity, 20.0);
    }

    #[test]
    fn test_read_missing_pcd_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_pcd_to_points(&dir.path().join("absent.pcd")).is_err());
    }

    #[derive(PcdDeserialize, Debug)]
    struct PointXyzRead {
        x: f32,
        y: f32,
        z: f32,
    }
}
