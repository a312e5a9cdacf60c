use crate::{
    config::Config,
    point3d::Point3,
    preprocessing::{NativePreprocessor, PreprocessingEngine},
};
use nalgebra as na;
use std::borrow::Borrow;

/// Per-frame entry point to the preprocessing engine.
///
/// Owns a single engine handle and adds no locking of its own; sharing one
/// `Preprocessor` across threads is only as safe as the engine makes it.
pub struct Preprocessor<E = NativePreprocessor> {
    engine: E,
}

impl<E: PreprocessingEngine> Preprocessor<E> {
    pub fn new(
        max_range: f64,
        min_range: f64,
        deskew: bool,
        max_num_threads: usize,
    ) -> Result<Self, E::Error> {
        Ok(Preprocessor {
            engine: E::new(max_range, min_range, deskew, max_num_threads)?,
        })
    }

    /// Builds the engine from `data.{max_range, min_range, deskew}` and
    /// `registration.max_num_threads`; nothing else in `config` is read.
    pub fn build(config: &Config) -> Result<Self, E::Error> {
        Self::new(
            config.data.max_range,
            config.data.min_range,
            config.data.deskew,
            config.registration.max_num_threads,
        )
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Runs one frame through the engine.
    ///
    /// `timestamps` is flattened in iteration order, so nested per-ring stamps
    /// can be passed as `rows.iter().flatten()`. Engine errors are returned
    /// untouched.
    pub fn preprocess<P, T>(
        &self,
        frame: &[P],
        timestamps: T,
        relative_motion: &na::Isometry3<f64>,
    ) -> Result<Vec<P>, E::Error>
    where
        P: Point3,
        T: IntoIterator,
        T::Item: Borrow<f64>,
    {
        let points: Vec<na::Vector3<f64>> = frame.iter().map(Point3::to_na_vec_f64).collect();
        let timestamps: Vec<f64> = timestamps.into_iter().map(|t| *t.borrow()).collect();
        let processed = self
            .engine
            .preprocess(&points, &timestamps, relative_motion)?;
        Ok(processed.iter().map(P::from_na_vec_f64).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PreprocessError;
    use std::cell::RefCell;

    /// Records what crosses the engine boundary.
    struct RecordingEngine {
        params: (f64, f64, bool, usize),
        seen_timestamps: RefCell<Vec<f64>>,
    }

    impl PreprocessingEngine for RecordingEngine {
        type Error = String;

        fn new(
            max_range: f64,
            min_range: f64,
            deskew: bool,
            max_num_threads: usize,
        ) -> Result<Self, String> {
            Ok(RecordingEngine {
                params: (max_range, min_range, deskew, max_num_threads),
                seen_timestamps: RefCell::new(Vec::new()),
            })
        }

        fn preprocess(
            &self,
            frame: &[na::Vector3<f64>],
            timestamps: &[f64],
            _relative_motion: &na::Isometry3<f64>,
        ) -> Result<Vec<na::Vector3<f64>>, String> {
            if frame.len() == 1 {
                return Err("engine rejected frame".to_string());
            }
            *self.seen_timestamps.borrow_mut() = timestamps.to_vec();
            Ok(frame.to_vec())
        }
    }

    #[test]
    fn test_build_reads_only_engine_fields() {
        let mut config = Config::default();
        config.data.max_range = 80.0;
        config.data.min_range = 2.0;
        config.data.deskew = false;
        config.registration.max_num_threads = 3;
        config.mapping.voxel_size = Some(9.0);
        config.out_dir = "elsewhere".to_string();
        let preprocessor = Preprocessor::<RecordingEngine>::build(&config).unwrap();
        assert_eq!(preprocessor.engine().params, (80.0, 2.0, false, 3));
    }

    #[test]
    fn test_nested_timestamps_are_flattened() {
        let preprocessor = Preprocessor::<RecordingEngine>::new(100.0, 0.0, true, 1).unwrap();
        let frame = [[1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [3.0, 0.0, 0.0], [4.0, 0.0, 0.0]];
        let rows = [[0.0, 0.1], [0.2, 0.3]];
        let out = preprocessor
            .preprocess(&frame, rows.iter().flatten(), &na::Isometry3::identity())
            .unwrap();
        assert_eq!(out, frame.to_vec());
        assert_eq!(*preprocessor.engine().seen_timestamps.borrow(), vec![0.0, 0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_engine_error_passes_through() {
        let preprocessor = Preprocessor::<RecordingEngine>::new(100.0, 0.0, true, 1).unwrap();
        let result = preprocessor.preprocess(&[[1.0f64, 0.0, 0.0]], &[0.0], &na::Isometry3::identity());
        assert_eq!(result, Err("engine rejected frame".to_string()));
    }

    #[test]
    fn test_empty_frame_through_native_engine() {
        let preprocessor = Preprocessor::<NativePreprocessor>::new(100.0, 0.0, false, 4).unwrap();
        let frame: Vec<[f64; 3]> = Vec::new();
        let out = preprocessor
            .preprocess(&frame, Vec::<f64>::new(), &na::Isometry3::identity())
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_native_engine_keeps_point_representation() {
        let config = Config::default().resolve();
        let preprocessor: Preprocessor = Preprocessor::build(&config).unwrap();
        let frame = vec![
            na::Point3::new(0.0, 0.0, 0.0),
            na::Point3::new(3.0, 4.0, 0.0),
            na::Point3::new(300.0, 0.0, 0.0),
        ];
        let out = preprocessor
            .preprocess(&frame, &[] as &[f64], &na::Isometry3::identity())
            .unwrap();
        assert_eq!(out, vec![na::Point3::new(3.0, 4.0, 0.0)]);
    }

    #[test]
    fn test_native_mismatch_error_unchanged() {
        let preprocessor = Preprocessor::<NativePreprocessor>::new(100.0, 0.0, true, 1).unwrap();
        let result = preprocessor.preprocess(
            &[[1.0f32, 0.0, 0.0], [2.0, 0.0, 0.0]],
            [0.0],
            &na::Isometry3::identity(),
        );
        assert!(matches!(
            result,
            Err(PreprocessError::TimestampMismatch {
                points: 2,
                timestamps: 1
            })
        ));
    }
}
