pub mod config;
pub mod error;
pub mod io;
pub mod lie_group;
pub mod overrides;
pub mod point3d;
pub mod preprocessing;
pub mod preprocessor;
pub mod voxel_util;
