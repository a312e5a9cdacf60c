use serde::{Deserialize, Serialize};

/// Distance bounds and motion compensation for incoming scans.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DataConfig {
    pub max_range: f64,
    pub min_range: f64,
    pub deskew: bool,
}
impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            max_range: 100.0,
            min_range: 0.0,
            deskew: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RegistrationConfig {
    pub max_num_iterations: usize,
    pub convergence_criterion: f64,
    /// 0 lets the engine pick the thread count.
    pub max_num_threads: usize,
}
impl Default for RegistrationConfig {
    fn default() -> Self {
        RegistrationConfig {
            max_num_iterations: 500,
            convergence_criterion: 0.0001,
            max_num_threads: 0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MappingConfig {
    /// Left empty, it is derived from `data.max_range` on resolution.
    pub voxel_size: Option<f64>,
    pub max_points_per_voxel: usize,
}
impl Default for MappingConfig {
    fn default() -> Self {
        MappingConfig {
            voxel_size: None,
            max_points_per_voxel: 20,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AdaptiveThresholdConfig {
    pub fixed_threshold: Option<f64>,
    pub initial_threshold: f64,
    pub min_motion_th: f64,
}
impl Default for AdaptiveThresholdConfig {
    fn default() -> Self {
        AdaptiveThresholdConfig {
            fixed_threshold: None,
            initial_threshold: 2.0,
            min_motion_th: 0.1,
        }
    }
}

/// Full pipeline settings.
///
/// A freshly deserialized value is raw: call [`Config::resolve`] once before
/// handing it to the pipeline so that `voxel_size` is set and the range bounds
/// are ordered.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub out_dir: String,
    pub data: DataConfig,
    pub registration: RegistrationConfig,
    pub mapping: MappingConfig,
    pub adaptive_threshold: AdaptiveThresholdConfig,
}
impl Default for Config {
    fn default() -> Self {
        Config {
            out_dir: "results".to_string(),
            data: DataConfig::default(),
            registration: RegistrationConfig::default(),
            mapping: MappingConfig::default(),
            adaptive_threshold: AdaptiveThresholdConfig::default(),
        }
    }
}

impl Config {
    /// Repairs inverted range bounds and fills in derived defaults.
    ///
    /// An inverted range is not an error: `min_range` is reset to `0.0` and a
    /// warning is logged.
    pub fn resolve(mut self) -> Config {
        if self.data.max_range < self.data.min_range {
            log::warn!(
                "max_range ({}) is smaller than min_range ({}), setting min_range to 0.0",
                self.data.max_range,
                self.data.min_range
            );
            self.data.min_range = 0.0;
        }
        if self.mapping.voxel_size.is_none() {
            self.mapping.voxel_size = Some(self.data.max_range / 100.0);
        }
        self
    }

    /// Voxel size of a resolved config, derived on the fly for raw ones.
    pub fn voxel_size(&self) -> f64 {
        self.mapping
            .voxel_size
            .unwrap_or(self.data.max_range / 100.0)
    }

    /// First float field holding an infinity or NaN, by dotted name.
    pub fn non_finite_field(&self) -> Option<&'static str> {
        let fields = [
            ("data.max_range", Some(self.data.max_range)),
            ("data.min_range", Some(self.data.min_range)),
            (
                "registration.convergence_criterion",
                Some(self.registration.convergence_criterion),
            ),
            ("mapping.voxel_size", self.mapping.voxel_size),
            (
                "adaptive_threshold.fixed_threshold",
                self.adaptive_threshold.fixed_threshold,
            ),
            (
                "adaptive_threshold.initial_threshold",
                Some(self.adaptive_threshold.initial_threshold),
            ),
            (
                "adaptive_threshold.min_motion_th",
                Some(self.adaptive_threshold.min_motion_th),
            ),
        ];
        fields
            .into_iter()
            .find(|(_, value)| value.is_some_and(|v| !v.is_finite()))
            .map(|(name, _)| name)
    }
}
