//! Partial configs: every field optional, laid over a [`Config`] field by field.

use crate::{
    config::{AdaptiveThresholdConfig, Config, DataConfig, MappingConfig, RegistrationConfig},
    error::ConfigError,
};
use serde::{de::DeserializeOwned, Deserialize};
use std::{fmt::Display, str::FromStr};

pub const ENV_PREFIX: &str = "KISS_ICP_";
pub const ENV_NESTED_DELIMITER: &str = "__";

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(default)]
pub struct DataOverride {
    pub max_range: Option<f64>,
    pub min_range: Option<f64>,
    pub deskew: Option<bool>,
}
impl DataOverride {
    fn apply_to(self, data: &mut DataConfig) {
        set(&mut data.max_range, self.max_range);
        set(&mut data.min_range, self.min_range);
        set(&mut data.deskew, self.deskew);
    }
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(default)]
pub struct RegistrationOverride {
    pub max_num_iterations: Option<usize>,
    pub convergence_criterion: Option<f64>,
    pub max_num_threads: Option<usize>,
}
impl RegistrationOverride {
    fn apply_to(self, registration: &mut RegistrationConfig) {
        set(&mut registration.max_num_iterations, self.max_num_iterations);
        set(&mut registration.convergence_criterion, self.convergence_criterion);
        set(&mut registration.max_num_threads, self.max_num_threads);
    }
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(default)]
pub struct MappingOverride {
    pub voxel_size: Option<f64>,
    pub max_points_per_voxel: Option<usize>,
}
impl MappingOverride {
    fn apply_to(self, mapping: &mut MappingConfig) {
        if self.voxel_size.is_some() {
            mapping.voxel_size = self.voxel_size;
        }
        set(&mut mapping.max_points_per_voxel, self.max_points_per_voxel);
    }
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(default)]
pub struct AdaptiveThresholdOverride {
    pub fixed_threshold: Option<f64>,
    pub initial_threshold: Option<f64>,
    pub min_motion_th: Option<f64>,
}
impl AdaptiveThresholdOverride {
    fn apply_to(self, threshold: &mut AdaptiveThresholdConfig) {
        if self.fixed_threshold.is_some() {
            threshold.fixed_threshold = self.fixed_threshold;
        }
        set(&mut threshold.initial_threshold, self.initial_threshold);
        set(&mut threshold.min_motion_th, self.min_motion_th);
    }
}

/// One configuration source. A `null` or absent value leaves the field alone.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverride {
    pub out_dir: Option<String>,
    pub data: Option<DataOverride>,
    pub registration: Option<RegistrationOverride>,
    pub mapping: Option<MappingOverride>,
    pub adaptive_threshold: Option<AdaptiveThresholdOverride>,
}

impl ConfigOverride {
    pub fn apply_to(self, config: &mut Config) {
        set(&mut config.out_dir, self.out_dir);
        if let Some(data) = self.data {
            data.apply_to(&mut config.data);
        }
        if let Some(registration) = self.registration {
            registration.apply_to(&mut config.registration);
        }
        if let Some(mapping) = self.mapping {
            mapping.apply_to(&mut config.mapping);
        }
        if let Some(threshold) = self.adaptive_threshold {
            threshold.apply_to(&mut config.adaptive_threshold);
        }
    }

    /// Collects `KISS_ICP_*` variables.
    ///
    /// `KISS_ICP_DATA__MAX_RANGE=80` sets one field; `KISS_ICP_DATA='{"deskew": false}'`
    /// sets a group from JSON. Group variables are read before field variables,
    /// so a field variable wins over the same key in a group. Names that match
    /// no field are skipped.
    pub fn from_env(vars: &[(String, String)]) -> Result<ConfigOverride, ConfigError> {
        let mut overrides: Vec<(Vec<String>, &str, &str)> = vars
            .iter()
            .filter_map(|(key, raw)| Some((env_field_path(key)?, key.as_str(), raw.as_str())))
            .collect();
        overrides.sort_by_key(|(path, _, _)| path.len());

        let mut result = ConfigOverride::default();
        for (path, key, raw) in overrides {
            let segments: Vec<&str> = path.iter().map(String::as_str).collect();
            if result.set_from_env(&segments, key, raw)? {
                log::debug!("{} overrides {}", key, path.join("."));
            } else {
                log::debug!("ignoring {}: no config field {}", key, path.join("."));
            }
        }
        Ok(result)
    }

    fn set_from_env(&mut self, path: &[&str], key: &str, raw: &str) -> Result<bool, ConfigError> {
        match path {
            ["out_dir"] => self.out_dir = Some(raw.to_string()),
            ["data"] => self.data = Some(parse_group(key, raw)?),
            ["registration"] => self.registration = Some(parse_group(key, raw)?),
            ["mapping"] => self.mapping = Some(parse_group(key, raw)?),
            ["adaptive_threshold"] => self.adaptive_threshold = Some(parse_group(key, raw)?),
            ["data", field] => {
                let data = self.data.get_or_insert_with(Default::default);
                match *field {
                    "max_range" => data.max_range = Some(parse_value(key, raw)?),
                    "min_range" => data.min_range = Some(parse_value(key, raw)?),
                    "deskew" => data.deskew = Some(parse_value(key, raw)?),
                    _ => return Ok(false),
                }
            }
            ["registration", field] => {
                let registration = self.registration.get_or_insert_with(Default::default);
                match *field {
                    "max_num_iterations" => {
                        registration.max_num_iterations = Some(parse_value(key, raw)?)
                    }
                    "convergence_criterion" => {
                        registration.convergence_criterion = Some(parse_value(key, raw)?)
                    }
                    "max_num_threads" => {
                        registration.max_num_threads = Some(parse_value(key, raw)?)
                    }
                    _ => return Ok(false),
                }
            }
            ["mapping", field] => {
                let mapping = self.mapping.get_or_insert_with(Default::default);
                match *field {
                    "voxel_size" => mapping.voxel_size = parse_optional(key, raw)?,
                    "max_points_per_voxel" => {
                        mapping.max_points_per_voxel = Some(parse_value(key, raw)?)
                    }
                    _ => return Ok(false),
                }
            }
            ["adaptive_threshold", field] => {
                let threshold = self.adaptive_threshold.get_or_insert_with(Default::default);
                match *field {
                    "fixed_threshold" => threshold.fixed_threshold = parse_optional(key, raw)?,
                    "initial_threshold" => {
                        threshold.initial_threshold = Some(parse_value(key, raw)?)
                    }
                    "min_motion_th" => threshold.min_motion_th = Some(parse_value(key, raw)?),
                    _ => return Ok(false),
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// `KISS_ICP_DATA__MAX_RANGE` -> `["data", "max_range"]`.
fn env_field_path(key: &str) -> Option<Vec<String>> {
    if !key.to_ascii_uppercase().starts_with(ENV_PREFIX) {
        return None;
    }
    let path: Vec<String> = key[ENV_PREFIX.len()..]
        .to_ascii_lowercase()
        .split(ENV_NESTED_DELIMITER)
        .map(str::to_string)
        .collect();
    if path.iter().any(String::is_empty) {
        return None;
    }
    Some(path)
}

/// Scalars go through `FromStr`, so `inf` and `-inf` are valid floats.
fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .to_ascii_lowercase()
        .parse()
        .map_err(|e: T::Err| ConfigError::Env {
            key: key.to_string(),
            message: e.to_string(),
        })
}

/// `null`, `none` or an empty value leave an optional field alone.
fn parse_optional<T>(key: &str, raw: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "null" | "none" => Ok(None),
        _ => parse_value(key, raw).map(Some),
    }
}

fn parse_group<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T, ConfigError> {
    serde_json::from_str(raw).map_err(|e| ConfigError::Env {
        key: key.to_string(),
        message: e.to_string(),
    })
}
