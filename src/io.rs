//! Layered config loading and dumping.
//!
//! Values are resolved field by field, later sources winning:
//! compiled-in defaults, then the optional YAML file, then `KISS_ICP_*`
//! environment variables.

use crate::{config::Config, error::ConfigError, overrides::ConfigOverride};
use std::{fs, io::Write, path::Path};

pub use crate::overrides::{ENV_NESTED_DELIMITER, ENV_PREFIX};
pub const DEFAULT_CONFIG_FILE: &str = "kiss_icp.yaml";

/// Whether this build can read and write YAML documents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum YamlSupport {
    Available,
    Unavailable,
}

impl YamlSupport {
    pub fn detect() -> YamlSupport {
        if cfg!(feature = "yaml") {
            YamlSupport::Available
        } else {
            YamlSupport::Unavailable
        }
    }

    /// Parses a YAML document into a config override. Empty documents override
    /// nothing.
    pub fn parse(self, text: &str) -> Result<ConfigOverride, ConfigError> {
        if self == YamlSupport::Unavailable {
            return Err(ConfigError::YamlUnavailable);
        }
        if is_blank_document(text) {
            return Ok(ConfigOverride::default());
        }
        parse_yaml(text)
    }

    pub fn dump(self, config: &Config) -> Result<String, ConfigError> {
        if self == YamlSupport::Unavailable {
            return Err(ConfigError::YamlUnavailable);
        }
        dump_yaml(config)
    }
}

#[cfg(feature = "yaml")]
fn parse_yaml(text: &str) -> Result<ConfigOverride, ConfigError> {
    let overrides: Option<ConfigOverride> = serde_yaml::from_str(text)?;
    Ok(overrides.unwrap_or_default())
}

#[cfg(not(feature = "yaml"))]
fn parse_yaml(_text: &str) -> Result<ConfigOverride, ConfigError> {
    Err(ConfigError::YamlUnavailable)
}

#[cfg(feature = "yaml")]
fn dump_yaml(config: &Config) -> Result<String, ConfigError> {
    Ok(serde_yaml::to_string(config)?)
}

#[cfg(not(feature = "yaml"))]
fn dump_yaml(_config: &Config) -> Result<String, ConfigError> {
    Err(ConfigError::YamlUnavailable)
}

fn is_blank_document(text: &str) -> bool {
    text.lines().map(str::trim).all(|line| {
        line.is_empty() || line.starts_with('#') || line == "---" || line == "..."
    })
}

/// Builds a resolved [`Config`] from defaults, a file and environment variables.
pub struct ConfigLoader {
    yaml: YamlSupport,
    env: Vec<(String, String)>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        ConfigLoader::new()
    }
}

impl ConfigLoader {
    /// Loader reading the process environment, with the compiled YAML support.
    pub fn new() -> ConfigLoader {
        ConfigLoader {
            yaml: YamlSupport::detect(),
            env: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        }
    }

    pub fn with_yaml_support(mut self, yaml: YamlSupport) -> ConfigLoader {
        self.yaml = yaml;
        self
    }

    /// Replaces the environment snapshot used for overrides.
    pub fn with_env<I, K, V>(mut self, vars: I) -> ConfigLoader
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    pub fn load(&self, config_file: Option<&Path>) -> Result<Config, ConfigError> {
        let mut config = Config::default();
        if let Some(path) = config_file {
            // checked before touching the file so a missing parser is reported first
            if self.yaml == YamlSupport::Unavailable {
                return Err(ConfigError::YamlUnavailable);
            }
            let text = fs::read_to_string(path)?;
            self.yaml.parse(&text)?.apply_to(&mut config);
            log::info!("Loaded config from {}", path.display());
        }
        ConfigOverride::from_env(&self.env)?.apply_to(&mut config);
        Ok(config.resolve())
    }
}

/// Loads the pipeline config.
///
/// A config file with no YAML support compiled in terminates the process with
/// status 1; running on defaults would silently change the results.
pub fn load_config(config_file: Option<&Path>) -> Result<Config, ConfigError> {
    match ConfigLoader::new().load(config_file) {
        Err(ConfigError::YamlUnavailable) => {
            let err = ConfigError::YamlUnavailable;
            log::error!("{}", err);
            eprintln!("{}", err);
            std::process::exit(1);
        }
        result => result,
    }
}

/// Dumps every field of `config` to `path`, as YAML when available and as
/// pretty JSON otherwise.
///
/// JSON has no infinities or NaN, so the JSON dump refuses such values instead
/// of writing `null` in their place.
pub fn write_config(config: &Config, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    write_config_with(config, path, YamlSupport::detect())
}

pub fn write_config_with(
    config: &Config,
    path: impl AsRef<Path>,
    yaml: YamlSupport,
) -> Result<(), ConfigError> {
    let contents = match yaml.dump(config) {
        Err(ConfigError::YamlUnavailable) => {
            log::warn!("YAML support unavailable, writing config as JSON");
            if let Some(field) = config.non_finite_field() {
                return Err(ConfigError::NonFinite(field));
            }
            serde_json::to_string_pretty(config)?
        }
        other => other?,
    };
    let mut file = fs::File::create(path.as_ref())?;
    file.write_all(contents.as_bytes())?;
    Ok(())
}
