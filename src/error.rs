use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "custom configuration file specified but YAML support is not compiled in, \
         rebuild with `--features yaml` or drop the config file argument"
    )]
    YamlUnavailable,

    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "yaml")]
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid value for {key}: {message}")]
    Env { key: String, message: String },

    #[error("{0} is not finite and cannot be written as JSON, enable the `yaml` feature")]
    NonFinite(&'static str),
}

#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("got {timestamps} timestamps for a frame of {points} points")]
    TimestampMismatch { points: usize, timestamps: usize },

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Error, Debug)]
pub enum PcdIoError {
    #[error(transparent)]
    Pcd(#[from] pcd_rs::anyhow::Error),
}
