#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to open configuration file: {0}")]
    ConfigOpen(#[from] std::io::Error),
    #[error("failed to parse configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("at {path} failed substituting environment variable: {reason}")]
    EnvVarSubstitution { path: String, reason: String },
    #[error("invalid configuration: {0}")]
    Validation(String),
}
