use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid duration {0:?} (expected \"<N>s\", \"<N>ms\" or \"infinite\")")]
    InvalidDuration(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
