use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot write settings to {path}: {message}")]
    Io { path: PathBuf, message: String },
    #[error("cannot encode settings: {0}")]
    Encode(String),
}
