use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentgenError {
    #[error("include path escapes project root: {0}")]
    PathEscape(String),

    #[error("include not found: {0}")]
    IncludeNotFound(PathBuf),

    #[error("include depth exceeded (max {max}) while resolving {path}")]
    DepthExceeded { path: String, max: usize },

    #[error("cannot read command template {path}: {source}")]
    SourceRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid role configuration {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("invalid project configuration {path}: {message}")]
    InvalidConfig { path: PathBuf, message: String },

    #[error("unknown role '{0}': expected one of pm, arch, dev, sec, qa, ops, all")]
    UnknownRole(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl AgentgenError {
    /// Short machine-readable kind, used in run summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentgenError::PathEscape(_) => "path_escape",
            AgentgenError::IncludeNotFound(_) => "include_not_found",
            AgentgenError::DepthExceeded { .. } => "depth_exceeded",
            AgentgenError::SourceRead { .. } => "source_read",
            AgentgenError::ConfigParse { .. } => "config_parse",
            AgentgenError::InvalidConfig { .. } => "invalid_config",
            AgentgenError::UnknownRole(_) => "unknown_role",
            AgentgenError::Io(_) => "io",
            AgentgenError::Yaml(_) => "yaml",
        }
    }
}

pub type Result<T> = std::result::Result<T, AgentgenError>;
