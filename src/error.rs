use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, UpdateError>;

#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("failed to parse {}: {reason}", path.display())]
    InvalidValuesFile { path: PathBuf, reason: String },

    #[error("invalid override {input:?}: {reason}")]
    InvalidOverride { input: String, reason: String },

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot find template {name}")]
    TemplateNotFound { name: String },

    #[error("template {name} is malformed: {reason}")]
    MalformedTemplate { name: String, reason: String },

    #[error("failed to serialize merged values: {0}")]
    Serialize(#[source] serde_yaml::Error),

    #[error("release service error: {0}")]
    Remote(String),
}
