use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, ConvertError>;

/// Failures that abort one document-generation pass.
///
/// Lane anomalies (overlapping or out-of-order notes) are not errors; they are
/// reported through [`crate::LaneAnomaly`] and logged.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("Invalid PPQ: source {source_ppq}, destination {dest_ppq} (both must be positive)")]
    InvalidPpq { source_ppq: i64, dest_ppq: i64 },

    #[error("Too many clips ({count}). Maximum allowed: {max}")]
    TooManyClips { count: usize, max: usize },

    #[error("Malformed template: {0}")]
    MalformedTemplate(String),

    #[error("No more unique {0} available")]
    PoolExhausted(&'static str),

    #[error("Clip {index} is invalid: {reason}")]
    InvalidClip { index: usize, reason: String },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse template XML: {0}")]
    XmlParse(#[from] xmltree::ParseError),

    #[error("Failed to serialize document: {0}")]
    XmlWrite(#[from] xmltree::Error),
}

impl ConvertError {
    pub fn malformed(message: impl Into<String>) -> Self {
        ConvertError::MalformedTemplate(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConvertError::Io {
            path: path.into(),
            source,
        }
    }
}
