use thiserror::Error;

/// Errors raised when a filter definition is accepted or edited.
///
/// Matching never fails; anything that could go wrong with a filter is
/// caught here, before the filter reaches a pass.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Invalid regular expression '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("A filter cannot be both a regular expression and a logic combination")]
    ConflictingModes,

    #[error("Marker {0} is out of range. Valid markers are 1-9")]
    MarkerOutOfRange(u8),

    #[error("Filter index {index} is out of range (list has {len} filters)")]
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarkerError {
    #[error("Marker {0} is out of range. Valid markers are 1-9")]
    OutOfRange(u8),

    #[error("Line index {index} is out of range (document has {len} lines)")]
    LineOutOfRange { index: usize, len: usize },
}

/// Outcome of a unit of work that did not produce a value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("task was cancelled")]
    Cancelled,

    #[error("task was superseded by a newer request")]
    Superseded,

    #[error("task failed: {0}")]
    Failed(String),

    #[error("task was aborted before reporting a result")]
    Aborted,
}

impl TaskError {
    /// True when the task stopped because newer work made it irrelevant.
    pub fn is_stale(&self) -> bool {
        matches!(self, TaskError::Cancelled | TaskError::Superseded)
    }
}

#[derive(Debug, Error)]
pub enum FilterFileError {
    #[error("Failed to read filter file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write filter file '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse filters: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid filter #{position}: {source}")]
    Invalid {
        position: usize,
        #[source]
        source: FilterError,
    },
}
