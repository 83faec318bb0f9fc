/// Convenience result type used across framecap.
pub type FramecapResult<T> = Result<T, FramecapError>;

/// Top-level error taxonomy used by capture and archive APIs.
#[derive(thiserror::Error, Debug)]
pub enum FramecapError {
    /// Invalid user-provided configuration or arguments.
    #[error("validation error: {0}")]
    Validation(String),

    /// An archive entry payload that is neither raw bytes nor a string.
    #[error("invalid entry type: {0}")]
    InvalidEntryType(String),

    /// A value does not fit its fixed-width archive header field.
    #[error("field overflow: `{field}` needs {needed} bytes but the field holds {width}")]
    FieldOverflow {
        /// Header field name.
        field: &'static str,
        /// Encoded length the value requires.
        needed: usize,
        /// Usable width of the field.
        width: usize,
    },

    /// The external frame encoder failed or hung up.
    #[error("frame encode failure: {0}")]
    FrameEncode(String),

    /// Recording session lifecycle violations.
    #[error("session error: {0}")]
    Session(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FramecapError {
    /// Build a [`FramecapError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`FramecapError::InvalidEntryType`] value.
    pub fn invalid_entry_type(msg: impl Into<String>) -> Self {
        Self::InvalidEntryType(msg.into())
    }

    /// Build a [`FramecapError::FieldOverflow`] value.
    pub fn field_overflow(field: &'static str, needed: usize, width: usize) -> Self {
        Self::FieldOverflow {
            field,
            needed,
            width,
        }
    }

    /// Build a [`FramecapError::FrameEncode`] value.
    pub fn frame_encode(msg: impl Into<String>) -> Self {
        Self::FrameEncode(msg.into())
    }

    /// Build a [`FramecapError::Session`] value.
    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
