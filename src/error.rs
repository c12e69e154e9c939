//! Error types for doorbell-config.

/// Result type alias for doorbell-config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while watching or reading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error occurred while stating or reading the configuration file.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse configuration file.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Failed to deserialize a section into a typed value.
    #[error("Failed to deserialize section '{section}': {reason}")]
    DeserializationError {
        /// The section being deserialized
        section: String,
        /// Why deserialization failed
        reason: String,
    },

    /// The requested section does not exist.
    #[error("No section: '{0}'")]
    MissingSection(String),

    /// The requested option does not exist in the section.
    #[error("No option '{option}' in section: '{section}'")]
    MissingOption {
        /// The section that was searched
        section: String,
        /// The option that was not found
        option: String,
    },

    /// An option exists but cannot be coerced to the requested type.
    #[error("Invalid value for [{section}] {option}: {reason}")]
    InvalidValue {
        /// The section holding the option
        section: String,
        /// The option name
        option: String,
        /// Why the value was rejected
        reason: String,
    },

    /// The watcher was built without a file or source to watch.
    #[error("No configuration source specified")]
    MissingSource,

    /// File watching is not supported or failed to initialize.
    #[error("File watching error: {0}")]
    WatchError(String),

    /// `start()` was called outside of a tokio runtime.
    #[error("No tokio runtime available to run the watcher")]
    NoRuntime,

    /// `start()` was called more than once.
    #[error("Watcher has already been started")]
    AlreadyStarted,
}

impl ConfigError {
    /// Create an invalid value error.
    pub fn invalid_value(
        section: impl Into<String>,
        option: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            section: section.into(),
            option: option.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error is a failed lookup of a section or option.
    pub fn is_lookup_failure(&self) -> bool {
        matches!(self, Self::MissingSection(_) | Self::MissingOption { .. })
    }
}

impl From<ini::ParseError> for ConfigError {
    fn from(err: ini::ParseError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
