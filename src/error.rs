use std::fmt;

/// Errors that can occur in the access-core crate.
///
/// Expected conditions (a denied route, a locked account, bad credentials)
/// are never errors; they are returned as decision values. This type only
/// carries infrastructure and configuration faults.
#[derive(Debug)]
pub enum Error {
    /// The login attempt store failed
    Store(StoreError),
    /// Configuration could not be loaded or is invalid
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Store(e) => write!(f, "attempt store error: {}", e),
            Error::Config(e) => write!(f, "configuration error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Store(e) => Some(e),
            Error::Config(e) => Some(e),
        }
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Error::Store(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

/// A failure of the attempt store backing the login throttle.
///
/// "Record not found" is not an error: stores report it as `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    /// The kind of store failure
    pub kind: StoreErrorKind,
    /// Human-readable detail for diagnostics (never shown to end users)
    pub message: String,
}

impl StoreError {
    /// Creates a new store error.
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for an unreachable or erroring backend.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Unavailable, message)
    }

    /// Shorthand for a call that timed out or was aborted.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Timeout, message)
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for StoreError {}

/// The kind of attempt store failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// The store could not be reached or rejected the call
    Unavailable,
    /// The call timed out or was cancelled by the transport layer
    Timeout,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreErrorKind::Unavailable => write!(f, "unavailable"),
            StoreErrorKind::Timeout => write!(f, "timeout"),
        }
    }
}

/// Configuration loading or validation failure.
#[derive(Debug)]
pub enum ConfigError {
    /// The configuration file could not be read
    Io(std::io::Error),
    /// The configuration file is not valid YAML for `AccessConfig`
    Parse(serde_yaml::Error),
    /// A value is present but not acceptable
    Invalid {
        /// Dotted path of the offending field
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "read config: {}", e),
            ConfigError::Parse(e) => write!(f, "parse config: {}", e),
            ConfigError::Invalid { field, reason } => write!(f, "invalid {}: {}", field, reason),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid { .. } => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(e: serde_yaml::Error) -> Self {
        ConfigError::Parse(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_display_includes_kind() {
        let err = StoreError::timeout("read login_attempts");
        assert_eq!(err.to_string(), "timeout: read login_attempts");
    }

    #[test]
    fn crate_error_wraps_store_error() {
        let err: Error = StoreError::unavailable("connection refused").into();
        assert!(matches!(err, Error::Store(ref e) if e.kind == StoreErrorKind::Unavailable));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn invalid_config_names_field() {
        let err = ConfigError::invalid("throttle.max_attempts", "must be at least 1");
        assert_eq!(
            err.to_string(),
            "invalid throttle.max_attempts: must be at least 1"
        );
    }
}
