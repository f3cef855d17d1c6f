use std::fmt;

/// A value that must never reach logs, audit records or error messages.
///
/// Login passwords and bearer tokens travel through the crate wrapped in
/// `Secret`. Formatting it prints `[REDACTED]`; the only way to read the
/// value is [`expose_secret`](Self::expose_secret).
///
/// # Examples
///
/// ```
/// use access_core::Password;
///
/// let password = Password::new("hunter2".to_string());
///
/// assert_eq!(format!("{:?}", password), "[REDACTED]");
/// assert_eq!(password.expose_secret(), "hunter2");
/// ```
// No Clone, Deref or AsRef: copies and implicit reads would bypass redaction.
pub struct Secret<T> {
    inner: T,
}

/// A login password.
pub type Password = Secret<String>;

/// An opaque bearer credential issued by the authentication backend.
pub type AccessToken = Secret<String>;

impl<T> Secret<T> {
    /// Wraps a sensitive value.
    pub fn new(value: T) -> Self {
        Self { inner: value }
    }

    /// Reads the wrapped value. Do not log the result.
    pub fn expose_secret(&self) -> &T {
        &self.inner
    }
}

impl From<String> for Secret<String> {
    fn from(value: String) -> Self {
        Secret::new(value)
    }
}

impl From<&str> for Secret<String> {
    fn from(value: &str) -> Self {
        Secret::new(value.to_string())
    }
}

impl<T> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}
