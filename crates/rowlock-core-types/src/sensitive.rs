//! Redaction wrapper for credentials
//!
//! Connection settings carry a database password. Wrapping it in
//! `Sensitive<T>` keeps it out of `Debug`/`Display` output, which is what
//! ends up in log lines and error messages.

use std::fmt;

const REDACTED: &str = "***REDACTED***";

/// Value that renders as `***REDACTED***` in Debug and Display
///
/// # Example
///
/// ```
/// use rowlock_core_types::Sensitive;
///
/// let password = Sensitive::new(String::from("hunter2"));
/// assert_eq!(format!("{:?}", password), "***REDACTED***");
/// assert_eq!(password.expose(), "hunter2");
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Sensitive<T>(T);

impl<T> Sensitive<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Borrow the wrapped value
    ///
    /// Only call this where the raw value is actually needed, e.g. when
    /// building a connection string.
    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> From<T> for Sensitive<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

impl<T> fmt::Debug for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl<T> fmt::Display for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}
