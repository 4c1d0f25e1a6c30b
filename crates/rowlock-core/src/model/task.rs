use std::fmt;

use crate::errors::{Result, RowLockError};

/// Log namespace for one experiment task
///
/// Rendered inside brackets in every log line: `[john]: start update`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskName(String);

impl TaskName {
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty or whitespace-only name.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RowLockError::EmptyTaskName.into());
        }
        Ok(Self(name))
    }

    /// Name from a non-empty literal
    pub(crate) fn known(name: &'static str) -> Self {
        debug_assert!(!name.trim().is_empty());
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TaskName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
