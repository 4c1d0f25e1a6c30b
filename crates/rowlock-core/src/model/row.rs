use std::fmt;

/// Name every interceptor tries to write
pub const SENTINEL_NAME: &str = "something else";

/// Store-assigned row identifier
///
/// Assigned once on insertion and never reused within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(i64);

impl RowId {
    /// Placeholder for an identifier the seed loader failed to obtain
    ///
    /// Stores only hand out positive ids, so this matches no row.
    pub const MISSING: RowId = RowId(-1);

    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(self) -> i64 {
        self.0
    }

    pub fn is_missing(self) -> bool {
        self == Self::MISSING
    }
}

impl From<i64> for RowId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A row's mutable columns as read back from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowState {
    pub name: String,
    /// The `is_set` column
    pub flag: bool,
}

impl RowState {
    pub fn new(name: impl Into<String>, flag: bool) -> Self {
        Self {
            name: name.into(),
            flag,
        }
    }

    /// True when an interceptor's write landed on this row
    pub fn is_intercepted(&self) -> bool {
        self.name == SENTINEL_NAME
    }
}

/// Result of one interceptor attempt
///
/// `rows_affected` is 0 when the conditional update found the flag already
/// set (the row was held by the updater), 1 when it went through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptOutcome {
    pub rows_affected: u64,
    pub row: RowState,
}

impl InterceptOutcome {
    /// The `(name, flag)` pair read back after the update
    pub fn into_parts(self) -> (String, bool) {
        (self.row.name, self.row.flag)
    }
}
