use thiserror::Error;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code. Store and Transaction are the two
/// kinds the experiment itself produces; the rest cover configuration,
/// input validation and thread failures around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Validation
    InvalidInput,
    NotFound,

    // Row store
    /// Insert, update, query or scan failure
    Store,
    /// Begin, commit or rollback failure
    Transaction,

    // Environment
    Configuration,
    Io,

    // Runtime
    /// A task thread panicked or could not be joined
    Concurrency,
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::Store => "ERR_STORE",
            ExErrorKind::Transaction => "ERR_TRANSACTION",
            ExErrorKind::Configuration => "ERR_CONFIGURATION",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Concurrency => "ERR_CONCURRENCY",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification kind, optional context (operation, row, task)
/// and an optional cause. The cause chain is rendered by `Display`, so an
/// error that wraps another never hides it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    row_id: Option<i64>,
    task: Option<String>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            row_id: None,
            task: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add row identifier context
    pub fn with_row_id(mut self, row_id: i64) -> Self {
        self.row_id = Some(row_id);
        self
    }

    /// Add task name context
    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Report a failed rollback together with the error that triggered it
    ///
    /// The rollback failure becomes the outer error and `cause` its source.
    pub fn rollback_failed(cause: ExError, rollback: ExError) -> Self {
        ExError::new(ExErrorKind::Transaction)
            .with_op("rollback")
            .with_message(format!("rollback failed: {}", rollback.message_or_code()))
            .with_source(cause)
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn row_id(&self) -> Option<i64> {
        self.row_id
    }

    pub fn task(&self) -> Option<&str> {
        self.task.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }

    /// Iterate over this error and every wrapped cause, outermost first
    pub fn chain(&self) -> impl Iterator<Item = &ExError> {
        std::iter::successors(Some(self), |e| e.source_error())
    }

    fn message_or_code(&self) -> &str {
        if self.message.is_empty() {
            self.code()
        } else {
            &self.message
        }
    }

    fn fmt_single(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(task) = &self.task {
            write!(f, " (task: {})", task)?;
        }
        if let Some(row_id) = self.row_id {
            write!(f, " (row_id: {})", row_id)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.fmt_single(f)?;
        let mut cause = self.source_error();
        while let Some(err) = cause {
            write!(f, "; caused by: ")?;
            err.fmt_single(f)?;
            cause = err.source_error();
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain errors raised by the experiment itself (not by a backend)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowLockError {
    /// No row with this identifier exists
    #[error("Row not found: {row_id}")]
    RowNotFound { row_id: i64 },

    /// The interceptors would not start while the updater holds its lock
    #[error(
        "Intercept delay ({intercept_delay_ms} ms) must be shorter than the transaction hold ({hold_ms} ms)"
    )]
    InvalidTiming {
        intercept_delay_ms: u128,
        hold_ms: u128,
    },

    #[error("Task name cannot be empty")]
    EmptyTaskName,

    /// A task thread panicked before reporting a result
    #[error("Task {task} panicked")]
    TaskPanicked { task: String },

    /// A required environment setting is absent
    #[error("Missing setting: {key}")]
    MissingSetting { key: String },

    /// The configured backend is unknown or not compiled in
    #[error("Unsupported backend: {backend}")]
    UnsupportedBackend { backend: String },
}

impl From<RowLockError> for ExError {
    fn from(err: RowLockError) -> Self {
        let message = err.to_string();
        match err {
            RowLockError::RowNotFound { row_id } => ExError::new(ExErrorKind::NotFound)
                .with_row_id(row_id)
                .with_message(message),

            RowLockError::InvalidTiming { .. } => ExError::new(ExErrorKind::InvalidInput)
                .with_op("experiment_timing")
                .with_message(message),

            RowLockError::EmptyTaskName => ExError::new(ExErrorKind::InvalidInput)
                .with_op("task_name")
                .with_message(message),

            RowLockError::TaskPanicked { task } => ExError::new(ExErrorKind::Concurrency)
                .with_task(task)
                .with_message(message),

            RowLockError::MissingSetting { .. } | RowLockError::UnsupportedBackend { .. } => {
                ExError::new(ExErrorKind::Configuration)
                    .with_op("load_config")
                    .with_message(message)
            }
        }
    }
}
