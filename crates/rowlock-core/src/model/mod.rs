pub mod row;
pub mod task;

pub use row::{InterceptOutcome, RowId, RowState, SENTINEL_NAME};
pub use task::TaskName;
