use rowlock_core::errors::{ExError, ExErrorKind, Result, RowLockError};
use rowlock_core::{RowId, RowSession, RowState, RowStore, RowTransaction};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

/// Failures to inject into the fake store
#[allow(dead_code)]
#[derive(Debug, Clone, Default)]
pub struct Faults {
    pub fail_connect: bool,
    pub fail_insert_for: Option<String>,
    pub fail_set_flag: bool,
    pub fail_rollback: bool,
    pub fail_commit: bool,
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub rows: BTreeMap<i64, RowState>,
    pub next_id: i64,
    pub commits: usize,
    pub rollbacks: usize,
    /// Transactions dropped without commit or rollback
    pub abandoned: usize,
    pub faults: Faults,
    /// When set, a flagged row is locked until its transaction ends
    pub row_locks: bool,
    held: BTreeSet<i64>,
}

/// In-memory row store for driving the core without a database
///
/// Writes made inside a transaction are visible to other sessions
/// immediately and undone on rollback. That models the moment after the
/// updater's change has become visible to a waiting statement.
///
/// With `row_locking()`, a conditional update on a row flagged by an open
/// transaction blocks until that transaction ends; other rows stay free.
#[derive(Clone, Default)]
pub struct FakeStore {
    state: Arc<Mutex<FakeState>>,
    released: Arc<Condvar>,
}

#[allow(dead_code)]
impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_faults(faults: Faults) -> Self {
        let store = Self::default();
        store.state().faults = faults;
        store
    }

    pub fn row_locking() -> Self {
        let store = Self::default();
        store.state().row_locks = true;
        store
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn row(&self, id: RowId) -> Option<RowState> {
        self.state().rows.get(&id.get()).cloned()
    }
}

impl RowStore for FakeStore {
    fn connect(&self) -> Result<Box<dyn RowSession>> {
        if self.state().faults.fail_connect {
            return Err(ExError::new(ExErrorKind::Store)
                .with_op("connect")
                .with_message("connection refused"));
        }
        Ok(Box::new(FakeSession {
            state: self.state.clone(),
            released: self.released.clone(),
        }))
    }

    fn backend(&self) -> &'static str {
        "fake"
    }
}

struct FakeSession {
    state: Arc<Mutex<FakeState>>,
    released: Arc<Condvar>,
}

impl RowSession for FakeSession {
    fn insert_row(&mut self, name: &str) -> Result<RowId> {
        let mut state = self.state.lock().unwrap();
        if state.faults.fail_insert_for.as_deref() == Some(name) {
            return Err(ExError::new(ExErrorKind::Store)
                .with_op("insert_row")
                .with_message(format!("insert of {} rejected", name)));
        }
        state.next_id += 1;
        let id = state.next_id;
        state.rows.insert(id, RowState::new(name, false));
        Ok(RowId::new(id))
    }

    fn update_name_if_unflagged(&mut self, id: RowId, name: &str) -> Result<u64> {
        let state = self.state.lock().unwrap();
        let mut state = self
            .released
            .wait_while(state, |s| s.row_locks && s.held.contains(&id.get()))
            .unwrap();
        match state.rows.get_mut(&id.get()) {
            Some(row) if !row.flag => {
                row.name = name.to_string();
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    fn fetch_row(&mut self, id: RowId) -> Result<RowState> {
        let state = self.state.lock().unwrap();
        state
            .rows
            .get(&id.get())
            .cloned()
            .ok_or_else(|| RowLockError::RowNotFound { row_id: id.get() }.into())
    }

    fn begin(&mut self) -> Result<Box<dyn RowTransaction + '_>> {
        Ok(Box::new(FakeTransaction {
            state: self.state.clone(),
            released: self.released.clone(),
            undo: Vec::new(),
            finished: false,
        }))
    }
}

struct FakeTransaction {
    state: Arc<Mutex<FakeState>>,
    released: Arc<Condvar>,
    undo: Vec<(i64, bool)>,
    finished: bool,
}

impl RowTransaction for FakeTransaction {
    fn set_flag(&mut self, id: RowId) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        if state.faults.fail_set_flag {
            return Err(ExError::new(ExErrorKind::Store)
                .with_op("set_flag")
                .with_message("deadlock detected"));
        }
        match state.rows.get_mut(&id.get()) {
            Some(row) => {
                self.undo.push((id.get(), row.flag));
                row.flag = true;
                state.held.insert(id.get());
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn commit(mut self: Box<Self>) -> Result<()> {
        self.finished = true;
        let mut state = self.state.lock().unwrap();
        self.release(&mut state);
        if state.faults.fail_commit {
            return Err(ExError::new(ExErrorKind::Transaction)
                .with_op("commit")
                .with_message("commit refused"));
        }
        state.commits += 1;
        Ok(())
    }

    fn rollback(mut self: Box<Self>) -> Result<()> {
        self.finished = true;
        let mut state = self.state.lock().unwrap();
        self.release(&mut state);
        if state.faults.fail_rollback {
            return Err(ExError::new(ExErrorKind::Transaction)
                .with_op("rollback")
                .with_message("connection lost during rollback"));
        }
        for (id, flag) in self.undo.drain(..).rev() {
            if let Some(row) = state.rows.get_mut(&id) {
                row.flag = flag;
            }
        }
        state.rollbacks += 1;
        Ok(())
    }
}

impl FakeTransaction {
    /// Drop this transaction's row locks; the undo log is kept for rollback
    fn release(&self, state: &mut FakeState) {
        for (id, _) in &self.undo {
            state.held.remove(id);
        }
        self.released.notify_all();
    }
}

impl Drop for FakeTransaction {
    fn drop(&mut self) {
        if !self.finished {
            if let Ok(mut state) = self.state.lock() {
                state.abandoned += 1;
                self.release(&mut state);
            }
        }
    }
}
