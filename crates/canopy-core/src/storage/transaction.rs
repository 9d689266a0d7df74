//! Transaction-context passing
//!
//! A service operation is told whether it owns the transaction boundary. The
//! outermost caller passes [`Boundary::Owned`]; anything it calls while its
//! transaction is open receives [`Boundary::Joined`] and never begins, commits
//! or rolls back.

use super::{StorageResult, TransactionManager};
use tracing::{debug, error, warn};

/// Who controls the transaction an operation runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Boundary {
    /// Open a transaction and commit or roll it back
    #[default]
    Owned,
    /// Run inside a transaction the caller already opened
    Joined,
}

/// An open (or joined) transaction.
///
/// Dropping an owned scope that was neither committed nor rolled back rolls it
/// back, so an early `?` return never leaves a transaction open.
pub struct TxScope<'a> {
    manager: &'a dyn TransactionManager,
    boundary: Boundary,
    finished: bool,
}

impl<'a> TxScope<'a> {
    pub fn open(manager: &'a dyn TransactionManager, boundary: Boundary) -> StorageResult<Self> {
        if boundary == Boundary::Owned {
            manager.begin()?;
            debug!("Transaction started");
        }

        Ok(Self {
            manager,
            boundary,
            finished: false,
        })
    }

    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    /// Boundary to hand to nested operations
    pub fn nested(&self) -> Boundary {
        Boundary::Joined
    }

    /// Commit an owned transaction. A failed commit is rolled back on drop.
    pub fn commit(mut self) -> StorageResult<()> {
        if self.boundary == Boundary::Owned {
            self.manager.commit()?;
            debug!("Transaction committed");
        }
        self.finished = true;
        Ok(())
    }

    pub fn rollback(mut self) -> StorageResult<()> {
        self.finished = true;
        if self.boundary == Boundary::Owned {
            self.manager.rollback()?;
            warn!("Transaction rolled back");
        }
        Ok(())
    }
}

impl Drop for TxScope<'_> {
    fn drop(&mut self) {
        if self.finished || self.boundary != Boundary::Owned {
            return;
        }

        match self.manager.rollback() {
            Ok(()) => warn!("Transaction rolled back"),
            Err(e) => error!(error = %e, "Failed to roll back transaction"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<&'static str>>,
        fail_commit: bool,
    }

    impl TransactionManager for Recorder {
        fn begin(&self) -> StorageResult<()> {
            self.calls.lock().push("begin");
            Ok(())
        }

        fn commit(&self) -> StorageResult<()> {
            self.calls.lock().push("commit");
            if self.fail_commit {
                return Err(StorageError::transaction("database is locked"));
            }
            Ok(())
        }

        fn rollback(&self) -> StorageResult<()> {
            self.calls.lock().push("rollback");
            Ok(())
        }
    }

    #[test]
    fn test_owned_scope_commits() {
        let recorder = Recorder::default();
        let scope = TxScope::open(&recorder, Boundary::Owned).unwrap();
        assert_eq!(scope.nested(), Boundary::Joined);
        scope.commit().unwrap();

        assert_eq!(*recorder.calls.lock(), ["begin", "commit"]);
    }

    #[test]
    fn test_joined_scope_never_touches_boundary() {
        let recorder = Recorder::default();
        TxScope::open(&recorder, Boundary::Joined).unwrap().commit().unwrap();
        TxScope::open(&recorder, Boundary::Joined).unwrap().rollback().unwrap();
        drop(TxScope::open(&recorder, Boundary::Joined).unwrap());

        assert!(recorder.calls.lock().is_empty());
    }

    #[test]
    fn test_dropped_scope_rolls_back() {
        let recorder = Recorder::default();
        {
            let _scope = TxScope::open(&recorder, Boundary::Owned).unwrap();
        }

        assert_eq!(*recorder.calls.lock(), ["begin", "rollback"]);
    }

    #[test]
    fn test_failed_commit_rolls_back() {
        let recorder = Recorder {
            fail_commit: true,
            ..Default::default()
        };
        let scope = TxScope::open(&recorder, Boundary::Owned).unwrap();
        assert!(scope.commit().is_err());

        assert_eq!(*recorder.calls.lock(), ["begin", "commit", "rollback"]);
    }
}
