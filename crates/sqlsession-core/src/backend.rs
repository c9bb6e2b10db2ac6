//! Backend capability traits.
//!
//! This module defines the boundary between the session core and a
//! database-specific adapter:
//!
//! - [`Backend`] - An open connection to one database, able to begin, commit
//!   and roll back transactions
//! - [`BackendFactory`] - Creates backends from [`ConnectionParameters`]
//! - [`FailoverCallback`] - Hooks for backends that reconnect on their own
//! - [`IsolationLevel`] - SQL transaction isolation levels
//!
//! Everything here is blocking. The session layer never suspends; timeouts and
//! cancellation belong to the adapter.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::params::ConnectionParameters;

/// Transaction isolation level.
///
/// Defines the degree to which one transaction must be isolated from
/// resource or data modifications made by other concurrent transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    /// Read uncommitted: Transactions can see uncommitted changes from others.
    ReadUncommitted,

    /// Read committed: Transactions only see committed changes from others.
    #[default]
    ReadCommitted,

    /// Repeatable read: Transactions see a consistent snapshot of the database.
    RepeatableRead,

    /// Serializable: Transactions appear to execute sequentially.
    Serializable,
}

impl IsolationLevel {
    /// Get the SQL syntax for this isolation level.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

/// An open connection to a database, owned by a session.
///
/// Implementations issue the actual `BEGIN`/`COMMIT`/`ROLLBACK` statements.
/// Errors are returned unchanged to the session's caller.
///
/// Dropping a backend releases the connection; [`disconnect`](Backend::disconnect)
/// is called first when the session closes so adapters can report failures.
pub trait Backend: Send {
    /// Check whether the connection is alive.
    ///
    /// Errors are treated as "not connected" by the session.
    fn is_connected(&self) -> Result<bool>;

    /// Start a transaction.
    fn begin(&mut self) -> Result<()>;

    /// Commit the current transaction.
    fn commit(&mut self) -> Result<()>;

    /// Roll back the current transaction.
    fn rollback(&mut self) -> Result<()>;

    /// Close the connection gracefully.
    fn disconnect(&mut self) -> Result<()> {
        Ok(())
    }

    /// Name of the backend (e.g. "postgresql").
    fn backend_name(&self) -> &str;

    /// Current transaction isolation level.
    fn isolation_level(&mut self) -> Result<IsolationLevel> {
        Err(Error::Unsupported("isolation_level"))
    }

    /// Change the transaction isolation level.
    fn set_isolation_level(&mut self, level: IsolationLevel) -> Result<()> {
        let _ = level;
        Err(Error::Unsupported("set_isolation_level"))
    }

    /// Next value of a sequence, or `None` if the backend has no sequences.
    fn next_sequence_value(&mut self, sequence: &str) -> Result<Option<i64>> {
        let _ = sequence;
        Ok(None)
    }

    /// Id generated by the last insert, or `None` if the backend cannot tell.
    fn last_insert_id(&mut self, table: &str) -> Result<Option<i64>> {
        let _ = table;
        Ok(None)
    }

    /// Table to select constants from (e.g. "dual"), empty when not needed.
    fn dummy_from_table(&self) -> &str {
        ""
    }

    /// Install the hooks consulted while the backend recovers a lost connection.
    fn set_failover_callback(&mut self, callback: Arc<dyn FailoverCallback>) -> Result<()> {
        let _ = callback;
        Err(Error::Unsupported("set_failover_callback"))
    }
}

/// Hooks invoked by backends that can re-establish a broken connection.
///
/// All methods default to doing nothing; [`failed`](FailoverCallback::failed)
/// defaults to giving up.
pub trait FailoverCallback: Send + Sync {
    /// Failover has started.
    fn started(&self) {}

    /// Failover succeeded and the connection is usable again.
    fn finished(&self) {}

    /// A reconnection attempt failed. Return `true` to retry.
    fn failed(&self, error: &Error) -> bool {
        let _ = error;
        false
    }

    /// Failover was given up.
    fn aborted(&self) {}
}

/// Creates [`Backend`]s for one kind of database.
///
/// The same factory is used for the initial connection and for reconnection;
/// on reconnect the parameters carry [`OPTION_RECONNECT`](crate::OPTION_RECONNECT).
pub trait BackendFactory: Send + Sync {
    /// Name under which the factory is registered.
    fn name(&self) -> &str;

    /// Open a new connection.
    fn make_session(&self, params: &ConnectionParameters) -> Result<Box<dyn Backend>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Minimal;

    impl Backend for Minimal {
        fn is_connected(&self) -> Result<bool> {
            Ok(true)
        }
        fn begin(&mut self) -> Result<()> {
            Ok(())
        }
        fn commit(&mut self) -> Result<()> {
            Ok(())
        }
        fn rollback(&mut self) -> Result<()> {
            Ok(())
        }
        fn backend_name(&self) -> &str {
            "minimal"
        }
    }

    #[test]
    fn test_isolation_level_default() {
        assert_eq!(IsolationLevel::default(), IsolationLevel::ReadCommitted);
    }

    #[test]
    fn test_isolation_level_as_sql() {
        assert_eq!(IsolationLevel::ReadUncommitted.as_sql(), "READ UNCOMMITTED");
        assert_eq!(IsolationLevel::ReadCommitted.as_sql(), "READ COMMITTED");
        assert_eq!(IsolationLevel::RepeatableRead.as_sql(), "REPEATABLE READ");
        assert_eq!(IsolationLevel::Serializable.as_sql(), "SERIALIZABLE");
    }

    #[test]
    fn test_backend_defaults() {
        let mut backend = Minimal;
        assert!(matches!(
            backend.isolation_level(),
            Err(Error::Unsupported("isolation_level"))
        ));
        assert!(backend.set_isolation_level(IsolationLevel::Serializable).is_err());
        assert_eq!(backend.next_sequence_value("seq").unwrap(), None);
        assert_eq!(backend.last_insert_id("users").unwrap(), None);
        assert_eq!(backend.dummy_from_table(), "");
        assert!(backend.disconnect().is_ok());
        assert!(matches!(
            backend.set_failover_callback(Arc::new(NoRetry)),
            Err(Error::Unsupported("set_failover_callback"))
        ));
    }

    struct NoRetry;

    impl FailoverCallback for NoRetry {}

    #[test]
    fn test_failover_callback_defaults() {
        let callback = NoRetry;
        callback.started();
        assert!(!callback.failed(&Error::not_connected()));
        callback.aborted();
    }
}
