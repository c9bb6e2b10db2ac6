//! Database sessions and transactions over pluggable backends.
//!
//! A [`Session`] owns the lifecycle of one logical connection:
//!
//! - `open`, `close` and `reconnect` against a [`BackendFactory`]
//! - implicit `begin`/`commit`/`rollback` through a session-owned transaction
//! - explicit, caller-owned [`Transaction`] guards that roll back on drop
//! - transparent forwarding to a pool slot via [`Session::from_pool`]
//!
//! # Quick Start
//!
//! ```ignore
//! use sqlsession::prelude::*;
//!
//! let mut registry = BackendRegistry::new();
//! registry.register(Arc::new(MyBackendFactory));
//!
//! let params = registry.parameters_from_uri("mydb://host=localhost")?;
//! let mut session = Session::connect(params)?;
//!
//! let mut tx = Transaction::new(&mut session)?;
//! tx.current_session_mut().log_query("insert into t values (1)");
//! tx.commit()?;
//! ```

pub mod config;
pub mod pool;
pub mod session;
pub mod transaction;

pub use config::SessionConfig;
pub use pool::{SessionGuard, SessionPool};
pub use session::{QueryTransformation, Session};
pub use transaction::{Transaction, TransactionId, TransactionState, TransactionStatus};

pub use sqlsession_core::{
    Backend, BackendFactory, BackendRegistry, ConfigError, ConnectionError, ConnectionErrorKind,
    ConnectionParameters, ConnectionSettings, Error, FailoverCallback, IsolationLevel,
    OPTION_RECONNECT,
    OPTION_TRUE, PoolError, PoolErrorKind, QueryError, QueryErrorKind, QueryLogger, Result,
    StandardLogger, TransactionError, TransactionErrorKind,
};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use sqlsession::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Backend, BackendFactory, BackendRegistry, ConnectionParameters, ConnectionSettings, Error,
        IsolationLevel, Result, Session, SessionConfig, SessionPool, Transaction, TransactionId,
        TransactionStatus,
    };
    pub use std::sync::Arc;
}
