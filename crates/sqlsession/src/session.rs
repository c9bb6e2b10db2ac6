//! Sessions: connection lifecycle and transaction orchestration.
//!
//! A [`Session`] is either
//!
//! - **direct**: it owns its backend and all per-connection state (transaction
//!   table, query buffer, logger, flags), or
//! - **pooled**: it is a handle into a pool slot and owns nothing. Every
//!   operation is forwarded to the session in the slot, so the handle can never
//!   disagree with the pooled session about connection or transaction state.
//!
//! # Example
//!
//! ```ignore
//! let mut session = Session::connect(params)?;
//!
//! // Implicit, session-owned transaction
//! session.begin()?;
//! session.commit()?;
//!
//! // Explicit, caller-owned transaction; rolled back if dropped while active
//! let mut tx = Transaction::new(&mut session)?;
//! tx.commit()?;
//! ```

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use sqlsession_core::{
    Backend, ConnectionParameters, Error, FailoverCallback, IsolationLevel, OPTION_RECONNECT,
    OPTION_TRUE, QueryLogger, Result, StandardLogger,
};

use crate::config::SessionConfig;
use crate::pool::{SessionGuard, SessionPool};
use crate::transaction::{Finish, TransactionId, TransactionState, TransactionTable};

/// User-supplied rewrite applied to the buffered query text by [`Session::query`].
pub type QueryTransformation = Box<dyn Fn(&str) -> String + Send + Sync>;

/// A logical connection to a database, owned directly or leased from a pool.
pub struct Session {
    kind: SessionKind,
}

enum SessionKind {
    Direct(Box<DirectSession>),
    Pooled(PoolLease),
}

struct PoolLease {
    pool: Arc<dyn SessionPool>,
    slot: usize,
}

impl PoolLease {
    fn session(&self) -> SessionGuard<'_> {
        self.pool.at(self.slot)
    }
}

/// State of a session that owns its connection.
struct DirectSession {
    backend: Option<Box<dyn Backend>>,
    last_params: Option<ConnectionParameters>,
    transactions: TransactionTable,
    allow_multiple_transactions: bool,
    query: String,
    query_transformation: Option<QueryTransformation>,
    logger: Box<dyn QueryLogger>,
    got_data: bool,
    uppercase_column_names: bool,
}

impl Session {
    /// Create an unconnected session with default configuration.
    pub fn new() -> Self {
        Self::with_config(&SessionConfig::default())
    }

    /// Create an unconnected session.
    pub fn with_config(config: &SessionConfig) -> Self {
        Self {
            kind: SessionKind::Direct(Box::new(DirectSession::new(config))),
        }
    }

    /// Create a session and open it.
    pub fn connect(params: ConnectionParameters) -> Result<Self> {
        let mut session = Self::new();
        session.open(params)?;
        Ok(session)
    }

    /// Lease a slot from `pool` and return a handle to it.
    ///
    /// The slot is given back when the handle is dropped.
    pub fn from_pool(pool: Arc<dyn SessionPool>) -> Result<Self> {
        let slot = pool.lease()?;
        tracing::debug!(slot, "Leased pool slot");
        Ok(Self {
            kind: SessionKind::Pooled(PoolLease { pool, slot }),
        })
    }

    /// Whether this session is a handle into a pool.
    pub fn is_pooled(&self) -> bool {
        matches!(self.kind, SessionKind::Pooled(_))
    }

    /// The leased slot, for pooled sessions.
    pub fn pool_slot(&self) -> Option<usize> {
        match &self.kind {
            SessionKind::Direct(_) => None,
            SessionKind::Pooled(lease) => Some(lease.slot),
        }
    }

    // ========================================================================
    // Connection lifecycle
    // ========================================================================

    /// Connect using `params`.
    ///
    /// Fails if the session already has a backend.
    #[tracing::instrument(level = "debug", skip(self, params), fields(backend = params.backend_name()))]
    pub fn open(&mut self, params: ConnectionParameters) -> Result<()> {
        match &mut self.kind {
            SessionKind::Direct(s) => s.open(params),
            SessionKind::Pooled(lease) => lease.session().open(params),
        }
    }

    /// Roll back the session-owned transaction if active, then drop the backend.
    ///
    /// The backend is released even when the rollback or disconnect fails; the
    /// first error is returned.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn close(&mut self) -> Result<()> {
        match &mut self.kind {
            SessionKind::Direct(s) => s.close(),
            SessionKind::Pooled(lease) => lease.session().close(),
        }
    }

    /// Close any current connection and reconnect with the last parameters.
    ///
    /// The backend receives the parameters with `reconnect=1` set. If closing
    /// fails (for example the rollback of an active transaction), the old
    /// backend is still released but no new connection is made.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn reconnect(&mut self) -> Result<()> {
        match &mut self.kind {
            SessionKind::Direct(s) => s.reconnect(),
            SessionKind::Pooled(lease) => lease.session().reconnect(),
        }
    }

    /// Whether the backend reports a live connection. Never fails.
    pub fn is_connected(&self) -> bool {
        match &self.kind {
            SessionKind::Direct(s) => s.is_connected(),
            SessionKind::Pooled(lease) => lease.session().is_connected(),
        }
    }

    /// Parameters of the last successful `open`.
    pub fn last_connect_parameters(&self) -> Option<ConnectionParameters> {
        match &self.kind {
            SessionKind::Direct(s) => s.last_params.clone(),
            SessionKind::Pooled(lease) => lease.session().last_connect_parameters(),
        }
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Start (or continue) the session's current transaction.
    ///
    /// Uses the attached caller-owned transaction if there is one, otherwise
    /// the session-owned transaction, allocating it on first use. The backend
    /// `begin` is issued only if the chosen transaction was not already active,
    /// so repeated calls are idempotent.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn begin(&mut self) -> Result<TransactionId> {
        match &mut self.kind {
            SessionKind::Direct(s) => s.begin(),
            SessionKind::Pooled(lease) => lease.session().begin(),
        }
    }

    /// Commit at the backend.
    ///
    /// Marks the current transaction committed only if the session owns it.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn commit(&mut self) -> Result<()> {
        match &mut self.kind {
            SessionKind::Direct(s) => s.commit(),
            SessionKind::Pooled(lease) => lease.session().commit(),
        }
    }

    /// Roll back at the backend.
    ///
    /// Marks the current transaction rolled back only if the session owns it.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn rollback(&mut self) -> Result<()> {
        match &mut self.kind {
            SessionKind::Direct(s) => s.rollback(),
            SessionKind::Pooled(lease) => lease.session().rollback(),
        }
    }

    /// The attached caller-owned transaction if the session-owned one is absent
    /// or inactive, else the session-owned one.
    pub fn current_transaction(&self) -> Option<TransactionId> {
        match &self.kind {
            SessionKind::Direct(s) => s.transactions.current(),
            SessionKind::Pooled(lease) => lease.session().current_transaction(),
        }
    }

    /// Whether the current transaction exists and is active.
    pub fn current_transaction_is_active(&self) -> bool {
        match &self.kind {
            SessionKind::Direct(s) => s.transactions.current_is_active(),
            SessionKind::Pooled(lease) => lease.session().current_transaction_is_active(),
        }
    }

    /// The session-owned transaction, if one has been allocated.
    pub fn internal_transaction(&self) -> Option<TransactionId> {
        match &self.kind {
            SessionKind::Direct(s) => s.transactions.internal(),
            SessionKind::Pooled(lease) => lease.session().internal_transaction(),
        }
    }

    /// The attached caller-owned transaction, if any.
    pub fn external_transaction(&self) -> Option<TransactionId> {
        match &self.kind {
            SessionKind::Direct(s) => s.transactions.external(),
            SessionKind::Pooled(lease) => lease.session().external_transaction(),
        }
    }

    /// Snapshot of a live transaction's state.
    pub fn transaction_state(&self, id: TransactionId) -> Option<TransactionState> {
        match &self.kind {
            SessionKind::Direct(s) => s.transactions.get(id),
            SessionKind::Pooled(lease) => lease.session().transaction_state(id),
        }
    }

    /// Allow or refuse a second explicit transaction while one is active.
    pub fn set_allow_multiple_transactions(&mut self, allow: bool) {
        match &mut self.kind {
            SessionKind::Direct(s) => s.allow_multiple_transactions = allow,
            SessionKind::Pooled(lease) => lease.session().set_allow_multiple_transactions(allow),
        }
    }

    /// Whether a second explicit transaction may start while one is active.
    pub fn allow_multiple_transactions(&self) -> bool {
        match &self.kind {
            SessionKind::Direct(s) => s.allow_multiple_transactions,
            SessionKind::Pooled(lease) => lease.session().allow_multiple_transactions(),
        }
    }

    pub(crate) fn attach_external_transaction(&mut self) -> Result<TransactionId> {
        match &mut self.kind {
            SessionKind::Direct(s) => s.attach_external_transaction(),
            SessionKind::Pooled(lease) => lease.session().attach_external_transaction(),
        }
    }

    pub(crate) fn finish_transaction(&mut self, id: TransactionId, finish: Finish) -> Result<()> {
        match &mut self.kind {
            SessionKind::Direct(s) => s.finish_transaction(id, finish),
            SessionKind::Pooled(lease) => lease.session().finish_transaction(id, finish),
        }
    }

    pub(crate) fn release_transaction(&mut self, id: TransactionId) {
        match &mut self.kind {
            SessionKind::Direct(s) => s.release_transaction(id),
            SessionKind::Pooled(lease) => lease.session().release_transaction(id),
        }
    }

    fn discard_internal_transaction(&mut self) -> Result<()> {
        match &mut self.kind {
            SessionKind::Direct(s) => s.discard_internal_transaction(),
            SessionKind::Pooled(lease) => lease.session().discard_internal_transaction(),
        }
    }

    // ========================================================================
    // Query buffer and logging
    // ========================================================================

    /// Append text to the query buffer.
    pub fn append_query(&mut self, text: &str) {
        match &mut self.kind {
            SessionKind::Direct(s) => s.query.push_str(text),
            SessionKind::Pooled(lease) => lease.session().append_query(text),
        }
    }

    /// Clear the query buffer.
    pub fn reset_query(&mut self) {
        match &mut self.kind {
            SessionKind::Direct(s) => s.query.clear(),
            SessionKind::Pooled(lease) => lease.session().reset_query(),
        }
    }

    /// Buffered query text with the query transformation applied.
    pub fn query(&self) -> String {
        match &self.kind {
            SessionKind::Direct(s) => match &s.query_transformation {
                Some(transform) => transform(&s.query),
                None => s.query.clone(),
            },
            SessionKind::Pooled(lease) => lease.session().query(),
        }
    }

    /// Install a rewrite applied to every query returned by [`query`](Session::query).
    pub fn set_query_transformation<F>(&mut self, transformation: F)
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.install_query_transformation(Some(Box::new(transformation)));
    }

    /// Remove the query transformation.
    pub fn clear_query_transformation(&mut self) {
        self.install_query_transformation(None);
    }

    fn install_query_transformation(&mut self, transformation: Option<QueryTransformation>) {
        match &mut self.kind {
            SessionKind::Direct(s) => s.query_transformation = transformation,
            SessionKind::Pooled(lease) => lease
                .session()
                .install_query_transformation(transformation),
        }
    }

    /// Replace the query logger.
    pub fn set_logger(&mut self, logger: Box<dyn QueryLogger>) {
        match &mut self.kind {
            SessionKind::Direct(s) => s.logger = logger,
            SessionKind::Pooled(lease) => lease.session().set_logger(logger),
        }
    }

    /// Install or remove the logger's echo stream.
    pub fn set_log_stream(&mut self, stream: Option<Box<dyn Write + Send>>) {
        match &mut self.kind {
            SessionKind::Direct(s) => s.logger.set_stream(stream),
            SessionKind::Pooled(lease) => lease.session().set_log_stream(stream),
        }
    }

    /// Whether the logger has an echo stream.
    pub fn has_log_stream(&self) -> bool {
        match &self.kind {
            SessionKind::Direct(s) => s.logger.has_stream(),
            SessionKind::Pooled(lease) => lease.session().has_log_stream(),
        }
    }

    /// Record a query about to be executed.
    pub fn log_query(&mut self, query: &str) {
        match &mut self.kind {
            SessionKind::Direct(s) => s.logger.start_query(query),
            SessionKind::Pooled(lease) => lease.session().log_query(query),
        }
    }

    /// Text of the last logged query.
    pub fn last_query(&self) -> String {
        match &self.kind {
            SessionKind::Direct(s) => s.logger.last_query(),
            SessionKind::Pooled(lease) => lease.session().last_query(),
        }
    }

    // ========================================================================
    // Flags
    // ========================================================================

    /// Record whether the last fetch returned data.
    pub fn set_got_data(&mut self, got_data: bool) {
        match &mut self.kind {
            SessionKind::Direct(s) => s.got_data = got_data,
            SessionKind::Pooled(lease) => lease.session().set_got_data(got_data),
        }
    }

    /// Whether the last fetch returned data.
    pub fn got_data(&self) -> bool {
        match &self.kind {
            SessionKind::Direct(s) => s.got_data,
            SessionKind::Pooled(lease) => lease.session().got_data(),
        }
    }

    /// Report column names in upper case.
    pub fn set_uppercase_column_names(&mut self, upper: bool) {
        match &mut self.kind {
            SessionKind::Direct(s) => s.uppercase_column_names = upper,
            SessionKind::Pooled(lease) => lease.session().set_uppercase_column_names(upper),
        }
    }

    /// Whether column names are reported in upper case.
    pub fn uppercase_column_names(&self) -> bool {
        match &self.kind {
            SessionKind::Direct(s) => s.uppercase_column_names,
            SessionKind::Pooled(lease) => lease.session().uppercase_column_names(),
        }
    }

    // ========================================================================
    // Backend metadata
    // ========================================================================

    /// Name of the connected backend.
    pub fn backend_name(&self) -> Result<String> {
        match &self.kind {
            SessionKind::Direct(s) => Ok(s.backend()?.backend_name().to_string()),
            SessionKind::Pooled(lease) => lease.session().backend_name(),
        }
    }

    /// Current isolation level.
    pub fn isolation_level(&mut self) -> Result<IsolationLevel> {
        match &mut self.kind {
            SessionKind::Direct(s) => s.backend_mut()?.isolation_level(),
            SessionKind::Pooled(lease) => lease.session().isolation_level(),
        }
    }

    /// Change the isolation level.
    pub fn set_isolation_level(&mut self, level: IsolationLevel) -> Result<()> {
        match &mut self.kind {
            SessionKind::Direct(s) => s.backend_mut()?.set_isolation_level(level),
            SessionKind::Pooled(lease) => lease.session().set_isolation_level(level),
        }
    }

    /// Next value of `sequence`, if the backend supports sequences.
    pub fn next_sequence_value(&mut self, sequence: &str) -> Result<Option<i64>> {
        match &mut self.kind {
            SessionKind::Direct(s) => s.backend_mut()?.next_sequence_value(sequence),
            SessionKind::Pooled(lease) => lease.session().next_sequence_value(sequence),
        }
    }

    /// Id generated by the last insert into `table`, if the backend can tell.
    pub fn last_insert_id(&mut self, table: &str) -> Result<Option<i64>> {
        match &mut self.kind {
            SessionKind::Direct(s) => s.backend_mut()?.last_insert_id(table),
            SessionKind::Pooled(lease) => lease.session().last_insert_id(table),
        }
    }

    /// Install failover hooks on the connected backend.
    ///
    /// Fails with `Unsupported` for backends that cannot reconnect on their own.
    pub fn set_failover_callback(&mut self, callback: Arc<dyn FailoverCallback>) -> Result<()> {
        match &mut self.kind {
            SessionKind::Direct(s) => s.backend_mut()?.set_failover_callback(callback),
            SessionKind::Pooled(lease) => lease.session().set_failover_callback(callback),
        }
    }

    /// Table to select constants from, empty when the backend needs none.
    pub fn dummy_from_table(&self) -> Result<String> {
        match &self.kind {
            SessionKind::Direct(s) => Ok(s.backend()?.dummy_from_table().to_string()),
            SessionKind::Pooled(lease) => lease.session().dummy_from_table(),
        }
    }

    /// `" from <table>"` for backends that need a dummy table, else empty.
    pub fn dummy_from_clause(&self) -> Result<String> {
        let table = self.dummy_from_table()?;
        if table.is_empty() {
            Ok(table)
        } else {
            Ok(format!(" from {table}"))
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SessionKind::Direct(s) => f
                .debug_struct("Session")
                .field("connected", &s.backend.is_some())
                .field("last_params", &s.last_params)
                .field("transactions", &s.transactions)
                .field("allow_multiple_transactions", &s.allow_multiple_transactions)
                .finish_non_exhaustive(),
            SessionKind::Pooled(lease) => f
                .debug_struct("Session")
                .field("pool_slot", &lease.slot)
                .finish_non_exhaustive(),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        match &mut self.kind {
            SessionKind::Direct(s) => s.teardown(),
            SessionKind::Pooled(lease) => {
                if let Err(e) = lease.session().discard_internal_transaction() {
                    tracing::warn!(
                        slot = lease.slot,
                        error = %e,
                        "Rollback of pooled session transaction failed during release"
                    );
                }
                lease.pool.give_back(lease.slot);
                tracing::debug!(slot = lease.slot, "Gave back pool slot");
            }
        }
    }
}

impl DirectSession {
    fn new(config: &SessionConfig) -> Self {
        Self {
            backend: None,
            last_params: None,
            transactions: TransactionTable::default(),
            allow_multiple_transactions: config.allow_multiple_transactions,
            query: String::new(),
            query_transformation: None,
            logger: Box::new(StandardLogger::new()),
            got_data: false,
            uppercase_column_names: config.uppercase_column_names,
        }
    }

    fn backend(&self) -> Result<&(dyn Backend + 'static)> {
        self.backend.as_deref().ok_or_else(Error::not_connected)
    }

    fn backend_mut(&mut self) -> Result<&mut (dyn Backend + 'static)> {
        self.backend.as_deref_mut().ok_or_else(Error::not_connected)
    }

    fn is_connected(&self) -> bool {
        self.backend
            .as_deref()
            .is_some_and(|backend| backend.is_connected().unwrap_or(false))
    }

    fn open(&mut self, params: ConnectionParameters) -> Result<()> {
        if self.backend.is_some() {
            return Err(Error::already_connected());
        }

        let backend = params.factory().make_session(&params)?;
        tracing::info!(
            backend = params.backend_name(),
            connect_string = params.connect_string(),
            "Session opened"
        );
        self.backend = Some(backend);
        self.last_params = Some(params);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let rolled_back = self.discard_internal_transaction();
        let disconnected = match self.backend.take() {
            Some(mut backend) => {
                tracing::info!(backend = backend.backend_name(), "Session closed");
                backend.disconnect()
            }
            None => Ok(()),
        };
        rolled_back.and(disconnected)
    }

    fn reconnect(&mut self) -> Result<()> {
        let params = self
            .last_params
            .clone()
            .ok_or_else(Error::no_previous_connection)?;

        if self.backend.is_some() {
            self.close()?;
        }

        let params = params.with_option(OPTION_RECONNECT, OPTION_TRUE);
        let backend = params.factory().make_session(&params)?;
        tracing::info!(backend = params.backend_name(), "Session reconnected");
        self.backend = Some(backend);
        Ok(())
    }

    fn begin(&mut self) -> Result<TransactionId> {
        self.backend()?;

        let (id, was_active) = self.transactions.select_for_begin();
        if !was_active {
            if let Err(e) = self.backend_mut().and_then(|backend| backend.begin()) {
                // A caller-owned transaction stays active; its guard decides.
                if self.transactions.internal() == Some(id) {
                    self.transactions.update(id, TransactionState::disable);
                }
                return Err(e);
            }
            tracing::debug!(transaction = %id, "Transaction started");
        }
        Ok(id)
    }

    fn commit(&mut self) -> Result<()> {
        self.backend_mut()?.commit()?;
        self.transactions
            .mark_current_if_session_owned(TransactionState::mark_committed);
        tracing::debug!("Committed");
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.backend_mut()?.rollback()?;
        self.transactions
            .mark_current_if_session_owned(TransactionState::mark_rolled_back);
        tracing::debug!("Rolled back");
        Ok(())
    }

    /// Disable the session-owned transaction (rolling it back if active) and
    /// start a fresh backend transaction.
    fn begin_external_transaction(&mut self) -> Result<()> {
        self.backend()?;
        if self.transactions.disable_internal() {
            tracing::debug!("Rolling back session-owned transaction superseded by caller");
            self.backend_mut()?.rollback()?;
        }
        self.backend_mut()?.begin()
    }

    fn attach_external_transaction(&mut self) -> Result<TransactionId> {
        if !self.allow_multiple_transactions && self.transactions.current_is_active() {
            let id = self.transactions.register_disabled();
            tracing::debug!(
                transaction = %id,
                "Multiple transactions disallowed; created disabled transaction"
            );
            return Ok(id);
        }

        self.begin_external_transaction()?;
        let id = self.transactions.attach_external();
        tracing::debug!(transaction = %id, "Caller-owned transaction started");
        Ok(id)
    }

    fn finish_transaction(&mut self, id: TransactionId, finish: Finish) -> Result<()> {
        if !self.transactions.get(id).is_some_and(|s| s.is_active()) {
            return Err(Error::already_handled());
        }

        match finish {
            Finish::Commit => {
                self.commit()?;
                self.transactions.update(id, TransactionState::mark_committed);
            }
            Finish::Rollback => {
                self.rollback()?;
                self.transactions.update(id, TransactionState::mark_rolled_back);
            }
        }
        Ok(())
    }

    fn release_transaction(&mut self, id: TransactionId) {
        if self.transactions.get(id).is_some_and(|s| s.is_active()) {
            if let Err(e) = self.rollback() {
                tracing::warn!(
                    transaction = %id,
                    error = %e,
                    "Rollback of abandoned transaction failed"
                );
            }
            self.transactions.update(id, TransactionState::mark_rolled_back);
            tracing::debug!(transaction = %id, "Abandoned transaction rolled back");
        }
        self.transactions.detach(id);
    }

    /// Forget the session-owned transaction, rolling back if it was active.
    fn discard_internal_transaction(&mut self) -> Result<()> {
        if self.transactions.remove_internal() {
            if let Some(backend) = self.backend.as_deref_mut() {
                return backend.rollback();
            }
        }
        Ok(())
    }

    fn teardown(&mut self) {
        if let Err(e) = self.discard_internal_transaction() {
            tracing::warn!(error = %e, "Rollback failed while dropping session");
        }
        if let Some(mut backend) = self.backend.take() {
            if let Err(e) = backend.disconnect() {
                tracing::warn!(error = %e, "Disconnect failed while dropping session");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconnected_session_refuses_backend_operations() {
        let mut session = Session::new();
        assert!(!session.is_connected());
        assert!(!session.is_pooled());
        assert_eq!(session.pool_slot(), None);

        assert!(session.begin().unwrap_err().is_not_connected());
        assert!(session.commit().unwrap_err().is_not_connected());
        assert!(session.rollback().unwrap_err().is_not_connected());
        assert!(session.backend_name().unwrap_err().is_not_connected());
        assert!(session.dummy_from_clause().unwrap_err().is_not_connected());
        assert!(session.internal_transaction().is_none());
    }

    #[test]
    fn test_reconnect_without_history_fails() {
        let mut session = Session::new();
        let err = session.reconnect().unwrap_err();
        assert!(matches!(
            err,
            Error::Connection(ref c)
                if c.kind == sqlsession_core::ConnectionErrorKind::NoPreviousConnection
        ));
        assert!(session.close().is_ok());
    }

    #[test]
    fn test_query_buffer_and_transformation() {
        let mut session = Session::new();
        session.append_query("select * ");
        session.append_query("from t");
        assert_eq!(session.query(), "select * from t");

        session.set_query_transformation(|q| q.to_uppercase());
        assert_eq!(session.query(), "SELECT * FROM T");

        session.clear_query_transformation();
        session.reset_query();
        assert_eq!(session.query(), "");
    }

    #[test]
    fn test_flags_and_config() {
        let config = SessionConfig::new()
            .allow_multiple_transactions(false)
            .uppercase_column_names(true);
        let mut session = Session::with_config(&config);
        assert!(!session.allow_multiple_transactions());
        assert!(session.uppercase_column_names());

        session.set_allow_multiple_transactions(true);
        session.set_uppercase_column_names(false);
        session.set_got_data(true);
        assert!(session.allow_multiple_transactions());
        assert!(!session.uppercase_column_names());
        assert!(session.got_data());
    }

    #[test]
    fn test_log_query_records_last_query() {
        let mut session = Session::new();
        assert_eq!(session.last_query(), "");
        assert!(!session.has_log_stream());

        session.log_query("select 1");
        assert_eq!(session.last_query(), "select 1");

        session.set_log_stream(Some(Box::new(std::io::sink())));
        assert!(session.has_log_stream());
    }
}
