//! Transactions and their bookkeeping.
//!
//! A session tracks every live transaction in a [`TransactionTable`] keyed by
//! [`TransactionId`]:
//!
//! - the **internal** transaction is owned by the session. It is created by
//!   `Session::begin` when the caller never constructed a [`Transaction`], and
//!   is reused across `begin`/`commit` cycles: committing it does not free it,
//!   the next `begin` reactivates the same entry under the same id;
//! - the **external** transaction is a [`Transaction`] guard constructed by the
//!   caller. The session stores its state and a back-reference (its id), and
//!   forgets both when the guard is dropped.
//!
//! # Example
//!
//! ```ignore
//! let mut tx = Transaction::new(&mut session)?;
//! tx.current_session_mut().append_query("update accounts set ...");
//! tx.commit()?;
//! // a second commit fails: the transaction is already handled
//! assert!(tx.commit().unwrap_err().is_already_handled());
//! ```

use std::collections::BTreeMap;
use std::fmt;

use sqlsession_core::Result;

use crate::session::Session;

/// Identity of a transaction within its session.
///
/// Ids are never reused by a session, so an id held by a caller keeps
/// referring to the same transaction across reactivations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(u64);

impl TransactionId {
    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx#{}", self.0)
    }
}

/// Lifecycle status of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionStatus {
    /// Refuses every operation.
    #[default]
    Disabled,
    /// Started at the backend, may be committed or rolled back.
    Active,
    /// Committed.
    Committed,
    /// Rolled back.
    RolledBack,
}

impl TransactionStatus {
    /// Lowercase name of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Disabled => "disabled",
            TransactionStatus::Active => "active",
            TransactionStatus::Committed => "committed",
            TransactionStatus::RolledBack => "rolled back",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of one transaction.
///
/// `handled` is true whenever the status is not `Active`. The transition
/// helpers keep the two fields in step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionState {
    status: TransactionStatus,
    handled: bool,
    by_session: bool,
}

impl TransactionState {
    pub(crate) const fn session_owned() -> Self {
        Self {
            status: TransactionStatus::Active,
            handled: false,
            by_session: true,
        }
    }

    pub(crate) const fn caller_owned() -> Self {
        Self {
            status: TransactionStatus::Active,
            handled: false,
            by_session: false,
        }
    }

    pub(crate) const fn caller_disabled() -> Self {
        Self {
            status: TransactionStatus::Disabled,
            handled: true,
            by_session: false,
        }
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Whether the transaction can still be committed or rolled back.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.handled && matches!(self.status, TransactionStatus::Active)
    }

    /// Whether commit/rollback is no longer allowed.
    #[must_use]
    pub const fn is_handled(&self) -> bool {
        self.handled
    }

    /// Whether the session allocated this transaction for itself.
    #[must_use]
    pub const fn by_session(&self) -> bool {
        self.by_session
    }

    pub(crate) fn disable(&mut self) {
        self.handled = true;
        self.status = TransactionStatus::Disabled;
    }

    /// Reactivation: valid from any status, keeps identity.
    pub(crate) fn activate(&mut self) {
        self.handled = false;
        self.status = TransactionStatus::Active;
    }

    pub(crate) fn mark_committed(&mut self) {
        self.handled = true;
        self.status = TransactionStatus::Committed;
    }

    pub(crate) fn mark_rolled_back(&mut self) {
        self.handled = true;
        self.status = TransactionStatus::RolledBack;
    }
}

/// How a transaction is being finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Finish {
    Commit,
    Rollback,
}

/// Per-session registry of live transactions.
#[derive(Debug, Default)]
pub(crate) struct TransactionTable {
    next_id: u64,
    entries: BTreeMap<TransactionId, TransactionState>,
    internal: Option<TransactionId>,
    external: Option<TransactionId>,
}

impl TransactionTable {
    fn insert(&mut self, state: TransactionState) -> TransactionId {
        self.next_id += 1;
        let id = TransactionId(self.next_id);
        self.entries.insert(id, state);
        id
    }

    pub(crate) fn get(&self, id: TransactionId) -> Option<TransactionState> {
        self.entries.get(&id).copied()
    }

    pub(crate) fn update(&mut self, id: TransactionId, transition: fn(&mut TransactionState)) {
        if let Some(state) = self.entries.get_mut(&id) {
            transition(state);
        }
    }

    pub(crate) fn internal(&self) -> Option<TransactionId> {
        self.internal
    }

    pub(crate) fn external(&self) -> Option<TransactionId> {
        self.external
    }

    /// External if the internal one is absent or inactive, else internal.
    pub(crate) fn current(&self) -> Option<TransactionId> {
        match self.internal {
            Some(id) if self.get(id).is_some_and(|s| s.is_active()) => Some(id),
            _ => self.external,
        }
    }

    pub(crate) fn current_is_active(&self) -> bool {
        self.current()
            .and_then(|id| self.get(id))
            .is_some_and(|s| s.is_active())
    }

    /// Pick the transaction `Session::begin` should use and activate it.
    ///
    /// Priority: attached external, then existing internal, then a newly
    /// allocated internal. Returns the id and whether it was already active.
    pub(crate) fn select_for_begin(&mut self) -> (TransactionId, bool) {
        let external = self.external;
        for id in [self.external, self.internal].into_iter().flatten() {
            if let Some(state) = self.entries.get_mut(&id) {
                let was_active = state.is_active();
                if Some(id) == external
                    && matches!(
                        state.status,
                        TransactionStatus::Committed | TransactionStatus::RolledBack
                    )
                {
                    tracing::debug!(
                        transaction = %id,
                        status = %state.status,
                        "Reactivating finished caller-owned transaction"
                    );
                }
                state.activate();
                return (id, was_active);
            }
        }

        let id = self.insert(TransactionState::session_owned());
        self.internal = Some(id);
        tracing::debug!(transaction = %id, "Allocated session-owned transaction");
        (id, false)
    }

    /// Disable the internal transaction. Returns whether it was active.
    pub(crate) fn disable_internal(&mut self) -> bool {
        let Some(state) = self.internal.and_then(|id| self.entries.get_mut(&id)) else {
            return false;
        };
        let was_active = state.is_active();
        state.disable();
        was_active
    }

    /// Disable and forget the internal transaction. Returns whether it was active.
    pub(crate) fn remove_internal(&mut self) -> bool {
        let was_active = self.disable_internal();
        if let Some(id) = self.internal.take() {
            self.entries.remove(&id);
        }
        was_active
    }

    /// Register an active caller-owned transaction as the external one.
    pub(crate) fn attach_external(&mut self) -> TransactionId {
        let id = self.insert(TransactionState::caller_owned());
        self.external = Some(id);
        id
    }

    /// Register a caller-owned transaction that refuses every operation.
    pub(crate) fn register_disabled(&mut self) -> TransactionId {
        self.insert(TransactionState::caller_disabled())
    }

    /// Forget a caller-owned transaction and clear the back-reference to it.
    pub(crate) fn detach(&mut self, id: TransactionId) -> Option<TransactionState> {
        if self.external == Some(id) {
            self.external = None;
        }
        self.entries.remove(&id)
    }

    /// Apply `transition` to the current transaction if the session owns it.
    pub(crate) fn mark_current_if_session_owned(&mut self, transition: fn(&mut TransactionState)) {
        if let Some(id) = self.current() {
            if let Some(state) = self.entries.get_mut(&id) {
                if state.by_session {
                    transition(state);
                }
            }
        }
    }
}

/// A caller-owned transaction bound to one session.
///
/// Constructing a `Transaction` starts a backend transaction (unless the
/// session disallows multiple transactions and one is already active, in
/// which case the guard is created disabled). It must be finished with
/// [`commit`](Transaction::commit) or [`rollback`](Transaction::rollback);
/// dropping an active guard rolls back, discarding any backend error.
///
/// The guard borrows the session mutably for its whole life. Work inside the
/// transaction goes through [`current_session_mut`](Transaction::current_session_mut).
pub struct Transaction<'s> {
    session: &'s mut Session,
    id: TransactionId,
}

impl<'s> Transaction<'s> {
    /// Start a transaction on `session`.
    ///
    /// If the session's own internal transaction is active, it is disabled and
    /// rolled back first. Fails when the session is not connected or the
    /// backend cannot begin.
    pub fn new(session: &'s mut Session) -> Result<Self> {
        let id = session.attach_external_transaction()?;
        Ok(Self { session, id })
    }

    /// Commit the transaction.
    ///
    /// Fails with an already-handled error if it is not active.
    pub fn commit(&mut self) -> Result<()> {
        self.session.finish_transaction(self.id, Finish::Commit)
    }

    /// Roll the transaction back.
    ///
    /// Fails with an already-handled error if it is not active.
    pub fn rollback(&mut self) -> Result<()> {
        self.session.finish_transaction(self.id, Finish::Rollback)
    }

    /// Current status.
    pub fn status(&self) -> TransactionStatus {
        self.state()
            .map_or(TransactionStatus::Disabled, |s| s.status())
    }

    /// Whether commit/rollback is still possible.
    pub fn is_active(&self) -> bool {
        self.state().is_some_and(|s| s.is_active())
    }

    /// Always false for a caller-constructed transaction.
    pub fn by_session(&self) -> bool {
        self.state().is_some_and(|s| s.by_session())
    }

    /// Id of this transaction within its session.
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// The session this transaction runs on.
    pub fn current_session(&self) -> &Session {
        &*self.session
    }

    /// The session this transaction runs on, for issuing work.
    pub fn current_session_mut(&mut self) -> &mut Session {
        &mut *self.session
    }

    fn state(&self) -> Option<TransactionState> {
        self.session.transaction_state(self.id)
    }
}

impl fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("status", &self.status())
            .finish()
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        self.session.release_transaction(self.id);
    }
}
