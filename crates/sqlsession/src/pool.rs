//! Boundary to a connection pool.
//!
//! A pooled [`Session`] is only a handle `(pool, slot)`. Everything it does is
//! forwarded to the session stored in that slot, reached through
//! [`SessionPool::at`]. The pool is responsible for making `lease`,
//! `give_back` and `at` safe under concurrent use; sessions do no locking.

use std::ops::DerefMut;

use sqlsession_core::Result;

use crate::session::Session;

/// Exclusive access to the session stored in a pool slot.
pub type SessionGuard<'a> = Box<dyn DerefMut<Target = Session> + 'a>;

/// Operations a session needs from a pool.
pub trait SessionPool: Send + Sync {
    /// Reserve a free slot, blocking or failing according to the pool's policy.
    fn lease(&self) -> Result<usize>;

    /// Return a slot obtained from [`lease`](SessionPool::lease).
    fn give_back(&self, slot: usize);

    /// Access the session in a leased slot.
    ///
    /// `slot` must have been returned by `lease` and not yet given back.
    fn at(&self, slot: usize) -> SessionGuard<'_>;
}
