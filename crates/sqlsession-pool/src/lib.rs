//! Fixed-size session pool for sqlsession.
//!
//! A [`ConnectionPool`] owns `size` sessions, one per slot. Callers lease a
//! slot, work through [`Session::from_pool`] (or [`ConnectionPool::session`]),
//! and the slot is given back when that pooled session is dropped.
//!
//! ```ignore
//! let pool = Arc::new(ConnectionPool::connect(PoolConfig::new(4), &params)?);
//!
//! let mut session = pool.session()?;
//! session.begin()?;
//! session.commit()?;
//! ```
//!
//! Slots are handed out lowest index first. Each slot's session sits behind
//! its own mutex; the free list has a separate mutex and a condition variable
//! that wakes one waiter per returned slot.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use sqlsession::{Session, SessionConfig, SessionGuard, SessionPool};
use sqlsession_core::{ConnectionParameters, Error, PoolError, PoolErrorKind, Result};

/// Connection pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of sessions in the pool
    pub size: usize,
    /// Maximum time to wait in `lease` in milliseconds; `None` waits forever
    pub lease_timeout_ms: Option<u64>,
    /// Configuration applied to every pooled session
    pub session: SessionConfig,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: 10,
            lease_timeout_ms: Some(30_000), // 30 seconds
            session: SessionConfig::default(),
        }
    }
}

impl PoolConfig {
    /// Create a pool configuration with the given size.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }

    /// Set lease timeout.
    #[must_use]
    pub fn lease_timeout(mut self, ms: u64) -> Self {
        self.lease_timeout_ms = Some(ms);
        self
    }

    /// Wait forever for a free slot.
    #[must_use]
    pub fn no_lease_timeout(mut self) -> Self {
        self.lease_timeout_ms = None;
        self
    }

    /// Set the configuration of pooled sessions.
    #[must_use]
    pub fn session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }
}

/// Pool statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Total number of slots
    pub size: usize,
    /// Number of free slots
    pub idle: usize,
    /// Number of leased slots
    pub leased: usize,
    /// Number of callers blocked in `lease`
    pub waiting: usize,
    /// Leases granted since the pool was created
    pub total_leases: u64,
}

#[derive(Debug)]
struct FreeList {
    free: Vec<bool>,
    waiting: usize,
    total_leases: u64,
}

impl FreeList {
    fn take_lowest(&mut self) -> Option<usize> {
        let slot = self.free.iter().position(|free| *free)?;
        self.free[slot] = false;
        self.total_leases += 1;
        Some(slot)
    }
}

/// A fixed set of sessions shared between threads.
pub struct ConnectionPool {
    config: PoolConfig,
    slots: Vec<Mutex<Session>>,
    free_list: Mutex<FreeList>,
    available: Condvar,
}

impl ConnectionPool {
    /// Create a pool of unconnected sessions.
    pub fn new(config: PoolConfig) -> Result<Self> {
        if config.size == 0 {
            return Err(Error::Pool(PoolError {
                kind: PoolErrorKind::Config,
                message: "Pool size must be at least 1".to_string(),
                source: None,
            }));
        }

        let slots = (0..config.size)
            .map(|_| Mutex::new(Session::with_config(&config.session)))
            .collect();
        let free_list = Mutex::new(FreeList {
            free: vec![true; config.size],
            waiting: 0,
            total_leases: 0,
        });

        tracing::debug!(size = config.size, "Created session pool");
        Ok(Self {
            config,
            slots,
            free_list,
            available: Condvar::new(),
        })
    }

    /// Create a pool and open every session with `params`.
    #[tracing::instrument(level = "debug", skip(config, params), fields(size = config.size))]
    pub fn connect(config: PoolConfig, params: &ConnectionParameters) -> Result<Self> {
        let pool = Self::new(config)?;
        for slot in &pool.slots {
            lock_session(slot).open(params.clone())?;
        }
        tracing::info!(
            size = pool.config.size,
            backend = params.backend_name(),
            "Session pool connected"
        );
        Ok(pool)
    }

    /// Get the pool configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Number of slots.
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Reserve the lowest free slot, waiting up to the configured lease timeout.
    pub fn lease(&self) -> Result<usize> {
        let deadline = self
            .config
            .lease_timeout_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms));

        let mut list = self.lock_free_list();
        if let Some(slot) = list.take_lowest() {
            tracing::trace!(slot, "Leased slot");
            return Ok(slot);
        }

        list.waiting += 1;
        let leased = loop {
            if let Some(slot) = list.take_lowest() {
                break Ok(slot);
            }
            match deadline {
                None => {
                    list = self
                        .available
                        .wait(list)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        break Err(Error::Pool(PoolError {
                            kind: PoolErrorKind::Timeout,
                            message: format!(
                                "Timed out after {}ms waiting for a free session",
                                self.config.lease_timeout_ms.unwrap_or_default()
                            ),
                            source: None,
                        }));
                    }
                    list = self
                        .available
                        .wait_timeout(list, deadline - now)
                        .map_or_else(|e| e.into_inner().0, |(guard, _)| guard);
                }
            }
        };
        list.waiting -= 1;

        match &leased {
            Ok(slot) => tracing::trace!(slot, "Leased slot after waiting"),
            Err(e) => tracing::warn!(error = %e, "Lease timed out"),
        }
        leased
    }

    /// Reserve the lowest free slot without waiting.
    pub fn try_lease(&self) -> Result<usize> {
        self.lock_free_list().take_lowest().ok_or_else(|| {
            Error::Pool(PoolError {
                kind: PoolErrorKind::Exhausted,
                message: format!("All {} sessions are in use", self.slots.len()),
                source: None,
            })
        })
    }

    /// Return a leased slot and wake one waiter.
    ///
    /// Returning a free or unknown slot is logged and ignored.
    pub fn give_back(&self, slot: usize) {
        let mut list = self.lock_free_list();
        match list.free.get_mut(slot) {
            Some(free) if !*free => *free = true,
            Some(_) => {
                tracing::warn!(slot, "Ignoring give_back of a slot that is not leased");
                return;
            }
            None => {
                tracing::warn!(slot, size = self.slots.len(), "Ignoring give_back of unknown slot");
                return;
            }
        }
        drop(list);
        self.available.notify_one();
    }

    /// Lock the session in `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range.
    pub fn at(&self, slot: usize) -> MutexGuard<'_, Session> {
        lock_session(&self.slots[slot])
    }

    /// Lease a slot and return a pooled session bound to it.
    pub fn session(self: &Arc<Self>) -> Result<Session> {
        let pool: Arc<dyn SessionPool> = Arc::clone(self) as Arc<dyn SessionPool>;
        Session::from_pool(pool)
    }

    /// Get the current pool statistics.
    pub fn stats(&self) -> PoolStats {
        let list = self.lock_free_list();
        let idle = list.free.iter().filter(|free| **free).count();
        PoolStats {
            size: list.free.len(),
            idle,
            leased: list.free.len() - idle,
            waiting: list.waiting,
            total_leases: list.total_leases,
        }
    }

    fn lock_free_list(&self) -> MutexGuard<'_, FreeList> {
        self.free_list
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// A session whose user panicked is still usable; its state is whatever the
/// panic left behind.
fn lock_session(slot: &Mutex<Session>) -> MutexGuard<'_, Session> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionPool for ConnectionPool {
    fn lease(&self) -> Result<usize> {
        ConnectionPool::lease(self)
    }

    fn give_back(&self, slot: usize) {
        ConnectionPool::give_back(self, slot);
    }

    fn at(&self, slot: usize) -> SessionGuard<'_> {
        Box::new(ConnectionPool::at(self, slot))
    }
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
