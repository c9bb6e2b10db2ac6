//! Core types and traits for the session layer.
//!
//! This crate provides the building blocks shared by sessions, transactions
//! and pools:
//!
//! - `Backend` / `BackendFactory` traits implemented by database adapters
//! - `ConnectionParameters` and the `BackendRegistry` that resolves them
//! - `QueryLogger` and the default `StandardLogger`
//! - The `Error` type used everywhere

pub mod backend;
pub mod error;
pub mod logger;
pub mod params;

pub use backend::{Backend, BackendFactory, FailoverCallback, IsolationLevel};
pub use error::{
    ConfigError, ConnectionError, ConnectionErrorKind, Error, PoolError, PoolErrorKind,
    QueryError, QueryErrorKind, Result, TransactionError, TransactionErrorKind,
};
pub use logger::{QueryLogger, StandardLogger};
pub use params::{
    BackendRegistry, ConnectionParameters, ConnectionSettings, OPTION_RECONNECT, OPTION_TRUE,
};
