//! Recording backend shared by the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use sqlsession::{
    Backend, BackendFactory, ConnectionError, ConnectionErrorKind, ConnectionParameters, Error,
    FailoverCallback, IsolationLevel, OPTION_RECONNECT, QueryError, QueryErrorKind, Result,
};

/// One call received by a [`MockBackend`] or its factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect { connect_string: String, reconnect: bool },
    Begin,
    Commit,
    Rollback,
    Disconnect,
}

#[derive(Debug)]
pub struct MockState {
    pub calls: Vec<Call>,
    pub fail_connect: bool,
    pub fail_begin: bool,
    pub fail_commit: bool,
    pub fail_rollback: bool,
    pub fail_commit_serialization: bool,
    pub failover_installed: bool,
    pub alive: bool,
    pub isolation: IsolationLevel,
    pub sequence: i64,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            fail_connect: false,
            fail_begin: false,
            fail_commit: false,
            fail_rollback: false,
            fail_commit_serialization: false,
            failover_installed: false,
            alive: true,
            isolation: IsolationLevel::ReadCommitted,
            sequence: 0,
        }
    }
}

pub type SharedState = Arc<Mutex<MockState>>;

pub fn lock(state: &SharedState) -> MutexGuard<'_, MockState> {
    state.lock().expect("lock poisoned")
}

pub fn calls(state: &SharedState) -> Vec<Call> {
    lock(state).calls.clone()
}

pub fn count(state: &SharedState, call: &Call) -> usize {
    lock(state).calls.iter().filter(|c| *c == call).count()
}

pub fn clear_calls(state: &SharedState) {
    lock(state).calls.clear();
}

fn injected(operation: &str) -> Error {
    Error::Query(QueryError {
        kind: QueryErrorKind::Database,
        sqlstate: None,
        message: format!("injected {operation} failure"),
        source: None,
    })
}

fn serialization_failure() -> Error {
    Error::Query(QueryError {
        kind: QueryErrorKind::Serialization,
        sqlstate: Some("40001".to_string()),
        message: "could not serialize access".to_string(),
        source: None,
    })
}

fn connection_lost() -> Error {
    Error::Connection(ConnectionError {
        kind: ConnectionErrorKind::Disconnected,
        message: "connection lost".to_string(),
        source: None,
    })
}

pub struct MockFactory {
    name: &'static str,
    dummy_table: &'static str,
    state: SharedState,
}

impl MockFactory {
    pub fn new(name: &'static str) -> (Arc<Self>, SharedState) {
        let state = SharedState::default();
        let factory = Arc::new(Self {
            name,
            dummy_table: "",
            state: Arc::clone(&state),
        });
        (factory, state)
    }

    pub fn with_dummy_table(
        name: &'static str,
        dummy_table: &'static str,
    ) -> (Arc<Self>, SharedState) {
        let state = SharedState::default();
        let factory = Arc::new(Self {
            name,
            dummy_table,
            state: Arc::clone(&state),
        });
        (factory, state)
    }
}

impl BackendFactory for MockFactory {
    fn name(&self) -> &str {
        self.name
    }

    fn make_session(&self, params: &ConnectionParameters) -> Result<Box<dyn Backend>> {
        let mut state = lock(&self.state);
        state.calls.push(Call::Connect {
            connect_string: params.connect_string().to_string(),
            reconnect: params.is_option_on(OPTION_RECONNECT),
        });
        if state.fail_connect {
            return Err(Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Connect,
                message: "injected connect failure".to_string(),
                source: None,
            }));
        }
        state.alive = true;
        Ok(Box::new(MockBackend {
            name: self.name,
            dummy_table: self.dummy_table,
            state: Arc::clone(&self.state),
        }))
    }
}

pub struct MockBackend {
    name: &'static str,
    dummy_table: &'static str,
    state: SharedState,
}

impl MockBackend {
    fn record(&self, call: Call, fail: impl Fn(&MockState) -> bool, operation: &str) -> Result<()> {
        let mut state = lock(&self.state);
        let dead = !state.alive && call != Call::Disconnect;
        state.calls.push(call);
        if dead {
            return Err(connection_lost());
        }
        if fail(&*state) {
            return Err(injected(operation));
        }
        Ok(())
    }
}

impl Backend for MockBackend {
    fn is_connected(&self) -> Result<bool> {
        if lock(&self.state).alive {
            Ok(true)
        } else {
            Err(connection_lost())
        }
    }

    fn begin(&mut self) -> Result<()> {
        self.record(Call::Begin, |s| s.fail_begin, "begin")
    }

    fn commit(&mut self) -> Result<()> {
        self.record(Call::Commit, |s| s.fail_commit, "commit")?;
        if lock(&self.state).fail_commit_serialization {
            return Err(serialization_failure());
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.record(Call::Rollback, |s| s.fail_rollback, "rollback")
    }

    fn disconnect(&mut self) -> Result<()> {
        self.record(Call::Disconnect, |_| false, "disconnect")
    }

    fn backend_name(&self) -> &str {
        self.name
    }

    fn isolation_level(&mut self) -> Result<IsolationLevel> {
        Ok(lock(&self.state).isolation)
    }

    fn set_isolation_level(&mut self, level: IsolationLevel) -> Result<()> {
        lock(&self.state).isolation = level;
        Ok(())
    }

    fn next_sequence_value(&mut self, _sequence: &str) -> Result<Option<i64>> {
        let mut state = lock(&self.state);
        state.sequence += 1;
        Ok(Some(state.sequence))
    }

    fn dummy_from_table(&self) -> &str {
        self.dummy_table
    }

    fn set_failover_callback(&mut self, callback: Arc<dyn FailoverCallback>) -> Result<()> {
        let _ = callback;
        lock(&self.state).failover_installed = true;
        Ok(())
    }
}

/// Parameters for a fresh mock backend plus its recorded state.
pub fn mock_params(connect_string: &str) -> (ConnectionParameters, SharedState) {
    let (factory, state) = MockFactory::new("mock");
    (ConnectionParameters::new(factory, connect_string), state)
}
