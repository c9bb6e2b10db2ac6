//! Backend that records calls per connection.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use sqlsession::{Backend, BackendFactory, ConnectionParameters, OPTION_RECONNECT, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Begin,
    Commit,
    Rollback,
    Disconnect,
}

/// Calls received by each connection, indexed in connection order.
#[derive(Debug, Default)]
pub struct Log {
    pub connections: Vec<Vec<Call>>,
    pub reconnects: usize,
}

pub type SharedLog = Arc<Mutex<Log>>;

pub struct RecordingFactory {
    log: SharedLog,
}

impl RecordingFactory {
    pub fn params() -> (ConnectionParameters, SharedLog) {
        let log = SharedLog::default();
        let factory = Arc::new(Self {
            log: Arc::clone(&log),
        });
        (ConnectionParameters::new(factory, "pool=test"), log)
    }
}

impl BackendFactory for RecordingFactory {
    fn name(&self) -> &str {
        "recording"
    }

    fn make_session(&self, params: &ConnectionParameters) -> Result<Box<dyn Backend>> {
        let mut log = self.log.lock().expect("lock poisoned");
        if params.is_option_on(OPTION_RECONNECT) {
            log.reconnects += 1;
        }
        log.connections.push(Vec::new());
        Ok(Box::new(RecordingBackend {
            index: log.connections.len() - 1,
            log: Arc::clone(&self.log),
        }))
    }
}

struct RecordingBackend {
    index: usize,
    log: SharedLog,
}

impl RecordingBackend {
    fn record(&self, call: Call) -> Result<()> {
        self.log.lock().expect("lock poisoned").connections[self.index].push(call);
        Ok(())
    }
}

impl Backend for RecordingBackend {
    fn is_connected(&self) -> Result<bool> {
        Ok(true)
    }

    fn begin(&mut self) -> Result<()> {
        self.record(Call::Begin)
    }

    fn commit(&mut self) -> Result<()> {
        self.record(Call::Commit)
    }

    fn rollback(&mut self) -> Result<()> {
        self.record(Call::Rollback)
    }

    fn disconnect(&mut self) -> Result<()> {
        self.record(Call::Disconnect)
    }

    fn backend_name(&self) -> &str {
        "recording"
    }
}

pub fn connection_calls(log: &SharedLog, index: usize) -> Vec<Call> {
    log.lock().expect("lock poisoned").connections[index].clone()
}

pub fn connection_count(log: &SharedLog) -> usize {
    log.lock().expect("lock poisoned").connections.len()
}
