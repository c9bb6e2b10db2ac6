//! Query logging.
//!
//! Every session owns one [`QueryLogger`]. Statement code calls
//! `Session::log_query` right before execution; the logger remembers the text
//! so `Session::last_query` can report it after a failure.
//!
//! [`StandardLogger`] is installed by default. It emits each query as a
//! `tracing` event under the `sqlsession::query` target and, when a log stream
//! has been set, also writes the query to that stream, one per line.

use std::fmt;
use std::io::Write;

/// Sink for executed query text.
pub trait QueryLogger: Send {
    /// Called with the final query text right before execution.
    fn start_query(&mut self, query: &str);

    /// Text of the most recent query, empty if none was logged.
    fn last_query(&self) -> String;

    /// Install or remove a stream that receives every query.
    ///
    /// Loggers without stream support ignore this.
    fn set_stream(&mut self, stream: Option<Box<dyn Write + Send>>) {
        let _ = stream;
    }

    /// Whether a stream is currently installed.
    fn has_stream(&self) -> bool {
        false
    }
}

/// Default logger: `tracing` plus an optional echo stream.
#[derive(Default)]
pub struct StandardLogger {
    stream: Option<Box<dyn Write + Send>>,
    last_query: String,
}

impl StandardLogger {
    /// Create a logger without a stream.
    pub fn new() -> Self {
        Self::default()
    }
}

impl QueryLogger for StandardLogger {
    fn start_query(&mut self, query: &str) {
        tracing::debug!(target: "sqlsession::query", query = %query, "Executing query");

        if let Some(stream) = self.stream.as_mut() {
            if let Err(e) = writeln!(stream, "{query}") {
                tracing::warn!(error = %e, "Failed to write query to log stream");
            }
        }

        self.last_query.clear();
        self.last_query.push_str(query);
    }

    fn last_query(&self) -> String {
        self.last_query.clone()
    }

    fn set_stream(&mut self, stream: Option<Box<dyn Write + Send>>) {
        self.stream = stream;
    }

    fn has_stream(&self) -> bool {
        self.stream.is_some()
    }
}

impl fmt::Debug for StandardLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandardLogger")
            .field("has_stream", &self.stream.is_some())
            .field("last_query", &self.last_query)
            .finish()
    }
}
