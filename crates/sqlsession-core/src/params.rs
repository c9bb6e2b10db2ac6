//! Connection parameters and backend lookup.
//!
//! [`ConnectionParameters`] is what a session hands to a [`BackendFactory`].
//! It is also the only state a session keeps across a disconnect, so that
//! `reconnect` can repeat the last successful `open`.
//!
//! [`ConnectionSettings`] is the serializable form (backend name instead of a
//! factory) and is turned into parameters through a [`BackendRegistry`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::BackendFactory;
use crate::error::{Error, Result};

/// Option set on reconnection so adapters can suppress interactive prompts.
pub const OPTION_RECONNECT: &str = "reconnect";

/// Canonical "on" value for boolean options.
pub const OPTION_TRUE: &str = "1";

/// Everything needed to open a backend connection.
#[derive(Clone)]
pub struct ConnectionParameters {
    factory: Arc<dyn BackendFactory>,
    connect_string: String,
    options: BTreeMap<String, String>,
}

impl ConnectionParameters {
    /// Create parameters for the given factory and connect string.
    pub fn new(factory: Arc<dyn BackendFactory>, connect_string: impl Into<String>) -> Self {
        Self {
            factory,
            connect_string: connect_string.into(),
            options: BTreeMap::new(),
        }
    }

    /// Set an option (builder pattern).
    #[must_use]
    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_option(name, value);
        self
    }

    /// Set an option, replacing any previous value.
    pub fn set_option(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.options.insert(name.into(), value.into());
    }

    /// Get an option value.
    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }

    /// Whether a boolean option is set to a true value.
    ///
    /// Accepts `1`, `true`, `yes` and `on`, case-insensitively.
    pub fn is_option_on(&self, name: &str) -> bool {
        self.option(name).is_some_and(|value| {
            ["1", "true", "yes", "on"]
                .iter()
                .any(|on| value.eq_ignore_ascii_case(on))
        })
    }

    /// All options, ordered by name.
    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    /// The factory that will create the backend.
    pub fn factory(&self) -> &Arc<dyn BackendFactory> {
        &self.factory
    }

    /// Name of the factory's backend.
    pub fn backend_name(&self) -> &str {
        self.factory.name()
    }

    /// Backend-specific connect string.
    pub fn connect_string(&self) -> &str {
        &self.connect_string
    }
}

impl fmt::Debug for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParameters")
            .field("backend", &self.factory.name())
            .field("connect_string", &self.connect_string)
            .field("options", &self.options)
            .finish()
    }
}

/// Serializable description of a connection.
///
/// ```json
/// { "backend": "postgresql", "connect_string": "dbname=app", "options": { "timeout": "5" } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Registered backend name
    pub backend: String,
    /// Backend-specific connect string
    pub connect_string: String,
    /// Extra options passed through to the backend
    pub options: BTreeMap<String, String>,
}

impl ConnectionSettings {
    /// Create settings for a backend and connect string.
    pub fn new(backend: impl Into<String>, connect_string: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            connect_string: connect_string.into(),
            options: BTreeMap::new(),
        }
    }

    /// Parse `backend://connect-string`.
    pub fn parse_uri(uri: &str) -> Result<Self> {
        match uri.split_once("://") {
            Some((backend, rest)) if !backend.is_empty() => Ok(Self::new(backend, rest)),
            _ => Err(Error::config(format!(
                "Connection string '{uri}' does not name a backend (expected 'backend://...')"
            ))),
        }
    }

    /// Set an option (builder pattern).
    #[must_use]
    pub fn option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }
}

/// Maps backend names to factories.
#[derive(Default, Clone)]
pub struct BackendRegistry {
    factories: HashMap<String, Arc<dyn BackendFactory>>,
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under its own name, replacing any previous one.
    pub fn register(&mut self, factory: Arc<dyn BackendFactory>) {
        tracing::debug!(backend = factory.name(), "Registering backend factory");
        self.factories.insert(factory.name().to_string(), factory);
    }

    /// Look up a factory by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn BackendFactory>> {
        self.factories.get(name).cloned()
    }

    /// Names of all registered backends, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Turn settings into parameters.
    pub fn resolve(&self, settings: &ConnectionSettings) -> Result<ConnectionParameters> {
        let factory = self.get(&settings.backend).ok_or_else(|| {
            Error::config(format!("Unknown backend '{}'", settings.backend))
        })?;

        let mut params = ConnectionParameters::new(factory, settings.connect_string.clone());
        for (name, value) in &settings.options {
            params.set_option(name.clone(), value.clone());
        }
        Ok(params)
    }

    /// Parse `backend://connect-string` and resolve it.
    pub fn parameters_from_uri(&self, uri: &str) -> Result<ConnectionParameters> {
        self.resolve(&ConnectionSettings::parse_uri(uri)?)
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;

    struct NamedFactory(&'static str);

    impl BackendFactory for NamedFactory {
        fn name(&self) -> &str {
            self.0
        }

        fn make_session(&self, _params: &ConnectionParameters) -> Result<Box<dyn Backend>> {
            Err(Error::Unsupported("make_session"))
        }
    }

    fn registry() -> BackendRegistry {
        let mut registry = BackendRegistry::new();
        registry.register(Arc::new(NamedFactory("postgresql")));
        registry.register(Arc::new(NamedFactory("sqlite3")));
        registry
    }

    #[test]
    fn test_option_flags() {
        let params = ConnectionParameters::new(Arc::new(NamedFactory("x")), "db")
            .with_option(OPTION_RECONNECT, OPTION_TRUE)
            .with_option("prompt", "Yes")
            .with_option("verbose", "0");

        assert!(params.is_option_on(OPTION_RECONNECT));
        assert!(params.is_option_on("prompt"));
        assert!(!params.is_option_on("verbose"));
        assert!(!params.is_option_on("missing"));
        assert_eq!(params.option("verbose"), Some("0"));
        assert_eq!(params.backend_name(), "x");
        assert_eq!(params.connect_string(), "db");
    }

    #[test]
    fn test_parse_uri() {
        let settings = ConnectionSettings::parse_uri("sqlite3://file.db").unwrap();
        assert_eq!(settings.backend, "sqlite3");
        assert_eq!(settings.connect_string, "file.db");

        assert!(ConnectionSettings::parse_uri("file.db").is_err());
        assert!(ConnectionSettings::parse_uri("://file.db").is_err());
    }

    #[test]
    fn test_registry_resolve() {
        let registry = registry();
        assert_eq!(registry.names(), vec!["postgresql", "sqlite3"]);

        let settings = ConnectionSettings::new("postgresql", "dbname=app").option("timeout", "5");
        let params = registry.resolve(&settings).unwrap();
        assert_eq!(params.backend_name(), "postgresql");
        assert_eq!(params.connect_string(), "dbname=app");
        assert_eq!(params.option("timeout"), Some("5"));

        let err = registry.parameters_from_uri("oracle://scott").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_settings_from_json() {
        let settings: ConnectionSettings = serde_json::from_str(
            r#"{ "backend": "sqlite3", "connect_string": ":memory:", "options": { "busy": "1" } }"#,
        )
        .unwrap();
        assert_eq!(settings.backend, "sqlite3");
        assert_eq!(settings.options.get("busy").map(String::as_str), Some("1"));

        let partial: ConnectionSettings = serde_json::from_str(r#"{ "backend": "sqlite3" }"#).unwrap();
        assert!(partial.connect_string.is_empty());
        assert!(partial.options.is_empty());
    }
}
