//! API key storage for mcp-rule.
//!
//! The Rule.io API key is kept out of the TOML config file. It is resolved
//! from, in order:
//!
//! 1. an explicit value (e.g. `--api-key`),
//! 2. the `RULE_API_KEY` environment variable,
//! 3. the OS keychain (service `mcp-rule`, entry `rule/api_key`).
//!
//! # Example
//!
//! ```ignore
//! use rule_storage::{api_key_entry, CredentialStore, KeychainStore};
//!
//! let store = KeychainStore::new();
//! store.store(&api_key_entry(), "rule-api-key")?;
//! assert!(store.exists(&api_key_entry()));
//! ```

use std::collections::HashMap;
use std::sync::RwLock;

use keyring::Entry;
use rule_core::{Error, Result};
use tracing::{debug, warn};

/// Service name used in OS keychain.
const SERVICE_NAME: &str = "mcp-rule";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "RULE_API_KEY";

/// Where a resolved API key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Explicit,
    Environment,
    Keychain,
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::Explicit => write!(f, "command line"),
            KeySource::Environment => write!(f, "{}", API_KEY_ENV),
            KeySource::Keychain => write!(f, "keychain"),
        }
    }
}

/// Credential storage trait.
///
/// Implementations can use the OS keychain or in-memory storage (for tests).
pub trait CredentialStore: Send + Sync {
    /// Store a credential.
    fn store(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a credential. `Ok(None)` when absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Delete a credential. Deleting an absent credential is not an error.
    fn delete(&self, key: &str) -> Result<()>;

    /// Check if a credential exists.
    fn exists(&self, key: &str) -> bool {
        matches!(self.get(key), Ok(Some(_)))
    }
}

/// Keychain entry name for the Rule.io API key.
pub fn api_key_entry() -> String {
    "rule/api_key".to_string()
}

/// Resolve the API key from an explicit value, the environment value, or the store.
///
/// Blank values are treated as absent. Keychain failures are logged and
/// treated as "no key" so that a missing secret service never blocks
/// explicit or environment keys.
pub fn resolve_api_key(
    explicit: Option<&str>,
    env_value: Option<&str>,
    store: &dyn CredentialStore,
) -> Option<(String, KeySource)> {
    let non_blank = |v: Option<&str>| v.map(str::trim).filter(|v| !v.is_empty()).map(String::from);

    if let Some(key) = non_blank(explicit) {
        return Some((key, KeySource::Explicit));
    }
    if let Some(key) = non_blank(env_value) {
        return Some((key, KeySource::Environment));
    }
    match store.get(&api_key_entry()) {
        Ok(value) => non_blank(value.as_deref()).map(|key| (key, KeySource::Keychain)),
        Err(e) => {
            warn!(error = %e, "Could not read API key from keychain");
            None
        }
    }
}

// =============================================================================
// KeychainStore - OS Keychain implementation
// =============================================================================

/// Credential store backed by the OS keychain.
#[derive(Debug)]
pub struct KeychainStore {
    service_name: String,
}

impl KeychainStore {
    pub fn new() -> Self {
        Self {
            service_name: SERVICE_NAME.to_string(),
        }
    }

    /// Use a custom service name (keeps tests away from real credentials).
    pub fn with_service_name(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service_name, key).map_err(|e| {
            Error::Storage(format!("Failed to open keychain entry '{}': {}", key, e))
        })
    }
}

impl Default for KeychainStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeychainStore {
    fn store(&self, key: &str, value: &str) -> Result<()> {
        debug!(key = key, service = %self.service_name, "Storing credential");
        self.entry(key)?
            .set_password(value)
            .map_err(|e| Error::Storage(format!("Failed to store credential '{}': {}", key, e)))
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        debug!(key = key, service = %self.service_name, "Reading credential");
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(Error::Storage(format!(
                "Failed to read credential '{}': {}",
                key, e
            ))),
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        debug!(key = key, service = %self.service_name, "Deleting credential");
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(Error::Storage(format!(
                "Failed to delete credential '{}': {}",
                key, e
            ))),
        }
    }
}

// =============================================================================
// MemoryStore - In-memory implementation for testing
// =============================================================================

/// In-memory credential store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    credentials: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with credentials.
    pub fn with_credentials(credentials: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            credentials: RwLock::new(credentials.into_iter().collect()),
        }
    }
}

impl CredentialStore for MemoryStore {
    fn store(&self, key: &str, value: &str) -> Result<()> {
        self.credentials
            .write()
            .map_err(|e| Error::Storage(format!("Lock poisoned: {}", e)))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let creds = self
            .credentials
            .read()
            .map_err(|e| Error::Storage(format!("Lock poisoned: {}", e)))?;
        Ok(creds.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.credentials
            .write()
            .map_err(|e| Error::Storage(format!("Lock poisoned: {}", e)))?
            .remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenStore;

    impl CredentialStore for BrokenStore {
        fn store(&self, _key: &str, _value: &str) -> Result<()> {
            Err(Error::Storage("no secret service".into()))
        }
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(Error::Storage("no secret service".into()))
        }
        fn delete(&self, _key: &str) -> Result<()> {
            Err(Error::Storage("no secret service".into()))
        }
    }

    #[test]
    fn test_memory_store_basic() {
        let store = MemoryStore::new();

        store.store("rule/api_key", "k1").unwrap();
        assert_eq!(store.get("rule/api_key").unwrap(), Some("k1".to_string()));
        assert!(store.exists("rule/api_key"));

        store.store("rule/api_key", "k2").unwrap();
        assert_eq!(store.get("rule/api_key").unwrap(), Some("k2".to_string()));

        store.delete("rule/api_key").unwrap();
        assert!(!store.exists("rule/api_key"));

        // Deleting again is fine
        store.delete("rule/api_key").unwrap();
    }

    #[test]
    fn test_resolve_prefers_explicit() {
        let store =
            MemoryStore::with_credentials([(api_key_entry(), "from-keychain".to_string())]);

        let (key, source) = resolve_api_key(Some("from-flag"), Some("from-env"), &store).unwrap();
        assert_eq!(key, "from-flag");
        assert_eq!(source, KeySource::Explicit);
    }

    #[test]
    fn test_resolve_falls_back_to_env_then_keychain() {
        let store =
            MemoryStore::with_credentials([(api_key_entry(), "from-keychain".to_string())]);

        let (key, source) = resolve_api_key(None, Some("from-env"), &store).unwrap();
        assert_eq!((key.as_str(), source), ("from-env", KeySource::Environment));

        let (key, source) = resolve_api_key(Some("  "), None, &store).unwrap();
        assert_eq!((key.as_str(), source), ("from-keychain", KeySource::Keychain));
    }

    #[test]
    fn test_resolve_none_when_nothing_configured() {
        assert!(resolve_api_key(None, Some(""), &MemoryStore::new()).is_none());
    }

    #[test]
    fn test_resolve_survives_keychain_failure() {
        assert!(resolve_api_key(None, None, &BrokenStore).is_none());
        let (key, _) = resolve_api_key(None, Some("env"), &BrokenStore).unwrap();
        assert_eq!(key, "env");
    }

    #[test]
    fn test_key_source_display() {
        assert_eq!(KeySource::Environment.to_string(), "RULE_API_KEY");
        assert_eq!(KeySource::Keychain.to_string(), "keychain");
    }

    #[test]
    fn test_keychain_store_service_name() {
        assert_eq!(KeychainStore::new().service_name, "mcp-rule");
        assert_eq!(
            KeychainStore::with_service_name("test-service").service_name,
            "test-service"
        );
    }
}
