//! Credential access for the two remote APIs.
//!
//! The surrounding application owns credential persistence (a popup form, a
//! synced key-value store, a secrets manager — whatever fits). The library
//! only needs two named secrets at run time, so the seam is a minimal trait:
//! read a key, write a key, and an absent key reads as the empty string,
//! which the engine treats as "not configured".

use std::collections::HashMap;
use std::sync::Mutex;

/// Store key for the document-service API credential.
pub const SERVICE_API_KEY: &str = "scanye_api_key";

/// Store key for the vision model API credential.
pub const MODEL_API_KEY: &str = "openai_api_key";

/// Key-value access to the stored secrets.
///
/// `get` never fails: an absent key is the empty string. Reads are issued
/// concurrently by the engine and require no coordination beyond `Sync`.
pub trait CredentialStore: Send + Sync {
    /// Read a credential; empty string when the key is not stored.
    fn get(&self, key: &str) -> String;

    /// Store a credential, replacing any previous value.
    fn set(&self, key: &str, value: &str);
}

/// In-memory credential store.
///
/// The default store for the CLI and for tests. Applications with real
/// persistence implement [`CredentialStore`] over their own backend.
#[derive(Debug, Default)]
pub struct MemoryCredentials {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store from the conventional environment variables
    /// (`SCANYE_API_KEY`, `OPENAI_API_KEY`). Unset variables stay absent.
    pub fn from_env() -> Self {
        let store = Self::new();
        for (key, var) in [(SERVICE_API_KEY, "SCANYE_API_KEY"), (MODEL_API_KEY, "OPENAI_API_KEY")] {
            if let Ok(value) = std::env::var(var) {
                if !value.is_empty() {
                    store.set(key, &value);
                }
            }
        }
        store
    }
}

impl CredentialStore for MemoryCredentials {
    fn get(&self, key: &str) -> String {
        self.values
            .lock()
            .expect("credential store lock poisoned")
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    fn set(&self, key: &str, value: &str) {
        self.values
            .lock()
            .expect("credential store lock poisoned")
            .insert(key.to_string(), value.to_string());
    }
}
