// src/storage/secrets.rs

use std::fmt;

use super::{SecretStore, StorageError};
use crate::types::BoxFuture;

pub const SECRET_ENV_PREFIX: &str = "PROFILERUN_SECRET_";

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Secret store resolving `name` from `PROFILERUN_SECRET_<NAME>`.
///
/// The name is upper-cased and anything outside `[A-Z0-9]` becomes `_`, so
/// `{Secret:storage-key}` reads `PROFILERUN_SECRET_STORAGE_KEY`.
pub struct EnvSecretStore {
    lookup: Lookup,
}

impl EnvSecretStore {
    pub fn new() -> Self {
        Self::with_lookup(|key| std::env::var(key).ok())
    }

    /// Use a custom variable lookup instead of the process environment.
    pub fn with_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Box::new(lookup),
        }
    }

    pub fn variable_name(name: &str) -> String {
        let normalized: String = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("{SECRET_ENV_PREFIX}{normalized}")
    }
}

impl Default for EnvSecretStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EnvSecretStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvSecretStore").finish_non_exhaustive()
    }
}

impl SecretStore for EnvSecretStore {
    fn get_secret<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<String, StorageError>> {
        Box::pin(async move {
            let var = Self::variable_name(name);
            (self.lookup)(&var).ok_or_else(|| StorageError::NotFound(format!("secret '{name}'")))
        })
    }
}
