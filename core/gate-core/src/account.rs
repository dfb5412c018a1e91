//! Cached "my account" for the wallet connection.
//!
//! Written by the wallet-connection collaborator on connect and on account
//! switch; read (never written) by the provider bridge to drop `accountsChanged`
//! notifications that report the account we already have.

use once_cell::sync::Lazy;
use std::sync::{Arc, RwLock};

static GLOBAL_ACCOUNT: Lazy<AccountCache> = Lazy::new(AccountCache::default);

#[derive(Debug, Clone, Default)]
pub struct AccountCache {
    inner: Arc<RwLock<Option<String>>>,
}

impl AccountCache {
    /// Process-wide cache shared by the wallet collaborator and the gate.
    /// Tests should build their own with `AccountCache::default()`.
    pub fn global() -> &'static AccountCache {
        &GLOBAL_ACCOUNT
    }

    pub fn with_account(account: impl Into<String>) -> Self {
        let cache = Self::default();
        cache.set(account);
        cache
    }

    pub fn set(&self, account: impl Into<String>) {
        let mut slot = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(account.into());
    }

    pub fn clear(&self) {
        let mut slot = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = None;
    }

    pub fn current(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Exact comparison against the cached value; an empty report only
    /// matches an empty cache.
    pub fn is_current(&self, reported: Option<&str>) -> bool {
        let slot = self
            .inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        slot.as_deref() == reported
    }
}
