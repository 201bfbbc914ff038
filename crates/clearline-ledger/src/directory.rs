use std::collections::HashMap;
use std::sync::RwLock;

use clearline_types::AccountId;

/// External owner-to-account mapping.
///
/// This table is an application-side collaborator, not part of the ledger
/// engine: the engine knows accounts only by identifier. The registry writes
/// it on account creation and reads it for owner lookups.
pub trait OwnerDirectory: Send + Sync {
    fn record(&self, owner_id: &str, account_id: AccountId);
    fn accounts_for(&self, owner_id: &str) -> Vec<AccountId>;
}

/// Process-local directory for tests and embedding.
#[derive(Default)]
pub struct InMemoryOwnerDirectory {
    inner: RwLock<HashMap<String, Vec<AccountId>>>,
}

impl InMemoryOwnerDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OwnerDirectory for InMemoryOwnerDirectory {
    fn record(&self, owner_id: &str, account_id: AccountId) {
        let mut map = self.inner.write().expect("directory lock poisoned");
        let accounts = map.entry(owner_id.to_string()).or_default();
        if !accounts.contains(&account_id) {
            accounts.push(account_id);
        }
    }

    fn accounts_for(&self, owner_id: &str) -> Vec<AccountId> {
        self.inner
            .read()
            .expect("directory lock poisoned")
            .get(owner_id)
            .cloned()
            .unwrap_or_default()
    }
}
