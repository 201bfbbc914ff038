use std::sync::Arc;

use tracing::info;

use clearline_cluster::ClusterManager;
use clearline_engine::{EngineError, LedgerEngine};
use clearline_types::{Account, AccountId, AccountStatus};

use crate::directory::OwnerDirectory;
use crate::error::LedgerClientError;

/// Request to create a ledger account.
#[derive(Clone, Debug)]
pub struct AccountSpec {
    pub ledger: u32,
    pub code: u16,
    pub owner_id: Option<String>,
    /// Off for funding/treasury accounts that may carry a net debit.
    pub debits_must_not_exceed_credits: bool,
}

impl AccountSpec {
    pub fn new(ledger: u32, code: u16) -> Self {
        Self {
            ledger,
            code,
            owner_id: None,
            debits_must_not_exceed_credits: true,
        }
    }

    pub fn owned_by(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn overdraftable(mut self) -> Self {
        self.debits_must_not_exceed_credits = false;
        self
    }
}

/// Creates and looks up accounts; maps application-level owners to ledger
/// account identifiers.
pub struct AccountRegistry {
    cluster: Arc<ClusterManager>,
    directory: Arc<dyn OwnerDirectory>,
}

impl AccountRegistry {
    pub fn new(cluster: Arc<ClusterManager>, directory: Arc<dyn OwnerDirectory>) -> Self {
        Self { cluster, directory }
    }

    /// Create an account with a fresh 128-bit identifier and persist the
    /// owner mapping. Fails with `DuplicateAccount` on an engine conflict.
    pub async fn create_account(&self, spec: AccountSpec) -> Result<Account, LedgerClientError> {
        if spec.ledger == 0 {
            return Err(LedgerClientError::Validation("ledger must be non-zero".into()));
        }
        if spec.code == 0 {
            return Err(LedgerClientError::Validation("code must be non-zero".into()));
        }

        let account = Account::new(
            AccountId::generate(),
            spec.ledger,
            spec.code,
            spec.owner_id.clone(),
            spec.debits_must_not_exceed_credits,
        );

        let results = self
            .cluster
            .execute(|engine| {
                let account = account.clone();
                async move { engine.create_accounts(&[account]).await }
            })
            .await?;

        match results.into_iter().next() {
            Some(Ok(())) => {}
            Some(Err(EngineError::DuplicateId)) => {
                return Err(LedgerClientError::DuplicateAccount(account.id));
            }
            Some(Err(e)) => return Err(LedgerClientError::Validation(e.to_string())),
            None => {
                return Err(LedgerClientError::Validation(
                    "engine returned no result for account create".into(),
                ))
            }
        }

        if let Some(owner) = &account.owner_id {
            self.directory.record(owner, account.id);
        }
        info!(account = %account.id, ledger = account.ledger, code = account.code, "account created");
        Ok(account)
    }

    /// Look up an account. `None` for unknown ids; never an error.
    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>, LedgerClientError> {
        let mut found = self
            .cluster
            .execute(|engine| async move { engine.lookup_accounts(&[id]).await })
            .await?;
        Ok(found.pop().flatten())
    }

    /// All accounts correlated to an external owner.
    pub async fn accounts_by_owner(
        &self,
        owner_id: &str,
    ) -> Result<Vec<Account>, LedgerClientError> {
        let ids = self.directory.accounts_for(owner_id);
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let found = self
            .cluster
            .execute(|engine| {
                let ids = ids.clone();
                async move { engine.lookup_accounts(&ids).await }
            })
            .await?;
        Ok(found.into_iter().flatten().collect())
    }

    /// Status-only mutation. Enforces the monotonic transition rule before
    /// submitting; never touches balances.
    pub async fn update_account_status(
        &self,
        id: AccountId,
        status: AccountStatus,
    ) -> Result<(), LedgerClientError> {
        let current = self
            .get_account(id)
            .await?
            .ok_or(LedgerClientError::AccountNotFound(id))?;

        if !current.status.can_transition_to(status) {
            return Err(LedgerClientError::Status(
                clearline_types::TypeError::InvalidStatusTransition {
                    from: current.status.to_string(),
                    to: status.to_string(),
                },
            ));
        }

        let result = self
            .cluster
            .execute(|engine| async move { engine.set_account_status(id, status).await })
            .await?;
        result.map_err(|e| match e {
            EngineError::AccountNotFound(id) => LedgerClientError::AccountNotFound(id),
            other => LedgerClientError::Validation(other.to_string()),
        })?;
        info!(account = %id, status = %status, "account status updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clearline_cluster::{ClusterConfig, LoopbackConnector};
    use clearline_engine::InMemoryEngine;

    use crate::directory::InMemoryOwnerDirectory;

    async fn registry() -> AccountRegistry {
        let engine = Arc::new(InMemoryEngine::new());
        let cluster = Arc::new(ClusterManager::new(
            ClusterConfig::default(),
            Arc::new(LoopbackConnector::new(engine)),
        ));
        cluster.connect().await.unwrap();
        AccountRegistry::new(cluster, Arc::new(InMemoryOwnerDirectory::new()))
    }

    #[tokio::test]
    async fn create_and_lookup_roundtrip() {
        let registry = registry().await;
        let created = registry
            .create_account(AccountSpec::new(840, 10).owned_by("merchant-7"))
            .await
            .unwrap();

        let found = registry.get_account(created.id).await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.owner_id.as_deref(), Some("merchant-7"));
        assert_eq!(found.status, AccountStatus::Active);
    }

    #[tokio::test]
    async fn zero_ledger_or_code_is_rejected_client_side() {
        let registry = registry().await;
        assert!(matches!(
            registry.create_account(AccountSpec::new(0, 10)).await,
            Err(LedgerClientError::Validation(_))
        ));
        assert!(matches!(
            registry.create_account(AccountSpec::new(840, 0)).await,
            Err(LedgerClientError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn unknown_account_lookup_is_none_not_error() {
        let registry = registry().await;
        let found = registry.get_account(AccountId::generate()).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn owner_lookup_returns_all_mappings() {
        let registry = registry().await;
        let a = registry
            .create_account(AccountSpec::new(840, 10).owned_by("owner-1"))
            .await
            .unwrap();
        let b = registry
            .create_account(AccountSpec::new(840, 11).owned_by("owner-1"))
            .await
            .unwrap();
        registry
            .create_account(AccountSpec::new(840, 10).owned_by("owner-2"))
            .await
            .unwrap();

        let accounts = registry.accounts_by_owner("owner-1").await.unwrap();
        let ids: Vec<AccountId> = accounts.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
        assert!(registry.accounts_by_owner("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn status_update_enforces_monotonic_rule() {
        let registry = registry().await;
        let account = registry
            .create_account(AccountSpec::new(840, 10))
            .await
            .unwrap();

        registry
            .update_account_status(account.id, AccountStatus::Frozen)
            .await
            .unwrap();
        registry
            .update_account_status(account.id, AccountStatus::Closed)
            .await
            .unwrap();

        let err = registry
            .update_account_status(account.id, AccountStatus::Active)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerClientError::Status(_)));
    }
}
