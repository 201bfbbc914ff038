use std::sync::Arc;

use clearline_cluster::ClusterManager;
use clearline_engine::LedgerEngine;
use clearline_types::{AccountBalance, AccountId};

use crate::error::LedgerClientError;

/// Batch-friendly read path deriving available/pending/total balances from
/// posted and pending totals.
pub struct BalanceQuery {
    cluster: Arc<ClusterManager>,
}

impl BalanceQuery {
    pub fn new(cluster: Arc<ClusterManager>) -> Self {
        Self { cluster }
    }

    /// Balance of a single account. Unknown ids are an error here, unlike
    /// the batch path.
    pub async fn get_balance(&self, id: AccountId) -> Result<AccountBalance, LedgerClientError> {
        let mut found = self
            .cluster
            .execute(|engine| async move { engine.lookup_accounts(&[id]).await })
            .await?;
        found
            .pop()
            .flatten()
            .map(|account| account.balance())
            .ok_or(LedgerClientError::AccountNotFound(id))
    }

    /// Balances for many accounts. Unknown ids are omitted from the result
    /// rather than failing the whole batch.
    pub async fn get_balances(
        &self,
        ids: &[AccountId],
    ) -> Result<Vec<AccountBalance>, LedgerClientError> {
        let found = self
            .cluster
            .execute(|engine| {
                let ids = ids.to_vec();
                async move { engine.lookup_accounts(&ids).await }
            })
            .await?;
        Ok(found
            .into_iter()
            .flatten()
            .map(|account| account.balance())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clearline_cluster::{ClusterConfig, LoopbackConnector};
    use clearline_engine::InMemoryEngine;
    use clearline_types::{Account, Transfer};

    async fn harness() -> (BalanceQuery, AccountId, AccountId) {
        let engine = Arc::new(InMemoryEngine::new());
        let cluster = Arc::new(ClusterManager::new(
            ClusterConfig::default(),
            Arc::new(LoopbackConnector::new(engine.clone())),
        ));
        cluster.connect().await.unwrap();

        let funding = Account::new(AccountId::generate(), 840, 99, None, false);
        let a = Account::new(AccountId::generate(), 840, 1, None, true);
        engine.create_accounts(&[funding.clone(), a.clone()]).await;
        engine
            .create_transfers(&[Transfer::immediate(funding.id, a.id, 4_200, 840, 1)])
            .await;

        (BalanceQuery::new(cluster), funding.id, a.id)
    }

    #[tokio::test]
    async fn single_lookup_derives_balance() {
        let (query, _funding, a) = harness().await;
        let balance = query.get_balance(a).await.unwrap();
        assert_eq!(balance.available, 4_200);
        assert_eq!(balance.pending, 0);
        assert_eq!(balance.total, 4_200);
    }

    #[tokio::test]
    async fn unknown_single_lookup_is_an_error() {
        let (query, _, _) = harness().await;
        let missing = AccountId::generate();
        assert_eq!(
            query.get_balance(missing).await.unwrap_err(),
            LedgerClientError::AccountNotFound(missing)
        );
    }

    #[tokio::test]
    async fn batch_omits_unknown_accounts() {
        let (query, funding, a) = harness().await;
        let balances = query
            .get_balances(&[a, AccountId::generate(), funding])
            .await
            .unwrap();
        assert_eq!(balances.len(), 2);
        assert_eq!(balances[0].account_id, a);
        assert_eq!(balances[1].account_id, funding);
        assert_eq!(balances[1].available, -4_200);
    }
}
