use alloy_primitives::{Address, FixedBytes};
use futures::try_join;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use crate::models::common::CallerContext;
use crate::models::entities::logs::Log;
use crate::models::entities::transactions::Transaction;
use crate::models::errors::QueryError;
use crate::models::filters::TransactionFilter;
use crate::query;
use crate::query::count;
use crate::query::pagination::{MAX_PAGE_SIZE, Page, PagingOptions, build_page};
use crate::storage::ReadStore;
use crate::visibility::{RuleSet, RuleSource, transaction_visible};

pub struct TransactionService<S, R> {
    store: Arc<S>,
    rules: Arc<R>,
}

impl<S: ReadStore, R: RuleSource> TransactionService<S, R> {
    pub fn new(store: Arc<S>, rules: Arc<R>) -> Self {
        Self { store, rules }
    }

    pub async fn find_all(
        &self,
        filter: &TransactionFilter,
        paging: &PagingOptions,
        caller: &CallerContext,
    ) -> Result<Page<Transaction>, QueryError> {
        let paging = paging.normalized(MAX_PAGE_SIZE);
        let plan = query::transactions_plan(filter, &paging);
        let query_string = count::canonical_filter_string(&plan.conditions);
        let (rows, total) = try_join!(
            self.store.fetch_transactions(&plan),
            self.store.counter(plan.table_name(), &query_string)
        )?;
        // item_count reflects what the caller may actually see; total_items
        // stays the advisory estimate over the unfiltered set.
        let visible = self.visible_only(rows, caller).await?;
        Ok(build_page(visible, &paging, total.unwrap_or(0)))
    }

    pub async fn find_one(
        &self,
        hash: FixedBytes<32>,
        caller: &CallerContext,
    ) -> Result<Transaction, QueryError> {
        let plan = query::transaction_by_hash_plan(hash);
        let transaction = self
            .store
            .fetch_transactions(&plan)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| QueryError::NotFound(format!("transaction {hash}")))?;
        // A transaction the caller may not see is indistinguishable from a
        // missing one.
        self.visible_only(vec![transaction], caller)
            .await?
            .pop()
            .ok_or_else(|| QueryError::NotFound(format!("transaction {hash}")))
    }

    /// Whether `caller` may see `transaction`, given the logs the ingestion
    /// pipeline wrote for it. Fetches the permission rules for the logs'
    /// contracts; a rule source failure fails the check.
    pub async fn is_visible(
        &self,
        transaction: &Transaction,
        related_logs: &[Log],
        caller: &CallerContext,
    ) -> Result<bool, QueryError> {
        if *caller == CallerContext::Admin {
            return Ok(true);
        }
        let contracts: HashSet<Address> = related_logs.iter().map(|log| log.address).collect();
        let rule_set = RuleSet::load(self.rules.as_ref(), contracts).await?;
        Ok(transaction_visible(transaction, related_logs, &rule_set, caller))
    }

    async fn visible_only(
        &self,
        rows: Vec<Transaction>,
        caller: &CallerContext,
    ) -> Result<Vec<Transaction>, QueryError> {
        if *caller == CallerContext::Admin || rows.is_empty() {
            return Ok(rows);
        }

        let hashes: Vec<FixedBytes<32>> = rows.iter().map(|t| t.hash).collect();
        let logs = self.store.logs_for_transactions(&hashes).await?;
        let mut logs_by_tx: HashMap<FixedBytes<32>, Vec<Log>> = HashMap::new();
        for log in logs {
            logs_by_tx.entry(log.transaction_hash).or_default().push(log);
        }

        let contracts: HashSet<Address> =
            logs_by_tx.values().flatten().map(|log| log.address).collect();
        let rule_set = RuleSet::load(self.rules.as_ref(), contracts).await?;

        let fetched = rows.len();
        let visible: Vec<Transaction> = rows
            .into_iter()
            .filter(|transaction| {
                let related = logs_by_tx
                    .get(&transaction.hash)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                transaction_visible(transaction, related, &rule_set, caller)
            })
            .collect();
        if visible.len() < fetched {
            debug!("Visibility filter kept {}/{} transactions", visible.len(), fetched);
        }
        Ok(visible)
    }
}
