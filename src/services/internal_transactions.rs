use futures::try_join;
use std::sync::Arc;

use crate::models::entities::traces::InternalTransaction;
use crate::models::errors::QueryError;
use crate::models::filters::InternalTransactionFilter;
use crate::query;
use crate::query::count;
use crate::query::pagination::{MAX_PAGE_SIZE, Page, PagingOptions, build_page};
use crate::relevance::{AddressKind, classify_address};
use crate::storage::ReadStore;

pub struct InternalTransactionService<S> {
    store: Arc<S>,
}

impl<S: ReadStore> InternalTransactionService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn find_all(
        &self,
        filter: &InternalTransactionFilter,
        paging: &PagingOptions,
    ) -> Result<Page<InternalTransaction>, QueryError> {
        let paging = paging.normalized(MAX_PAGE_SIZE);
        // Address-scoped listings suppress zero-value calls for accounts;
        // the classification fails open to the contract treatment.
        let kind = match filter.address {
            Some(address) => classify_address(&*self.store, address).await,
            None => AddressKind::Contract,
        };
        let plan = query::internal_transactions_plan(filter, &paging, kind)?;
        let query_string = count::canonical_filter_string(&plan.conditions);
        let (items, total) = try_join!(
            self.store.fetch_internal_transactions(&plan),
            self.store.counter(plan.table_name(), &query_string)
        )?;
        Ok(build_page(items, &paging, total.unwrap_or(0)))
    }
}
