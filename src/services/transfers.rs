use futures::try_join;
use std::sync::Arc;

use crate::models::entities::transfers::Transfer;
use crate::models::errors::QueryError;
use crate::models::filters::TransferFilter;
use crate::query;
use crate::query::count;
use crate::query::pagination::{MAX_PAGE_SIZE, Page, PagingOptions, build_page};
use crate::storage::ReadStore;

pub struct TransferService<S> {
    store: Arc<S>,
}

impl<S: ReadStore> TransferService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn find_all(
        &self,
        filter: &TransferFilter,
        paging: &PagingOptions,
    ) -> Result<Page<Transfer>, QueryError> {
        let paging = paging.normalized(MAX_PAGE_SIZE);
        let plan = query::transfers_plan(filter, &paging)?;
        let query_string = count::canonical_filter_string(&plan.conditions);
        let (items, total) = try_join!(
            self.store.fetch_transfers(&plan),
            self.store.counter(plan.table_name(), &query_string)
        )?;
        Ok(build_page(items, &paging, total.unwrap_or(0)))
    }
}
