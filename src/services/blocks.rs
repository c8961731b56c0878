use futures::try_join;
use std::sync::Arc;

use crate::models::entities::blocks::Block;
use crate::models::errors::QueryError;
use crate::models::filters::BlockFilter;
use crate::query;
use crate::query::count;
use crate::query::pagination::{MAX_PAGE_SIZE, Page, PagingOptions, build_page};
use crate::storage::ReadStore;

/// Block listings use the range-diff count strategy: block numbers are dense,
/// so the advisory total is max − min + 1 over the matching range.
pub struct BlockService<S> {
    store: Arc<S>,
}

impl<S: ReadStore> BlockService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn find_all(
        &self,
        filter: &BlockFilter,
        paging: &PagingOptions,
    ) -> Result<Page<Block>, QueryError> {
        let paging = paging.normalized(MAX_PAGE_SIZE);
        let plan = query::blocks_plan(filter, &paging);
        let bounds_conditions = query::block_conditions(filter);
        // Separate round trips, no shared snapshot: the count is advisory and
        // never gates the listing.
        let (items, bounds) = try_join!(
            self.store.fetch_blocks(&plan),
            self.store.block_number_bounds(&bounds_conditions)
        )?;
        Ok(build_page(items, &paging, count::range_diff_total(bounds)))
    }

    pub async fn find_one(&self, number: u64) -> Result<Block, QueryError> {
        let plan = query::block_by_number_plan(number);
        self.store
            .fetch_blocks(&plan)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| QueryError::NotFound(format!("block {number}")))
    }
}
