use alloy_primitives::Address;
use futures::try_join;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::models::common::CallerContext;
use crate::models::entities::logs::Log;
use crate::models::errors::QueryError;
use crate::models::filters::LogFilter;
use crate::query;
use crate::query::count;
use crate::query::pagination::{MAX_PAGE_SIZE, Page, PagingOptions, build_page};
use crate::storage::ReadStore;
use crate::visibility::{RuleSet, RuleSource, log_visible};

pub struct LogService<S, R> {
    store: Arc<S>,
    rules: Arc<R>,
}

impl<S: ReadStore, R: RuleSource> LogService<S, R> {
    pub fn new(store: Arc<S>, rules: Arc<R>) -> Self {
        Self { store, rules }
    }

    pub async fn find_all(
        &self,
        filter: &LogFilter,
        paging: &PagingOptions,
        caller: &CallerContext,
    ) -> Result<Page<Log>, QueryError> {
        let paging = paging.normalized(MAX_PAGE_SIZE);
        let plan = query::logs_plan(filter, &paging)?;
        let query_string = count::canonical_filter_string(&plan.conditions);
        let (rows, total) = try_join!(
            self.store.fetch_logs(&plan),
            self.store.counter(plan.table_name(), &query_string)
        )?;

        let visible = if *caller == CallerContext::Admin {
            rows
        } else {
            let contracts: HashSet<Address> = rows.iter().map(|log| log.address).collect();
            let rule_set = RuleSet::load(self.rules.as_ref(), contracts).await?;
            let fetched = rows.len();
            let visible: Vec<Log> = rows
                .into_iter()
                .filter(|log| log_visible(log, rule_set.for_contract(&log.address), caller))
                .collect();
            if visible.len() < fetched {
                debug!("Visibility filter kept {}/{} logs", visible.len(), fetched);
            }
            visible
        };
        Ok(build_page(visible, &paging, total.unwrap_or(0)))
    }
}
