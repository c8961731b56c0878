pub mod postgres;

use alloy_primitives::FixedBytes;
use async_trait::async_trait;

use crate::models::entities::blocks::Block;
use crate::models::entities::logs::Log;
use crate::models::entities::traces::InternalTransaction;
use crate::models::entities::transactions::Transaction;
use crate::models::entities::transfers::Transfer;
use crate::models::errors::QueryError;
use crate::query::plan::{Condition, QueryPlan};
use crate::relevance::BytecodeSource;

/// Read access to the tables populated by the external ingestion pipeline.
/// Every method is a single read round trip; a "count + listing" pair is two
/// independent trips with no shared snapshot, so the advisory count and the
/// page are allowed to disagree under concurrent writes.
#[async_trait]
pub trait ReadStore: BytecodeSource + Send + Sync {
    async fn fetch_blocks(&self, plan: &QueryPlan) -> Result<Vec<Block>, QueryError>;

    async fn fetch_transactions(&self, plan: &QueryPlan) -> Result<Vec<Transaction>, QueryError>;

    async fn fetch_transfers(&self, plan: &QueryPlan) -> Result<Vec<Transfer>, QueryError>;

    async fn fetch_logs(&self, plan: &QueryPlan) -> Result<Vec<Log>, QueryError>;

    async fn fetch_internal_transactions(
        &self,
        plan: &QueryPlan,
    ) -> Result<Vec<InternalTransaction>, QueryError>;

    /// All logs written for the given transactions, for visibility evaluation
    /// of a fetched page.
    async fn logs_for_transactions(
        &self,
        hashes: &[FixedBytes<32>],
    ) -> Result<Vec<Log>, QueryError>;

    /// Smallest and largest block number matching `conditions`, via two
    /// index-backed order-and-limit-1 queries. `None` when nothing matches.
    async fn block_number_bounds(
        &self,
        conditions: &[Condition],
    ) -> Result<Option<(u64, u64)>, QueryError>;

    /// Read the externally maintained counter for (table, canonical filter).
    /// `None` on a cache miss.
    async fn counter(
        &self,
        table_name: &str,
        query_string: &str,
    ) -> Result<Option<u64>, QueryError>;
}
