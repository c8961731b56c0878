use alloy_primitives::{FixedBytes, U256};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A block as ingested by the external pipeline. Immutable once written;
/// keyed by block number.
#[derive(Debug, Clone, Serialize)]
pub struct Block {
    pub number: u64,
    pub hash: FixedBytes<32>,
    pub parent_hash: FixedBytes<32>,
    pub timestamp: DateTime<Utc>,
    pub gas_limit: U256,
    pub gas_used: U256,
    pub transaction_count: u64,
}
