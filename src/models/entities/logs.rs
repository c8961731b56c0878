use alloy_primitives::{Address, Bytes, FixedBytes};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// An event log as ingested by the external pipeline. Keyed by
/// (transaction_hash, log_index); log_index is the intra-block ordinal.
#[derive(Debug, Clone, Serialize)]
pub struct Log {
    pub transaction_hash: FixedBytes<32>,
    pub transaction_index: u64,
    pub log_index: u64,
    pub block_number: u64,
    pub timestamp: DateTime<Utc>,
    pub address: Address,
    pub topics: Vec<FixedBytes<32>>,
    pub data: Bytes,
}
