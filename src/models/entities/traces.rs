use alloy_primitives::{Address, FixedBytes, U256};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// An internal transaction (trace call) as ingested by the external pipeline.
/// Keyed by an auto-sequence id; trace_index is the intra-block ordinal.
#[derive(Debug, Clone, Serialize)]
pub struct InternalTransaction {
    pub id: u64,
    pub block_number: u64,
    pub timestamp: DateTime<Utc>,
    pub transaction_hash: FixedBytes<32>,
    pub trace_index: u64,
    pub call_type: String,
    pub from: Address,
    pub to: Option<Address>,
    pub value: U256,
    pub gas: U256,
    pub gas_used: U256,
    pub error: Option<String>,
}
