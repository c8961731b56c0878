use alloy_primitives::{Address, Bytes, FixedBytes, U256};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Receipt fields projected onto a transaction via a LEFT JOIN. Absent while
/// the ingestion pipeline has written the transaction but not its receipt yet.
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub transaction_hash: FixedBytes<32>,
    pub status: u64,
    pub gas_used: U256,
    pub cumulative_gas_used: U256,
    pub contract_address: Option<Address>,
}

/// A transaction as ingested by the external pipeline. Keyed by hash; the
/// (block_number, transaction_index) pair is the stable sort key.
#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    pub hash: FixedBytes<32>,
    pub block_number: u64,
    pub block_hash: FixedBytes<32>,
    pub transaction_index: u64,
    pub from: Address,
    pub to: Option<Address>,
    pub nonce: u64,
    pub value: U256,
    pub gas_limit: U256,
    pub gas_price: U256,
    pub input: Bytes,
    pub received_at: DateTime<Utc>,
    pub receipt: Option<Receipt>,
}
