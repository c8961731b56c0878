use alloy_primitives::{Address, FixedBytes};
use chrono::{DateTime, Utc};

use crate::models::entities::transfers::{TokenType, TransferType};

/// Logical filter for block listings. Block-number and timestamp ranges are
/// both inclusive.
#[derive(Debug, Clone, Default)]
pub struct BlockFilter {
    pub from_block: Option<u64>,
    pub to_block: Option<u64>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
}

/// Logical filter for transaction listings. An address routes the query to
/// the fan-out index; without one the primary table is scanned by its native
/// columns.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub address: Option<Address>,
    pub block_number: Option<u64>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
}

/// Logical filter for token transfer listings. At least one of `address`
/// (account view, fan-out path) or `token_address` (token view, primary path)
/// is required.
#[derive(Debug, Clone, Default)]
pub struct TransferFilter {
    pub address: Option<Address>,
    pub token_address: Option<Address>,
    pub token_type: Option<TokenType>,
    pub transfer_type: Option<TransferType>,
    /// Fee and refund rows are bookkeeping noise for token listings and are
    /// excluded unless explicitly requested.
    pub include_fee_and_refund: bool,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
}

/// Logical filter for event log listings. At least one of `address` or
/// `transaction_hash` is required.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub address: Option<Address>,
    pub transaction_hash: Option<FixedBytes<32>>,
    pub from_block: Option<u64>,
    pub to_block: Option<u64>,
}

/// Logical filter for internal transaction listings. At least one of the
/// three anchors is required; an unanchored trace scan is rejected.
#[derive(Debug, Clone, Default)]
pub struct InternalTransactionFilter {
    pub address: Option<Address>,
    pub transaction_hash: Option<FixedBytes<32>>,
    pub block_number: Option<u64>,
}
