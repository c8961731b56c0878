//! Query composition: turns a logical filter plus paging into a [`QueryPlan`].
//!
//! Table-path selection is a pure function of the filter shape, decided here
//! and nowhere else: an address in the filter routes the query to the fan-out
//! index for that entity (one row per (address, record), with the sort and
//! filter keys denormalized), anything else queries the primary table by its
//! native columns.
//!
//! Tie-break directions are endpoint-specific and deliberately not unified:
//! transactions tie-break follows the requested direction, transfers and
//! internal transactions always tie-break ascending on their ordinal, and the
//! log listing is a fixed ascending endpoint.

pub mod count;
pub mod pagination;
pub mod plan;

use crate::models::common::SortDirection;
use crate::models::errors::QueryError;
use crate::models::filters::{
    BlockFilter, InternalTransactionFilter, LogFilter, TransactionFilter, TransferFilter,
};
use crate::query::pagination::{MAX_PAGE_SIZE, PagingOptions};
use crate::query::plan::{Condition, OrderKey, QueryPlan};
use crate::relevance::AddressKind;

use alloy_primitives::FixedBytes;

/// Which table a listing resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TablePath {
    Primary,
    FanOut,
}

const BLOCK_SELECT: &str = "number, hash, parent_hash, timestamp, \
     gas_limit::text AS gas_limit, gas_used::text AS gas_used, transaction_count";

const TX_SELECT: &str = "t.hash, t.block_number, t.block_hash, t.transaction_index, \
     t.\"from\", t.\"to\", t.nonce, t.value::text AS value, \
     t.gas_limit::text AS gas_limit, t.gas_price::text AS gas_price, t.input, t.received_at, \
     r.status AS receipt_status, r.gas_used::text AS receipt_gas_used, \
     r.cumulative_gas_used::text AS receipt_cumulative_gas_used, \
     r.contract_address AS receipt_contract_address";

const TX_RECEIPT_JOIN: &str = "LEFT JOIN receipts r ON r.transaction_hash = t.hash";

const TX_FANOUT_JOIN: &str = "JOIN transactions t ON t.hash = a.transaction_hash \
     LEFT JOIN receipts r ON r.transaction_hash = t.hash";

const TRANSFER_SELECT: &str = "t.number, t.block_number, t.timestamp, t.transaction_hash, \
     t.log_index, t.\"from\", t.\"to\", t.token_address, t.token_type, t.transfer_type, \
     t.amount::text AS amount, t.is_fee_or_refund";

const TRANSFER_FANOUT_JOIN: &str = "JOIN transfers t ON t.number = a.transfer_number";

const LOG_SELECT: &str =
    "transaction_hash, transaction_index, log_index, block_number, timestamp, \
     address, topics, data";

const TRACE_SELECT: &str = "t.id, t.block_number, t.timestamp, t.transaction_hash, \
     t.trace_index, t.call_type, t.\"from\", t.\"to\", t.value::text AS value, \
     t.gas::text AS gas, t.gas_used::text AS gas_used, t.error";

const TRACE_FANOUT_JOIN: &str = "JOIN traces t ON t.id = a.trace_id";

pub fn transaction_table_path(filter: &TransactionFilter) -> TablePath {
    if filter.address.is_some() { TablePath::FanOut } else { TablePath::Primary }
}

pub fn transfer_table_path(filter: &TransferFilter) -> Result<TablePath, QueryError> {
    if filter.address.is_some() {
        Ok(TablePath::FanOut)
    } else if filter.token_address.is_some() {
        Ok(TablePath::Primary)
    } else {
        Err(QueryError::MissingRequiredIdentifier("address or token address"))
    }
}

pub fn internal_transaction_table_path(
    filter: &InternalTransactionFilter,
) -> Result<TablePath, QueryError> {
    if filter.address.is_some() {
        Ok(TablePath::FanOut)
    } else if filter.transaction_hash.is_some() || filter.block_number.is_some() {
        Ok(TablePath::Primary)
    } else {
        Err(QueryError::MissingRequiredIdentifier("address, transaction hash, or block number"))
    }
}

/// Conditions for a block listing, shared by the listing plan and the
/// range-diff bound queries.
pub fn block_conditions(filter: &BlockFilter) -> Vec<Condition> {
    let mut conditions = Vec::new();
    if let Some(from) = filter.from_block {
        conditions.push(Condition::gte("number", from));
    }
    if let Some(to) = filter.to_block {
        conditions.push(Condition::lte("number", to));
    }
    if let Some(from) = filter.from_date {
        conditions.push(Condition::gte("timestamp", from));
    }
    if let Some(to) = filter.to_date {
        conditions.push(Condition::lte("timestamp", to));
    }
    conditions
}

pub fn blocks_plan(filter: &BlockFilter, paging: &PagingOptions) -> QueryPlan {
    let paging = paging.normalized(MAX_PAGE_SIZE);
    QueryPlan {
        table: "blocks",
        select: BLOCK_SELECT,
        join: None,
        conditions: block_conditions(filter),
        order: vec![OrderKey { column: "number", direction: paging.direction }],
        limit: paging.page_size,
        offset: paging.offset(),
    }
}

pub fn block_by_number_plan(number: u64) -> QueryPlan {
    QueryPlan {
        table: "blocks",
        select: BLOCK_SELECT,
        join: None,
        conditions: vec![Condition::eq("number", number)],
        order: vec![],
        limit: 1,
        offset: 0,
    }
}

pub fn transactions_plan(filter: &TransactionFilter, paging: &PagingOptions) -> QueryPlan {
    let paging = paging.normalized(MAX_PAGE_SIZE);
    match transaction_table_path(filter) {
        TablePath::FanOut => {
            let mut conditions = Vec::new();
            if let Some(address) = filter.address {
                conditions.push(Condition::eq("a.address", address));
            }
            if let Some(number) = filter.block_number {
                conditions.push(Condition::eq("a.block_number", number));
            }
            if let Some(from) = filter.from_date {
                conditions.push(Condition::gte("a.received_at", from));
            }
            if let Some(to) = filter.to_date {
                conditions.push(Condition::lte("a.received_at", to));
            }
            QueryPlan {
                table: "address_transactions a",
                select: TX_SELECT,
                join: Some(TX_FANOUT_JOIN),
                conditions,
                order: vec![
                    OrderKey { column: "a.block_number", direction: paging.direction },
                    OrderKey { column: "a.transaction_index", direction: paging.direction },
                ],
                limit: paging.page_size,
                offset: paging.offset(),
            }
        }
        TablePath::Primary => {
            let mut conditions = Vec::new();
            if let Some(number) = filter.block_number {
                conditions.push(Condition::eq("t.block_number", number));
            }
            if let Some(from) = filter.from_date {
                conditions.push(Condition::gte("t.received_at", from));
            }
            if let Some(to) = filter.to_date {
                conditions.push(Condition::lte("t.received_at", to));
            }
            QueryPlan {
                table: "transactions t",
                select: TX_SELECT,
                join: Some(TX_RECEIPT_JOIN),
                conditions,
                order: vec![
                    OrderKey { column: "t.block_number", direction: paging.direction },
                    OrderKey { column: "t.transaction_index", direction: paging.direction },
                ],
                limit: paging.page_size,
                offset: paging.offset(),
            }
        }
    }
}

pub fn transaction_by_hash_plan(hash: FixedBytes<32>) -> QueryPlan {
    QueryPlan {
        table: "transactions t",
        select: TX_SELECT,
        join: Some(TX_RECEIPT_JOIN),
        conditions: vec![Condition::eq("t.hash", hash)],
        order: vec![],
        limit: 1,
        offset: 0,
    }
}

pub fn transfers_plan(
    filter: &TransferFilter,
    paging: &PagingOptions,
) -> Result<QueryPlan, QueryError> {
    let paging = paging.normalized(MAX_PAGE_SIZE);
    let path = transfer_table_path(filter)?;
    // Column prefix differs per path; the predicates are otherwise the same
    // because the fan-out rows denormalize every filter key.
    let (table, join, prefix) = match path {
        TablePath::FanOut => ("address_transfers a", Some(TRANSFER_FANOUT_JOIN), Prefix::FanOut),
        TablePath::Primary => ("transfers t", None, Prefix::Primary),
    };
    let mut conditions = Vec::new();
    if let Some(address) = filter.address {
        conditions.push(Condition::eq("a.address", address));
    }
    if let Some(token) = filter.token_address {
        conditions.push(Condition::eq(prefix.col("token_address"), token));
    }
    if let Some(token_type) = filter.token_type {
        conditions.push(Condition::eq(prefix.col("token_type"), token_type.as_str()));
    }
    if let Some(transfer_type) = filter.transfer_type {
        conditions.push(Condition::eq(prefix.col("transfer_type"), transfer_type.as_str()));
    } else if !filter.include_fee_and_refund {
        conditions.push(Condition::eq(prefix.col("is_fee_or_refund"), false));
    }
    if let Some(from) = filter.from_date {
        conditions.push(Condition::gte(prefix.col("timestamp"), from));
    }
    if let Some(to) = filter.to_date {
        conditions.push(Condition::lte(prefix.col("timestamp"), to));
    }
    Ok(QueryPlan {
        table,
        select: TRANSFER_SELECT,
        join,
        conditions,
        order: vec![
            OrderKey { column: prefix.col("timestamp"), direction: paging.direction },
            // Ordinal tie-break for this endpoint is always ascending.
            OrderKey { column: prefix.col("log_index"), direction: SortDirection::Asc },
        ],
        limit: paging.page_size,
        offset: paging.offset(),
    })
}

pub fn logs_plan(filter: &LogFilter, paging: &PagingOptions) -> Result<QueryPlan, QueryError> {
    if filter.address.is_none() && filter.transaction_hash.is_none() {
        return Err(QueryError::MissingRequiredIdentifier("address or transaction hash"));
    }
    let paging = paging.normalized(MAX_PAGE_SIZE);
    let mut conditions = Vec::new();
    if let Some(address) = filter.address {
        conditions.push(Condition::eq("address", address));
    }
    if let Some(hash) = filter.transaction_hash {
        conditions.push(Condition::eq("transaction_hash", hash));
    }
    if let Some(from) = filter.from_block {
        conditions.push(Condition::gte("block_number", from));
    }
    if let Some(to) = filter.to_block {
        conditions.push(Condition::lte("block_number", to));
    }
    Ok(QueryPlan {
        table: "logs",
        select: LOG_SELECT,
        join: None,
        conditions,
        // Fixed ascending endpoint; the requested direction does not apply.
        order: vec![
            OrderKey { column: "timestamp", direction: SortDirection::Asc },
            OrderKey { column: "log_index", direction: SortDirection::Asc },
        ],
        limit: paging.page_size,
        offset: paging.offset(),
    })
}

pub fn internal_transactions_plan(
    filter: &InternalTransactionFilter,
    paging: &PagingOptions,
    address_kind: AddressKind,
) -> Result<QueryPlan, QueryError> {
    let paging = paging.normalized(MAX_PAGE_SIZE);
    let path = internal_transaction_table_path(filter)?;
    let (table, join, prefix) = match path {
        TablePath::FanOut => ("address_traces a", Some(TRACE_FANOUT_JOIN), Prefix::FanOut),
        TablePath::Primary => ("traces t", None, Prefix::Primary),
    };
    let mut conditions = Vec::new();
    if let Some(address) = filter.address {
        conditions.push(Condition::eq("a.address", address));
        // Externally-owned accounts are not shown zero-value calls; contracts
        // (and lookup failures, which fail open) see everything.
        if address_kind == AddressKind::Account {
            conditions.push(Condition::gt("a.value", 0u64));
        }
    }
    if let Some(hash) = filter.transaction_hash {
        conditions.push(Condition::eq(prefix.col("transaction_hash"), hash));
    }
    if let Some(number) = filter.block_number {
        conditions.push(Condition::eq(prefix.col("block_number"), number));
    }
    Ok(QueryPlan {
        table,
        select: TRACE_SELECT,
        join,
        conditions,
        order: vec![
            OrderKey { column: prefix.col("block_number"), direction: paging.direction },
            OrderKey { column: prefix.col("trace_index"), direction: SortDirection::Asc },
        ],
        limit: paging.page_size,
        offset: paging.offset(),
    })
}

/// Column alias prefix for the two table paths.
#[derive(Clone, Copy)]
enum Prefix {
    Primary,
    FanOut,
}

impl Prefix {
    fn col(&self, name: &'static str) -> &'static str {
        match (self, name) {
            (Self::Primary, "token_address") => "t.token_address",
            (Self::Primary, "token_type") => "t.token_type",
            (Self::Primary, "transfer_type") => "t.transfer_type",
            (Self::Primary, "is_fee_or_refund") => "t.is_fee_or_refund",
            (Self::Primary, "timestamp") => "t.timestamp",
            (Self::Primary, "log_index") => "t.log_index",
            (Self::Primary, "transaction_hash") => "t.transaction_hash",
            (Self::Primary, "block_number") => "t.block_number",
            (Self::Primary, "trace_index") => "t.trace_index",
            (Self::FanOut, "token_address") => "a.token_address",
            (Self::FanOut, "token_type") => "a.token_type",
            (Self::FanOut, "transfer_type") => "a.transfer_type",
            (Self::FanOut, "is_fee_or_refund") => "a.is_fee_or_refund",
            (Self::FanOut, "timestamp") => "a.timestamp",
            (Self::FanOut, "log_index") => "a.log_index",
            (Self::FanOut, "transaction_hash") => "a.transaction_hash",
            (Self::FanOut, "block_number") => "a.block_number",
            (Self::FanOut, "trace_index") => "a.trace_index",
            _ => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::plan::{Op, SqlValue};
    use alloy_primitives::{address, b256};

    fn paging(page: u64, size: u64, direction: SortDirection) -> PagingOptions {
        PagingOptions { page, page_size: size, direction }
    }

    #[test]
    fn address_filter_selects_fan_out_path() {
        let with_address = TransactionFilter {
            address: Some(address!("52908400098527886E0F7030069857D2E4169EE7")),
            ..Default::default()
        };
        assert_eq!(transaction_table_path(&with_address), TablePath::FanOut);
        assert_eq!(transaction_table_path(&TransactionFilter::default()), TablePath::Primary);

        let plan = transactions_plan(&with_address, &PagingOptions::default());
        assert_eq!(plan.table_name(), "address_transactions");
        assert_eq!(plan.conditions[0].column, "a.address");
    }

    #[test]
    fn transfer_listing_requires_an_identifier() {
        let err = transfers_plan(&TransferFilter::default(), &PagingOptions::default())
            .expect_err("no identifier should be rejected");
        assert!(matches!(err, QueryError::MissingRequiredIdentifier(_)));
        assert!(err.is_client_error());
    }

    #[test]
    fn token_listing_without_address_uses_primary_table() {
        let filter = TransferFilter {
            token_address: Some(address!("52908400098527886E0F7030069857D2E4169EE7")),
            ..Default::default()
        };
        let plan = transfers_plan(&filter, &PagingOptions::default()).unwrap();
        assert_eq!(plan.table_name(), "transfers");
        assert!(plan.join.is_none());
        assert_eq!(plan.conditions[0].column, "t.token_address");
    }

    #[test]
    fn fee_rows_excluded_by_default() {
        let filter = TransferFilter {
            address: Some(address!("52908400098527886E0F7030069857D2E4169EE7")),
            ..Default::default()
        };
        let plan = transfers_plan(&filter, &PagingOptions::default()).unwrap();
        assert!(
            plan.conditions
                .iter()
                .any(|c| c.column == "a.is_fee_or_refund" && c.value == SqlValue::Bool(false))
        );

        let included = TransferFilter { include_fee_and_refund: true, ..filter };
        let plan = transfers_plan(&included, &PagingOptions::default()).unwrap();
        assert!(!plan.conditions.iter().any(|c| c.column == "a.is_fee_or_refund"));
    }

    #[test]
    fn transfer_tie_break_is_always_ascending() {
        let filter = TransferFilter {
            address: Some(address!("52908400098527886E0F7030069857D2E4169EE7")),
            ..Default::default()
        };
        let plan = transfers_plan(&filter, &paging(1, 10, SortDirection::Desc)).unwrap();
        assert_eq!(plan.order[0].direction, SortDirection::Desc);
        assert_eq!(plan.order[1].column, "a.log_index");
        assert_eq!(plan.order[1].direction, SortDirection::Asc);
    }

    #[test]
    fn transaction_tie_break_follows_requested_direction() {
        let plan = transactions_plan(&TransactionFilter::default(), &paging(1, 10, SortDirection::Asc));
        assert_eq!(plan.order[1].column, "t.transaction_index");
        assert_eq!(plan.order[1].direction, SortDirection::Asc);

        let plan =
            transactions_plan(&TransactionFilter::default(), &paging(1, 10, SortDirection::Desc));
        assert_eq!(plan.order[1].direction, SortDirection::Desc);
    }

    #[test]
    fn log_listing_is_a_fixed_ascending_endpoint() {
        let filter = LogFilter {
            address: Some(address!("52908400098527886E0F7030069857D2E4169EE7")),
            ..Default::default()
        };
        let plan = logs_plan(&filter, &paging(1, 10, SortDirection::Desc)).unwrap();
        assert!(plan.order.iter().all(|k| k.direction == SortDirection::Asc));
    }

    #[test]
    fn log_listing_requires_address_or_transaction_hash() {
        let err = logs_plan(&LogFilter::default(), &PagingOptions::default()).unwrap_err();
        assert!(matches!(err, QueryError::MissingRequiredIdentifier(_)));
    }

    #[test]
    fn paging_is_clamped_and_offset_applied() {
        let plan = blocks_plan(&BlockFilter::default(), &paging(3, 1_000_000, SortDirection::Desc));
        assert_eq!(plan.limit, MAX_PAGE_SIZE);
        assert_eq!(plan.offset, 2 * MAX_PAGE_SIZE);
    }

    #[test]
    fn account_internal_transactions_get_value_predicate() {
        let filter = InternalTransactionFilter {
            address: Some(address!("52908400098527886E0F7030069857D2E4169EE7")),
            ..Default::default()
        };
        let plan =
            internal_transactions_plan(&filter, &PagingOptions::default(), AddressKind::Account)
                .unwrap();
        assert!(plan.conditions.iter().any(|c| c.column == "a.value" && c.op == Op::Gt));

        let plan =
            internal_transactions_plan(&filter, &PagingOptions::default(), AddressKind::Contract)
                .unwrap();
        assert!(!plan.conditions.iter().any(|c| c.column == "a.value"));
    }

    #[test]
    fn internal_transactions_by_hash_use_primary_table() {
        let filter = InternalTransactionFilter {
            transaction_hash: Some(b256!(
                "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"
            )),
            ..Default::default()
        };
        let plan =
            internal_transactions_plan(&filter, &PagingOptions::default(), AddressKind::Contract)
                .unwrap();
        assert_eq!(plan.table_name(), "traces");

        let err = internal_transactions_plan(
            &InternalTransactionFilter::default(),
            &PagingOptions::default(),
            AddressKind::Contract,
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::MissingRequiredIdentifier(_)));
    }
}
