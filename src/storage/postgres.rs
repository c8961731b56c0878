use alloy_primitives::{Address, Bytes, FixedBytes, U256};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::FromRow;
use std::str::FromStr;
use tracing::{debug, info};

use crate::models::common::{Config, SortDirection};
use crate::models::entities::blocks::Block;
use crate::models::entities::logs::Log;
use crate::models::entities::traces::InternalTransaction;
use crate::models::entities::transactions::{Receipt, Transaction};
use crate::models::entities::transfers::{TokenType, Transfer, TransferType};
use crate::models::errors::QueryError;
use crate::query::plan::{Condition, OrderKey, QueryPlan, SqlValue};
use crate::relevance::BytecodeSource;
use crate::storage::ReadStore;

/// Bind the conditions' values, in declaration order, onto a sqlx query.
macro_rules! bind_values {
    ($query:expr, $conditions:expr) => {{
        let mut query = $query;
        for condition in $conditions {
            query = match &condition.value {
                SqlValue::I64(v) => query.bind(*v),
                SqlValue::Text(v) => query.bind(v.clone()),
                SqlValue::Bool(v) => query.bind(*v),
                SqlValue::Bytes(v) => query.bind(v.clone()),
                SqlValue::Timestamp(v) => query.bind(*v),
            };
        }
        query
    }};
}

/// sqlx-backed implementation of [`ReadStore`] over the tables the ingestion
/// pipeline maintains. Reads go to a randomly picked replica when replicas
/// are configured, otherwise to the primary. Never writes, never retries.
pub struct PgStore {
    primary: PgPool,
    replicas: Vec<PgPool>,
}

impl PgStore {
    pub async fn connect(config: &Config) -> Result<Self, QueryError> {
        let primary = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect(&config.database.url)
            .await?;

        let mut replicas = Vec::with_capacity(config.database.replica_urls.len());
        for url in &config.database.replica_urls {
            replicas.push(
                PgPoolOptions::new()
                    .max_connections(config.database.max_connections)
                    .connect(url)
                    .await?,
            );
        }

        info!(
            "Connected to primary database with {} read replica(s). \
             Advisory counters are tolerated up to {}s stale.",
            replicas.len(),
            config.count_staleness_secs
        );

        Ok(Self { primary, replicas })
    }

    fn reader(&self) -> &PgPool {
        if self.replicas.is_empty() {
            &self.primary
        } else {
            &self.replicas[fastrand::usize(..self.replicas.len())]
        }
    }

    async fn fetch_rows<R>(&self, plan: &QueryPlan) -> Result<Vec<R>, QueryError>
    where
        R: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let sql = plan.to_sql();
        debug!("Listing query: {}", sql);
        let query = bind_values!(sqlx::query_as::<_, R>(&sql), &plan.conditions);
        Ok(query.fetch_all(self.reader()).await?)
    }

    async fn bound(
        &self,
        conditions: &[Condition],
        direction: SortDirection,
    ) -> Result<Option<i64>, QueryError> {
        let plan = QueryPlan {
            table: "blocks",
            select: "number",
            join: None,
            conditions: conditions.to_vec(),
            order: vec![OrderKey { column: "number", direction }],
            limit: 1,
            offset: 0,
        };
        let sql = plan.to_sql();
        let query = bind_values!(sqlx::query_scalar::<_, i64>(&sql), &plan.conditions);
        Ok(query.fetch_optional(self.reader()).await?)
    }
}

#[async_trait]
impl ReadStore for PgStore {
    async fn fetch_blocks(&self, plan: &QueryPlan) -> Result<Vec<Block>, QueryError> {
        self.fetch_rows::<BlockRow>(plan).await?.into_iter().map(Block::try_from).collect()
    }

    async fn fetch_transactions(&self, plan: &QueryPlan) -> Result<Vec<Transaction>, QueryError> {
        self.fetch_rows::<TransactionRow>(plan)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }

    async fn fetch_transfers(&self, plan: &QueryPlan) -> Result<Vec<Transfer>, QueryError> {
        self.fetch_rows::<TransferRow>(plan).await?.into_iter().map(Transfer::try_from).collect()
    }

    async fn fetch_logs(&self, plan: &QueryPlan) -> Result<Vec<Log>, QueryError> {
        self.fetch_rows::<LogRow>(plan).await?.into_iter().map(Log::try_from).collect()
    }

    async fn fetch_internal_transactions(
        &self,
        plan: &QueryPlan,
    ) -> Result<Vec<InternalTransaction>, QueryError> {
        self.fetch_rows::<TraceRow>(plan)
            .await?
            .into_iter()
            .map(InternalTransaction::try_from)
            .collect()
    }

    async fn logs_for_transactions(
        &self,
        hashes: &[FixedBytes<32>],
    ) -> Result<Vec<Log>, QueryError> {
        if hashes.is_empty() {
            return Ok(Vec::new());
        }
        let hashes: Vec<Vec<u8>> = hashes.iter().map(|h| h.as_slice().to_vec()).collect();
        let rows: Vec<LogRow> = sqlx::query_as(
            "SELECT transaction_hash, transaction_index, log_index, block_number, timestamp, \
             address, topics, data \
             FROM logs WHERE transaction_hash = ANY($1) \
             ORDER BY block_number ASC, log_index ASC",
        )
        .bind(hashes)
        .fetch_all(self.reader())
        .await?;
        rows.into_iter().map(Log::try_from).collect()
    }

    async fn block_number_bounds(
        &self,
        conditions: &[Condition],
    ) -> Result<Option<(u64, u64)>, QueryError> {
        let min = self.bound(conditions, SortDirection::Asc).await?;
        let max = self.bound(conditions, SortDirection::Desc).await?;
        match (min, max) {
            (Some(min), Some(max)) => {
                Ok(Some((non_negative(min, "number")?, non_negative(max, "number")?)))
            }
            _ => Ok(None),
        }
    }

    async fn counter(
        &self,
        table_name: &str,
        query_string: &str,
    ) -> Result<Option<u64>, QueryError> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT count FROM counters WHERE table_name = $1 AND query_string = $2 LIMIT 1",
        )
        .bind(table_name)
        .bind(query_string)
        .fetch_optional(self.reader())
        .await?;
        Ok(count.map(|c| c.max(0) as u64))
    }
}

#[async_trait]
impl BytecodeSource for PgStore {
    async fn has_bytecode(&self, address: Address) -> anyhow::Result<bool> {
        let deployed: Option<bool> = sqlx::query_scalar(
            "SELECT bytecode IS NOT NULL AND length(bytecode) > 0 \
             FROM addresses WHERE address = $1",
        )
        .bind(address.as_slice().to_vec())
        .fetch_optional(&self.primary)
        .await?;
        // No row at all means the address was never seen: an account.
        Ok(deployed.unwrap_or(false))
    }
}

///////////////////////////////////// Row types /////////////////////////////////////
// Raw database rows; converted into the alloy-typed entities below. BYTEA
// lands as Vec<u8>, NUMERIC columns are selected with ::text casts.

#[derive(FromRow)]
struct BlockRow {
    number: i64,
    hash: Vec<u8>,
    parent_hash: Vec<u8>,
    timestamp: DateTime<Utc>,
    gas_limit: String,
    gas_used: String,
    transaction_count: i64,
}

#[derive(FromRow)]
struct TransactionRow {
    hash: Vec<u8>,
    block_number: i64,
    block_hash: Vec<u8>,
    transaction_index: i64,
    #[sqlx(rename = "from")]
    from_address: Vec<u8>,
    #[sqlx(rename = "to")]
    to_address: Option<Vec<u8>>,
    nonce: i64,
    value: String,
    gas_limit: String,
    gas_price: String,
    input: Vec<u8>,
    received_at: DateTime<Utc>,
    receipt_status: Option<i64>,
    receipt_gas_used: Option<String>,
    receipt_cumulative_gas_used: Option<String>,
    receipt_contract_address: Option<Vec<u8>>,
}

#[derive(FromRow)]
struct TransferRow {
    number: i64,
    block_number: i64,
    timestamp: DateTime<Utc>,
    transaction_hash: Option<Vec<u8>>,
    log_index: i64,
    #[sqlx(rename = "from")]
    from_address: Vec<u8>,
    #[sqlx(rename = "to")]
    to_address: Vec<u8>,
    token_address: Vec<u8>,
    token_type: String,
    transfer_type: String,
    amount: Option<String>,
    is_fee_or_refund: bool,
}

#[derive(FromRow)]
struct LogRow {
    transaction_hash: Vec<u8>,
    transaction_index: i64,
    log_index: i64,
    block_number: i64,
    timestamp: DateTime<Utc>,
    address: Vec<u8>,
    topics: Vec<Vec<u8>>,
    data: Vec<u8>,
}

#[derive(FromRow)]
struct TraceRow {
    id: i64,
    block_number: i64,
    timestamp: DateTime<Utc>,
    transaction_hash: Vec<u8>,
    trace_index: i64,
    call_type: String,
    #[sqlx(rename = "from")]
    from_address: Vec<u8>,
    #[sqlx(rename = "to")]
    to_address: Option<Vec<u8>>,
    value: String,
    gas: String,
    gas_used: String,
    error: Option<String>,
}

fn decode_err(field: &str, detail: impl std::fmt::Display) -> QueryError {
    QueryError::Decode(format!("{field}: {detail}"))
}

fn non_negative(v: i64, field: &str) -> Result<u64, QueryError> {
    u64::try_from(v).map_err(|_| decode_err(field, format!("negative value {v}")))
}

fn addr20(bytes: &[u8], field: &str) -> Result<Address, QueryError> {
    if bytes.len() != 20 {
        return Err(decode_err(field, format!("expected 20 bytes, got {}", bytes.len())));
    }
    Ok(Address::from_slice(bytes))
}

fn hash32(bytes: &[u8], field: &str) -> Result<FixedBytes<32>, QueryError> {
    if bytes.len() != 32 {
        return Err(decode_err(field, format!("expected 32 bytes, got {}", bytes.len())));
    }
    Ok(FixedBytes::from_slice(bytes))
}

fn u256_dec(s: &str, field: &str) -> Result<U256, QueryError> {
    U256::from_str_radix(s, 10).map_err(|e| decode_err(field, e))
}

impl TryFrom<BlockRow> for Block {
    type Error = QueryError;

    fn try_from(row: BlockRow) -> Result<Self, Self::Error> {
        Ok(Self {
            number: non_negative(row.number, "blocks.number")?,
            hash: hash32(&row.hash, "blocks.hash")?,
            parent_hash: hash32(&row.parent_hash, "blocks.parent_hash")?,
            timestamp: row.timestamp,
            gas_limit: u256_dec(&row.gas_limit, "blocks.gas_limit")?,
            gas_used: u256_dec(&row.gas_used, "blocks.gas_used")?,
            transaction_count: non_negative(row.transaction_count, "blocks.transaction_count")?,
        })
    }
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = QueryError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let hash = hash32(&row.hash, "transactions.hash")?;
        let receipt = match row.receipt_status {
            Some(status) => Some(Receipt {
                transaction_hash: hash,
                status: non_negative(status, "receipts.status")?,
                gas_used: row
                    .receipt_gas_used
                    .as_deref()
                    .map(|s| u256_dec(s, "receipts.gas_used"))
                    .transpose()?
                    .unwrap_or(U256::ZERO),
                cumulative_gas_used: row
                    .receipt_cumulative_gas_used
                    .as_deref()
                    .map(|s| u256_dec(s, "receipts.cumulative_gas_used"))
                    .transpose()?
                    .unwrap_or(U256::ZERO),
                contract_address: row
                    .receipt_contract_address
                    .as_deref()
                    .map(|b| addr20(b, "receipts.contract_address"))
                    .transpose()?,
            }),
            None => None,
        };
        Ok(Self {
            hash,
            block_number: non_negative(row.block_number, "transactions.block_number")?,
            block_hash: hash32(&row.block_hash, "transactions.block_hash")?,
            transaction_index: non_negative(
                row.transaction_index,
                "transactions.transaction_index",
            )?,
            from: addr20(&row.from_address, "transactions.from")?,
            to: row.to_address.as_deref().map(|b| addr20(b, "transactions.to")).transpose()?,
            nonce: non_negative(row.nonce, "transactions.nonce")?,
            value: u256_dec(&row.value, "transactions.value")?,
            gas_limit: u256_dec(&row.gas_limit, "transactions.gas_limit")?,
            gas_price: u256_dec(&row.gas_price, "transactions.gas_price")?,
            input: Bytes::from(row.input),
            received_at: row.received_at,
            receipt,
        })
    }
}

impl TryFrom<TransferRow> for Transfer {
    type Error = QueryError;

    fn try_from(row: TransferRow) -> Result<Self, Self::Error> {
        Ok(Self {
            number: non_negative(row.number, "transfers.number")?,
            block_number: non_negative(row.block_number, "transfers.block_number")?,
            timestamp: row.timestamp,
            transaction_hash: row
                .transaction_hash
                .as_deref()
                .map(|b| hash32(b, "transfers.transaction_hash"))
                .transpose()?,
            log_index: non_negative(row.log_index, "transfers.log_index")?,
            from: addr20(&row.from_address, "transfers.from")?,
            to: addr20(&row.to_address, "transfers.to")?,
            token_address: addr20(&row.token_address, "transfers.token_address")?,
            token_type: TokenType::from_str(&row.token_type)
                .map_err(|e| decode_err("transfers.token_type", e))?,
            transfer_type: TransferType::from_str(&row.transfer_type)
                .map_err(|e| decode_err("transfers.transfer_type", e))?,
            amount: row
                .amount
                .as_deref()
                .map(|s| u256_dec(s, "transfers.amount"))
                .transpose()?,
            is_fee_or_refund: row.is_fee_or_refund,
        })
    }
}

impl TryFrom<LogRow> for Log {
    type Error = QueryError;

    fn try_from(row: LogRow) -> Result<Self, Self::Error> {
        Ok(Self {
            transaction_hash: hash32(&row.transaction_hash, "logs.transaction_hash")?,
            transaction_index: non_negative(row.transaction_index, "logs.transaction_index")?,
            log_index: non_negative(row.log_index, "logs.log_index")?,
            block_number: non_negative(row.block_number, "logs.block_number")?,
            timestamp: row.timestamp,
            address: addr20(&row.address, "logs.address")?,
            topics: row
                .topics
                .iter()
                .map(|t| hash32(t, "logs.topics"))
                .collect::<Result<Vec<_>, _>>()?,
            data: Bytes::from(row.data),
        })
    }
}

impl TryFrom<TraceRow> for InternalTransaction {
    type Error = QueryError;

    fn try_from(row: TraceRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: non_negative(row.id, "traces.id")?,
            block_number: non_negative(row.block_number, "traces.block_number")?,
            timestamp: row.timestamp,
            transaction_hash: hash32(&row.transaction_hash, "traces.transaction_hash")?,
            trace_index: non_negative(row.trace_index, "traces.trace_index")?,
            call_type: row.call_type,
            from: addr20(&row.from_address, "traces.from")?,
            to: row.to_address.as_deref().map(|b| addr20(b, "traces.to")).transpose()?,
            value: u256_dec(&row.value, "traces.value")?,
            gas: u256_dec(&row.gas, "traces.gas")?,
            gas_used: u256_dec(&row.gas_used, "traces.gas_used")?,
            error: row.error,
        })
    }
}
