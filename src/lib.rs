//! Read path of a blockchain-explorer indexing service.
//!
//! Answers address-, token-, and time-scoped listing queries over the
//! append-only tables an external ingestion pipeline maintains (blocks,
//! transactions, receipts, logs, token transfers, internal transactions),
//! with stable pagination, approximate totals, and per-deployment visibility
//! rules over transactions and event logs. Strictly read-only; routing,
//! validation, and wire projection belong to the embedding application.

pub mod models;
pub mod query;
pub mod relevance;
pub mod services;
pub mod storage;
pub mod utils;
pub mod visibility;
