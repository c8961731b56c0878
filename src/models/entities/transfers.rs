use alloy_primitives::{Address, FixedBytes, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Eth,
    Erc20,
    Erc721,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eth => "eth",
            Self::Erc20 => "erc20",
            Self::Erc721 => "erc721",
        }
    }
}

impl FromStr for TokenType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eth" => Ok(Self::Eth),
            "erc20" => Ok(Self::Erc20),
            "erc721" => Ok(Self::Erc721),
            other => Err(format!("unknown token type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferType {
    Deposit,
    Mint,
    Transfer,
    Withdrawal,
    Fee,
    Refund,
}

impl TransferType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Mint => "mint",
            Self::Transfer => "transfer",
            Self::Withdrawal => "withdrawal",
            Self::Fee => "fee",
            Self::Refund => "refund",
        }
    }
}

impl FromStr for TransferType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(Self::Deposit),
            "mint" => Ok(Self::Mint),
            "transfer" => Ok(Self::Transfer),
            "withdrawal" => Ok(Self::Withdrawal),
            "fee" => Ok(Self::Fee),
            "refund" => Ok(Self::Refund),
            other => Err(format!("unknown transfer type: {other}")),
        }
    }
}

/// A token transfer as ingested by the external pipeline. Keyed by an
/// auto-sequence number; (timestamp, log_index) is the stable sort key.
#[derive(Debug, Clone, Serialize)]
pub struct Transfer {
    pub number: u64,
    pub block_number: u64,
    pub timestamp: DateTime<Utc>,
    pub transaction_hash: Option<FixedBytes<32>>,
    pub log_index: u64,
    pub from: Address,
    pub to: Address,
    pub token_address: Address,
    pub token_type: TokenType,
    pub transfer_type: TransferType,
    pub amount: Option<U256>,
    /// Denormalized flag so fee/refund rows can be excluded on the indexed
    /// path without string comparisons on transfer_type.
    pub is_fee_or_refund: bool,
}
