pub mod blocks;
pub mod internal_transactions;
pub mod logs;
pub mod transactions;
pub mod transfers;

pub use blocks::BlockService;
pub use internal_transactions::InternalTransactionService;
pub use logs::LogService;
pub use transactions::TransactionService;
pub use transfers::TransferService;
