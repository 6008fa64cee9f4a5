//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;
/// The ID of a financial account.
pub type AccountId = DatabaseId;
/// The ID of a cash transaction.
pub type TransactionId = DatabaseId;
/// The ID of a trade.
pub type TradeId = DatabaseId;
