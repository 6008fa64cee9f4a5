//! FX, bond and stock trades, their profit and loss, and the endpoints for managing them.

mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod get_endpoint;
mod state;
mod stats;

pub use core::{
    Direction, NewTrade, Trade, TradeDetails, TradeForm, TradeResponse, check_trade_account,
    close_trade_details, count_trades_for_account, create_trade, create_trade_tables,
    delete_trade, get_owned_trade, get_trade, get_trades_for_account, get_trades_for_user,
    update_trade, validate_trade,
};
pub use create_endpoint::create_trade_endpoint;
pub use delete_endpoint::delete_trade_endpoint;
pub use edit_endpoint::{CloseTradeForm, close_trade_endpoint, edit_trade_endpoint};
pub use get_endpoint::{
    TradeFilter, get_trade_endpoint, get_trade_stats_endpoint, list_trades_endpoint,
};
pub use state::TradeState;
pub use stats::{InstrumentStats, TradeStats, compute_trade_stats};
