//! Dashboard module
//!
//! Provides the net worth summary, the net worth time series and trading
//! totals across all of a user's accounts.

mod aggregation;
mod handlers;

pub use aggregation::{CurrencySummary, NetWorthPoint, NetWorthSeries};
pub use handlers::{
    DashboardState, DashboardSummary, NetWorthQuery, get_dashboard_summary, get_net_worth_series,
};
