//! Aggregate statistics over a set of trades.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::trade::Trade;

/// Profits and losses smaller than this count as breakeven.
const BREAKEVEN_EPSILON: f64 = 1e-9;

/// Totals for the closed trades of one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentStats {
    /// The traded instrument.
    pub instrument: String,
    /// The number of closed trades.
    pub closed_trades: usize,
    /// The number of closed trades that made money.
    pub wins: usize,
    /// The number of closed trades that lost money.
    pub losses: usize,
    /// The sum of realized profit and loss after fees.
    pub net_pnl: f64,
}

/// Performance statistics for a set of trades.
///
/// Everything except `open_trades` only considers closed trades. Losses are
/// reported as positive magnitudes in `gross_loss`, and as negative values in
/// `average_loss` and `largest_loss`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeStats {
    /// Trades without an exit.
    pub open_trades: usize,
    /// Trades with an exit price and time.
    pub closed_trades: usize,
    /// Closed trades that made money.
    pub wins: usize,
    /// Closed trades that lost money.
    pub losses: usize,
    /// Closed trades that made nothing.
    pub breakeven: usize,
    /// The share of closed trades that were wins, between 0 and 1.
    pub win_rate: Option<f64>,
    /// The sum of all winning trades.
    pub gross_profit: f64,
    /// The sum of all losing trades, as a positive number.
    pub gross_loss: f64,
    /// Gross profit minus gross loss.
    pub net_pnl: f64,
    /// Gross profit divided by gross loss, absent when there are no losses.
    pub profit_factor: Option<f64>,
    /// The mean of the winning trades.
    pub average_win: Option<f64>,
    /// The mean of the losing trades.
    pub average_loss: Option<f64>,
    /// The best trade.
    pub largest_win: Option<f64>,
    /// The worst trade.
    pub largest_loss: Option<f64>,
    /// Fees paid on closed trades.
    pub total_fees: f64,
    /// Totals per instrument, ordered by instrument.
    pub by_instrument: Vec<InstrumentStats>,
}

fn mean(total: f64, count: usize) -> Option<f64> {
    (count > 0).then(|| total / count as f64)
}

/// Summarise the performance of `trades`.
pub fn compute_trade_stats(trades: &[Trade]) -> TradeStats {
    let mut stats = TradeStats {
        open_trades: 0,
        closed_trades: 0,
        wins: 0,
        losses: 0,
        breakeven: 0,
        win_rate: None,
        gross_profit: 0.0,
        gross_loss: 0.0,
        net_pnl: 0.0,
        profit_factor: None,
        average_win: None,
        average_loss: None,
        largest_win: None,
        largest_loss: None,
        total_fees: 0.0,
        by_instrument: Vec::new(),
    };
    let mut by_instrument: BTreeMap<&str, InstrumentStats> = BTreeMap::new();

    for trade in trades {
        let Some(pnl) = trade.realized_pnl() else {
            stats.open_trades += 1;
            continue;
        };

        stats.closed_trades += 1;
        stats.total_fees += trade.fees;

        let instrument = by_instrument
            .entry(trade.instrument.as_str())
            .or_insert_with(|| InstrumentStats {
                instrument: trade.instrument.clone(),
                closed_trades: 0,
                wins: 0,
                losses: 0,
                net_pnl: 0.0,
            });
        instrument.closed_trades += 1;
        instrument.net_pnl += pnl;

        if pnl > BREAKEVEN_EPSILON {
            stats.wins += 1;
            instrument.wins += 1;
            stats.gross_profit += pnl;
            stats.largest_win = Some(stats.largest_win.map_or(pnl, |best| best.max(pnl)));
        } else if pnl < -BREAKEVEN_EPSILON {
            stats.losses += 1;
            instrument.losses += 1;
            stats.gross_loss -= pnl;
            stats.largest_loss = Some(stats.largest_loss.map_or(pnl, |worst| worst.min(pnl)));
        } else {
            stats.breakeven += 1;
        }
    }

    stats.net_pnl = stats.gross_profit - stats.gross_loss;
    stats.win_rate = (stats.closed_trades > 0)
        .then(|| stats.wins as f64 / stats.closed_trades as f64);
    stats.profit_factor =
        (stats.gross_loss > BREAKEVEN_EPSILON).then(|| stats.gross_profit / stats.gross_loss);
    stats.average_win = mean(stats.gross_profit, stats.wins);
    stats.average_loss = mean(-stats.gross_loss, stats.losses);
    stats.by_instrument = by_instrument.into_values().collect();

    stats
}
