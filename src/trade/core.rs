//! Defines the core data models and database queries for trades.
//!
//! A trade lives in the `trade` table and has exactly one detail row in
//! `trade_fx`, `trade_bond` or `trade_stock`, depending on its type.

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset};

use crate::{
    Error,
    account::{Account, get_owned_account},
    auth::UserID,
    database_id::{AccountId, TradeId},
};

// ============================================================================
// MODELS
// ============================================================================

/// Whether a trade profits from the price going up or down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// Bought first, profits when the price rises.
    Long,
    /// Sold first, profits when the price falls.
    Short,
}

impl Direction {
    fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
        }
    }

    /// +1 for long trades and -1 for short trades.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

impl ToSql for Direction {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for Direction {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "LONG" => Ok(Direction::Long),
            "SHORT" => Ok(Direction::Short),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

/// The instrument specific part of a trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeDetails {
    /// A currency pair or commodity.
    Fx {
        /// The price the position was opened at.
        entry_price: f64,
        /// The price the position was closed at.
        #[serde(default)]
        exit_price: Option<f64>,
        /// The position size in lots.
        lot_size: f64,
        /// The price change of one pip, e.g. 0.0001.
        pip_size: f64,
        /// The value of one pip for one lot, in the account currency.
        pip_value: f64,
    },
    /// A bond, priced per 100 of face value.
    Bond {
        /// The clean price the bond was bought at, per 100 of face value.
        entry_price: f64,
        /// The clean price the bond was sold at, per 100 of face value.
        #[serde(default)]
        exit_price: Option<f64>,
        /// The total face value held.
        face_value: f64,
        /// Coupons received while holding the bond.
        #[serde(default)]
        coupon_income: f64,
    },
    /// Shares in a company or fund.
    Stock {
        /// The price per share the position was opened at.
        entry_price: f64,
        /// The price per share the position was closed at.
        #[serde(default)]
        exit_price: Option<f64>,
        /// The number of shares.
        quantity: f64,
    },
}

impl TradeDetails {
    fn type_str(&self) -> &'static str {
        match self {
            TradeDetails::Fx { .. } => "FX",
            TradeDetails::Bond { .. } => "BOND",
            TradeDetails::Stock { .. } => "STOCK",
        }
    }

    /// The price the position was opened at.
    pub fn entry_price(&self) -> f64 {
        match self {
            TradeDetails::Fx { entry_price, .. }
            | TradeDetails::Bond { entry_price, .. }
            | TradeDetails::Stock { entry_price, .. } => *entry_price,
        }
    }

    /// The price the position was closed at, if it has been closed.
    pub fn exit_price(&self) -> Option<f64> {
        match self {
            TradeDetails::Fx { exit_price, .. }
            | TradeDetails::Bond { exit_price, .. }
            | TradeDetails::Stock { exit_price, .. } => *exit_price,
        }
    }

    fn set_exit_price(&mut self, price: f64) {
        match self {
            TradeDetails::Fx { exit_price, .. }
            | TradeDetails::Bond { exit_price, .. }
            | TradeDetails::Stock { exit_price, .. } => *exit_price = Some(price),
        }
    }

    /// The profit or loss before fees of moving from `entry_price` to `exit`.
    fn gross_pnl(&self, direction: Direction, exit: f64) -> f64 {
        let sign = direction.sign();

        match *self {
            TradeDetails::Fx {
                entry_price,
                lot_size,
                pip_size,
                pip_value,
                ..
            } => sign * (exit - entry_price) / pip_size * pip_value * lot_size,
            TradeDetails::Bond {
                entry_price,
                face_value,
                coupon_income,
                ..
            } => sign * (exit - entry_price) / 100.0 * face_value + coupon_income,
            TradeDetails::Stock {
                entry_price,
                quantity,
                ..
            } => sign * (exit - entry_price) * quantity,
        }
    }
}

/// A position in an instrument, booked against one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// The ID of the trade.
    pub id: TradeId,
    /// The account the trade is booked against.
    pub account_id: AccountId,
    /// The traded instrument, e.g. "EURUSD" or "AAPL".
    pub instrument: String,
    /// Long or short.
    pub direction: Direction,
    /// Commissions and other costs, in the account currency.
    pub fees: f64,
    /// When the position was opened.
    #[serde(with = "time::serde::rfc3339")]
    pub entry_at: OffsetDateTime,
    /// When the position was closed.
    #[serde(with = "time::serde::rfc3339::option")]
    pub exit_at: Option<OffsetDateTime>,
    /// Free text notes.
    pub notes: Option<String>,
    /// The instrument specific fields, including the `type` tag.
    #[serde(flatten)]
    pub details: TradeDetails,
}

impl Trade {
    /// Whether the trade has both an exit price and an exit time.
    pub fn is_closed(&self) -> bool {
        self.exit_at.is_some() && self.details.exit_price().is_some()
    }

    /// The profit or loss after fees, or `None` while the trade is open.
    pub fn realized_pnl(&self) -> Option<f64> {
        self.exit_at?;
        let exit = self.details.exit_price()?;

        Some(self.details.gross_pnl(self.direction, exit) - self.fees)
    }
}

/// A trade together with its realized profit or loss, as sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeResponse {
    /// The trade.
    #[serde(flatten)]
    pub trade: Trade,
    /// The profit or loss after fees, absent while the trade is open.
    pub realized_pnl: Option<f64>,
}

impl From<Trade> for TradeResponse {
    fn from(trade: Trade) -> Self {
        Self {
            realized_pnl: trade.realized_pnl(),
            trade,
        }
    }
}

/// The request body for creating or replacing a trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeForm {
    /// The account to book the trade against.
    pub account_id: AccountId,
    /// The traded instrument.
    pub instrument: String,
    /// Long or short.
    pub direction: Direction,
    /// Commissions and other costs.
    #[serde(default)]
    pub fees: f64,
    /// When the position was opened. Defaults to now.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub entry_at: Option<OffsetDateTime>,
    /// When the position was closed.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub exit_at: Option<OffsetDateTime>,
    /// Free text notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// The instrument specific fields, including the `type` tag.
    #[serde(flatten)]
    pub details: TradeDetails,
}

/// A trade that has passed validation and is ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrade {
    /// The account to book the trade against.
    pub account_id: AccountId,
    /// The traded instrument, trimmed and upper cased.
    pub instrument: String,
    /// Long or short.
    pub direction: Direction,
    /// Commissions and other costs.
    pub fees: f64,
    /// When the position was opened.
    pub entry_at: OffsetDateTime,
    /// When the position was closed.
    pub exit_at: Option<OffsetDateTime>,
    /// Free text notes.
    pub notes: Option<String>,
    /// The instrument specific fields.
    pub details: TradeDetails,
}

// ============================================================================
// VALIDATION
// ============================================================================

fn require_positive(name: &str, value: f64) -> Result<(), Error> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::Validation(format!("{name} must be a positive number")))
    }
}

fn require_non_negative(name: &str, value: f64) -> Result<(), Error> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::Validation(format!("{name} cannot be negative")))
    }
}

fn validate_details(details: &TradeDetails) -> Result<(), Error> {
    require_positive("entry_price", details.entry_price())?;

    if let Some(exit_price) = details.exit_price() {
        require_positive("exit_price", exit_price)?;
    }

    match *details {
        TradeDetails::Fx {
            lot_size,
            pip_size,
            pip_value,
            ..
        } => {
            require_positive("lot_size", lot_size)?;
            require_positive("pip_size", pip_size)?;
            require_positive("pip_value", pip_value)
        }
        TradeDetails::Bond {
            face_value,
            coupon_income,
            ..
        } => {
            require_positive("face_value", face_value)?;
            require_non_negative("coupon_income", coupon_income)
        }
        TradeDetails::Stock { quantity, .. } => require_positive("quantity", quantity),
    }
}

fn validate_exit(
    entry_at: OffsetDateTime,
    exit_at: Option<OffsetDateTime>,
    exit_price: Option<f64>,
    now: OffsetDateTime,
) -> Result<(), Error> {
    match (exit_at, exit_price) {
        (None, None) => Ok(()),
        (Some(exit_at), Some(_)) => {
            if exit_at > now {
                Err(Error::FutureDate(exit_at))
            } else if exit_at < entry_at {
                Err(Error::Validation(
                    "exit_at cannot be earlier than entry_at".to_owned(),
                ))
            } else {
                Ok(())
            }
        }
        _ => Err(Error::Validation(
            "a closed trade needs both exit_price and exit_at".to_owned(),
        )),
    }
}

/// Check the prices, sizes, fees and timestamps of a trade.
///
/// # Errors
/// Returns a:
/// - [Error::Validation] if a number is out of range, the instrument is blank,
///   only one of exit price and exit time is given, or the trade exits before it enters,
/// - [Error::FutureDate] if the trade enters or exits after `now`.
pub fn validate_trade(form: TradeForm, now: OffsetDateTime) -> Result<NewTrade, Error> {
    let instrument = form.instrument.trim().to_uppercase();
    if instrument.is_empty() {
        return Err(Error::Validation("instrument cannot be empty".to_owned()));
    }

    require_non_negative("fees", form.fees)?;
    validate_details(&form.details)?;

    let entry_at = form.entry_at.unwrap_or(now).to_offset(UtcOffset::UTC);
    if entry_at > now {
        return Err(Error::FutureDate(entry_at));
    }

    let exit_at = form.exit_at.map(|exit_at| exit_at.to_offset(UtcOffset::UTC));
    validate_exit(entry_at, exit_at, form.details.exit_price(), now)?;

    let notes = form
        .notes
        .map(|notes| notes.trim().to_owned())
        .filter(|notes| !notes.is_empty());

    Ok(NewTrade {
        account_id: form.account_id,
        instrument,
        direction: form.direction,
        fees: form.fees,
        entry_at,
        exit_at,
        notes,
        details: form.details,
    })
}

/// Close an open trade at `exit_price`, returning the closed trade ready to be stored.
///
/// # Errors
/// Returns a [Error::Validation] if the trade is already closed or the exit is
/// invalid, or [Error::FutureDate] if `exit_at` is after `now`.
pub fn close_trade_details(
    trade: &Trade,
    exit_price: f64,
    exit_at: Option<OffsetDateTime>,
    now: OffsetDateTime,
) -> Result<NewTrade, Error> {
    if trade.is_closed() {
        return Err(Error::Validation(format!(
            "trade {} is already closed",
            trade.id
        )));
    }

    require_positive("exit_price", exit_price)?;
    let exit_at = exit_at.unwrap_or(now).to_offset(UtcOffset::UTC);
    validate_exit(trade.entry_at, Some(exit_at), Some(exit_price), now)?;

    let mut details = trade.details.clone();
    details.set_exit_price(exit_price);

    Ok(NewTrade {
        account_id: trade.account_id,
        instrument: trade.instrument.clone(),
        direction: trade.direction,
        fees: trade.fees,
        entry_at: trade.entry_at,
        exit_at: Some(exit_at),
        notes: trade.notes.clone(),
        details,
    })
}

/// Check the user owns the account a trade is booked against.
///
/// # Errors
/// Returns [Error::NotFound] or [Error::Forbidden] if the account is missing or
/// belongs to someone else.
pub fn get_trade_account(
    trade: &Trade,
    user_id: UserID,
    connection: &Connection,
) -> Result<Account, Error> {
    get_owned_account(trade.account_id, user_id, connection)
}

/// Check the user owns the account a new trade is booked against and that it is active.
///
/// # Errors
/// Returns [Error::NotFound] or [Error::Forbidden] if the account is missing or
/// belongs to someone else, or [Error::AccountInactive] if it is inactive.
pub fn check_trade_account(
    trade: &NewTrade,
    user_id: UserID,
    connection: &Connection,
) -> Result<Account, Error> {
    let account = get_owned_account(trade.account_id, user_id, connection)?;

    if !account.is_active {
        return Err(Error::AccountInactive(account.id));
    }

    Ok(account)
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the trade table and the per-type detail tables.
///
/// # Errors
/// Returns an error if a table cannot be created.
pub fn create_trade_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS trade (
            id INTEGER PRIMARY KEY,
            account_id INTEGER NOT NULL,
            instrument TEXT NOT NULL,
            direction TEXT NOT NULL,
            type TEXT NOT NULL,
            fees REAL NOT NULL DEFAULT 0,
            entry_at TEXT NOT NULL,
            exit_at TEXT,
            notes TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_trade_account ON trade(account_id);",
        (),
    )?;

    connection.execute(
        "CREATE TABLE IF NOT EXISTS trade_fx (
            trade_id INTEGER PRIMARY KEY,
            entry_price REAL NOT NULL,
            exit_price REAL,
            lot_size REAL NOT NULL,
            pip_size REAL NOT NULL,
            pip_value REAL NOT NULL,
            FOREIGN KEY(trade_id) REFERENCES trade(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    connection.execute(
        "CREATE TABLE IF NOT EXISTS trade_bond (
            trade_id INTEGER PRIMARY KEY,
            entry_price REAL NOT NULL,
            exit_price REAL,
            face_value REAL NOT NULL,
            coupon_income REAL NOT NULL DEFAULT 0,
            FOREIGN KEY(trade_id) REFERENCES trade(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    connection.execute(
        "CREATE TABLE IF NOT EXISTS trade_stock (
            trade_id INTEGER PRIMARY KEY,
            entry_price REAL NOT NULL,
            exit_price REAL,
            quantity REAL NOT NULL,
            FOREIGN KEY(trade_id) REFERENCES trade(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

const SELECT_TRADE: &str = "SELECT t.id, t.account_id, t.instrument, t.direction, t.type,
        t.fees, t.entry_at, t.exit_at, t.notes,
        fx.entry_price, fx.exit_price, fx.lot_size, fx.pip_size, fx.pip_value,
        bond.entry_price, bond.exit_price, bond.face_value, bond.coupon_income,
        stock.entry_price, stock.exit_price, stock.quantity
    FROM trade t
    LEFT JOIN trade_fx fx ON fx.trade_id = t.id
    LEFT JOIN trade_bond bond ON bond.trade_id = t.id
    LEFT JOIN trade_stock stock ON stock.trade_id = t.id";

/// Map a row of [SELECT_TRADE] to a trade.
fn map_trade_row(row: &Row) -> Result<Trade, rusqlite::Error> {
    let trade_type: String = row.get(4)?;

    let details = match trade_type.as_str() {
        "FX" => TradeDetails::Fx {
            entry_price: row.get(9)?,
            exit_price: row.get(10)?,
            lot_size: row.get(11)?,
            pip_size: row.get(12)?,
            pip_value: row.get(13)?,
        },
        "BOND" => TradeDetails::Bond {
            entry_price: row.get(14)?,
            exit_price: row.get(15)?,
            face_value: row.get(16)?,
            coupon_income: row.get(17)?,
        },
        "STOCK" => TradeDetails::Stock {
            entry_price: row.get(18)?,
            exit_price: row.get(19)?,
            quantity: row.get(20)?,
        },
        _ => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                format!("unknown trade type {trade_type}").into(),
            ));
        }
    };

    Ok(Trade {
        id: row.get(0)?,
        account_id: row.get(1)?,
        instrument: row.get(2)?,
        direction: row.get(3)?,
        fees: row.get(5)?,
        entry_at: row.get(6)?,
        exit_at: row.get(7)?,
        notes: row.get(8)?,
        details,
    })
}

fn insert_trade_details(
    trade_id: TradeId,
    details: &TradeDetails,
    connection: &Connection,
) -> Result<(), Error> {
    match *details {
        TradeDetails::Fx {
            entry_price,
            exit_price,
            lot_size,
            pip_size,
            pip_value,
        } => connection.execute(
            "INSERT INTO trade_fx (trade_id, entry_price, exit_price, lot_size, pip_size, pip_value)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (trade_id, entry_price, exit_price, lot_size, pip_size, pip_value),
        )?,
        TradeDetails::Bond {
            entry_price,
            exit_price,
            face_value,
            coupon_income,
        } => connection.execute(
            "INSERT INTO trade_bond (trade_id, entry_price, exit_price, face_value, coupon_income)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            (trade_id, entry_price, exit_price, face_value, coupon_income),
        )?,
        TradeDetails::Stock {
            entry_price,
            exit_price,
            quantity,
        } => connection.execute(
            "INSERT INTO trade_stock (trade_id, entry_price, exit_price, quantity)
             VALUES (?1, ?2, ?3, ?4)",
            (trade_id, entry_price, exit_price, quantity),
        )?,
    };

    Ok(())
}

fn delete_trade_details(trade_id: TradeId, connection: &Connection) -> Result<(), Error> {
    for table in ["trade_fx", "trade_bond", "trade_stock"] {
        connection.execute(
            &format!("DELETE FROM {table} WHERE trade_id = ?1"),
            (trade_id,),
        )?;
    }

    Ok(())
}

/// Store a validated trade and its detail row.
///
/// The caller should run this inside a transaction so a trade is never stored without its details.
pub fn create_trade(trade: &NewTrade, connection: &Connection) -> Result<Trade, Error> {
    connection.execute(
        "INSERT INTO trade
            (account_id, instrument, direction, type, fees, entry_at, exit_at, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        (
            trade.account_id,
            &trade.instrument,
            trade.direction,
            trade.details.type_str(),
            trade.fees,
            trade.entry_at,
            trade.exit_at,
            &trade.notes,
            OffsetDateTime::now_utc(),
        ),
    )?;

    let id = connection.last_insert_rowid();
    insert_trade_details(id, &trade.details, connection)?;

    get_trade(id, connection)
}

/// Retrieve a trade by its `id`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no such trade.
pub fn get_trade(id: TradeId, connection: &Connection) -> Result<Trade, Error> {
    connection
        .query_row(&format!("{SELECT_TRADE} WHERE t.id = ?1"), (id,), map_trade_row)
        .map_err(Error::from)
}

/// Retrieve a trade, checking that the user owns its account.
///
/// # Errors
/// Returns [Error::NotFound] if there is no such trade, or [Error::Forbidden]
/// if it belongs to another user.
pub fn get_owned_trade(
    id: TradeId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Trade, Error> {
    let trade = get_trade(id, connection)?;
    get_trade_account(&trade, user_id, connection)?;

    Ok(trade)
}

/// Get the trades booked against an account, oldest entry first.
pub fn get_trades_for_account(
    account_id: AccountId,
    connection: &Connection,
) -> Result<Vec<Trade>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_TRADE} WHERE t.account_id = ?1 ORDER BY t.entry_at ASC, t.id ASC"
        ))?
        .query_map((account_id,), map_trade_row)?
        .map(|maybe_trade| maybe_trade.map_err(Error::from))
        .collect()
}

/// Get the trades of a user, newest entry first, optionally for one account.
pub fn get_trades_for_user(
    user_id: UserID,
    account_id: Option<AccountId>,
    connection: &Connection,
) -> Result<Vec<Trade>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_TRADE}
             WHERE t.account_id IN (SELECT id FROM account WHERE user_id = ?1)
               AND (?2 IS NULL OR t.account_id = ?2)
             ORDER BY t.entry_at DESC, t.id DESC"
        ))?
        .query_map((user_id, account_id), map_trade_row)?
        .map(|maybe_trade| maybe_trade.map_err(Error::from))
        .collect()
}

/// Replace a trade, including its detail row.
///
/// The caller should run this inside a transaction.
///
/// # Errors
/// Returns [Error::NotFound] if the trade does not exist.
pub fn update_trade(id: TradeId, trade: &NewTrade, connection: &Connection) -> Result<Trade, Error> {
    let rows_affected = connection.execute(
        "UPDATE trade
         SET account_id = ?1, instrument = ?2, direction = ?3, type = ?4, fees = ?5,
             entry_at = ?6, exit_at = ?7, notes = ?8
         WHERE id = ?9",
        (
            trade.account_id,
            &trade.instrument,
            trade.direction,
            trade.details.type_str(),
            trade.fees,
            trade.entry_at,
            trade.exit_at,
            &trade.notes,
            id,
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    delete_trade_details(id, connection)?;
    insert_trade_details(id, &trade.details, connection)?;

    get_trade(id, connection)
}

/// Delete a trade. The detail row goes with it.
///
/// # Errors
/// Returns [Error::NotFound] if the trade does not exist.
pub fn delete_trade(id: TradeId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM trade WHERE id = ?1", (id,))?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Get the number of trades booked against the account.
pub fn count_trades_for_account(
    account_id: AccountId,
    connection: &Connection,
) -> Result<i64, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM trade WHERE account_id = ?1",
            (account_id,),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod pnl_tests {
    use time::{Duration, OffsetDateTime};

    use super::{Direction, Trade, TradeDetails};

    fn trade(direction: Direction, fees: f64, details: TradeDetails) -> Trade {
        let now = OffsetDateTime::now_utc();

        Trade {
            id: 1,
            account_id: 1,
            instrument: "TEST".to_owned(),
            direction,
            fees,
            entry_at: now - Duration::days(1),
            exit_at: Some(now),
            notes: None,
            details,
        }
    }

    #[track_caller]
    fn assert_close(got: Option<f64>, want: f64) {
        let got = got.expect("want a closed trade");
        assert!((got - want).abs() < 1e-9, "got pnl {got}, want {want}");
    }

    #[test]
    fn stock_pnl() {
        let details = TradeDetails::Stock {
            entry_price: 100.0,
            exit_price: Some(110.0),
            quantity: 10.0,
        };

        assert_close(trade(Direction::Long, 5.0, details.clone()).realized_pnl(), 95.0);
        assert_close(trade(Direction::Short, 5.0, details).realized_pnl(), -105.0);
    }

    #[test]
    fn fx_pnl() {
        let details = TradeDetails::Fx {
            entry_price: 1.1000,
            exit_price: Some(1.1050),
            lot_size: 2.0,
            pip_size: 0.0001,
            pip_value: 10.0,
        };

        // 50 pips * $10 * 2 lots
        assert_close(trade(Direction::Long, 7.0, details.clone()).realized_pnl(), 993.0);
        assert_close(trade(Direction::Short, 7.0, details).realized_pnl(), -1007.0);
    }

    #[test]
    fn bond_pnl_includes_coupons() {
        let details = TradeDetails::Bond {
            entry_price: 98.0,
            exit_price: Some(101.0),
            face_value: 10_000.0,
            coupon_income: 250.0,
        };

        assert_close(trade(Direction::Long, 20.0, details.clone()).realized_pnl(), 530.0);
        assert_close(trade(Direction::Short, 20.0, details).realized_pnl(), -70.0);
    }

    #[test]
    fn open_trade_has_no_pnl() {
        let mut open = trade(
            Direction::Long,
            0.0,
            TradeDetails::Stock {
                entry_price: 100.0,
                exit_price: None,
                quantity: 1.0,
            },
        );
        open.exit_at = None;

        assert!(!open.is_closed());
        assert_eq!(open.realized_pnl(), None);
    }
}


#[cfg(test)]
mod database_tests {
    use time::{Duration, OffsetDateTime};

    use crate::{
        Error,
        test_utils::{create_test_account, create_test_user, get_test_connection},
    };

    use super::{
        Direction, NewTrade, TradeDetails, count_trades_for_account, create_trade, delete_trade,
        get_owned_trade, get_trade, get_trades_for_account, get_trades_for_user, update_trade,
    };

    fn new_trade(account_id: i64, details: TradeDetails) -> NewTrade {
        let now = OffsetDateTime::now_utc();
        let exit_at = details.exit_price().map(|_| now);

        NewTrade {
            account_id,
            instrument: "EURUSD".to_owned(),
            direction: Direction::Long,
            fees: 2.5,
            entry_at: now - Duration::days(1),
            exit_at,
            notes: Some("breakout".to_owned()),
            details,
        }
    }

    fn fx(exit_price: Option<f64>) -> TradeDetails {
        TradeDetails::Fx {
            entry_price: 1.1,
            exit_price,
            lot_size: 1.0,
            pip_size: 0.0001,
            pip_value: 10.0,
        }
    }

    #[test]
    fn create_and_get_each_type() {
        let conn = get_test_connection();
        let user = create_test_user("foo@bar.baz", &conn);
        let account = create_test_account(user.id, "Brokerage", "USD", &conn);
        let all_details = [
            fx(Some(1.2)),
            TradeDetails::Bond {
                entry_price: 99.0,
                exit_price: None,
                face_value: 1000.0,
                coupon_income: 12.0,
            },
            TradeDetails::Stock {
                entry_price: 10.0,
                exit_price: Some(12.0),
                quantity: 3.0,
            },
        ];

        for details in all_details {
            let created = create_trade(&new_trade(account.id, details.clone()), &conn).unwrap();

            assert_eq!(created.details, details);
            assert_eq!(get_trade(created.id, &conn), Ok(created));
        }

        assert_eq!(count_trades_for_account(account.id, &conn), Ok(3));
        assert_eq!(get_trades_for_account(account.id, &conn).unwrap().len(), 3);
    }

    #[test]
    fn update_can_change_type() {
        let conn = get_test_connection();
        let user = create_test_user("foo@bar.baz", &conn);
        let account = create_test_account(user.id, "Brokerage", "USD", &conn);
        let created = create_trade(&new_trade(account.id, fx(None)), &conn).unwrap();
        let stock = TradeDetails::Stock {
            entry_price: 10.0,
            exit_price: None,
            quantity: 3.0,
        };

        let updated =
            update_trade(created.id, &new_trade(account.id, stock.clone()), &conn).unwrap();

        assert_eq!(updated.details, stock);
        let fx_rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM trade_fx", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fx_rows, 0);
    }

    #[test]
    fn trades_are_scoped_to_owner() {
        let conn = get_test_connection();
        let user = create_test_user("foo@bar.baz", &conn);
        let other_user = create_test_user("bar@baz.qux", &conn);
        let account = create_test_account(user.id, "Brokerage", "USD", &conn);
        let other_account = create_test_account(other_user.id, "Brokerage", "USD", &conn);
        let own = create_trade(&new_trade(account.id, fx(None)), &conn).unwrap();
        let theirs = create_trade(&new_trade(other_account.id, fx(None)), &conn).unwrap();

        assert_eq!(get_trades_for_user(user.id, None, &conn), Ok(vec![own.clone()]));
        assert_eq!(
            get_trades_for_user(user.id, Some(other_account.id), &conn),
            Ok(vec![])
        );
        assert_eq!(get_owned_trade(own.id, user.id, &conn), Ok(own));
        assert_eq!(
            get_owned_trade(theirs.id, user.id, &conn),
            Err(Error::Forbidden)
        );
    }

    #[test]
    fn delete_removes_trade_and_details() {
        let conn = get_test_connection();
        let user = create_test_user("foo@bar.baz", &conn);
        let account = create_test_account(user.id, "Brokerage", "USD", &conn);
        let created = create_trade(&new_trade(account.id, fx(None)), &conn).unwrap();

        delete_trade(created.id, &conn).unwrap();

        assert_eq!(get_trade(created.id, &conn), Err(Error::NotFound));
        let fx_rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM trade_fx", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fx_rows, 0);
    }
}
