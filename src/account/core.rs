use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, auth::UserID, database_id::AccountId};

/// The kind of financial account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    /// A bank or cash account.
    Cash,
    /// A brokerage account for currency pairs and commodities.
    FxCommodity,
    /// A brokerage account for shares.
    Stocks,
    /// A brokerage account for bonds.
    Bonds,
    /// A crypto exchange or wallet.
    Crypto,
    /// A savings account.
    Savings,
    /// Anything else.
    Other,
}

impl AccountType {
    fn as_str(&self) -> &'static str {
        match self {
            AccountType::Cash => "CASH",
            AccountType::FxCommodity => "FX_COMMODITY",
            AccountType::Stocks => "STOCKS",
            AccountType::Bonds => "BONDS",
            AccountType::Crypto => "CRYPTO",
            AccountType::Savings => "SAVINGS",
            AccountType::Other => "OTHER",
        }
    }

    /// Whether money in this kind of account counts as liquid unless the user says otherwise.
    pub fn is_liquid_by_default(&self) -> bool {
        matches!(self, AccountType::Cash | AccountType::Savings)
    }
}

impl ToSql for AccountType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for AccountType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "CASH" => Ok(AccountType::Cash),
            "FX_COMMODITY" => Ok(AccountType::FxCommodity),
            "STOCKS" => Ok(AccountType::Stocks),
            "BONDS" => Ok(AccountType::Bonds),
            "CRYPTO" => Ok(AccountType::Crypto),
            "SAVINGS" => Ok(AccountType::Savings),
            "OTHER" => Ok(AccountType::Other),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

/// A financial account owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// The id for the account.
    pub id: AccountId,
    /// The user who owns the account.
    pub user_id: UserID,
    /// The display name, unique per user.
    pub name: String,
    /// The three letter currency code, e.g. "NZD".
    pub currency: String,
    /// The kind of account.
    #[serde(rename = "type")]
    pub account_type: AccountType,
    /// Whether the money can be spent at short notice.
    pub is_liquid: bool,
    /// Inactive accounts do not accept new transactions or trades.
    pub is_active: bool,
    /// The balance before any transactions or trades.
    pub initial_balance: f64,
    /// The balance after replaying every transaction and closed trade.
    pub balance: f64,
    /// When the account was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The data needed to create an account.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    /// The user who will own the account.
    pub user_id: UserID,
    /// A validated account name.
    pub name: String,
    /// A validated currency code.
    pub currency: String,
    /// The kind of account.
    pub account_type: AccountType,
    /// Whether the money can be spent at short notice.
    pub is_liquid: bool,
    /// The opening balance.
    pub initial_balance: f64,
}

/// The editable fields of an account.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountUpdate {
    /// A validated account name.
    pub name: String,
    /// The kind of account.
    pub account_type: AccountType,
    /// Whether the money can be spent at short notice.
    pub is_liquid: bool,
    /// The opening balance.
    pub initial_balance: f64,
}

pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            currency TEXT NOT NULL,
            type TEXT NOT NULL,
            is_liquid INTEGER NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            initial_balance REAL NOT NULL,
            balance REAL NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE(user_id, name),
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

const ACCOUNT_COLUMNS: &str =
    "id, user_id, name, currency, type, is_liquid, is_active, initial_balance, balance, created_at";

pub fn map_row_to_account(row: &Row) -> Result<Account, rusqlite::Error> {
    Ok(Account {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        currency: row.get(3)?,
        account_type: row.get(4)?,
        is_liquid: row.get(5)?,
        is_active: row.get(6)?,
        initial_balance: row.get(7)?,
        balance: row.get(8)?,
        created_at: row.get(9)?,
    })
}

/// Trim an account name and check it is not empty.
///
/// # Errors
/// Returns [Error::Validation] if the name is blank.
pub fn validate_account_name(raw_name: &str) -> Result<String, Error> {
    let name = raw_name.trim();

    if name.is_empty() {
        return Err(Error::Validation("account name cannot be empty".to_owned()));
    }

    Ok(name.to_owned())
}

/// Check that `raw_currency` is three ASCII letters and return it in upper case.
///
/// # Errors
/// Returns [Error::InvalidCurrency] otherwise.
pub fn validate_currency(raw_currency: &str) -> Result<String, Error> {
    let currency = raw_currency.trim();

    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(Error::InvalidCurrency(raw_currency.to_owned()));
    }

    Ok(currency.to_ascii_uppercase())
}

/// Check that a balance is a usable number.
///
/// # Errors
/// Returns [Error::Validation] for NaN and infinite values.
pub fn validate_balance(balance: f64) -> Result<f64, Error> {
    if !balance.is_finite() {
        return Err(Error::Validation("balance must be a finite number".to_owned()));
    }

    Ok(balance)
}

fn map_unique_name_error(error: rusqlite::Error, name: &str) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(sql_error, _)
            if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Error::DuplicateAccountName(name.to_owned())
        }
        error => error.into(),
    }
}

/// Insert a new account. The stored balance starts at the initial balance.
///
/// # Errors
/// Returns [Error::DuplicateAccountName] if the user already has an account with the name.
pub fn create_account(account: NewAccount, connection: &Connection) -> Result<Account, Error> {
    let created_at = OffsetDateTime::now_utc();

    connection
        .execute(
            "INSERT INTO account
                (user_id, name, currency, type, is_liquid, is_active, initial_balance, balance, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6, ?7)",
            (
                account.user_id,
                &account.name,
                &account.currency,
                account.account_type,
                account.is_liquid,
                account.initial_balance,
                created_at,
            ),
        )
        .map_err(|error| map_unique_name_error(error, &account.name))?;

    Ok(Account {
        id: connection.last_insert_rowid(),
        user_id: account.user_id,
        name: account.name,
        currency: account.currency,
        account_type: account.account_type,
        is_liquid: account.is_liquid,
        is_active: true,
        initial_balance: account.initial_balance,
        balance: account.initial_balance,
        created_at,
    })
}

/// Get an account by its ID, regardless of who owns it.
///
/// # Errors
/// Returns [Error::NotFound] if there is no such account.
pub fn get_account(account_id: AccountId, connection: &Connection) -> Result<Account, Error> {
    connection
        .query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM account WHERE id = ?1"),
            (account_id,),
            map_row_to_account,
        )
        .map_err(Error::from)
}

/// Get an account, checking that it belongs to `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no such account, or [Error::Forbidden]
/// if it belongs to someone else.
pub fn get_owned_account(
    account_id: AccountId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Account, Error> {
    let account = get_account(account_id, connection)?;

    if account.user_id != user_id {
        tracing::warn!("User {user_id} tried to access account {account_id} of another user");
        return Err(Error::Forbidden);
    }

    Ok(account)
}

/// Get every account of a user, ordered by name.
pub fn get_accounts_for_user(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Account>, Error> {
    connection
        .prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE user_id = ?1 ORDER BY name ASC, id ASC"
        ))?
        .query_map((user_id,), map_row_to_account)?
        .map(|maybe_account| maybe_account.map_err(Error::from))
        .collect()
}

/// Overwrite the editable fields of an account.
///
/// # Errors
/// Returns [Error::DuplicateAccountName] if the new name is taken, or
/// [Error::NotFound] if the account does not exist.
pub fn update_account(
    account_id: AccountId,
    update: &AccountUpdate,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection
        .execute(
            "UPDATE account SET name = ?1, type = ?2, is_liquid = ?3, initial_balance = ?4
             WHERE id = ?5",
            (
                &update.name,
                update.account_type,
                update.is_liquid,
                update.initial_balance,
                account_id,
            ),
        )
        .map_err(|error| map_unique_name_error(error, &update.name))?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Store a newly computed balance.
pub fn set_account_balance(
    account_id: AccountId,
    balance: f64,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE account SET balance = ?1 WHERE id = ?2",
        (balance, account_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Mark an account as active or inactive.
pub fn set_account_active(
    account_id: AccountId,
    is_active: bool,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE account SET is_active = ?1 WHERE id = ?2",
        (is_active, account_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Delete an account. Its trades, balance history and status history go with it.
///
/// # Errors
/// Returns [Error::NotFound] if the account does not exist, or an
/// [Error::SqlError] if transactions still reference it.
pub fn delete_account(account_id: AccountId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM account WHERE id = ?1", (account_id,))?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}
