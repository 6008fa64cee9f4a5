//! Defines the core data models and database queries for cash transactions.

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    account::{Account, get_owned_account},
    auth::UserID,
    database_id::{AccountId, TransactionId},
};

// ============================================================================
// MODELS
// ============================================================================

/// What a transaction does with money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Money paid into an account.
    Deposit,
    /// Money taken out of an account.
    Withdraw,
    /// Money moved between two accounts of the same user.
    Transfer,
    /// A dividend paid into an account.
    Dividend,
}

impl TransactionType {
    fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdraw => "WITHDRAW",
            TransactionType::Transfer => "TRANSFER",
            TransactionType::Dividend => "DIVIDEND",
        }
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "DEPOSIT" => Ok(TransactionType::Deposit),
            "WITHDRAW" => Ok(TransactionType::Withdraw),
            "TRANSFER" => Ok(TransactionType::Transfer),
            "DIVIDEND" => Ok(TransactionType::Dividend),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

/// A movement of cash into, out of, or between accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// What the transaction does.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// The amount of money moved, always positive.
    pub amount: f64,
    /// The account the money left.
    pub from_account_id: Option<AccountId>,
    /// The account the money arrived in.
    pub to_account_id: Option<AccountId>,
    /// When the money moved.
    #[serde(with = "time::serde::rfc3339")]
    pub occurred_at: OffsetDateTime,
    /// A text description of what the transaction was for.
    pub description: String,
    /// When the transaction was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Transaction {
    /// The change this transaction makes to the balance of `account_id`.
    pub fn delta_for(&self, account_id: AccountId) -> f64 {
        let mut delta = 0.0;

        if self.to_account_id == Some(account_id) {
            delta += self.amount;
        }

        if self.from_account_id == Some(account_id) {
            delta -= self.amount;
        }

        delta
    }

    /// The accounts whose balance this transaction affects.
    pub fn account_ids(&self) -> Vec<AccountId> {
        let mut ids: Vec<AccountId> = [self.from_account_id, self.to_account_id]
            .into_iter()
            .flatten()
            .collect();
        ids.dedup();

        ids
    }
}

/// The request body for creating or replacing a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionForm {
    /// What the transaction does.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// The amount of money moved.
    pub amount: f64,
    /// The account the money left.
    #[serde(default)]
    pub from_account_id: Option<AccountId>,
    /// The account the money arrived in.
    #[serde(default)]
    pub to_account_id: Option<AccountId>,
    /// When the money moved. Defaults to now.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub occurred_at: Option<OffsetDateTime>,
    /// A text description of what the transaction was for.
    #[serde(default)]
    pub description: String,
}

/// A transaction that has passed validation and is ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// What the transaction does.
    pub transaction_type: TransactionType,
    /// The amount of money moved.
    pub amount: f64,
    /// The account the money left.
    pub from_account_id: Option<AccountId>,
    /// The account the money arrived in.
    pub to_account_id: Option<AccountId>,
    /// When the money moved.
    pub occurred_at: OffsetDateTime,
    /// A text description of what the transaction was for.
    pub description: String,
}

impl NewTransaction {
    /// The accounts whose balance this transaction affects.
    pub fn account_ids(&self) -> Vec<AccountId> {
        let mut ids: Vec<AccountId> = [self.from_account_id, self.to_account_id]
            .into_iter()
            .flatten()
            .collect();
        ids.dedup();

        ids
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Check the amount, timestamp and which accounts are set against the transaction type.
///
/// Deposits and dividends go into `to_account_id` only, withdrawals come out
/// of `from_account_id` only, and transfers need two different accounts.
///
/// # Errors
/// Returns a:
/// - [Error::Validation] if the amount is not a positive number or the accounts do not fit the type,
/// - [Error::FutureDate] if the transaction happens after `now`.
pub fn validate_transaction(
    form: TransactionForm,
    now: OffsetDateTime,
) -> Result<NewTransaction, Error> {
    if !form.amount.is_finite() || form.amount <= 0.0 {
        return Err(Error::Validation(
            "amount must be a positive number".to_owned(),
        ));
    }

    let occurred_at = form.occurred_at.unwrap_or(now);
    if occurred_at > now {
        return Err(Error::FutureDate(occurred_at));
    }

    match (
        form.transaction_type,
        form.from_account_id,
        form.to_account_id,
    ) {
        (TransactionType::Deposit | TransactionType::Dividend, None, Some(_)) => {}
        (TransactionType::Deposit | TransactionType::Dividend, _, _) => {
            return Err(Error::Validation(
                "deposits and dividends need a to_account_id and no from_account_id".to_owned(),
            ));
        }
        (TransactionType::Withdraw, Some(_), None) => {}
        (TransactionType::Withdraw, _, _) => {
            return Err(Error::Validation(
                "withdrawals need a from_account_id and no to_account_id".to_owned(),
            ));
        }
        (TransactionType::Transfer, Some(from), Some(to)) if from != to => {}
        (TransactionType::Transfer, _, _) => {
            return Err(Error::Validation(
                "transfers need two different accounts".to_owned(),
            ));
        }
    }

    Ok(NewTransaction {
        transaction_type: form.transaction_type,
        amount: form.amount,
        from_account_id: form.from_account_id,
        to_account_id: form.to_account_id,
        occurred_at: occurred_at.to_offset(time::UtcOffset::UTC),
        description: form.description.trim().to_owned(),
    })
}

/// Check that the user owns every account the transaction touches, that they
/// are active and that a transfer stays within one currency.
///
/// # Errors
/// Returns a:
/// - [Error::NotFound] or [Error::Forbidden] if an account is missing or not owned by the user,
/// - [Error::AccountInactive] if an account is inactive,
/// - [Error::CurrencyMismatch] if a transfer crosses currencies.
pub fn check_transaction_accounts(
    transaction: &NewTransaction,
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Account>, Error> {
    let accounts = transaction
        .account_ids()
        .into_iter()
        .map(|account_id| get_owned_account(account_id, user_id, connection))
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(inactive) = accounts.iter().find(|account| !account.is_active) {
        return Err(Error::AccountInactive(inactive.id));
    }

    if let [from, to] = accounts.as_slice()
        && from.currency != to.currency
    {
        return Err(Error::CurrencyMismatch(
            from.currency.clone(),
            to.currency.clone(),
        ));
    }

    Ok(accounts)
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                type TEXT NOT NULL,
                amount REAL NOT NULL,
                from_account_id INTEGER,
                to_account_id INTEGER,
                occurred_at TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                FOREIGN KEY(from_account_id) REFERENCES account(id) ON UPDATE CASCADE,
                FOREIGN KEY(to_account_id) REFERENCES account(id) ON UPDATE CASCADE
                )",
        (),
    )?;

    // Indexes used when replaying the ledger of one account.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_from_account ON \"transaction\"(from_account_id);",
        (),
    )?;
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_to_account ON \"transaction\"(to_account_id);",
        (),
    )?;

    Ok(())
}

const TRANSACTION_COLUMNS: &str =
    "id, type, amount, from_account_id, to_account_id, occurred_at, description, created_at";

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        transaction_type: row.get(1)?,
        amount: row.get(2)?,
        from_account_id: row.get(3)?,
        to_account_id: row.get(4)?,
        occurred_at: row.get(5)?,
        description: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Store a validated transaction.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn create_transaction(
    transaction: &NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "INSERT INTO \"transaction\"
                (type, amount, from_account_id, to_account_id, occurred_at, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            (
                transaction.transaction_type,
                transaction.amount,
                transaction.from_account_id,
                transaction.to_account_id,
                transaction.occurred_at,
                &transaction.description,
                OffsetDateTime::now_utc(),
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = :id"
        ))?
        .query_one(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// Retrieve a transaction, checking that the user owns the accounts it touches.
///
/// # Errors
/// Returns [Error::NotFound] if there is no such transaction, or
/// [Error::Forbidden] if it belongs to another user.
pub fn get_owned_transaction(
    id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = get_transaction(id, connection)?;

    for account_id in transaction.account_ids() {
        get_owned_account(account_id, user_id, connection)?;
    }

    Ok(transaction)
}

/// Get every transaction that touches the account, oldest first.
pub fn get_transactions_for_account(
    account_id: AccountId,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\"
             WHERE from_account_id = ?1 OR to_account_id = ?1
             ORDER BY occurred_at ASC, id ASC"
        ))?
        .query_map((account_id,), map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Filters and paging for listing a user's transactions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransactionQuery {
    /// Only include transactions touching this account.
    pub account_id: Option<AccountId>,
    /// The maximum number of transactions to return.
    pub limit: i64,
    /// The number of transactions to skip.
    pub offset: i64,
}

/// Get the transactions of a user, newest first.
pub fn query_transactions(
    user_id: UserID,
    query: TransactionQuery,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\"
             WHERE (from_account_id IN (SELECT id FROM account WHERE user_id = ?1)
                    OR to_account_id IN (SELECT id FROM account WHERE user_id = ?1))
               AND (?2 IS NULL OR from_account_id = ?2 OR to_account_id = ?2)
             ORDER BY occurred_at DESC, id DESC
             LIMIT ?3 OFFSET ?4"
        ))?
        .query_map(
            (user_id, query.account_id, query.limit, query.offset),
            map_transaction_row,
        )?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Replace the contents of a transaction.
///
/// # Errors
/// Returns [Error::NotFound] if the transaction does not exist.
pub fn update_transaction(
    id: TransactionId,
    transaction: &NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let rows_affected = connection.execute(
        "UPDATE \"transaction\"
         SET type = ?1, amount = ?2, from_account_id = ?3, to_account_id = ?4,
             occurred_at = ?5, description = ?6
         WHERE id = ?7",
        (
            transaction.transaction_type,
            transaction.amount,
            transaction.from_account_id,
            transaction.to_account_id,
            transaction.occurred_at,
            &transaction.description,
            id,
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    get_transaction(id, connection)
}

/// Delete a transaction.
///
/// # Errors
/// Returns [Error::NotFound] if the transaction does not exist.
pub fn delete_transaction(id: TransactionId, connection: &Connection) -> Result<(), Error> {
    let rows_affected =
        connection.execute("DELETE FROM \"transaction\" WHERE id = ?1", (id,))?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Get the other accounts that shared a transfer with `account_id`.
pub fn get_transfer_counterparts(
    account_id: AccountId,
    connection: &Connection,
) -> Result<Vec<AccountId>, Error> {
    connection
        .prepare(
            "SELECT DISTINCT CASE WHEN from_account_id = ?1 THEN to_account_id ELSE from_account_id END
             FROM \"transaction\"
             WHERE type = 'TRANSFER' AND (from_account_id = ?1 OR to_account_id = ?1)",
        )?
        .query_map((account_id,), |row| row.get(0))?
        .map(|maybe_id| maybe_id.map_err(Error::from))
        .collect()
}

/// Delete every transaction that touches the account, returning how many were deleted.
pub fn delete_transactions_for_account(
    account_id: AccountId,
    connection: &Connection,
) -> Result<i64, Error> {
    let rows_affected = connection.execute(
        "DELETE FROM \"transaction\" WHERE from_account_id = ?1 OR to_account_id = ?1",
        (account_id,),
    )?;

    Ok(rows_affected as i64)
}

/// Get the number of transactions that touch the account.
pub fn count_transactions_for_account(
    account_id: AccountId,
    connection: &Connection,
) -> Result<i64, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM \"transaction\" WHERE from_account_id = ?1 OR to_account_id = ?1",
            (account_id,),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod validation_tests {
    use time::{Duration, OffsetDateTime};

    use crate::Error;

    use super::{TransactionForm, TransactionType, validate_transaction};

    fn form(
        transaction_type: TransactionType,
        from_account_id: Option<i64>,
        to_account_id: Option<i64>,
    ) -> TransactionForm {
        TransactionForm {
            transaction_type,
            amount: 10.0,
            from_account_id,
            to_account_id,
            occurred_at: None,
            description: " rent ".to_owned(),
        }
    }

    #[test]
    fn accepts_valid_shapes() {
        let now = OffsetDateTime::now_utc();
        let cases = [
            form(TransactionType::Deposit, None, Some(1)),
            form(TransactionType::Dividend, None, Some(1)),
            form(TransactionType::Withdraw, Some(1), None),
            form(TransactionType::Transfer, Some(1), Some(2)),
        ];

        for case in cases {
            let got = validate_transaction(case.clone(), now);
            assert!(got.is_ok(), "want {case:?} to be valid, got {got:?}");
        }
    }

    #[test]
    fn defaults_to_now_and_trims_description() {
        let now = OffsetDateTime::now_utc();

        let got = validate_transaction(form(TransactionType::Deposit, None, Some(1)), now).unwrap();

        assert_eq!(got.occurred_at, now);
        assert_eq!(got.description, "rent");
    }

    #[test]
    fn rejects_invalid_shapes() {
        let now = OffsetDateTime::now_utc();
        let cases = [
            form(TransactionType::Deposit, Some(1), Some(2)),
            form(TransactionType::Deposit, Some(1), None),
            form(TransactionType::Dividend, None, None),
            form(TransactionType::Withdraw, None, Some(1)),
            form(TransactionType::Withdraw, Some(1), Some(2)),
            form(TransactionType::Transfer, Some(1), None),
            form(TransactionType::Transfer, Some(1), Some(1)),
        ];

        for case in cases {
            let got = validate_transaction(case.clone(), now);
            assert!(
                matches!(got, Err(Error::Validation(_))),
                "want {case:?} to be rejected, got {got:?}"
            );
        }
    }

    #[test]
    fn rejects_non_positive_amounts() {
        let now = OffsetDateTime::now_utc();

        for amount in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let mut case = form(TransactionType::Deposit, None, Some(1));
            case.amount = amount;

            assert!(
                matches!(validate_transaction(case, now), Err(Error::Validation(_))),
                "want amount {amount} to be rejected"
            );
        }
    }

    #[test]
    fn rejects_future_date() {
        let now = OffsetDateTime::now_utc();
        let tomorrow = now + Duration::days(1);
        let mut case = form(TransactionType::Deposit, None, Some(1));
        case.occurred_at = Some(tomorrow);

        assert_eq!(
            validate_transaction(case, now),
            Err(Error::FutureDate(tomorrow))
        );
    }
}
