use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use tradebook::{
    AccountType, Direction, Email, NewAccount, NewTrade, NewTransaction, PasswordHash, Role,
    TradeDetails, TransactionType, UserID, ValidatedPassword, create_account, create_trade,
    create_transaction, create_user, initialize_db, recalculate_balance,
};

/// A utility for creating a test database for the REST API server of tradebook.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// The email address of the test user.
    #[arg(long, default_value = "test@example.com")]
    email: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let mut conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating test user {} with the password 'test'...", args.email);

    let password_hash = PasswordHash::new(
        ValidatedPassword::new_unchecked("test"),
        PasswordHash::DEFAULT_COST,
    )?;

    let user = create_user(Email::new(&args.email)?, password_hash, Role::User, &conn)?;

    println!("Creating demo accounts, transactions and trades...");

    let transaction = conn.transaction()?;
    create_demo_ledger(user.id, &transaction)?;
    transaction.commit()?;

    println!("Success!");

    Ok(())
}

fn create_demo_ledger(user_id: UserID, conn: &Connection) -> Result<(), tradebook::Error> {
    let now = OffsetDateTime::now_utc();
    let days_ago = |days: i64| now - Duration::days(days);

    let everyday = create_account(
        NewAccount {
            user_id,
            name: "Everyday".to_owned(),
            currency: "USD".to_owned(),
            account_type: AccountType::Cash,
            is_liquid: true,
            initial_balance: 1_000.0,
        },
        conn,
    )?;
    let brokerage = create_account(
        NewAccount {
            user_id,
            name: "Brokerage".to_owned(),
            currency: "USD".to_owned(),
            account_type: AccountType::Stocks,
            is_liquid: false,
            initial_balance: 0.0,
        },
        conn,
    )?;
    let forex = create_account(
        NewAccount {
            user_id,
            name: "Forex".to_owned(),
            currency: "USD".to_owned(),
            account_type: AccountType::FxCommodity,
            is_liquid: false,
            initial_balance: 0.0,
        },
        conn,
    )?;

    let transactions = [
        (TransactionType::Deposit, 2_500.0, None, Some(everyday.id), 60, "Salary"),
        (TransactionType::Withdraw, 120.0, Some(everyday.id), None, 45, "Groceries"),
        (TransactionType::Transfer, 1_500.0, Some(everyday.id), Some(brokerage.id), 40, "Invest"),
        (TransactionType::Transfer, 500.0, Some(everyday.id), Some(forex.id), 40, "Margin"),
        (TransactionType::Dividend, 12.5, None, Some(brokerage.id), 10, "AAPL dividend"),
    ];

    for (transaction_type, amount, from_account_id, to_account_id, age, description) in
        transactions
    {
        create_transaction(
            &NewTransaction {
                transaction_type,
                amount,
                from_account_id,
                to_account_id,
                occurred_at: days_ago(age),
                description: description.to_owned(),
            },
            conn,
        )?;
    }

    let trades = [
        NewTrade {
            account_id: brokerage.id,
            instrument: "AAPL".to_owned(),
            direction: Direction::Long,
            fees: 2.0,
            entry_at: days_ago(35),
            exit_at: Some(days_ago(20)),
            notes: Some("Earnings run up".to_owned()),
            details: TradeDetails::Stock {
                entry_price: 180.0,
                exit_price: Some(192.5),
                quantity: 5.0,
            },
        },
        NewTrade {
            account_id: brokerage.id,
            instrument: "MSFT".to_owned(),
            direction: Direction::Long,
            fees: 1.0,
            entry_at: days_ago(5),
            exit_at: None,
            notes: None,
            details: TradeDetails::Stock {
                entry_price: 410.0,
                exit_price: None,
                quantity: 2.0,
            },
        },
        NewTrade {
            account_id: forex.id,
            instrument: "EURUSD".to_owned(),
            direction: Direction::Short,
            fees: 3.5,
            entry_at: days_ago(30),
            exit_at: Some(days_ago(29)),
            notes: None,
            details: TradeDetails::Fx {
                entry_price: 1.0850,
                exit_price: Some(1.0875),
                lot_size: 0.5,
                pip_size: 0.0001,
                pip_value: 10.0,
            },
        },
    ];

    for trade in &trades {
        create_trade(trade, conn)?;
    }

    for account_id in [everyday.id, brokerage.id, forex.id] {
        let account = recalculate_balance(account_id, conn)?;
        println!("  {}: {:.2} {}", account.name, account.balance, account.currency);
    }

    Ok(())
}
