#![allow(missing_docs)]

use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use axum_test::TestServer;
use rusqlite::Connection;
use serde_json::json;

use crate::{
    AppState, Error,
    account::{Account, AccountType, NewAccount},
    auth::{Email, PasswordHash, Role, SessionResponse, User, UserID, create_user},
    config::Config,
    database_id::AccountId,
    db::initialize,
    endpoints,
    mailer::{MailMessage, Mailer},
    routing::build_router,
    transaction::Transaction,
};

pub(crate) const TEST_PASSWORD: &str = "thisisaverysecurepassword!!!!";

/// A mailer that keeps every message so tests can read the codes it carried.
#[derive(Debug, Default)]
pub(crate) struct RecordingMailer {
    messages: Mutex<Vec<MailMessage>>,
}

impl RecordingMailer {
    /// The code at the end of the last message sent to `email`.
    pub(crate) fn last_code_for(&self, email: &str) -> Option<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|message| message.to.as_str() == email)
            .and_then(|message| message.body.lines().last())
            .map(|line| line.trim().to_owned())
    }

    pub(crate) fn message_count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, message: MailMessage) -> Result<(), Error> {
        self.messages.lock().unwrap().push(message);
        Ok(())
    }
}

pub(crate) struct TestContext {
    pub(crate) state: AppState,
    pub(crate) mailer: Arc<RecordingMailer>,
}

pub(crate) fn test_config() -> Config {
    Config {
        password_hash_cost: 4,
        auth_requests_per_minute: 10_000,
        secure_cookies: false,
        ..Default::default()
    }
}

pub(crate) fn get_test_server() -> (TestServer, TestContext) {
    get_test_server_with_config(test_config())
}

pub(crate) fn get_test_server_with_config(config: Config) -> (TestServer, TestContext) {
    let mailer = Arc::new(RecordingMailer::default());
    let connection = Connection::open_in_memory().expect("Could not open database in memory.");
    let state = AppState::new(connection, "42", config, mailer.clone())
        .expect("Could not create app state.");
    let server =
        TestServer::try_new(build_router(state.clone())).expect("Could not create test server.");

    (server, TestContext { state, mailer })
}

pub(crate) async fn register_user(server: &TestServer, email: &str) -> SessionResponse {
    let response = server
        .post(endpoints::REGISTER)
        .json(&json!({ "email": email, "password": TEST_PASSWORD }))
        .await;

    response.assert_status(StatusCode::CREATED);
    response.json::<SessionResponse>()
}

pub(crate) async fn log_in(server: &TestServer, email: &str, password: &str) -> SessionResponse {
    let response = server
        .post(endpoints::LOG_IN)
        .json(&json!({ "email": email, "password": password }))
        .await;

    response.assert_status_ok();
    response.json::<SessionResponse>()
}

pub(crate) fn get_test_connection() -> Connection {
    let connection = Connection::open_in_memory().expect("Could not open database in memory.");
    initialize(&connection).expect("Could not initialize database.");
    connection
}

pub(crate) fn create_test_user(email: &str, connection: &Connection) -> User {
    create_user(
        Email::new(email).expect("Could not parse email."),
        PasswordHash::new_unchecked("hunter2"),
        Role::User,
        connection,
    )
    .expect("Could not create test user.")
}

pub(crate) fn create_test_account(
    user_id: UserID,
    name: &str,
    currency: &str,
    connection: &Connection,
) -> Account {
    crate::account::create_account(
        NewAccount {
            user_id,
            name: name.to_owned(),
            currency: currency.to_owned(),
            account_type: AccountType::Cash,
            is_liquid: true,
            initial_balance: 0.0,
        },
        connection,
    )
    .expect("Could not create test account.")
}

pub(crate) async fn create_account(
    server: &TestServer,
    token: &str,
    name: &str,
    currency: &str,
) -> Account {
    let response = server
        .post(endpoints::ACCOUNTS)
        .authorization_bearer(token)
        .json(&json!({ "name": name, "currency": currency, "type": "CASH" }))
        .await;

    response.assert_status(StatusCode::CREATED);
    response.json::<Account>()
}

pub(crate) async fn deposit(
    server: &TestServer,
    token: &str,
    account_id: AccountId,
    amount: f64,
) -> Transaction {
    let response = server
        .post(endpoints::TRANSACTIONS)
        .authorization_bearer(token)
        .json(&json!({ "type": "DEPOSIT", "amount": amount, "to_account_id": account_id }))
        .await;

    response.assert_status(StatusCode::CREATED);
    response.json::<Transaction>()
}
