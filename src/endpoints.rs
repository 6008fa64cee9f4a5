//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/account/{account_id}', use [format_endpoint].

/// The path that the refresh token cookie is scoped to.
pub const AUTH_COOKIE_PATH: &str = "/auth";
/// The route for creating a new user.
pub const REGISTER: &str = "/auth/register";
/// The route for logging in a user.
pub const LOG_IN: &str = "/auth/login";
/// The route for swapping a refresh token for a new session.
pub const REFRESH: &str = "/auth/refresh";
/// The route for ending the current session.
pub const LOG_OUT: &str = "/auth/logout";
/// The route for ending every session of the authenticated user.
pub const LOG_OUT_ALL: &str = "/auth/logout_all";
/// The route for getting the authenticated user.
pub const ME: &str = "/auth/me";
/// The route for confirming an email address with a code.
pub const VERIFY_EMAIL: &str = "/auth/verify_email";
/// The route for sending a new email verification code.
pub const RESEND_VERIFICATION: &str = "/auth/verify_email/resend";
/// The route for requesting a password reset code.
pub const FORGOT_PASSWORD: &str = "/auth/forgot_password";
/// The route for setting a new password with a reset code.
pub const RESET_PASSWORD: &str = "/auth/reset_password";
/// The route for changing the authenticated user's password.
pub const CHANGE_PASSWORD: &str = "/auth/change_password";

/// The route to list and create accounts.
pub const ACCOUNTS: &str = "/account";
/// The route to access a single account.
pub const ACCOUNT: &str = "/account/{account_id}";
/// The route to activate or deactivate an account.
pub const ACCOUNT_STATUS: &str = "/account/{account_id}/status";
/// The route to list the status changes of an account.
pub const ACCOUNT_STATUS_HISTORY: &str = "/account/{account_id}/status_history";
/// The route to list the balance snapshots of an account.
pub const ACCOUNT_BALANCE_HISTORY: &str = "/account/{account_id}/balance_history";
/// The route to get the running ledger of an account.
pub const ACCOUNT_LEDGER: &str = "/account/{account_id}/ledger";
/// The route to force a balance recalculation of an account.
pub const ACCOUNT_RECALCULATE: &str = "/account/{account_id}/recalculate";

/// The route to list and create transactions.
pub const TRANSACTIONS: &str = "/transactions";
/// The route to access a single transaction.
pub const TRANSACTION: &str = "/transactions/{transaction_id}";

/// The route to list and create trades.
pub const TRADES: &str = "/trade";
/// The route to get trading statistics.
pub const TRADE_STATS: &str = "/trade/stats";
/// The route to access a single trade.
pub const TRADE: &str = "/trade/{trade_id}";
/// The route to close an open trade.
pub const CLOSE_TRADE: &str = "/trade/{trade_id}/close";

/// The route to get net worth and trading totals.
pub const DASHBOARD_SUMMARY: &str = "/dashboard/summary";
/// The route to get the net worth time series.
pub const DASHBOARD_NET_WORTH: &str = "/dashboard/net_worth";

/// The route to request a cup of coffee (experimental).
pub const COFFEE: &str = "/api/coffee";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/users/{user_id}', '{user_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, c) in endpoint_path.chars().enumerate() {
        if c == '{' {
            param_start = Some(i);
        } else if param_start.is_some() && c == '}' {
            param_end = Some(i + 1);
            break;
        }
    }

    let param_start = match param_start {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = param_end.unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
