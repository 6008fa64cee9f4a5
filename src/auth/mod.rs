//! User accounts, credentials and the token based session lifecycle.

mod cookie;
mod email;
mod forgot_password;
mod log_in;
mod log_out;
mod middleware;
mod password;
mod profile;
mod refresh;
pub(crate) mod refresh_token;
mod register;
pub(crate) mod session;
mod state;
pub(crate) mod token;
mod user;
pub(crate) mod user_token;
mod verify_email;

pub use cookie::COOKIE_REFRESH_TOKEN;
pub use email::Email;
pub use forgot_password::{forgot_password, reset_password};
pub use log_in::{LogInForm, SessionResponse, log_in};
pub use log_out::{log_out, log_out_all};
pub use middleware::auth_guard;
pub use password::{PasswordHash, ValidatedPassword};
pub use profile::{change_password, get_me};
pub use refresh::refresh;
pub use refresh_token::{
    create_refresh_token_table, delete_expired_refresh_tokens, revoke_all_refresh_tokens,
};
pub use register::{RegisterForm, register_user};
pub use state::AuthState;
pub use token::TokenKeys;
pub use user::{
    Role, User, UserID, UserResponse, count_users, create_user, create_user_table,
    get_user_by_email, get_user_by_id, update_password,
};
pub use user_token::create_user_token_table;
pub use verify_email::{resend_verification_email, verify_email};
