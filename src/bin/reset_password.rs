use std::{
    error::Error,
    io::{self},
    path::Path,
    process::exit,
};

use clap::Parser;
use rusqlite::Connection;

use tradebook::{
    Email, PasswordHash, User, ValidatedPassword, get_user_by_email, revoke_all_refresh_tokens,
    update_password,
};

/// A utility for changing the password for a registered user.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The email address of the user whose password should be reset.
    #[arg(long)]
    email: String,
}

/// Reset the password of a user and log them out everywhere.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let db_path = Path::new(&args.db_path);
    validate_db_path(db_path);

    let user = get_user(db_path, &args.email);
    println!("Resetting password for {}", user.email);

    let password_hash = match get_new_password_hash() {
        Some(password_hash) => password_hash,
        None => return Ok(()),
    };
    let revoked = save_new_password(db_path, &user, &password_hash)?;
    println!("Password updated successfully! Revoked {revoked} session(s).");

    Ok(())
}

fn get_user(db_path: &Path, raw_email: &str) -> User {
    println!("Loading user from {db_path:#?}");

    let email = match Email::new(raw_email) {
        Ok(email) => email,
        Err(error) => {
            print_error(error);
            exit(1);
        }
    };

    let conn = match Connection::open(db_path) {
        Ok(conn) => conn,
        Err(error) => {
            print_error(format!("Could not open the database at {db_path:?}: {error}"));
            exit(1);
        }
    };

    match get_user_by_email(&email, &conn) {
        Ok(user) => user,
        Err(error) => {
            print_error(format!("Could not get the user {email}: {error}"));
            exit(1);
        }
    }
}

fn validate_db_path(db_path: &Path) {
    match db_path.extension() {
        None => {
            print_error("Database path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            print_error("Database path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if !db_path.is_file() {
        eprintln!("File does not exist at {db_path:#?}!");
        exit(1);
    }
}

fn get_new_password_hash() -> Option<PasswordHash> {
    loop {
        println!();

        let first_password = match rpassword::prompt_password("Enter a new password: ") {
            Ok(string) => string,
            Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => {
                return None;
            }
            Err(error) => {
                print_error(format!("Could not read password from stdin: {error}"));
                return None;
            }
        };

        if let Err(error) = ValidatedPassword::new(&first_password, &[]) {
            print_error(error);
            continue;
        }

        let second_password = match rpassword::prompt_password("Enter the same password again: ") {
            Ok(string) => string,
            Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => {
                return None;
            }
            Err(error) => {
                print_error(format!("Could not read password from stdin: {error}"));
                return None;
            }
        };

        if first_password != second_password {
            print_error("Passwords must match, try again.");
            continue;
        }

        let password_hash = match PasswordHash::new(
            ValidatedPassword::new_unchecked(&first_password),
            PasswordHash::DEFAULT_COST,
        ) {
            Ok(password_hash) => password_hash,
            Err(error) => {
                print_error(format!("Could not hash password: {error}. Try again."));
                continue;
            }
        };

        return Some(password_hash);
    }
}

fn print_error(error: impl ToString) {
    eprintln!(
        "\x1b[31;1m{}\x1b[0m",
        capitalise_first_char(&error.to_string())
    )
}

/// From https://crates.io/crates/capitalize
fn capitalise_first_char(string: &str) -> String {
    let mut chars = string.chars();
    let Some(first) = chars.next() else {
        return String::with_capacity(0);
    };
    first.to_uppercase().chain(chars).collect()
}

/// Store the new password hash and revoke every refresh token of the user
/// in one transaction, returning the number of revoked tokens.
fn save_new_password(
    db_path: &Path,
    user: &User,
    password: &PasswordHash,
) -> Result<i64, tradebook::Error> {
    let mut conn = Connection::open(db_path)?;
    let transaction = conn.transaction()?;

    update_password(user.id, password, &transaction)?;
    let revoked = revoke_all_refresh_tokens(user.id, &transaction)?;

    transaction.commit()?;

    Ok(revoked)
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf, process};

    use rusqlite::Connection;
    use tradebook::{
        Email, PasswordHash, Role, UserID, ValidatedPassword, create_user, get_user_by_email,
        initialize_db,
    };

    use super::save_new_password;

    fn temp_db_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("tradebook-{name}-{}.db", process::id()))
    }

    fn hash(password: &str) -> PasswordHash {
        PasswordHash::new(ValidatedPassword::new_unchecked(password), 4).unwrap()
    }

    #[test]
    fn saves_new_password() {
        let db_path = temp_db_path("saves-new-password");
        let _ = fs::remove_file(&db_path);
        let email = Email::new("foo@bar.baz").unwrap();
        let user = {
            let conn = Connection::open(&db_path).unwrap();
            initialize_db(&conn).unwrap();
            create_user(email.clone(), hash("hunter2"), Role::User, &conn).unwrap()
        };

        let revoked = save_new_password(&db_path, &user, &hash("correct horse battery")).unwrap();

        let conn = Connection::open(&db_path).unwrap();
        let saved = get_user_by_email(&email, &conn).unwrap();
        assert_eq!(revoked, 0);
        assert!(saved.password_hash.verify("correct horse battery").unwrap());
        assert!(!saved.password_hash.verify("hunter2").unwrap());
        fs::remove_file(&db_path).unwrap();
    }

    #[test]
    fn unknown_user_is_an_error() {
        let db_path = temp_db_path("unknown-user");
        let _ = fs::remove_file(&db_path);
        let email = Email::new("foo@bar.baz").unwrap();
        let user = {
            let conn = Connection::open(&db_path).unwrap();
            initialize_db(&conn).unwrap();
            let mut user = create_user(email, hash("hunter2"), Role::User, &conn).unwrap();
            user.id = UserID::new(user.id.as_i64() + 1);
            user
        };

        let result = save_new_password(&db_path, &user, &hash("correct horse battery"));

        assert_eq!(result, Err(tradebook::Error::NotFound));
        fs::remove_file(&db_path).unwrap();
    }
}
