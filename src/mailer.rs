//! Outgoing email for account verification and password resets.

use crate::{Error, auth::Email};

/// An email ready to be delivered.
#[derive(Debug, Clone, PartialEq)]
pub struct MailMessage {
    /// The recipient.
    pub to: Email,
    /// The subject line.
    pub subject: String,
    /// The plain text body.
    pub body: String,
}

/// Something that can deliver emails to users.
pub trait Mailer: Send + Sync {
    /// Deliver `message`.
    ///
    /// # Errors
    /// Returns [Error::MailError] if the message could not be handed off.
    fn send(&self, message: MailMessage) -> Result<(), Error>;
}

/// A mailer that writes messages to the log instead of sending them.
///
/// Suitable for single-user deployments where the operator reads the server
/// logs, and for local development.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, message: MailMessage) -> Result<(), Error> {
        tracing::info!(
            "Email to {}\nsubject: {}\n{}",
            message.to,
            message.subject,
            message.body
        );

        Ok(())
    }
}

/// Build the message that carries an email verification code.
pub fn verification_message(to: Email, code: &str) -> MailMessage {
    MailMessage {
        to,
        subject: "Verify your email address".to_owned(),
        body: format!(
            "Welcome to tradebook! Submit this code to verify your email address. \
            It expires in 24 hours.\n\n{code}"
        ),
    }
}

/// Build the message that carries a password reset code.
pub fn password_reset_message(to: Email, code: &str) -> MailMessage {
    MailMessage {
        to,
        subject: "Reset your password".to_owned(),
        body: format!(
            "Someone asked to reset the password for your tradebook account. \
            If it was not you, ignore this email. The code expires in one hour.\n\n{code}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use crate::auth::Email;

    use super::{password_reset_message, verification_message};

    #[test]
    fn messages_end_with_code() {
        let to = Email::new("foo@bar.baz").unwrap();

        let verification = verification_message(to.clone(), "abc123");
        let reset = password_reset_message(to, "def456");

        assert!(verification.body.ends_with("abc123"));
        assert!(reset.body.ends_with("def456"));
    }
}
