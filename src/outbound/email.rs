//! Mail delivery adapters.
//!
//! Production deployments would plug an SMTP sender into the [`Mailer`]
//! port; the console mailer logs the reset link instead, which pairs with
//! the demo behaviour of returning the link in the response.

use async_trait::async_trait;
use tracing::info;

use crate::domain::Email;
use crate::domain::ports::{Mailer, MailerError};

/// Mailer that logs reset links instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleMailer;

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send_password_reset(&self, email: &Email, reset_url: &str) -> Result<(), MailerError> {
        info!(email = %email, reset_url = %reset_url, "password reset link issued");
        Ok(())
    }
}
