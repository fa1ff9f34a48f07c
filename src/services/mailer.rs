use std::future::Future;

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::config::MailConfig;
use crate::utils::error::AppError;

/// Transactional email dispatch.
///
/// Abstracts over the SMTP relay so the registration and notification
/// services can be tested with a recording fake.
pub trait Mailer: Send + Sync {
    /// Send a plain-text email. Delivery is synchronous: the returned
    /// future resolves once the relay has accepted or rejected the message.
    fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// SMTP mailer backed by Lettre.
#[derive(Clone)]
pub struct SmtpMailer {
    server: String,
    port: u16,
    credentials: Credentials,
    from_email: String,
    from_name: String,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Self {
        Self {
            server: config.smtp_server.clone(),
            port: config.smtp_port,
            credentials: Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ),
            from_email: config.from_email.clone(),
            from_name: config.from_name.clone(),
        }
    }

    /// Builds a fresh transport for each message to avoid connection
    /// pooling issues.
    fn transport(&self) -> Result<SmtpTransport, AppError> {
        Ok(SmtpTransport::relay(&self.server)
            .map_err(|e| AppError::EmailError(format!("SMTP relay error: {e}")))?
            .port(self.port)
            .credentials(self.credentials.clone())
            .build())
    }

    fn from_header(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_email)
    }
}

impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError> {
        let email = Message::builder()
            .from(
                self.from_header()
                    .parse()
                    .map_err(|e| AppError::EmailError(format!("Invalid from address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| AppError::EmailError(format!("Invalid to address: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| AppError::EmailError(format!("Failed to build email: {e}")))?;

        let mailer = self.transport()?;

        tokio::task::spawn_blocking(move || {
            mailer
                .send(&email)
                .map_err(|e| AppError::EmailError(format!("Failed to send email: {e}")))
        })
        .await
        .map_err(|e| AppError::EmailError(format!("Email task failed: {e}")))?
        .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> MailConfig {
        MailConfig {
            smtp_server: "smtp.example.com".to_string(),
            smtp_port: 587,
            smtp_username: "mailer".to_string(),
            smtp_password: "secret".to_string(),
            from_email: "noreply@rendezvous.local".to_string(),
            from_name: "RendezVous".to_string(),
        }
    }

    #[test]
    fn from_header_combines_name_and_address() {
        let mailer = SmtpMailer::new(&test_config());
        assert_eq!(mailer.from_header(), "RendezVous <noreply@rendezvous.local>");
    }

    #[test]
    fn from_header_parses_as_mailbox() {
        let mailer = SmtpMailer::new(&test_config());
        assert!(mailer
            .from_header()
            .parse::<lettre::message::Mailbox>()
            .is_ok());
    }
}
