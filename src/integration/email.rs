use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use tracing::instrument;

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    config::EmailConfig,
};

/**
 * Sends html emails.
 */
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: String) -> Result<(), ApplicationError>;
}

/**
 * Email sender relaying through an SMTP server.
 */
pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailSender {
    /**
     * Creates the SMTP transport. No connection is opened until the first email is sent.
     */
    pub fn new(email_config: &EmailConfig) -> Result<Self, ApplicationError> {
        let builder = if email_config.tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&email_config.smtp_host)
                .map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to create SMTP transport: {err}")))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&email_config.smtp_host)
        };
        let builder = builder.port(email_config.smtp_port);
        let builder = match (&email_config.username, &email_config.password) {
            (Some(username), Some(password)) => builder.credentials(Credentials::new(username.clone(), password.clone())),
            _ => builder,
        };
        let from = parse_mailbox(&email_config.from).map_err(|err| ApplicationError::new(ErrorType::Initialization, err.message))?;
        Ok(SmtpEmailSender { transport: builder.build(), from })
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, ApplicationError> {
    address.parse::<Mailbox>().map_err(|err| ApplicationError::new(ErrorType::Validation, format!("Invalid email address {address}: {err}")))
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    #[instrument(skip(self, html_body))]
    async fn send(&self, to: &str, subject: &str, html_body: String) -> Result<(), ApplicationError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(to)?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body)
            .map_err(|err| ApplicationError::new(ErrorType::Email, format!("Failed to build email: {err}")))?;
        self.transport.send(message).await.map_err(|err| ApplicationError::new(ErrorType::Email, format!("Failed to send email: {err}")))?;
        tracing::info!("Sent email '{}'", subject);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn config(tls: bool) -> EmailConfig {
        EmailConfig {
            smtp_host: "localhost".to_string(),
            smtp_port: 2525,
            username: Some("user".to_string()),
            password: Some("secret".to_string()),
            from: "Membership <noreply@example.org>".to_string(),
            tls,
            base_url: "https://members.example.org".to_string(),
        }
    }

    #[test]
    fn test_parse_mailbox() {
        assert_eq!(parse_mailbox("John <john@example.org>").unwrap().email.to_string(), "john@example.org");
        assert_eq!(parse_mailbox("not an address").unwrap_err().error_type, ErrorType::Validation);
    }

    #[tokio::test]
    async fn test_new_sender() {
        assert!(SmtpEmailSender::new(&config(false)).is_ok());
        let invalid = EmailConfig { from: "nobody".to_string(), ..config(false) };
        assert_eq!(SmtpEmailSender::new(&invalid).err().unwrap().error_type, ErrorType::Initialization);
    }
}
