use std::sync::Arc;

use tracing::instrument;

use crate::{integration::email::EmailSender, model::{apperror::ApplicationError, models::UserDetailType}};

/**
 * Builds and sends the account emails.
 */
pub struct NotificationService {
    email_sender: Arc<dyn EmailSender>,
    /**
     * Base url of the web client.
     */
    base_url: String,
}

impl NotificationService {
    pub fn new(email_sender: Arc<dyn EmailSender>, base_url: String) -> Self {
        NotificationService { email_sender, base_url: base_url.trim_end_matches('/').to_string() }
    }

    /**
     * Url of the city list in the web client, used by reminders.
     */
    pub fn cities_url(&self) -> String {
        format!("{}/cities", self.base_url)
    }

    #[instrument(skip(self))]
    pub async fn send_registration(&self, email: &str) -> Result<(), ApplicationError> {
        let body = format!(
            "<p>Welcome!</p><p>Your registration has been received. Sign in at <a href=\"{url}\">{url}</a> to complete your profile.</p>",
            url = escape_html(&format!("{}/signin", self.base_url))
        );
        self.email_sender.send(email, "Registration", body).await
    }

    /**
     * Reminds a user without a city to join one.
     */
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn send_reminder(&self, cities_url: &str, user: &UserDetailType) -> Result<(), ApplicationError> {
        let body = format!(
            "<p>Dear {},</p><p>you have not joined a city yet. Choose your city at <a href=\"{url}\">{url}</a>.</p>",
            escape_html(&user.full_name()),
            url = escape_html(cities_url)
        );
        self.email_sender.send(&user.email, "Join a city", body).await
    }

    #[instrument(skip(self, confirmation_link))]
    pub async fn send_reset(&self, confirmation_link: &str, email: &str) -> Result<(), ApplicationError> {
        let body = format!(
            "<p>A password reset was requested for your account.</p><p>Reset your password at <a href=\"{url}\">{url}</a>.</p>",
            url = escape_html(confirmation_link)
        );
        self.email_sender.send(email, "Password reset", body).await
    }
}

/**
 * Escapes text for use in html element content and quoted attributes.
 */
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for character in text.chars() {
        match character {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(character),
        }
    }
    escaped
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl EmailSender for RecordingSender {
        async fn send(&self, to: &str, subject: &str, html_body: String) -> Result<(), ApplicationError> {
            self.sent.lock().unwrap().push((to.to_string(), subject.to_string(), html_body));
            Ok(())
        }
    }

    fn service() -> (Arc<RecordingSender>, NotificationService) {
        let sender = Arc::new(RecordingSender::default());
        let service = NotificationService::new(sender.clone(), "https://members.example.org/".to_string());
        (sender, service)
    }

    #[tokio::test]
    async fn test_send_registration() {
        let (sender, service) = service();
        service.send_registration("new@example.org").await.unwrap();
        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent[0].0, "new@example.org");
        assert!(sent[0].2.contains("https://members.example.org/signin"));
    }

    #[tokio::test]
    async fn test_send_reminder() {
        let (sender, service) = service();
        let user = UserDetailType { id: "1".to_string(), email: "jane@example.org".to_string(), first_name: "Jane".to_string(), last_name: "Doe".to_string() };
        service.send_reminder(&service.cities_url(), &user).await.unwrap();
        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent[0].0, "jane@example.org");
        assert!(sent[0].2.contains("Dear Jane Doe"));
        assert!(sent[0].2.contains("https://members.example.org/cities"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("Jane Doe"), "Jane Doe");
        assert_eq!(escape_html("<b>\"Tom\" & 'Jerry'</b>"), "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;");
    }

    #[tokio::test]
    async fn test_send_reminder_escapes_name() {
        let (sender, service) = service();
        let user = UserDetailType { id: "2".to_string(), email: "eve@example.org".to_string(), first_name: "<script>alert(1)</script>".to_string(), last_name: "O'Neil".to_string() };
        service.send_reminder(&service.cities_url(), &user).await.unwrap();
        let sent = sender.sent.lock().unwrap();
        assert!(!sent[0].2.contains("<script>"));
        assert!(sent[0].2.contains("Dear &lt;script&gt;alert(1)&lt;/script&gt; O&#39;Neil"));
    }

    #[tokio::test]
    async fn test_send_reset() {
        let (sender, service) = service();
        service.send_reset("https://members.example.org/reset?token=abc", "jane@example.org").await.unwrap();
        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent[0].1, "Password reset");
        assert!(sent[0].2.contains("reset?token=abc"));
    }
}
