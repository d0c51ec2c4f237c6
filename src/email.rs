use color_eyre::Result;
use serde::Serialize;

/// A rendered message ready for the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[cfg_attr(test, mockall::automock)]
pub trait EmailSender: Send + Sync {
    fn send(&self, message: &EmailMessage) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

/// Sends through the Resend HTTP API; logs instead when no API key is set.
#[derive(Clone)]
pub struct ResendEmailSender {
    client: reqwest::Client,
    api_key: Option<String>,
    from: String,
}

impl ResendEmailSender {
    pub fn new(api_key: Option<String>, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.filter(|k| !k.is_empty()),
            from,
        }
    }
}

impl EmailSender for ResendEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let Some(api_key) = &self.api_key else {
            tracing::info!(
                "email disabled, not sending '{}' to {}:\n{}",
                message.subject,
                message.to,
                message.text
            );
            return Ok(());
        };

        let body = SendEmailRequest {
            from: &self.from,
            to: vec![&message.to],
            subject: &message.subject,
            html: &message.html,
            text: &message.text,
        };

        let resp = self
            .client
            .post("https://api.resend.com/emails")
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            tracing::error!("Resend API error: {status} - {text}");
            color_eyre::eyre::bail!("Resend API returned {status}");
        }

        tracing::info!("email '{}' sent to {}", message.subject, message.to);
        Ok(())
    }
}
