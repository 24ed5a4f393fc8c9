use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use super::NotifyError;
use crate::config::SmtpConfig;
use crate::lucky::{render_card, CardStyle, LuckyCard};
use crate::models::LiXiReceipt;
use crate::templates::Templates;

const SENDER_NAME: &str = "CanDiaChi";

/// Delivers a lucky number to the visitor who drew it.
#[async_trait]
pub trait LuckyMailer: Send + Sync {
    async fn send_lucky_number(&self, receipt: &LiXiReceipt) -> Result<(), NotifyError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    templates: Arc<Templates>,
    site_url: String,
}

impl SmtpMailer {
    /// SMTP over implicit TLS.
    pub fn new(
        config: &SmtpConfig,
        templates: Arc<Templates>,
        site_url: &str,
    ) -> Result<Self, NotifyError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
            .port(config.port)
            .credentials(Credentials::new(config.user.clone(), config.pass.clone()))
            .build();

        Ok(Self {
            transport,
            from: Mailbox::new(Some(SENDER_NAME.to_string()), config.user.parse()?),
            templates,
            site_url: site_url.to_string(),
        })
    }

    pub fn build_message(&self, receipt: &LiXiReceipt) -> Result<Message, NotifyError> {
        let card = LuckyCard::for_entry(
            receipt.lucky_number,
            &receipt.email,
            receipt.business_name.as_deref(),
            &self.site_url,
        );
        let html = render_card(&self.templates, CardStyle::InlineHtml, &card)?;
        let text = format!("Số may mắn của bạn: {}", receipt.lucky_number);

        let message = Message::builder()
            .from(self.from.clone())
            .to(receipt.email.parse()?)
            .subject(format!("Số May Mắn Của Bạn · {SENDER_NAME}"))
            .multipart(MultiPart::alternative_plain_html(text, html))?;

        Ok(message)
    }
}

#[async_trait]
impl LuckyMailer for SmtpMailer {
    async fn send_lucky_number(&self, receipt: &LiXiReceipt) -> Result<(), NotifyError> {
        let message = self.build_message(receipt)?;
        let response = self.transport.send(message).await?;
        log::info!(
            "Lucky number {} emailed to {} ({})",
            receipt.lucky_number,
            receipt.email,
            response.code()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailer() -> SmtpMailer {
        let config = SmtpConfig {
            host: "smtp.example.com".into(),
            port: 465,
            user: "lixi@candiachi.com".into(),
            pass: "secret".into(),
        };
        SmtpMailer::new(&config, Arc::new(Templates::new().unwrap()), "https://candiachi.com")
            .unwrap()
    }

    #[tokio::test]
    async fn message_is_multipart_alternative_with_the_number() {
        let receipt = LiXiReceipt {
            lucky_number: 2026,
            email: "lan@example.com".into(),
            business_name: Some("Phở Hòa".into()),
        };
        let message = mailer().build_message(&receipt).unwrap();
        let raw = String::from_utf8_lossy(&message.formatted()).to_string();

        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("lan@example.com"));
        assert!(raw.contains("CanDiaChi"));
        assert_eq!(message.envelope().to().len(), 1);
    }

    #[tokio::test]
    async fn invalid_recipient_is_rejected() {
        let receipt = LiXiReceipt {
            lucky_number: 2026,
            email: "not-an-email".into(),
            business_name: None,
        };
        assert!(matches!(
            mailer().build_message(&receipt),
            Err(NotifyError::Address(_))
        ));
    }
}
