use anyhow::{Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{Address, AsyncTransport, Tokio1Executor};

use crate::config::Settings;

pub const SENDER_NAME: &str = "Updates Notifier";
const FALLBACK_FROM: &str = "updates-notifier@localhost";

pub fn subject_for(home_url: &str) -> String {
    format!("{SENDER_NAME}: Updates Available @ {home_url}")
}

/// HTML email over SMTP.
pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
    subject: String,
}

impl EmailSender {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let cfg = &settings.email;
        let host = cfg.smtp.host.trim();
        anyhow::ensure!(!host.is_empty(), "SMTP host missing");

        let builder = if cfg.smtp.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        }
        .with_context(|| format!("invalid SMTP host {host}"))?
        .port(cfg.smtp.port);

        let mailer = if cfg.smtp.user.is_empty() {
            builder.build()
        } else {
            builder
                .credentials(Credentials::new(
                    cfg.smtp.user.clone(),
                    cfg.smtp.pass.clone(),
                ))
                .build()
        };

        let from = sender_mailbox(&cfg.notify_from, &cfg.smtp.user)?;
        let to = cfg
            .recipients()
            .into_iter()
            .map(|r| {
                r.parse::<Mailbox>()
                    .with_context(|| format!("invalid recipient {r}"))
            })
            .collect::<Result<Vec<_>>>()?;
        anyhow::ensure!(!to.is_empty(), "no email recipients configured");

        Ok(Self {
            mailer,
            from,
            to,
            subject: subject_for(&settings.site_info().home_url),
        })
    }

    pub async fn send_message(&self, html: &str) -> Result<()> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(self.subject.clone())
            .header(header::ContentType::TEXT_HTML);
        for to in &self.to {
            builder = builder.to(to.clone());
        }
        let msg = builder.body(html.to_string()).context("build email")?;

        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }
}

/// Configured sender, else the SMTP login if it is an address, else a
/// local fallback. Always carries the notifier's display name when the
/// configured mailbox has none.
fn sender_mailbox(notify_from: &str, smtp_user: &str) -> Result<Mailbox> {
    let from = notify_from.trim();
    if !from.is_empty() {
        let mut mb: Mailbox = from
            .parse()
            .with_context(|| format!("invalid sender {from}"))?;
        if mb.name.is_none() {
            mb.name = Some(SENDER_NAME.to_string());
        }
        return Ok(mb);
    }
    let addr: Address = smtp_user
        .trim()
        .parse()
        .or_else(|_| FALLBACK_FROM.parse())
        .context("fallback sender address")?;
    Ok(Mailbox::new(Some(SENDER_NAME.to_string()), addr))
}
