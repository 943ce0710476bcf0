use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::Notifier;
use crate::model::JobListing;

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";

/// SMTP over implicit TLS (port 465).
pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailSender {
    pub fn new(host: &str, user: String, pass: String, from: Mailbox, to: Mailbox) -> Result<Self> {
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .with_context(|| format!("invalid SMTP host {host}"))?
            .credentials(Credentials::new(user, pass))
            .build();
        Ok(Self { mailer, from, to })
    }

    /// `Ok(None)` when `EMAIL_USER` or `EMAIL_PASS` is missing; the channel is
    /// then simply disabled.
    pub fn from_env() -> Result<Option<Self>> {
        let var = |k: &str| {
            std::env::var(k)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let (Some(user), Some(pass)) = (var("EMAIL_USER"), var("EMAIL_PASS")) else {
            return Ok(None);
        };
        let host = var("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string());
        let from_addr = var("EMAIL_FROM").unwrap_or_else(|| user.clone());
        let to_addr = var("EMAIL_TO").unwrap_or_else(|| from_addr.clone());

        let from: Mailbox = from_addr
            .parse()
            .with_context(|| format!("invalid EMAIL_FROM {from_addr:?}"))?;
        let to: Mailbox = to_addr
            .parse()
            .with_context(|| format!("invalid EMAIL_TO {to_addr:?}"))?;

        Self::new(&host, user, pass, from, to).map(Some)
    }
}

pub fn build_message(from: &Mailbox, to: &Mailbox, job: &JobListing) -> Result<Message> {
    Message::builder()
        .from(from.clone())
        .to(to.clone())
        .subject(subject(job))
        .header(header::ContentType::TEXT_PLAIN)
        .body(body(job))
        .context("build email")
}

pub fn subject(job: &JobListing) -> String {
    format!("New Job: {} ({})", job.title, job.company)
}

pub fn body(job: &JobListing) -> String {
    format!(
        "Title: {}\nCompany: {}\nLocation: {}\nApply Here: {}\n",
        job.title, job.company, job.location, job.url
    )
}

#[async_trait]
impl Notifier for EmailSender {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send(&self, job: &JobListing) -> Result<()> {
        let msg = build_message(&self.from, &self.to, job)?;
        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> JobListing {
        JobListing {
            id: "200".into(),
            title: "ML Engineer".into(),
            company: "Apple".into(),
            location: "Seattle".into(),
            url: "https://jobs.apple.com/en-us/details/200".into(),
        }
    }

    #[test]
    fn subject_and_body_format() {
        assert_eq!(subject(&job()), "New Job: ML Engineer (Apple)");
        let b = body(&job());
        assert!(b.starts_with("Title: ML Engineer\nCompany: Apple\nLocation: Seattle\n"));
        assert!(b.contains("Apply Here: https://jobs.apple.com/en-us/details/200"));
    }

    #[test]
    fn message_carries_headers() {
        let from: Mailbox = "me@example.com".parse().unwrap();
        let to: Mailbox = "you@example.com".parse().unwrap();
        let raw = String::from_utf8(build_message(&from, &to, &job()).unwrap().formatted()).unwrap();
        assert!(raw.contains("Subject: New Job: ML Engineer (Apple)"));
        assert!(raw.contains("From: me@example.com"));
        assert!(raw.contains("To: you@example.com"));
    }

    #[serial_test::serial]
    #[test]
    fn missing_credentials_disable_channel() {
        std::env::remove_var("EMAIL_USER");
        std::env::set_var("EMAIL_PASS", "secret");
        assert!(EmailSender::from_env().unwrap().is_none());
        std::env::remove_var("EMAIL_PASS");
    }
}
