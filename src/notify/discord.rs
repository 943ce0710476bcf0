use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;

use super::Notifier;
use crate::model::JobListing;

pub const ENV_WEBHOOK_URL: &str = "DISCORD_WEBHOOK_URL";

/// Upper bound for a single wait between attempts, backoff or `Retry-After`.
const MAX_WAIT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct DiscordNotifier {
    webhook: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
    backoff_base: Duration,
}

impl DiscordNotifier {
    pub fn new(webhook: String) -> Self {
        Self {
            webhook,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
            backoff_base: Duration::from_millis(500),
        }
    }

    /// `None` when `DISCORD_WEBHOOK_URL` is unset or blank.
    pub fn from_env() -> Option<Self> {
        std::env::var(ENV_WEBHOOK_URL)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(Self::new)
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    pub fn with_backoff(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// `base * 2^(attempt-1)`, capped at one minute.
    fn backoff_delay(&self, attempt: u8) -> Duration {
        let factor = 1u32
            .checked_shl(u32::from(attempt.saturating_sub(1)))
            .unwrap_or(u32::MAX);
        self.backoff_base.saturating_mul(factor).min(MAX_WAIT)
    }
}

pub fn format_content(job: &JobListing) -> String {
    let location = if job.location.is_empty() {
        "Unknown"
    } else {
        job.location.as_str()
    };
    format!(
        "🚨 **New job posted** 🚨\n\n**{}**\nCompany: {}\nLocation: {}\n[Apply]({})",
        job.title, job.company, location, job.url
    )
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn name(&self) -> &'static str {
        "discord"
    }

    async fn send(&self, job: &JobListing) -> Result<()> {
        let payload = DiscordWebhookPayload {
            content: format_content(job),
        };

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&self.webhook)
                .timeout(self.timeout)
                .json(&payload)
                .send()
                .await;

            match res {
                Ok(rsp) => {
                    let status = rsp.status();
                    if status.is_success() {
                        return Ok(());
                    }
                    // 4xx other than 429 means a bad or revoked webhook.
                    let retryable =
                        status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS;
                    if retryable && attempt < self.max_retries {
                        let wait = retry_after(rsp.headers())
                            .unwrap_or_else(|| self.backoff_delay(attempt));
                        tokio::time::sleep(wait).await;
                        continue;
                    }
                    return Err(anyhow!("Discord webhook HTTP error: {status}"));
                }
                Err(e) => {
                    if attempt < self.max_retries {
                        tokio::time::sleep(self.backoff_delay(attempt)).await;
                        continue;
                    }
                    return Err(anyhow!("Discord webhook request failed: {e}"));
                }
            }
        }
    }
}

/// `Retry-After` in (possibly fractional) seconds.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let secs: f64 = headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some(Duration::from_secs_f64(secs).min(MAX_WAIT))
}

#[derive(Serialize)]
struct DiscordWebhookPayload {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_lists_title_company_location_and_link() {
        let job = JobListing {
            id: "1".into(),
            title: "Software Engineer".into(),
            company: "Apple".into(),
            location: "Cupertino".into(),
            url: "https://jobs.apple.com/en-us/details/1".into(),
        };
        let c = format_content(&job);
        assert!(c.contains("**Software Engineer**"));
        assert!(c.contains("Company: Apple"));
        assert!(c.contains("Location: Cupertino"));
        assert!(c.contains("(https://jobs.apple.com/en-us/details/1)"));
    }

    #[test]
    fn backoff_doubles_and_saturates() {
        let d = DiscordNotifier::new("http://localhost/hook".into())
            .with_backoff(Duration::from_millis(500));
        assert_eq!(d.backoff_delay(1), Duration::from_millis(500));
        assert_eq!(d.backoff_delay(3), Duration::from_secs(2));
        assert_eq!(d.backoff_delay(40), MAX_WAIT);
        assert_eq!(d.backoff_delay(u8::MAX), MAX_WAIT);
    }

    #[test]
    fn retry_after_parses_seconds() {
        let mut h = HeaderMap::new();
        assert_eq!(retry_after(&h), None);
        h.insert(RETRY_AFTER, "1.5".parse().unwrap());
        assert_eq!(retry_after(&h), Some(Duration::from_millis(1500)));
        h.insert(RETRY_AFTER, "3600".parse().unwrap());
        assert_eq!(retry_after(&h), Some(MAX_WAIT));
        h.insert(RETRY_AFTER, "Wed, 21 Oct 2015 07:28:00 GMT".parse().unwrap());
        assert_eq!(retry_after(&h), None);
    }

    #[test]
    fn payload_serializes_to_content_field() {
        let p = DiscordWebhookPayload {
            content: "hi".into(),
        };
        assert_eq!(serde_json::to_string(&p).unwrap(), r#"{"content":"hi"}"#);
    }
}
