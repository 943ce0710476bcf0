// src/notify/mod.rs
//! Notification channels and the fan-out multiplexer used by the watcher.

pub mod discord;
pub mod email;

use anyhow::Result;
use async_trait::async_trait;
use metrics::counter;

use crate::model::JobListing;

pub use discord::DiscordNotifier;
pub use email::EmailSender;

/// One delivery channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, job: &JobListing) -> Result<()>;
}

/// Per-channel result for a single listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOutcome {
    pub channel: &'static str,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub outcomes: Vec<ChannelOutcome>,
}

impl DeliveryReport {
    pub fn delivered(&self) -> usize {
        self.outcomes.iter().filter(|o| o.error.is_none()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.delivered()
    }
}

/// Sends every listing to all configured channels; one channel failing
/// never stops the others.
#[derive(Default)]
pub struct NotifierMux {
    channels: Vec<Box<dyn Notifier>>,
}

impl NotifierMux {
    pub fn new(channels: Vec<Box<dyn Notifier>>) -> Self {
        Self { channels }
    }

    /// Enable whichever channels have credentials in the environment.
    pub fn from_env() -> Self {
        let mut channels: Vec<Box<dyn Notifier>> = Vec::new();

        match email::EmailSender::from_env() {
            Ok(Some(sender)) => channels.push(Box::new(sender)),
            Ok(None) => tracing::info!("email disabled (EMAIL_USER/EMAIL_PASS not set)"),
            Err(e) => tracing::warn!(error = %format!("{e:#}"), "email disabled (bad config)"),
        }

        match discord::DiscordNotifier::from_env() {
            Some(d) => channels.push(Box::new(d)),
            None => tracing::info!("discord disabled (DISCORD_WEBHOOK_URL not set)"),
        }

        if channels.is_empty() {
            tracing::warn!("no notification channels configured; new jobs will only be logged");
        }
        Self { channels }
    }

    pub fn with_channel(mut self, channel: Box<dyn Notifier>) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub async fn notify(&self, job: &JobListing) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for ch in &self.channels {
            let error = match ch.send(job).await {
                Ok(()) => {
                    tracing::info!(channel = ch.name(), id = %job.id, "notification sent");
                    None
                }
                Err(e) => {
                    tracing::warn!(channel = ch.name(), id = %job.id, error = %format!("{e:#}"), "notification failed");
                    counter!("watcher_delivery_failures_total", "channel" => ch.name()).increment(1);
                    Some(format!("{e:#}"))
                }
            };
            report.outcomes.push(ChannelOutcome {
                channel: ch.name(),
                error,
            });
        }
        report
    }
}
