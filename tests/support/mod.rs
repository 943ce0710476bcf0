// tests/support/mod.rs
// Shared test doubles for the watcher integration tests.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use job_watcher::model::{Candidate, JobListing};
use job_watcher::notify::Notifier;
use job_watcher::source::types::SourceAdapter;
use std::sync::{Arc, Mutex};
use url::Url;

pub struct FakeSource {
    pub name: &'static str,
    pub company: &'static str,
    pub base: Url,
    pub result: Result<Vec<Candidate>, String>,
}

impl FakeSource {
    pub fn ok(name: &'static str, candidates: Vec<Candidate>) -> Self {
        Self {
            name,
            company: name,
            base: Url::parse("https://careers.example.com").unwrap(),
            result: Ok(candidates),
        }
    }

    pub fn failing(name: &'static str, msg: &str) -> Self {
        Self {
            name,
            company: name,
            base: Url::parse("https://careers.example.com").unwrap(),
            result: Err(msg.to_string()),
        }
    }
}

#[async_trait]
impl SourceAdapter for FakeSource {
    fn name(&self) -> &str {
        self.name
    }

    fn company(&self) -> &str {
        self.company
    }

    fn base_url(&self) -> &Url {
        &self.base
    }

    async fn fetch(&self) -> Result<Vec<Candidate>> {
        self.result.clone().map_err(|e| anyhow!(e))
    }
}

/// Records every send as "channel:id"; optionally fails after recording.
#[derive(Clone)]
pub struct RecordingNotifier {
    pub channel: &'static str,
    pub fail: bool,
    pub log: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn new(channel: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            channel,
            fail: false,
            log: log.clone(),
        }
    }

    pub fn failing(channel: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            channel,
            fail: true,
            log: log.clone(),
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        self.channel
    }

    async fn send(&self, job: &JobListing) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.channel, job.id));
        if self.fail {
            return Err(anyhow!("{} delivery refused", self.channel));
        }
        Ok(())
    }
}

pub fn cand(id: &str, title: &str, location: &str) -> Candidate {
    Candidate::new(title, id, format!("/jobs/{id}"), location)
}

pub fn log() -> Arc<Mutex<Vec<String>>> {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub fn read_ids(path: &std::path::Path) -> Vec<String> {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}
