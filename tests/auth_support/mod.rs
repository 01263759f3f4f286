#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use devgrant::auth::DeviceCodeGrant;
use devgrant::config::DeviceFlowConfig;
use devgrant::error::{DeviceFlowError, Result};
use devgrant::flow::VerificationPrompt;
use devgrant::http::FormTransport;
use tokio::time::Instant;

pub const DEVICE_URL: &str = "https://idp.test/login/device/code";
pub const TOKEN_URL: &str = "https://idp.test/login/oauth/access_token";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub at: Duration,
    pub params: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Transport that replays canned bodies per URL and records each request
/// with its offset from construction on the (possibly paused) tokio clock.
pub struct ScriptedTransport {
    started: Instant,
    bodies: Mutex<HashMap<String, VecDeque<String>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            started: Instant::now(),
            bodies: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn push(&self, url: &str, body: serde_json::Value) {
        self.push_raw(url, &body.to_string());
    }

    pub fn push_raw(&self, url: &str, body: &str) {
        self.bodies
            .lock()
            .expect("bodies lock poisoned")
            .entry(url.to_string())
            .or_default()
            .push_back(body.to_string());
    }

    pub fn requests_to(&self, url: &str) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .expect("requests lock poisoned")
            .iter()
            .filter(|r| r.url == url)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl FormTransport for ScriptedTransport {
    async fn post_form(&self, url: &str, params: &[(&str, &str)]) -> Result<String> {
        self.requests
            .lock()
            .expect("requests lock poisoned")
            .push(RecordedRequest {
                url: url.to_string(),
                at: self.started.elapsed(),
                params: params
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            });
        self.bodies
            .lock()
            .expect("bodies lock poisoned")
            .get_mut(url)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| DeviceFlowError::Transport(format!("no scripted response for {url}")))
    }
}

/// Prompt that remembers what it was asked to show.
#[derive(Default)]
pub struct RecordingPrompt {
    shown: Mutex<Vec<(String, String)>>,
}

impl RecordingPrompt {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn shown(&self) -> Vec<(String, String)> {
        self.shown.lock().expect("prompt lock poisoned").clone()
    }
}

impl VerificationPrompt for RecordingPrompt {
    fn show(&self, grant: &DeviceCodeGrant) {
        self.shown.lock().expect("prompt lock poisoned").push((
            grant.verification_uri().to_string(),
            grant.user_code().to_string(),
        ));
    }
}

pub fn scripted_config() -> DeviceFlowConfig {
    DeviceFlowConfig::new("client-1")
        .with_device_code_url(DEVICE_URL)
        .with_access_token_url(TOKEN_URL)
}
