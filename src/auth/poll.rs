//! Access-token polling for the device authorization grant.
//!
//! The poller waits, checks the deadline, sends one token request and
//! classifies the answer:
//!
//! - `authorization_pending` waits again at the same interval
//! - `slow_down` doubles the interval (bounded by the configured cap)
//! - any other error code, expiry or cancellation ends the loop with an error
//! - an `access_token` ends the loop with the token

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::token::AccessToken;
use crate::config::DeviceFlowConfig;
use crate::error::{DeviceFlowError, Result};
use crate::http::FormTransport;

pub const DEVICE_CODE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// OAuth error code returned by the token endpoint.
///
/// Matching is exact and case-sensitive. Codes the crate does not know land
/// in [`ErrorCode::Other`] with the raw string and are treated as terminal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    AuthorizationPending,
    SlowDown,
    AccessDenied,
    ExpiredToken,
    IncorrectClientCredentials,
    IncorrectDeviceCode,
    UnsupportedGrantType,
    DeviceFlowDisabled,
    Other(String),
}

impl ErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::AuthorizationPending => "authorization_pending",
            Self::SlowDown => "slow_down",
            Self::AccessDenied => "access_denied",
            Self::ExpiredToken => "expired_token",
            Self::IncorrectClientCredentials => "incorrect_client_credentials",
            Self::IncorrectDeviceCode => "incorrect_device_code",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::DeviceFlowDisabled => "device_flow_disabled",
            Self::Other(code) => code,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ErrorCode {
    fn from(code: &str) -> Self {
        match code {
            "authorization_pending" => Self::AuthorizationPending,
            "slow_down" => Self::SlowDown,
            "access_denied" => Self::AccessDenied,
            "expired_token" => Self::ExpiredToken,
            "incorrect_client_credentials" => Self::IncorrectClientCredentials,
            "incorrect_device_code" => Self::IncorrectDeviceCode,
            "unsupported_grant_type" => Self::UnsupportedGrantType,
            "device_flow_disabled" => Self::DeviceFlowDisabled,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for ErrorCode {
    fn from(code: String) -> Self {
        Self::from(code.as_str())
    }
}

/// Result of a single token request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Success(AccessToken),
    Pending,
    SlowDown,
    Error {
        code: ErrorCode,
        description: Option<String>,
        uri: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct TokenSuccessBody {
    access_token: Option<String>,
    token_type: Option<String>,
    scope: Option<String>,
}

/// `{error, error_description, error_uri}` body shared by both endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct OAuthErrorBody {
    pub(crate) error: Option<String>,
    pub(crate) error_description: Option<String>,
    pub(crate) error_uri: Option<String>,
}

impl OAuthErrorBody {
    /// Parse `body` as an error payload with a non-empty `error` field.
    pub(crate) fn parse(body: &str) -> Option<Self> {
        serde_json::from_str::<Self>(body)
            .ok()
            .filter(|e| e.error.as_deref().is_some_and(|code| !code.is_empty()))
    }

    pub(crate) fn into_error(self) -> DeviceFlowError {
        DeviceFlowError::authorization(
            self.error.unwrap_or_default(),
            self.error_description,
            self.error_uri,
        )
    }
}

impl PollOutcome {
    /// Classify a token endpoint body.
    ///
    /// A non-empty `access_token` wins over a sibling `error` field.
    pub fn from_body(body: &str) -> Result<Self> {
        let success = serde_json::from_str::<TokenSuccessBody>(body);
        if let Ok(TokenSuccessBody {
            access_token: Some(access_token),
            token_type,
            scope,
        }) = &success
        {
            if !access_token.is_empty() {
                return Ok(Self::Success(AccessToken {
                    access_token: access_token.clone(),
                    token_type: token_type.clone().unwrap_or_default(),
                    scope: scope.clone().unwrap_or_default(),
                }));
            }
        }

        if let Some(error) = OAuthErrorBody::parse(body) {
            let code = ErrorCode::from(error.error.unwrap_or_default());
            return Ok(match code {
                ErrorCode::AuthorizationPending => Self::Pending,
                ErrorCode::SlowDown => Self::SlowDown,
                code => Self::Error {
                    code,
                    description: error.error_description,
                    uri: error.error_uri,
                },
            });
        }

        Err(DeviceFlowError::MalformedResponse(match success {
            Err(e) => e.to_string(),
            Ok(_) => "response has neither access_token nor error".to_string(),
        }))
    }
}

/// Mutable loop state. The interval never shrinks and the deadline is fixed.
#[derive(Debug, Clone)]
pub struct PollState {
    current_interval: Duration,
    deadline: Instant,
    max_interval: Option<Duration>,
    attempts: u32,
}

impl PollState {
    pub fn new(initial_interval: Duration, deadline: Instant, max_interval: Option<Duration>) -> Self {
        Self {
            current_interval: initial_interval,
            deadline,
            max_interval,
            attempts: 0,
        }
    }

    pub fn current_interval(&self) -> Duration {
        self.current_interval
    }

    /// Token requests issued so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now > self.deadline
    }

    /// Double the interval for `slow_down`.
    pub fn back_off(&mut self) {
        let doubled = self.current_interval.saturating_mul(2);
        let next = match self.max_interval {
            Some(cap) => doubled.min(cap),
            None => doubled,
        };
        // an initial interval above the cap stays where it is
        self.current_interval = next.max(self.current_interval);
    }

    fn record_attempt(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
    }
}

/// Polls the token endpoint until the user authorizes, the code expires or
/// the provider rejects the request.
pub struct AccessTokenPoller {
    transport: Arc<dyn FormTransport>,
    client_id: String,
    access_token_url: String,
    max_interval: Option<Duration>,
}

impl AccessTokenPoller {
    pub fn new(transport: Arc<dyn FormTransport>, config: &DeviceFlowConfig) -> Self {
        Self {
            transport,
            client_id: config.client_id.clone(),
            access_token_url: config.access_token_url.clone(),
            max_interval: config.max_interval,
        }
    }

    /// Poll without an external cancellation signal.
    pub async fn poll(
        &self,
        device_code: &str,
        initial_interval: Duration,
        expires_at: Instant,
    ) -> Result<AccessToken> {
        self.poll_with_cancel(device_code, initial_interval, expires_at, &CancellationToken::new())
            .await
    }

    /// Run the polling loop. The first request happens after one full
    /// `initial_interval`; `cancel` is observed during every wait and again
    /// right before each request.
    pub async fn poll_with_cancel(
        &self,
        device_code: &str,
        initial_interval: Duration,
        expires_at: Instant,
        cancel: &CancellationToken,
    ) -> Result<AccessToken> {
        let mut state = PollState::new(initial_interval, expires_at, self.max_interval);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DeviceFlowError::Cancelled),
                _ = tokio::time::sleep(state.current_interval()) => {}
            }

            // cancellation wins over expiry when both happen in one wait
            if cancel.is_cancelled() {
                return Err(DeviceFlowError::Cancelled);
            }
            if state.is_expired_at(Instant::now()) {
                tracing::warn!(attempts = state.attempts(), "Device code expired while polling");
                return Err(DeviceFlowError::Expired);
            }

            let outcome = self.request_token(device_code).await?;
            state.record_attempt();

            match outcome {
                PollOutcome::Success(token) => {
                    tracing::info!(attempts = state.attempts(), "Device authorized");
                    return Ok(token);
                }
                PollOutcome::Pending => {
                    tracing::debug!(
                        attempt = state.attempts(),
                        interval_secs = state.current_interval().as_secs_f64(),
                        "Authorization pending"
                    );
                }
                PollOutcome::SlowDown => {
                    state.back_off();
                    tracing::debug!(
                        attempt = state.attempts(),
                        interval_secs = state.current_interval().as_secs_f64(),
                        "Server asked to slow down"
                    );
                }
                PollOutcome::Error {
                    code,
                    description,
                    uri,
                } => {
                    tracing::warn!(attempt = state.attempts(), %code, "Device authorization rejected");
                    return Err(DeviceFlowError::Authorization {
                        code,
                        description,
                        uri,
                    });
                }
            }
        }
    }

    /// Issue one token request and classify the response.
    pub async fn request_token(&self, device_code: &str) -> Result<PollOutcome> {
        let body = self
            .transport
            .post_form(
                &self.access_token_url,
                &[
                    ("client_id", self.client_id.as_str()),
                    ("device_code", device_code),
                    ("grant_type", DEVICE_CODE_GRANT_TYPE),
                ],
            )
            .await?;
        PollOutcome::from_body(&body)
    }
}
