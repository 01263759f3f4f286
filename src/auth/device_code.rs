use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::time::Instant;

use super::poll::OAuthErrorBody;
use crate::config::DeviceFlowConfig;
use crate::error::{DeviceFlowError, Result};
use crate::http::FormTransport;

const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Device/user code pair issued by the authorization server.
///
/// Immutable once issued; [`DeviceCodeGrant::expires_at`] is derived from the
/// moment the request was sent, not from when the response arrived.
#[derive(Debug, Clone)]
pub struct DeviceCodeGrant {
    device_code: String,
    user_code: String,
    verification_uri: String,
    verification_uri_complete: Option<String>,
    expires_in: Duration,
    interval: Duration,
    issued_at: Instant,
    issued_at_utc: DateTime<Utc>,
}

impl DeviceCodeGrant {
    /// Machine-held credential used for polling. Never shown to the user.
    pub fn device_code(&self) -> &str {
        &self.device_code
    }

    pub fn user_code(&self) -> &str {
        &self.user_code
    }

    pub fn verification_uri(&self) -> &str {
        &self.verification_uri
    }

    /// Verification URI with the user code embedded, when the server offers one.
    pub fn verification_uri_complete(&self) -> Option<&str> {
        self.verification_uri_complete.as_deref()
    }

    pub fn expires_in(&self) -> Duration {
        self.expires_in
    }

    /// Minimum polling interval declared by the server.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn expires_at(&self) -> Instant {
        self.issued_at
            .checked_add(self.expires_in)
            .unwrap_or_else(|| self.issued_at + FAR_FUTURE)
    }

    /// Wall-clock expiry, for display.
    pub fn expires_at_utc(&self) -> DateTime<Utc> {
        chrono::Duration::from_std(self.expires_in)
            .ok()
            .and_then(|d| self.issued_at_utc.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    #[serde(alias = "verification_url")]
    verification_uri: String,
    verification_uri_complete: Option<String>,
    expires_in: u64,
    interval: u64,
}

/// Sends the initial device authorization request.
pub struct DeviceCodeRequester {
    transport: Arc<dyn FormTransport>,
    client_id: String,
    scope: String,
    device_code_url: String,
}

impl DeviceCodeRequester {
    pub fn new(transport: Arc<dyn FormTransport>, config: &DeviceFlowConfig) -> Self {
        Self {
            transport,
            client_id: config.client_id.clone(),
            scope: config.scope.clone(),
            device_code_url: config.device_code_url.clone(),
        }
    }

    pub async fn request_device_code(&self) -> Result<DeviceCodeGrant> {
        self.request_device_code_at(Instant::now()).await
    }

    /// Request a device code, anchoring the grant's expiry at `issued_at`.
    ///
    /// Not retried: any failure here ends the flow.
    pub async fn request_device_code_at(&self, issued_at: Instant) -> Result<DeviceCodeGrant> {
        let issued_at_utc = Utc::now();
        let body = self
            .transport
            .post_form(
                &self.device_code_url,
                &[
                    ("client_id", self.client_id.as_str()),
                    ("scope", self.scope.as_str()),
                ],
            )
            .await?;

        let payload: DeviceCodeResponse = match serde_json::from_str(&body) {
            Ok(payload) => payload,
            Err(e) => {
                if let Some(error) = OAuthErrorBody::parse(&body) {
                    return Err(error.into_error());
                }
                return Err(DeviceFlowError::Decode(e.to_string()));
            }
        };

        tracing::debug!(
            user_code = %payload.user_code,
            verification_uri = %payload.verification_uri,
            expires_in = payload.expires_in,
            interval = payload.interval,
            "Device code issued"
        );

        Ok(DeviceCodeGrant {
            device_code: payload.device_code,
            user_code: payload.user_code,
            verification_uri: payload.verification_uri,
            verification_uri_complete: payload.verification_uri_complete,
            expires_in: Duration::from_secs(payload.expires_in),
            interval: Duration::from_secs(payload.interval),
            issued_at,
            issued_at_utc,
        })
    }
}
