//! Error types for the device authorization flow.

use thiserror::Error;

use crate::auth::poll::ErrorCode;

/// Terminal failures of a device-flow run.
///
/// `authorization_pending` and `slow_down` never surface here; the poller
/// consumes them internally.
#[derive(Error, Debug)]
pub enum DeviceFlowError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Invalid device code response: {0}")]
    Decode(String),

    #[error("Malformed access token response: {0}")]
    MalformedResponse(String),

    #[error("Device code expired before authorization completed")]
    Expired,

    #[error("Authorization failed: {}", describe_authorization(.code, .description.as_deref(), .uri.as_deref()))]
    Authorization {
        code: ErrorCode,
        description: Option<String>,
        uri: Option<String>,
    },

    #[error("Device flow cancelled")]
    Cancelled,
}

impl DeviceFlowError {
    /// Build an authorization error from the raw provider fields.
    pub fn authorization(
        code: impl Into<ErrorCode>,
        description: Option<String>,
        uri: Option<String>,
    ) -> Self {
        Self::Authorization {
            code: code.into(),
            description,
            uri,
        }
    }

    /// Provider error code, if the provider rejected the request.
    pub fn provider_code(&self) -> Option<&ErrorCode> {
        match self {
            Self::Authorization { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Process exit status for this error at the binary boundary.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Cancelled => 130,
            Self::Configuration(_) => 2,
            _ => 1,
        }
    }
}

fn describe_authorization(code: &ErrorCode, description: Option<&str>, uri: Option<&str>) -> String {
    let mut message = code.to_string();
    if let Some(description) = description.filter(|d| !d.is_empty()) {
        message.push_str(" (");
        message.push_str(description);
        message.push(')');
    }
    if let Some(uri) = uri.filter(|u| !u.is_empty()) {
        message.push_str(" see ");
        message.push_str(uri);
    }
    message
}

impl From<reqwest::Error> for DeviceFlowError {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport(error.to_string())
    }
}

impl From<serde_json::Error> for DeviceFlowError {
    fn from(error: serde_json::Error) -> Self {
        Self::Decode(error.to_string())
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, DeviceFlowError>;
