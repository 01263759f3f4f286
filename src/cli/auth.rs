//! CLI handler for the device login.

use tokio_util::sync::CancellationToken;

use crate::config::{DeviceFlowConfig, ENV_CLIENT_ID};
use crate::error::{DeviceFlowError, Result};
use crate::flow::DeviceFlow;

/// Run the device flow from environment configuration and print the token.
pub async fn handle_login(cancel: &CancellationToken) -> Result<()> {
    let config = DeviceFlowConfig::from_env()?;
    let flow = DeviceFlow::new(config)?;
    let token = flow.run_with_cancel(cancel).await?;
    println!("access token: {}", token.access_token);
    Ok(())
}

/// Map a [`DeviceFlowError`] to a user-facing message with actionable guidance.
pub fn format_error_help(err: &DeviceFlowError) -> String {
    match err {
        DeviceFlowError::Configuration(msg) => {
            format!("{msg}. Set {ENV_CLIENT_ID} (and optionally DEVGRANT_SCOPE) in the environment or .env")
        }
        DeviceFlowError::Expired => {
            "The device code expired before it was entered. Run devgrant again for a new code".to_string()
        }
        DeviceFlowError::Cancelled => "Cancelled".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_help_names_client_id_variable() {
        let help = format_error_help(&DeviceFlowError::Configuration("missing".into()));
        assert!(help.contains("DEVGRANT_CLIENT_ID"));
    }

    #[test]
    fn expired_help_suggests_rerun() {
        assert!(format_error_help(&DeviceFlowError::Expired).contains("again"));
    }

    #[test]
    fn authorization_falls_through_to_display() {
        let err = DeviceFlowError::authorization("access_denied", Some("nope".into()), None);
        assert_eq!(
            format_error_help(&err),
            "Authorization failed: access_denied (nope)"
        );
    }
}
