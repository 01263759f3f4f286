//! Device flow orchestration: request a code, show it, poll for the token.

use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::auth::{AccessToken, AccessTokenPoller, DeviceCodeGrant, DeviceCodeRequester};
use crate::config::DeviceFlowConfig;
use crate::error::{DeviceFlowError, Result};
use crate::http::{FormTransport, ReqwestTransport};

/// Shows the verification URI and user code to the user.
pub trait VerificationPrompt: Send + Sync {
    fn show(&self, grant: &DeviceCodeGrant);
}

/// Prints the verification instructions to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutPrompt;

impl VerificationPrompt for StdoutPrompt {
    fn show(&self, grant: &DeviceCodeGrant) {
        println!(
            "Open {} in your browser and enter this code:",
            grant.verification_uri()
        );
        println!("{}", grant.user_code());
        if let Some(complete) = grant.verification_uri_complete() {
            println!("Or open {complete} to skip typing the code.");
        }
        println!(
            "The code expires at {}.",
            grant.expires_at_utc().format("%H:%M:%S UTC")
        );
    }
}

/// One device authorization run.
///
/// # Example
/// ```no_run
/// use devgrant::config::DeviceFlowConfig;
/// use devgrant::flow::DeviceFlow;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> devgrant::error::Result<()> {
/// let flow = DeviceFlow::new(DeviceFlowConfig::from_env()?)?;
/// let cancel = CancellationToken::new();
/// let token = flow.run_with_cancel(&cancel).await?;
/// # Ok(())
/// # }
/// ```
pub struct DeviceFlow {
    config: DeviceFlowConfig,
    requester: DeviceCodeRequester,
    poller: AccessTokenPoller,
    prompt: Arc<dyn VerificationPrompt>,
}

impl DeviceFlow {
    /// Validate `config` and build a flow over a `reqwest` transport.
    pub fn new(config: DeviceFlowConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::from_config(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: DeviceFlowConfig, transport: Arc<dyn FormTransport>) -> Self {
        Self {
            requester: DeviceCodeRequester::new(transport.clone(), &config),
            poller: AccessTokenPoller::new(transport, &config),
            config,
            prompt: Arc::new(StdoutPrompt),
        }
    }

    pub fn with_prompt(mut self, prompt: Arc<dyn VerificationPrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn config(&self) -> &DeviceFlowConfig {
        &self.config
    }

    pub async fn run(&self) -> Result<AccessToken> {
        self.run_with_cancel(&CancellationToken::new()).await
    }

    /// Run the whole flow. Errors from either stage are returned unchanged.
    pub async fn run_with_cancel(&self, cancel: &CancellationToken) -> Result<AccessToken> {
        // expiry counts from the moment the code was requested
        let issued_at = Instant::now();
        let grant = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DeviceFlowError::Cancelled),
            grant = self.requester.request_device_code_at(issued_at) => grant?,
        };

        self.prompt.show(&grant);
        tracing::info!(
            verification_uri = %grant.verification_uri(),
            expires_in_secs = grant.expires_in().as_secs(),
            "Waiting for user authorization"
        );

        let interval = grant.interval().saturating_add(self.config.interval_padding);
        self.poller
            .poll_with_cancel(grant.device_code(), interval, grant.expires_at(), cancel)
            .await
    }
}
