//! devgrant: OAuth 2.0 Device Authorization Grant (RFC 8628) client.
//!
//! Requests a device/user code pair, shows it to the user and polls the
//! token endpoint until the user approves in a browser, the code expires, or
//! the provider rejects the request.
//!
//! # Quick Start
//!
//! ```no_run
//! use devgrant::config::DeviceFlowConfig;
//! use devgrant::flow::DeviceFlow;
//!
//! # async fn example() -> devgrant::error::Result<()> {
//! let config = DeviceFlowConfig::new("Iv1.0123456789abcdef").with_scope("read:user");
//! let token = DeviceFlow::new(config)?.run().await?;
//! println!("{}", token.access_token);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod flow;
pub mod http;

#[cfg(feature = "cli")]
pub mod cli;
