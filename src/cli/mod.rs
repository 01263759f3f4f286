//! CLI entry point for devgrant.

pub mod auth;

use clap::Parser;

/// Authorize this device with an OAuth provider and print the access token.
///
/// Configuration comes from `DEVGRANT_*` environment variables (or a `.env`
/// file); see `devgrant::config`.
#[derive(Parser, Debug)]
#[command(
    name = "devgrant",
    version,
    about = "OAuth 2.0 device authorization grant client"
)]
pub struct Cli {}
