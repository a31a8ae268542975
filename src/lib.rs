use anyhow::{Context, Result};
use sysinfo::System;

pub mod command;
pub mod gpu;
pub mod info;
pub mod platform;

pub use platform::Platform;

#[derive(Debug, Clone, serde::Serialize)]
pub struct HostInfo {
    pub hostname: String,
    pub user: String,
    pub os: String,
    pub os_version: String,
    pub platform: Platform,
    pub architecture: &'static str,
}

impl HostInfo {
    /// Create a new [`HostInfo`] describing the current machine.
    pub fn new() -> Result<Self> {
        let hostname = hostname::get().context("could not read the hostname")?;
        Ok(Self {
            hostname: hostname.to_string_lossy().to_string(),
            user: current_user().unwrap_or("?".to_string()),
            os: System::name().unwrap_or("?".to_string()),
            os_version: System::os_version().unwrap_or("?".to_string()),
            platform: Platform::current(),
            architecture: std::env::consts::ARCH,
        })
    }
}

#[cfg(unix)]
fn current_user() -> Option<String> {
    users::get_current_username().map(|u| u.to_string_lossy().to_string())
}

#[cfg(not(unix))]
fn current_user() -> Option<String> {
    std::env::var("USERNAME").ok()
}

/// Installs the global `tracing` subscriber.
///
/// Logs go to stderr. `RUST_LOG` overrides `default_filter`.
pub fn init_logging(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
