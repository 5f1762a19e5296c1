//! Network identity module
//!
//! Outbound requests are routed through a VPN client subprocess so the
//! crawler's apparent address can be rotated. This module owns that
//! subprocess:
//! - Launching the client against a randomly chosen server
//! - Waiting for the client's readiness marker
//! - Verifying that the public IP actually changed
//! - Terminating the client gracefully, escalating to a forced kill

mod manager;
mod resolver;
mod state;

pub use manager::{IdentitySettings, NetworkIdentityManager, READINESS_MARKER};
pub use resolver::PublicIpResolver;
pub use state::ConnectionState;

use std::time::Duration;
use thiserror::Error;

/// Errors raised while rotating or releasing the network identity
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Failed to launch VPN client {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out after {timeout:?} waiting for VPN server {server}")]
    ConnectionTimeout { server: u32, timeout: Duration },

    #[error("VPN client for server {server} stopped before connecting ({status}): {stderr}")]
    ConnectionFailed {
        server: u32,
        status: String,
        stderr: String,
    },

    #[error("Public IP {ip} did not change after connecting")]
    IdentityUnchanged { ip: String },

    #[error("VPN client (pid {pid}) ignored terminate for {waited:?} and was force-killed")]
    ForceKill { pid: u32, waited: Duration },

    #[error("Failed to resolve public IP: {0}")]
    IpLookup(String),
}
