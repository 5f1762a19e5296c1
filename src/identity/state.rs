//! Connection state of the VPN client subprocess

use std::fmt;

/// Lifecycle of the single VPN connection owned by the identity manager
///
/// ```text
/// Disconnected --rotate--> Connecting --ready + new IP--> Connected
///      ^                        |                            |
///      +-------- failure -------+                            |
///      +------------- Terminating <------- release ----------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No client process is running
    #[default]
    Disconnected,

    /// A client process was launched and has not signalled readiness yet
    Connecting,

    /// The client is ready and the public IP has been verified as changed
    Connected,

    /// The client is being shut down
    Terminating,
}

impl ConnectionState {
    /// Returns true if a client process may be alive in this state
    pub fn has_process(&self) -> bool {
        !matches!(self, Self::Disconnected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Terminating => "terminating",
        };
        write!(f, "{}", name)
    }
}
