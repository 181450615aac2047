use std::time::Duration;

use clap::Parser;

/// Command-line configuration for the session server.
#[derive(Parser, Debug, Clone)]
#[command(name = "chess-session-server", about = "Two-player networked chess session server")]
pub struct ServerConfig {
    /// Address to bind the control listener on.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Control listener port.
    #[arg(long, default_value_t = 10_000)]
    pub port: u16,

    /// A peer silent on its liveness channel for longer than this is
    /// declared dead.
    #[arg(long, default_value_t = 12_000)]
    pub heartbeat_timeout_ms: u64,

    /// How often each liveness monitor checks for silence.
    #[arg(long, default_value_t = 1_000)]
    pub heartbeat_poll_ms: u64,
}

impl ServerConfig {
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }

    pub fn heartbeat_poll(&self) -> Duration {
        Duration::from_millis(self.heartbeat_poll_ms)
    }
}
