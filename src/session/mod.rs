pub mod client;
pub mod heartbeat;

pub use client::{ClientSession, SessionLink, SharedRegistry};
pub use heartbeat::HeartbeatMonitor;
