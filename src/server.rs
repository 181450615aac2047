//! TCP front door: accepts control connections, runs the two-channel
//! handshake, and wires each peer up to the coordinator.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use actix::prelude::*;
use log::{error, info, warn};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::game::GameCoordinator;
use crate::models::wire;
use crate::registry::{Seat, SessionRegistry, SessionShared};
use crate::session::{ClientSession, HeartbeatMonitor, SessionLink, SharedRegistry};

/// How long a freshly connected peer gets to dial back on its
/// advertised liveness port before the connection is dropped.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct GameServer {
    listener: TcpListener,
    config: ServerConfig,
    registry: SharedRegistry,
    coordinator: Addr<GameCoordinator>,
    shutdown: CancellationToken,
}

impl GameServer {
    pub async fn bind(config: ServerConfig) -> io::Result<GameServer> {
        let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
        let registry: SharedRegistry = Arc::new(SessionRegistry::new());
        let shutdown = CancellationToken::new();
        let coordinator =
            GameCoordinator::new(Arc::clone(&registry), shutdown.clone()).start();
        Ok(GameServer {
            listener,
            config,
            registry,
            coordinator,
            shutdown,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts peers until the game ends or the process is interrupted.
    /// Each handshake runs in its own task, so a peer slow to open its
    /// liveness channel never stalls other admissions.
    pub async fn run(self) -> io::Result<()> {
        info!("listening on {}", self.local_addr()?);
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("game finished, closing listener");
                    return Ok(());
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupted, shutting down");
                    self.coordinator.do_send(crate::models::messages::EndGame {
                        reason: "server shutting down".to_string(),
                    });
                    self.shutdown.cancelled().await;
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = accepted?;
                    info!("connection from {}", peer);
                    let host = self.config.host.clone();
                    let registry = Arc::clone(&self.registry);
                    let coordinator = self.coordinator.clone();
                    let timeout = self.config.heartbeat_timeout();
                    let poll = self.config.heartbeat_poll();
                    actix_rt::spawn(async move {
                        let handshake =
                            setup_connection(stream, host, registry, coordinator, timeout, poll);
                        if let Err(err) = handshake.await {
                            warn!("handshake with {} failed: {}", peer, err);
                        }
                    });
                }
            }
        }
    }
}

/// Opens the peer's dedicated liveness channel, then starts both actors
/// for it. The role request itself is handled by the session actor once
/// its line stream is live.
async fn setup_connection(
    mut stream: TcpStream,
    host: String,
    registry: SharedRegistry,
    coordinator: Addr<GameCoordinator>,
    timeout: Duration,
    poll: Duration,
) -> io::Result<()> {
    let hb_listener = TcpListener::bind((host.as_str(), 0)).await?;
    let hb_port = hb_listener.local_addr()?.port();

    let line = format!("{}{}\n", wire::HEARTBEAT_PORT_PREFIX, hb_port);
    stream.write_all(line.as_bytes()).await?;

    let accept = tokio::time::timeout(HANDSHAKE_TIMEOUT, hb_listener.accept()).await;
    let (hb_stream, _) = match accept {
        Ok(result) => result?,
        Err(_) => {
            error!("peer never opened its liveness channel on port {}", hb_port);
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "liveness channel not opened",
            ));
        }
    };

    let shared = Arc::new(SessionShared::new());
    let heartbeat = HeartbeatMonitor::start_monitor(
        hb_stream,
        Arc::clone(&shared),
        Arc::clone(&registry),
        coordinator.clone(),
        timeout,
        poll,
    );
    let addr = ClientSession::start_session(
        stream,
        Arc::clone(&shared),
        Arc::clone(&registry),
        coordinator,
        heartbeat.clone(),
    );
    registry.register_pending(Seat {
        shared,
        link: SessionLink { addr, heartbeat },
    });
    Ok(())
}
