//! Liveness monitoring over each peer's dedicated heartbeat connection.
//!
//! Keep-alive traffic runs on its own channel so a player thinking about
//! a move never looks dead to the server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use actix::io::{FramedWrite, WriteHandler};
use actix::prelude::*;
use log::{debug, info, warn};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};

use crate::game::rules::color_name;
use crate::game::GameCoordinator;
use crate::models::messages::{EndGame, Terminate};
use crate::models::wire;
use crate::registry::{Role, SessionShared};
use crate::session::SharedRegistry;

pub struct HeartbeatMonitor {
    shared: Arc<SessionShared>,
    registry: SharedRegistry,
    coordinator: Addr<GameCoordinator>,
    framed: FramedWrite<String, OwnedWriteHalf, LinesCodec>,
    last_seen: Instant,
    timeout: Duration,
    poll: Duration,
    terminated: bool,
}

impl HeartbeatMonitor {
    pub fn start_monitor(
        stream: TcpStream,
        shared: Arc<SessionShared>,
        registry: SharedRegistry,
        coordinator: Addr<GameCoordinator>,
        timeout: Duration,
        poll: Duration,
    ) -> Addr<HeartbeatMonitor> {
        let (read, write) = stream.into_split();
        HeartbeatMonitor::create(|ctx| {
            ctx.add_stream(FramedRead::new(read, LinesCodec::new()));
            HeartbeatMonitor {
                shared,
                registry,
                coordinator,
                framed: FramedWrite::new(write, LinesCodec::new(), ctx),
                last_seen: Instant::now(),
                timeout,
                poll,
                terminated: false,
            }
        })
    }

    /// Declares the peer dead. Runs its effects at most once per session:
    /// the liveness flag is monotonic and only the call that clears it
    /// notifies the rest of the system.
    fn declare_dead(&mut self, ctx: &mut Context<Self>) {
        if self.terminated || !self.shared.mark_dead() {
            ctx.stop();
            return;
        }

        match self.shared.role() {
            Role::Player(color) => {
                info!(
                    "liveness lost for {} player {}, ending game",
                    color_name(color),
                    self.shared.id
                );
                self.coordinator.do_send(EndGame {
                    reason: format!(
                        "{} player lost connection",
                        color_name(color)
                    ),
                });
            }
            Role::Spectator => {
                info!("liveness lost for spectator {}, dropping it", self.shared.id);
                for seat in self.registry.remove_dead_spectators() {
                    seat.link.addr.do_send(Terminate);
                }
            }
            Role::Unassigned => {
                self.registry.remove_pending(self.shared.id);
                debug!("liveness lost for unassigned session {}", self.shared.id);
            }
        }

        ctx.stop();
    }
}

impl Actor for HeartbeatMonitor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        ctx.run_interval(self.poll, |monitor, ctx| {
            if monitor.last_seen.elapsed() > monitor.timeout {
                monitor.declare_dead(ctx);
            }
        });
    }
}

impl StreamHandler<Result<String, LinesCodecError>> for HeartbeatMonitor {
    fn handle(&mut self, item: Result<String, LinesCodecError>, ctx: &mut Self::Context) {
        match item {
            Ok(line) => {
                if line.trim() != wire::HEARTBEAT {
                    debug!(
                        "unexpected liveness line from {}: {:?}",
                        self.shared.id, line
                    );
                }
                self.last_seen = Instant::now();
            }
            Err(err) => {
                warn!("liveness channel error for {}: {}", self.shared.id, err);
                self.declare_dead(ctx);
            }
        }
    }

    fn finished(&mut self, ctx: &mut Self::Context) {
        // peer closed its liveness channel
        self.declare_dead(ctx);
    }
}

impl Handler<Terminate> for HeartbeatMonitor {
    type Result = ();

    /// Sends the secondary `GAME_END` notice and closes the channel. The
    /// actor stops once the write side drains.
    fn handle(&mut self, _: Terminate, _: &mut Self::Context) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        self.framed.write(wire::GAME_END.to_string());
        self.framed.close();
    }
}

impl WriteHandler<LinesCodecError> for HeartbeatMonitor {
    fn error(&mut self, err: LinesCodecError, _: &mut Self::Context) -> Running {
        warn!("liveness write error for {}: {}", self.shared.id, err);
        Running::Stop
    }
}
