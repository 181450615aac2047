//! Server-side representative of one remote peer's control channel.
//!
//! The session actor runs the role handshake, forwards move lines to the
//! coordinator while a move is outstanding, and pushes one-way notices
//! (state updates, invalid-move and game-end lines) back to the peer.

use std::sync::Arc;

use actix::io::{FramedWrite, WriteHandler};
use actix::prelude::*;
use chess::Color;
use log::{debug, info, warn};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};

use crate::game::rules::color_name;
use crate::game::GameCoordinator;
use crate::models::messages::{
    GameEnd, InvalidMove, MoveSubmitted, PlayerRegistered, RequestMove, SessionFailed,
    SpectatorRegistered, StateUpdate, Terminate,
};
use crate::models::moves::PlayerMove;
use crate::models::wire;
use crate::registry::{Role, Seat, SessionRegistry, SessionShared};
use crate::session::HeartbeatMonitor;

/// Addresses the rest of the system needs to reach one connection.
#[derive(Clone)]
pub struct SessionLink {
    pub addr: Addr<ClientSession>,
    pub heartbeat: Addr<HeartbeatMonitor>,
}

pub type SharedRegistry = Arc<SessionRegistry<SessionLink>>;

pub struct ClientSession {
    shared: Arc<SessionShared>,
    registry: SharedRegistry,
    coordinator: Addr<GameCoordinator>,
    heartbeat: Addr<HeartbeatMonitor>,
    framed: FramedWrite<String, OwnedWriteHalf, LinesCodec>,
    awaiting_move: bool,
    terminated: bool,
}

impl ClientSession {
    pub fn start_session(
        stream: TcpStream,
        shared: Arc<SessionShared>,
        registry: SharedRegistry,
        coordinator: Addr<GameCoordinator>,
        heartbeat: Addr<HeartbeatMonitor>,
    ) -> Addr<ClientSession> {
        let (read, write) = stream.into_split();
        ClientSession::create(|ctx| {
            ctx.add_stream(FramedRead::new(read, LinesCodec::new()));
            ClientSession {
                shared,
                registry,
                coordinator,
                heartbeat,
                framed: FramedWrite::new(write, LinesCodec::new(), ctx),
                awaiting_move: false,
                terminated: false,
            }
        })
    }

    fn send_line(&mut self, line: impl Into<String>) {
        self.framed.write(line.into());
    }

    fn handle_role_request(&mut self, line: &str, ctx: &mut Context<Self>) {
        let seat = Seat {
            shared: self.shared.clone(),
            link: SessionLink {
                addr: ctx.address(),
                heartbeat: self.heartbeat.clone(),
            },
        };

        match line {
            wire::ROLE_PLAYER => match self.registry.register_player(seat) {
                Some(color) => {
                    info!(
                        "session {} admitted as {} player",
                        self.shared.id,
                        color_name(color)
                    );
                    self.send_line(wire::ACK_OK);
                    self.send_line(color_name(color));
                    self.coordinator.do_send(PlayerRegistered { color });
                }
                None => {
                    info!(
                        "session {} asked for a player seat, but both are taken",
                        self.shared.id
                    );
                    self.send_line(wire::ACK_NOT_OK);
                }
            },
            wire::ROLE_SPECTATOR => {
                info!("session {} admitted as spectator", self.shared.id);
                self.registry.register_spectator(seat);
                self.send_line(wire::ACK_OK);
                self.coordinator.do_send(SpectatorRegistered {
                    addr: ctx.address(),
                });
            }
            other => {
                warn!(
                    "session {} sent an invalid role request {:?}",
                    self.shared.id, other
                );
                self.send_line(wire::ACK_NOT_OK);
            }
        }
    }

    fn handle_player_line(&mut self, color: Color, line: &str) {
        if !self.awaiting_move {
            debug!(
                "{} player sent {:?} while no move was requested, ignoring",
                color_name(color),
                line
            );
            return;
        }
        self.awaiting_move = false;
        self.coordinator.do_send(MoveSubmitted {
            color,
            mv: PlayerMove::parse(line),
        });
    }
}

impl Actor for ClientSession {
    type Context = Context<Self>;

    fn started(&mut self, _: &mut Self::Context) {
        info!("control channel open for session {}", self.shared.id);
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        if self.terminated {
            return Running::Stop;
        }
        // the channel went away without a coordinated teardown
        match self.shared.role() {
            Role::Player(color) => {
                self.coordinator.do_send(SessionFailed {
                    color,
                    reason: "control connection lost".to_string(),
                });
            }
            Role::Spectator => {
                self.shared.mark_dead();
                self.registry.remove_spectator(self.shared.id);
                info!("spectator {} disconnected", self.shared.id);
            }
            Role::Unassigned => {
                self.shared.mark_dead();
                self.registry.remove_pending(self.shared.id);
                info!("session {} left before taking a role", self.shared.id);
            }
        }
        Running::Stop
    }
}

impl StreamHandler<Result<String, LinesCodecError>> for ClientSession {
    fn handle(&mut self, item: Result<String, LinesCodecError>, ctx: &mut Self::Context) {
        match item {
            Ok(line) => {
                let line = line.trim().to_string();
                match self.shared.role() {
                    Role::Unassigned => self.handle_role_request(&line, ctx),
                    Role::Player(color) => self.handle_player_line(color, &line),
                    Role::Spectator => {
                        debug!("spectator {} sent {:?}, ignoring", self.shared.id, line)
                    }
                }
            }
            Err(err) => {
                warn!("control channel error for {}: {}", self.shared.id, err);
                ctx.stop();
            }
        }
    }
}

impl Handler<RequestMove> for ClientSession {
    type Result = ();

    fn handle(&mut self, _: RequestMove, _: &mut Self::Context) {
        self.awaiting_move = true;
        self.send_line(wire::REQUEST_MOVE);
    }
}

impl Handler<StateUpdate> for ClientSession {
    type Result = ();

    fn handle(&mut self, msg: StateUpdate, _: &mut Self::Context) {
        self.send_line(wire::GAME_STATE_UPDATE);
        self.send_line(msg.0);
    }
}

impl Handler<InvalidMove> for ClientSession {
    type Result = ();

    fn handle(&mut self, msg: InvalidMove, _: &mut Self::Context) {
        self.send_line(wire::INVALID_MOVE);
        self.send_line(msg.0);
    }
}

impl Handler<GameEnd> for ClientSession {
    type Result = ();

    fn handle(&mut self, msg: GameEnd, _: &mut Self::Context) {
        self.send_line(wire::GAME_END);
        self.send_line(msg.0);
    }
}

impl Handler<Terminate> for ClientSession {
    type Result = ();

    fn handle(&mut self, _: Terminate, _: &mut Self::Context) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        self.heartbeat.do_send(Terminate);
        self.framed.close();
    }
}

impl WriteHandler<LinesCodecError> for ClientSession {
    /// Push failures stay local to this peer; the broadcast loop never
    /// sees them.
    fn error(&mut self, err: LinesCodecError, _: &mut Self::Context) -> Running {
        warn!("control write error for {}: {}", self.shared.id, err);
        Running::Stop
    }
}
