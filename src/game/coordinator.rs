//! The authoritative game loop.
//!
//! One coordinator actor owns the rule engine and the current snapshot.
//! Sessions submit moves as messages, so turn sequencing needs no locks:
//! only one move request is ever outstanding, and anything arriving out
//! of turn is dropped on the floor.

use std::sync::atomic::{AtomicBool, Ordering};

use actix::prelude::*;
use chess::Color;
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::game::rules::{color_name, PositionStatus, RuleEngine};
use crate::models::game_state::GameSnapshot;
use crate::models::messages::{
    EndGame, GameEnd, InvalidMove, MoveSubmitted, PlayerRegistered, RequestMove, SessionFailed,
    SpectatorRegistered, StateUpdate, Terminate,
};
use crate::models::moves::{NormalMove, PlayerMove};
use crate::models::wire;
use crate::session::SharedRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    WaitingForPlayers,
    InProgress { turn: Color },
    GameOver,
    Terminated,
}

pub struct GameCoordinator {
    registry: SharedRegistry,
    rules: RuleEngine,
    /// Current authoritative snapshot; `None` until the game starts.
    /// Replaced wholesale after every applied move.
    snapshot: Option<GameSnapshot>,
    phase: Phase,
    /// Compare-and-set guard: the termination sequence runs exactly once
    /// no matter how many paths (natural game end, liveness timeout,
    /// operator shutdown) race into it.
    finished: AtomicBool,
    shutdown: CancellationToken,
}

impl GameCoordinator {
    pub fn new(registry: SharedRegistry, shutdown: CancellationToken) -> GameCoordinator {
        GameCoordinator {
            registry,
            rules: RuleEngine::new(),
            snapshot: None,
            phase: Phase::WaitingForPlayers,
            finished: AtomicBool::new(false),
            shutdown,
        }
    }

    /// Fires exactly once, on the second player registration.
    fn start_game(&mut self) {
        info!("both players seated, game starting");
        let snapshot = self.rules.snapshot(0, None);
        self.broadcast_snapshot(&snapshot);
        self.snapshot = Some(snapshot);
        self.phase = Phase::InProgress { turn: Color::White };
        self.request_move(Color::White);
    }

    fn request_move(&mut self, color: Color) {
        let Some(seat) = self.registry.player_for(color) else {
            self.end_game(format!("{} player is missing", color_name(color)));
            return;
        };
        if !seat.shared.is_alive() {
            self.end_game(format!("{} player lost connection", color_name(color)));
            return;
        }
        seat.link.addr.do_send(RequestMove);
    }

    /// Dispatches one snapshot to every roster entry. Each session gets
    /// its own mailbox delivery, so a slow or dead peer cannot stall the
    /// loop, and per-peer failures stay behind the session boundary.
    fn broadcast_snapshot(&self, snapshot: &GameSnapshot) {
        for seat in self.registry.remove_dead_spectators() {
            seat.link.addr.do_send(Terminate);
        }
        let payload = wire::serialize_snapshot(snapshot);
        let audience = self
            .registry
            .players()
            .into_iter()
            .chain(self.registry.spectators());
        for seat in audience {
            seat.link.addr.do_send(StateUpdate(payload.clone()));
        }
    }

    fn notify_invalid(&mut self, color: Color, reason: String) {
        info!("rejecting move from {}: {}", color_name(color), reason);
        if let Some(seat) = self.registry.player_for(color) {
            seat.link.addr.do_send(InvalidMove(reason));
        }
        self.request_move(color);
    }

    fn apply_move(&mut self, turn: Color, mv: NormalMove) {
        let notation = match self.rules.apply(&mv) {
            Ok(notation) => notation,
            Err(reason) => {
                self.notify_invalid(turn, reason);
                return;
            }
        };

        let move_count = self.snapshot.as_ref().map_or(0, |s| s.move_count) + 1;
        let snapshot = self.rules.snapshot(move_count, Some(notation.clone()));
        info!(
            "{} played {} (move {})",
            color_name(turn),
            notation,
            move_count
        );
        self.broadcast_snapshot(&snapshot);
        self.snapshot = Some(snapshot);

        match self.rules.position_status() {
            PositionStatus::Ongoing => {
                let next = !turn;
                self.phase = Phase::InProgress { turn: next };
                self.request_move(next);
            }
            PositionStatus::Checkmate { winner } => {
                self.end_game(format!("checkmate, {} wins", color_name(winner)));
            }
            PositionStatus::Stalemate => {
                self.end_game("draw by stalemate".to_string());
            }
            PositionStatus::InsufficientMaterial => {
                self.end_game("draw by insufficient material".to_string());
            }
        }
    }

    /// The single termination sequence: notify and tear down players
    /// first, then spectators, then release the listener.
    fn end_game(&mut self, reason: String) {
        if self.finished.swap(true, Ordering::SeqCst) {
            debug!("endGame re-entered ({}), already terminating", reason);
            return;
        }
        info!("game over: {}", reason);
        self.phase = Phase::GameOver;

        for seat in self.registry.players() {
            seat.link.addr.do_send(GameEnd(reason.clone()));
            seat.link.addr.do_send(Terminate);
        }
        for seat in self.registry.spectators() {
            seat.link.addr.do_send(GameEnd(reason.clone()));
            seat.link.addr.do_send(Terminate);
        }
        // roleless sessions hold open sockets too
        for seat in self.registry.take_pending() {
            seat.link.addr.do_send(GameEnd(reason.clone()));
            seat.link.addr.do_send(Terminate);
        }

        self.shutdown.cancel();
        self.phase = Phase::Terminated;
    }

    fn forfeit(&mut self, loser: Color, cause: &str) {
        let reason = match self.phase {
            Phase::InProgress { .. } => format!(
                "{} {}; {} wins",
                color_name(loser),
                cause,
                color_name(!loser)
            ),
            _ => format!("{} {}", color_name(loser), cause),
        };
        self.end_game(reason);
    }
}

impl Actor for GameCoordinator {
    type Context = Context<Self>;
}

impl Handler<PlayerRegistered> for GameCoordinator {
    type Result = ();

    fn handle(&mut self, msg: PlayerRegistered, _: &mut Self::Context) {
        info!("{} player registered", color_name(msg.color));
        if self.phase == Phase::WaitingForPlayers && self.registry.player_count() == 2 {
            self.start_game();
        }
    }
}

impl Handler<SpectatorRegistered> for GameCoordinator {
    type Result = ();

    /// A spectator joining mid-game gets the current snapshot right away
    /// instead of waiting for the next move.
    fn handle(&mut self, msg: SpectatorRegistered, _: &mut Self::Context) {
        if let Some(snapshot) = &self.snapshot {
            msg.addr
                .do_send(StateUpdate(wire::serialize_snapshot(snapshot)));
        }
    }
}

impl Handler<MoveSubmitted> for GameCoordinator {
    type Result = ();

    fn handle(&mut self, msg: MoveSubmitted, _: &mut Self::Context) {
        let Phase::InProgress { turn } = self.phase else {
            debug!(
                "ignoring move from {} outside an active game",
                color_name(msg.color)
            );
            return;
        };
        if msg.color != turn {
            warn!(
                "ignoring move from {} while it is {}'s turn",
                color_name(msg.color),
                color_name(turn)
            );
            return;
        }
        // the sender may have been declared dead while its move was in
        // flight; a dead player's move never reaches the board
        match self.registry.player_for(turn) {
            Some(seat) if seat.shared.is_alive() => {}
            _ => {
                self.end_game(format!("{} player lost connection", color_name(turn)));
                return;
            }
        }

        match msg.mv {
            PlayerMove::Normal(mv) => self.apply_move(turn, mv),
            PlayerMove::Resign => self.forfeit(turn, "resigned"),
            PlayerMove::Error { input } => {
                // unparseable input costs the sender a retry, not the game
                self.notify_invalid(turn, format!("could not parse move {:?}", input));
            }
        }
    }
}

impl Handler<SessionFailed> for GameCoordinator {
    type Result = ();

    fn handle(&mut self, msg: SessionFailed, _: &mut Self::Context) {
        self.forfeit(msg.color, &msg.reason);
    }
}

impl Handler<EndGame> for GameCoordinator {
    type Result = ();

    fn handle(&mut self, msg: EndGame, _: &mut Self::Context) {
        self.end_game(msg.reason);
    }
}
