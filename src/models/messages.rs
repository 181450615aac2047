//! Actor messages exchanged between the coordinator, the client sessions,
//! and the heartbeat monitors.

use actix::prelude::*;
use chess::Color;

use crate::models::moves::PlayerMove;
use crate::session::ClientSession;

// --- messages handled by ClientSession ---

/// Pre-serialized authoritative snapshot for this session's peer.
#[derive(Message)]
#[rtype(result = "()")]
pub struct StateUpdate(pub String);

/// It is this player's turn; ask the peer for a move.
#[derive(Message)]
#[rtype(result = "()")]
pub struct RequestMove;

/// The last submitted move was rejected; the peer will be re-asked.
#[derive(Message)]
#[rtype(result = "()")]
pub struct InvalidMove(pub String);

/// Terminal notice with a human-readable reason.
#[derive(Message)]
#[rtype(result = "()")]
pub struct GameEnd(pub String);

/// Idempotent teardown of both of a peer's channels. Handled by the
/// session actor and by its heartbeat monitor.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Terminate;

// --- messages handled by GameCoordinator ---

#[derive(Message)]
#[rtype(result = "()")]
pub struct PlayerRegistered {
    pub color: Color,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct SpectatorRegistered {
    pub addr: Addr<ClientSession>,
}

/// A move read from the current player's control channel.
#[derive(Message)]
#[rtype(result = "()")]
pub struct MoveSubmitted {
    pub color: Color,
    pub mv: PlayerMove,
}

/// A player's control channel failed or closed; equivalent to
/// resignation.
#[derive(Message)]
#[rtype(result = "()")]
pub struct SessionFailed {
    pub color: Color,
    pub reason: String,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct EndGame {
    pub reason: String,
}
