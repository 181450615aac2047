//! Thread-safe rosters of connected sessions.
//!
//! The registry is an explicitly owned object shared by `Arc`, never a
//! global. Role admission and roster mutation happen under the roster
//! lock, so at most two player seats can ever be handed out even when
//! connection attempts race each other.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chess::Color;
use uuid::Uuid;

/// Role assigned to a connection during the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Unassigned,
    Player(Color),
    Spectator,
}

/// State shared between a session's control actor, its heartbeat monitor,
/// and the coordinator.
#[derive(Debug)]
pub struct SessionShared {
    pub id: Uuid,
    role: Mutex<Role>,
    alive: AtomicBool,
}

impl SessionShared {
    pub fn new() -> SessionShared {
        SessionShared {
            id: Uuid::new_v4(),
            role: Mutex::new(Role::Unassigned),
            alive: AtomicBool::new(true),
        }
    }

    pub fn role(&self) -> Role {
        *self.role.lock().unwrap()
    }

    pub(crate) fn set_role(&self, role: Role) {
        *self.role.lock().unwrap() = role;
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Clears the liveness flag. The flag is monotonic: it only ever goes
    /// from alive to dead. Returns true for the one call that performed
    /// the transition.
    pub fn mark_dead(&self) -> bool {
        self.alive.swap(false, Ordering::SeqCst)
    }
}

impl Default for SessionShared {
    fn default() -> Self {
        Self::new()
    }
}

/// One roster entry: the shared session state plus whatever handle the
/// owner needs to reach the connection (actor addresses in the server,
/// nothing in unit tests).
pub struct Seat<H> {
    pub shared: std::sync::Arc<SessionShared>,
    pub link: H,
}

impl<H: Clone> Clone for Seat<H> {
    fn clone(&self) -> Self {
        Seat {
            shared: self.shared.clone(),
            link: self.link.clone(),
        }
    }
}

pub struct SessionRegistry<H> {
    players: Mutex<Vec<Seat<H>>>,
    spectators: Mutex<Vec<Seat<H>>>,
    /// Connected sessions that have not taken a role yet. Tracked so the
    /// termination sequence can close them instead of leaving their
    /// sockets open.
    pending: Mutex<Vec<Seat<H>>>,
}

impl<H> Default for SessionRegistry<H> {
    fn default() -> Self {
        SessionRegistry {
            players: Mutex::new(Vec::new()),
            spectators: Mutex::new(Vec::new()),
            pending: Mutex::new(Vec::new()),
        }
    }
}

impl<H: Clone> SessionRegistry<H> {
    pub fn new() -> SessionRegistry<H> {
        SessionRegistry::default()
    }

    /// Atomically admits a player: white for the first seat, black for the
    /// second, `None` when both seats are taken. The color choice and the
    /// size check happen under one lock.
    pub fn register_player(&self, seat: Seat<H>) -> Option<Color> {
        let mut players = self.players.lock().unwrap();
        if players.len() >= 2 {
            return None;
        }
        let has_white = players
            .iter()
            .any(|seat| seat.shared.role() == Role::Player(Color::White));
        let color = if has_white { Color::Black } else { Color::White };
        seat.shared.set_role(Role::Player(color));
        self.remove_pending(seat.shared.id);
        players.push(seat);
        Some(color)
    }

    /// Spectator admission never fails; the spectator roster is unbounded.
    pub fn register_spectator(&self, seat: Seat<H>) {
        seat.shared.set_role(Role::Spectator);
        self.remove_pending(seat.shared.id);
        self.spectators.lock().unwrap().push(seat);
    }

    pub fn register_pending(&self, seat: Seat<H>) {
        self.pending.lock().unwrap().push(seat);
    }

    pub fn remove_pending(&self, id: Uuid) {
        self.pending
            .lock()
            .unwrap()
            .retain(|seat| seat.shared.id != id);
    }

    /// Drains the roleless sessions for the termination sequence.
    pub fn take_pending(&self) -> Vec<Seat<H>> {
        std::mem::take(&mut *self.pending.lock().unwrap())
    }

    pub fn player_count(&self) -> usize {
        self.players.lock().unwrap().len()
    }

    pub fn player_for(&self, color: Color) -> Option<Seat<H>> {
        self.players
            .lock()
            .unwrap()
            .iter()
            .find(|seat| seat.shared.role() == Role::Player(color))
            .cloned()
    }

    pub fn players(&self) -> Vec<Seat<H>> {
        self.players.lock().unwrap().clone()
    }

    pub fn spectators(&self) -> Vec<Seat<H>> {
        self.spectators.lock().unwrap().clone()
    }

    /// Drops spectators whose liveness flag has been cleared, returning
    /// the removed seats so the caller can terminate their sessions.
    pub fn remove_dead_spectators(&self) -> Vec<Seat<H>> {
        let mut spectators = self.spectators.lock().unwrap();
        let mut removed = Vec::new();
        spectators.retain(|seat| {
            if seat.shared.is_alive() {
                true
            } else {
                removed.push(seat.clone());
                false
            }
        });
        removed
    }

    pub fn remove_spectator(&self, id: Uuid) {
        self.spectators
            .lock()
            .unwrap()
            .retain(|seat| seat.shared.id != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn seat() -> Seat<()> {
        Seat {
            shared: Arc::new(SessionShared::new()),
            link: (),
        }
    }

    #[test]
    fn first_two_players_get_colors_third_is_rejected() {
        let registry: SessionRegistry<()> = SessionRegistry::default();
        assert_eq!(registry.register_player(seat()), Some(Color::White));
        assert_eq!(registry.register_player(seat()), Some(Color::Black));
        assert_eq!(registry.register_player(seat()), None);
        assert_eq!(registry.player_count(), 2);
    }

    #[test]
    fn concurrent_admission_caps_at_two_players() {
        let registry: Arc<SessionRegistry<()>> = Arc::new(SessionRegistry::default());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.register_player(seat()))
            })
            .collect();

        let admitted: Vec<Color> = handles
            .into_iter()
            .filter_map(|handle| handle.join().unwrap())
            .collect();

        assert_eq!(admitted.len(), 2);
        assert!(admitted.contains(&Color::White));
        assert!(admitted.contains(&Color::Black));
        assert_eq!(registry.player_count(), 2);
    }

    #[test]
    fn player_lookup_by_color() {
        let registry: SessionRegistry<()> = SessionRegistry::default();
        let white = seat();
        let white_id = white.shared.id;
        registry.register_player(white);
        registry.register_player(seat());

        assert_eq!(
            registry.player_for(Color::White).unwrap().shared.id,
            white_id
        );
        assert!(registry.player_for(Color::Black).is_some());
    }

    #[test]
    fn spectator_roster_is_unbounded_and_filters_dead_sessions() {
        let registry: SessionRegistry<()> = SessionRegistry::default();
        for _ in 0..10 {
            registry.register_spectator(seat());
        }
        assert_eq!(registry.spectators().len(), 10);

        let dead = registry.spectators()[3].clone();
        assert!(dead.shared.mark_dead());
        assert!(!dead.shared.mark_dead());

        let removed = registry.remove_dead_spectators();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].shared.id, dead.shared.id);
        assert_eq!(registry.spectators().len(), 9);
    }

    #[test]
    fn taking_a_role_leaves_the_pending_roster() {
        let registry: SessionRegistry<()> = SessionRegistry::default();

        let player = seat();
        let watcher = seat();
        let idle = seat();
        registry.register_pending(player.clone());
        registry.register_pending(watcher.clone());
        registry.register_pending(idle.clone());

        registry.register_player(player);
        registry.register_spectator(watcher);

        let leftover = registry.take_pending();
        assert_eq!(leftover.len(), 1);
        assert_eq!(leftover[0].shared.id, idle.shared.id);
        assert!(registry.take_pending().is_empty());
    }

    #[test]
    fn spectator_can_be_removed_by_id() {
        let registry: SessionRegistry<()> = SessionRegistry::default();
        let watcher = seat();
        let id = watcher.shared.id;
        registry.register_spectator(watcher);
        registry.register_spectator(seat());

        registry.remove_spectator(id);
        assert_eq!(registry.spectators().len(), 1);
        assert!(registry.spectators().iter().all(|seat| seat.shared.id != id));
    }
}
