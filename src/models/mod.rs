pub mod game_state;
pub mod messages;
pub mod moves;
pub mod wire;

pub use game_state::{GameSnapshot, Winner};
pub use moves::{BoardPos, NormalMove, PlayerMove};
