/// Authoritative snapshot of one game, as broadcast to every session.
///
/// The coordinator replaces the whole snapshot after each applied move
/// instead of mutating it in place, so a broadcast can never observe a
/// half-updated board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSnapshot {
    /// Piece codes (`wpawn`, `bking`, ...) indexed `[row][col]`, row 0 =
    /// rank 8.
    pub board: [[Option<String>; 8]; 8],
    pub white_turn: bool,
    pub white_in_check: bool,
    pub black_in_check: bool,
    pub game_over: bool,
    pub winner: Option<Winner>,
    pub move_count: u32,
    pub last_move: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    White,
    Black,
    Draw,
}

impl Winner {
    pub fn as_str(self) -> &'static str {
        match self {
            Winner::White => "white",
            Winner::Black => "black",
            Winner::Draw => "draw",
        }
    }
}

impl GameSnapshot {
    /// Blank board, white to move. Starting point for deserialization and
    /// tests; live snapshots are built by the rule engine.
    pub fn empty() -> GameSnapshot {
        GameSnapshot {
            board: std::array::from_fn(|_| std::array::from_fn(|_| None)),
            white_turn: true,
            white_in_check: false,
            black_in_check: false,
            game_over: false,
            winner: None,
            move_count: 0,
            last_move: None,
        }
    }
}
