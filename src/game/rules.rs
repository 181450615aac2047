//! Seam around the `chess` crate. The session engine treats legality,
//! check detection, and game-over verdicts as black-box questions and
//! never inspects piece movement rules itself.

use chess::{Board, BoardStatus, ChessMove, Color, File, Game, Piece, Rank, Square};

use crate::models::game_state::{GameSnapshot, Winner};
use crate::models::moves::{BoardPos, NormalMove, Promotion};

/// Verdict on the current position, asked after every applied move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionStatus {
    Ongoing,
    Checkmate { winner: Color },
    Stalemate,
    InsufficientMaterial,
}

pub struct RuleEngine {
    game: Game,
}

impl RuleEngine {
    pub fn new() -> RuleEngine {
        RuleEngine { game: Game::new() }
    }

    pub fn side_to_move(&self) -> Color {
        self.game.side_to_move()
    }

    /// Validates and applies a move for the side to move. Legality,
    /// including own-king safety, is decided entirely by the rule engine.
    /// Returns the move's notation on success, a rejection reason
    /// otherwise.
    pub fn apply(&mut self, mv: &NormalMove) -> Result<String, String> {
        let from = square_at(mv.from);
        let to = square_at(mv.to);
        let board = self.game.current_position();
        let promotion = promotion_piece(&board, mv, from, to);
        let chess_move = ChessMove::new(from, to, promotion);

        if self.game.make_move(chess_move) {
            Ok(notation(from, to, promotion))
        } else {
            Err(format!("illegal move {}{}", from, to))
        }
    }

    pub fn position_status(&self) -> PositionStatus {
        let board = self.game.current_position();
        match board.status() {
            BoardStatus::Checkmate => PositionStatus::Checkmate {
                winner: !board.side_to_move(),
            },
            BoardStatus::Stalemate => PositionStatus::Stalemate,
            BoardStatus::Ongoing => {
                if insufficient_material(&board) {
                    PositionStatus::InsufficientMaterial
                } else {
                    PositionStatus::Ongoing
                }
            }
        }
    }

    /// Builds a fresh snapshot of the current position.
    pub fn snapshot(&self, move_count: u32, last_move: Option<String>) -> GameSnapshot {
        let board = self.game.current_position();
        let mut snapshot = GameSnapshot::empty();

        for rank in 0..8 {
            for file in 0..8 {
                let square = Square::make_square(Rank::from_index(rank), File::from_index(file));
                if let (Some(piece), Some(color)) =
                    (board.piece_on(square), board.color_on(square))
                {
                    snapshot.board[7 - rank][file] = Some(piece_code(color, piece));
                }
            }
        }

        let in_check = board.checkers().popcnt() > 0;
        snapshot.white_turn = board.side_to_move() == Color::White;
        snapshot.white_in_check = in_check && board.side_to_move() == Color::White;
        snapshot.black_in_check = in_check && board.side_to_move() == Color::Black;

        match self.position_status() {
            PositionStatus::Ongoing => {}
            PositionStatus::Checkmate { winner } => {
                snapshot.game_over = true;
                snapshot.winner = Some(winner_of(winner));
            }
            PositionStatus::Stalemate | PositionStatus::InsufficientMaterial => {
                snapshot.game_over = true;
                snapshot.winner = Some(Winner::Draw);
            }
        }

        snapshot.move_count = move_count;
        snapshot.last_move = last_move;
        snapshot
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

pub fn color_name(color: Color) -> &'static str {
    match color {
        Color::White => "white",
        Color::Black => "black",
    }
}

pub fn winner_of(color: Color) -> Winner {
    match color {
        Color::White => Winner::White,
        Color::Black => Winner::Black,
    }
}

fn square_at(pos: BoardPos) -> Square {
    Square::make_square(
        Rank::from_index(pos.rank_index()),
        File::from_index(pos.file_index()),
    )
}

/// Untagged pawn pushes to the last rank promote to a queen; an explicit
/// tag picks the piece. Non-promotion moves always get `None` so a stray
/// tag cannot poison an otherwise legal move.
fn promotion_piece(board: &Board, mv: &NormalMove, from: Square, to: Square) -> Option<Piece> {
    if board.piece_on(from) != Some(Piece::Pawn) {
        return None;
    }
    let back_rank = match board.side_to_move() {
        Color::White => Rank::Eighth,
        Color::Black => Rank::First,
    };
    if to.get_rank() != back_rank {
        return None;
    }
    Some(match mv.promotion {
        Some(Promotion::Rook) => Piece::Rook,
        Some(Promotion::Bishop) => Piece::Bishop,
        Some(Promotion::Knight) => Piece::Knight,
        Some(Promotion::Queen) | None => Piece::Queen,
    })
}

fn notation(from: Square, to: Square, promotion: Option<Piece>) -> String {
    let suffix = match promotion {
        Some(Piece::Queen) => "q",
        Some(Piece::Rook) => "r",
        Some(Piece::Bishop) => "b",
        Some(Piece::Knight) => "n",
        _ => "",
    };
    format!("{}{}{}", from, to, suffix)
}

fn piece_code(color: Color, piece: Piece) -> String {
    let prefix = match color {
        Color::White => "w",
        Color::Black => "b",
    };
    let name = match piece {
        Piece::Pawn => "pawn",
        Piece::Knight => "knight",
        Piece::Bishop => "bishop",
        Piece::Rook => "rook",
        Piece::Queen => "queen",
        Piece::King => "king",
    };
    format!("{}{}", prefix, name)
}

/// Draw detection for dead positions: lone kings, a single minor piece,
/// or same-colored lone bishops.
fn insufficient_material(board: &Board) -> bool {
    let heavy = *board.pieces(Piece::Pawn) | *board.pieces(Piece::Rook) | *board.pieces(Piece::Queen);
    if heavy.popcnt() > 0 {
        return false;
    }

    let knights = *board.pieces(Piece::Knight);
    let bishops = *board.pieces(Piece::Bishop);
    let minors = knights | bishops;

    match minors.popcnt() {
        0 | 1 => true,
        2 => {
            // two bishops on opposite sides, stuck on the same square color
            if knights.popcnt() != 0 {
                return false;
            }
            let per_side_one = (bishops & *board.color_combined(Color::White)).popcnt() == 1;
            if !per_side_one {
                return false;
            }
            let shades: Vec<usize> = bishops
                .map(|square| (square.get_rank().to_index() + square.get_file().to_index()) % 2)
                .collect();
            shades[0] == shades[1]
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::moves::PlayerMove;

    fn parsed(input: &str) -> NormalMove {
        match PlayerMove::parse(input) {
            PlayerMove::Normal(mv) => mv,
            other => panic!("expected a normal move for {:?}, got {:?}", input, other),
        }
    }

    impl RuleEngine {
        fn from_fen(fen: &str) -> RuleEngine {
            RuleEngine {
                game: Game::new_with_board(fen.parse().expect("valid test fen")),
            }
        }
    }

    #[test]
    fn applies_a_legal_opening_move() {
        let mut engine = RuleEngine::new();
        assert_eq!(engine.side_to_move(), Color::White);
        assert_eq!(engine.apply(&parsed("e2e4")).unwrap(), "e2e4");
        assert_eq!(engine.side_to_move(), Color::Black);
        assert_eq!(engine.position_status(), PositionStatus::Ongoing);
    }

    #[test]
    fn rejects_illegal_and_out_of_turn_moves() {
        let mut engine = RuleEngine::new();
        assert!(engine.apply(&parsed("e2e5")).is_err());
        engine.apply(&parsed("e2e4")).unwrap();
        // white piece while black is to move
        assert!(engine.apply(&parsed("d2d4")).is_err());
        assert_eq!(engine.side_to_move(), Color::Black);
    }

    #[test]
    fn snapshot_reflects_the_position() {
        let mut engine = RuleEngine::new();
        engine.apply(&parsed("e2e4")).unwrap();
        let snapshot = engine.snapshot(1, Some("e2e4".to_string()));

        assert_eq!(snapshot.board[4][4].as_deref(), Some("wpawn"));
        assert_eq!(snapshot.board[6][4], None);
        assert_eq!(snapshot.board[0][4].as_deref(), Some("bking"));
        assert!(!snapshot.white_turn);
        assert!(!snapshot.game_over);
        assert_eq!(snapshot.move_count, 1);
        assert_eq!(snapshot.last_move.as_deref(), Some("e2e4"));
    }

    #[test]
    fn detects_scholars_mate() {
        let mut engine = RuleEngine::new();
        for mv in ["e2e4", "e7e5", "d1h5", "b8c6", "f1c4", "g8f6", "h5f7"] {
            engine.apply(&parsed(mv)).unwrap();
        }
        assert_eq!(
            engine.position_status(),
            PositionStatus::Checkmate {
                winner: Color::White
            }
        );
        let snapshot = engine.snapshot(7, Some("h5f7".to_string()));
        assert!(snapshot.game_over);
        assert_eq!(snapshot.winner, Some(Winner::White));
    }

    #[test]
    fn detects_stalemate() {
        let engine = RuleEngine::from_fen("k7/8/1Q6/8/8/8/8/7K b - - 0 1");
        assert_eq!(engine.position_status(), PositionStatus::Stalemate);
        assert_eq!(engine.snapshot(40, None).winner, Some(Winner::Draw));
    }

    #[test]
    fn detects_insufficient_material() {
        let bare_kings = RuleEngine::from_fen("k7/8/8/8/8/8/8/K7 w - - 0 1");
        assert_eq!(
            bare_kings.position_status(),
            PositionStatus::InsufficientMaterial
        );

        let lone_bishop = RuleEngine::from_fen("k7/8/8/8/8/8/8/KB6 w - - 0 1");
        assert_eq!(
            lone_bishop.position_status(),
            PositionStatus::InsufficientMaterial
        );

        let rook_ending = RuleEngine::from_fen("k7/8/8/8/8/8/8/KR6 w - - 0 1");
        assert_eq!(rook_ending.position_status(), PositionStatus::Ongoing);
    }

    #[test]
    fn pawn_promotion_defaults_to_queen() {
        let mut engine = RuleEngine::from_fen("8/P6k/8/8/8/8/8/K7 w - - 0 1");
        assert_eq!(engine.apply(&parsed("a7a8")).unwrap(), "a7a8q");
        let snapshot = engine.snapshot(1, Some("a7a8q".to_string()));
        assert_eq!(snapshot.board[0][0].as_deref(), Some("wqueen"));
    }

    #[test]
    fn explicit_underpromotion_is_honored() {
        let mut engine = RuleEngine::from_fen("8/P6k/8/8/8/8/8/K7 w - - 0 1");
        assert_eq!(engine.apply(&parsed("a7a8n")).unwrap(), "a7a8n");
        let snapshot = engine.snapshot(1, None);
        assert_eq!(snapshot.board[0][0].as_deref(), Some("wknight"));
    }

    #[test]
    fn check_flags_follow_the_side_in_check() {
        let engine = RuleEngine::from_fen("k7/8/8/8/8/8/8/R6K b - - 0 1");
        let snapshot = engine.snapshot(10, None);
        assert!(snapshot.black_in_check);
        assert!(!snapshot.white_in_check);
        assert!(!snapshot.game_over);
    }
}
