//! Line-protocol vocabulary and the game-state wire codec.
//!
//! Every message is one text line. A game-state push is two lines: the
//! `GAME_STATE_UPDATE` marker followed by the serialized snapshot in
//! `<board>|<metadata>` form, where the board part lists every occupied
//! square as `row,col,pieceCode;` and the metadata part is
//! `key:value;`-separated.

use std::fmt::Write as _;

use thiserror::Error;

use crate::models::game_state::{GameSnapshot, Winner};

pub const HEARTBEAT_PORT_PREFIX: &str = "HEARTBEAT_PORT:";
pub const ROLE_PLAYER: &str = "player";
pub const ROLE_SPECTATOR: &str = "spectator";
pub const ACK_OK: &str = "ok";
pub const ACK_NOT_OK: &str = "not ok";
pub const GAME_STATE_UPDATE: &str = "GAME_STATE_UPDATE";
pub const REQUEST_MOVE: &str = "REQUEST_MOVE";
pub const INVALID_MOVE: &str = "INVALID_MOVE";
pub const GAME_END: &str = "GAME_END";
pub const HEARTBEAT: &str = "HEARTBEAT";

/// Sentinel for absent metadata values (`winner`, `lastMove`).
const NONE_VALUE: &str = "none";

#[derive(Debug, Error)]
pub enum WireError {
    #[error("missing `|` separator between board and metadata")]
    MissingSeparator,
    #[error("malformed board entry `{0}`")]
    BadBoardEntry(String),
    #[error("square {row},{col} out of range")]
    SquareOutOfRange { row: u8, col: u8 },
    #[error("malformed metadata field `{0}`")]
    BadMetadata(String),
}

pub fn serialize_snapshot(snapshot: &GameSnapshot) -> String {
    let mut out = String::new();

    for (row, rank) in snapshot.board.iter().enumerate() {
        for (col, square) in rank.iter().enumerate() {
            if let Some(code) = square {
                // infallible: writing to a String
                let _ = write!(out, "{},{},{};", row, col, code);
            }
        }
    }

    out.push('|');
    let winner = snapshot.winner.map_or(NONE_VALUE, Winner::as_str);
    let last_move = snapshot.last_move.as_deref().unwrap_or(NONE_VALUE);
    let _ = write!(
        out,
        "whiteTurn:{};whiteInCheck:{};blackInCheck:{};gameOver:{};winner:{};moveCount:{};lastMove:{}",
        snapshot.white_turn,
        snapshot.white_in_check,
        snapshot.black_in_check,
        snapshot.game_over,
        winner,
        snapshot.move_count,
        last_move,
    );

    out
}

pub fn deserialize_snapshot(line: &str) -> Result<GameSnapshot, WireError> {
    let (board_part, meta_part) = line.split_once('|').ok_or(WireError::MissingSeparator)?;

    let mut snapshot = GameSnapshot::empty();

    for entry in board_part.split(';') {
        if entry.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = entry.split(',').collect();
        if fields.len() != 3 {
            return Err(WireError::BadBoardEntry(entry.to_string()));
        }
        let row: u8 = fields[0]
            .trim()
            .parse()
            .map_err(|_| WireError::BadBoardEntry(entry.to_string()))?;
        let col: u8 = fields[1]
            .trim()
            .parse()
            .map_err(|_| WireError::BadBoardEntry(entry.to_string()))?;
        if row >= 8 || col >= 8 {
            return Err(WireError::SquareOutOfRange { row, col });
        }
        snapshot.board[row as usize][col as usize] = Some(fields[2].trim().to_string());
    }

    for field in meta_part.split(';') {
        if field.trim().is_empty() {
            continue;
        }
        let (key, value) = field
            .split_once(':')
            .ok_or_else(|| WireError::BadMetadata(field.to_string()))?;
        let value = value.trim();
        let bad = || WireError::BadMetadata(field.to_string());

        match key.trim() {
            "whiteTurn" => snapshot.white_turn = value.parse().map_err(|_| bad())?,
            "whiteInCheck" => snapshot.white_in_check = value.parse().map_err(|_| bad())?,
            "blackInCheck" => snapshot.black_in_check = value.parse().map_err(|_| bad())?,
            "gameOver" => snapshot.game_over = value.parse().map_err(|_| bad())?,
            "winner" => {
                snapshot.winner = match value {
                    NONE_VALUE => None,
                    "white" => Some(Winner::White),
                    "black" => Some(Winner::Black),
                    "draw" => Some(Winner::Draw),
                    _ => return Err(bad()),
                }
            }
            "moveCount" => snapshot.move_count = value.parse().map_err(|_| bad())?,
            "lastMove" => {
                snapshot.last_move = match value {
                    NONE_VALUE => None,
                    other => Some(other.to_string()),
                }
            }
            // unknown keys are skipped for forward compatibility
            _ => {}
        }
    }

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GameSnapshot {
        let mut snapshot = GameSnapshot::empty();
        snapshot.board[0][0] = Some("brook".to_string());
        snapshot.board[6][4] = Some("wpawn".to_string());
        snapshot.board[7][4] = Some("wking".to_string());
        snapshot.white_turn = false;
        snapshot.black_in_check = true;
        snapshot.move_count = 5;
        snapshot.last_move = Some("e2e4".to_string());
        snapshot
    }

    #[test]
    fn round_trips_a_mid_game_snapshot() {
        let snapshot = sample();
        let line = serialize_snapshot(&snapshot);
        assert_eq!(deserialize_snapshot(&line).unwrap(), snapshot);
    }

    #[test]
    fn round_trips_a_finished_game() {
        let mut snapshot = sample();
        snapshot.game_over = true;
        snapshot.winner = Some(Winner::Draw);
        let line = serialize_snapshot(&snapshot);
        assert_eq!(deserialize_snapshot(&line).unwrap(), snapshot);
    }

    #[test]
    fn serializes_the_expected_shape() {
        let mut snapshot = GameSnapshot::empty();
        snapshot.board[0][0] = Some("brook".to_string());
        assert_eq!(
            serialize_snapshot(&snapshot),
            concat!(
                "0,0,brook;|whiteTurn:true;whiteInCheck:false;blackInCheck:false;",
                "gameOver:false;winner:none;moveCount:0;lastMove:none"
            ),
        );
    }

    #[test]
    fn round_trips_an_empty_board() {
        let snapshot = GameSnapshot::empty();
        let line = serialize_snapshot(&snapshot);
        assert!(line.starts_with('|'));
        assert_eq!(deserialize_snapshot(&line).unwrap(), snapshot);
    }

    #[test]
    fn rejects_missing_separator() {
        assert!(matches!(
            deserialize_snapshot("0,0,brook;whiteTurn:true"),
            Err(WireError::MissingSeparator)
        ));
    }

    #[test]
    fn rejects_out_of_range_squares() {
        assert!(matches!(
            deserialize_snapshot("8,0,wpawn;|whiteTurn:true"),
            Err(WireError::SquareOutOfRange { row: 8, col: 0 })
        ));
    }

    #[test]
    fn rejects_malformed_entries() {
        assert!(matches!(
            deserialize_snapshot("x,0,wpawn;|whiteTurn:true"),
            Err(WireError::BadBoardEntry(_))
        ));
        assert!(matches!(
            deserialize_snapshot("|moveCount:many"),
            Err(WireError::BadMetadata(_))
        ));
        assert!(matches!(
            deserialize_snapshot("|winner:purple"),
            Err(WireError::BadMetadata(_))
        ));
    }
}
