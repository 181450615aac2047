use std::fmt;

/// A move command parsed from a player's control channel.
///
/// Resign and Error are never applied to the board: resignation ends the
/// game, and an unparseable line gets the sender an `INVALID_MOVE` notice
/// and a fresh move request for the same turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerMove {
    Normal(NormalMove),
    Resign,
    Error { input: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalMove {
    pub from: BoardPos,
    pub to: BoardPos,
    pub promotion: Option<Promotion>,
}

/// Board coordinates in the wire convention: row 0 is rank 8, col 0 is
/// file a.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardPos {
    pub row: u8,
    pub col: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Promotion {
    Queen,
    Rook,
    Bishop,
    Knight,
}

impl BoardPos {
    pub fn new(row: u8, col: u8) -> Option<BoardPos> {
        if row < 8 && col < 8 {
            Some(BoardPos { row, col })
        } else {
            None
        }
    }

    /// Rank index as the rule engine counts (0 = rank 1).
    pub fn rank_index(self) -> usize {
        7 - self.row as usize
    }

    pub fn file_index(self) -> usize {
        self.col as usize
    }
}

impl fmt::Display for BoardPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = (b'a' + self.col) as char;
        let rank = 8 - self.row;
        write!(f, "{}{}", file, rank)
    }
}

impl fmt::Display for NormalMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(promotion) = self.promotion {
            write!(f, "{}", promotion.letter())?;
        }
        Ok(())
    }
}

impl Promotion {
    fn letter(self) -> char {
        match self {
            Promotion::Queen => 'q',
            Promotion::Rook => 'r',
            Promotion::Bishop => 'b',
            Promotion::Knight => 'n',
        }
    }

    fn from_letter(letter: u8) -> Option<Promotion> {
        match letter {
            b'q' => Some(Promotion::Queen),
            b'r' => Some(Promotion::Rook),
            b'b' => Some(Promotion::Bishop),
            b'n' => Some(Promotion::Knight),
            _ => None,
        }
    }
}

impl PlayerMove {
    /// Parses a raw control-channel line. Accepts algebraic pairs
    /// (`e2e4`, `e2-e4`, optional promotion letter as in `e7e8q`), the
    /// numeric `fromRow,fromCol,toRow,toCol` form, and the literal
    /// `resign`. Anything else becomes `PlayerMove::Error`.
    pub fn parse(input: &str) -> PlayerMove {
        let trimmed = input.trim().to_lowercase();

        if trimmed == "resign" {
            return PlayerMove::Resign;
        }

        let parsed = if trimmed.contains(',') {
            parse_coordinates(&trimmed)
        } else {
            parse_algebraic(&trimmed)
        };

        match parsed {
            Some(mv) => PlayerMove::Normal(mv),
            None => PlayerMove::Error {
                input: input.trim().to_string(),
            },
        }
    }
}

fn parse_coordinates(input: &str) -> Option<NormalMove> {
    let parts: Vec<&str> = input.split(',').collect();
    if parts.len() != 4 {
        return None;
    }

    let mut coords = [0u8; 4];
    for (slot, part) in coords.iter_mut().zip(&parts) {
        *slot = part.trim().parse().ok()?;
    }

    Some(NormalMove {
        from: BoardPos::new(coords[0], coords[1])?,
        to: BoardPos::new(coords[2], coords[3])?,
        promotion: None,
    })
}

fn parse_algebraic(input: &str) -> Option<NormalMove> {
    let compact = input.replace('-', "");
    let bytes = compact.as_bytes();
    if bytes.len() != 4 && bytes.len() != 5 {
        return None;
    }

    let from = square_pos(bytes[0], bytes[1])?;
    let to = square_pos(bytes[2], bytes[3])?;
    let promotion = match bytes.get(4) {
        Some(&letter) => Some(Promotion::from_letter(letter)?),
        None => None,
    };

    Some(NormalMove {
        from,
        to,
        promotion,
    })
}

fn square_pos(file: u8, rank: u8) -> Option<BoardPos> {
    if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
        return None;
    }
    BoardPos::new(8 - (rank - b'0'), file - b'a')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normal(from_row: u8, from_col: u8, to_row: u8, to_col: u8) -> PlayerMove {
        PlayerMove::Normal(NormalMove {
            from: BoardPos::new(from_row, from_col).unwrap(),
            to: BoardPos::new(to_row, to_col).unwrap(),
            promotion: None,
        })
    }

    #[test]
    fn parses_algebraic_pairs() {
        assert_eq!(PlayerMove::parse("e2e4"), normal(6, 4, 4, 4));
        assert_eq!(PlayerMove::parse("E2-E4"), normal(6, 4, 4, 4));
        assert_eq!(PlayerMove::parse("  a7a8  "), normal(1, 0, 0, 0));
    }

    #[test]
    fn parses_coordinate_quadruples() {
        assert_eq!(PlayerMove::parse("6,4,4,4"), normal(6, 4, 4, 4));
        assert_eq!(PlayerMove::parse("0, 0, 7, 7"), normal(0, 0, 7, 7));
    }

    #[test]
    fn parses_resign_case_insensitively() {
        assert_eq!(PlayerMove::parse("resign"), PlayerMove::Resign);
        assert_eq!(PlayerMove::parse("RESIGN"), PlayerMove::Resign);
    }

    #[test]
    fn parses_promotion_suffix() {
        assert_eq!(
            PlayerMove::parse("e7e8q"),
            PlayerMove::Normal(NormalMove {
                from: BoardPos::new(1, 4).unwrap(),
                to: BoardPos::new(0, 4).unwrap(),
                promotion: Some(Promotion::Queen),
            })
        );
        assert_eq!(
            PlayerMove::parse("a2a1n"),
            PlayerMove::Normal(NormalMove {
                from: BoardPos::new(6, 0).unwrap(),
                to: BoardPos::new(7, 0).unwrap(),
                promotion: Some(Promotion::Knight),
            })
        );
    }

    #[test]
    fn rejects_garbage() {
        for input in ["", "   ", "hello", "e9e4", "i2i4", "e2e4x", "1,2,3", "8,0,0,0", "a,b,c,d"] {
            match PlayerMove::parse(input) {
                PlayerMove::Error { .. } => {}
                other => panic!("expected parse error for {:?}, got {:?}", input, other),
            }
        }
    }

    #[test]
    fn notation_round_trips_through_display() {
        let mv = match PlayerMove::parse("e2e4") {
            PlayerMove::Normal(mv) => mv,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(mv.to_string(), "e2e4");

        let promo = match PlayerMove::parse("e7e8r") {
            PlayerMove::Normal(mv) => mv,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(promo.to_string(), "e7e8r");
    }
}
