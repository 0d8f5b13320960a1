use serde::Serialize;

use crate::error::MoveError;
use crate::types::{Color, Position};

/// Coarse structural classification of a move, derived purely from grid
/// coordinates before any legality check. `None` is Talpa's
/// self-removal move (origin and destination coincide).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    None,
    Up,
    Down,
    Left,
    Right,
    Invalid,
}

impl Direction {
    /// Single-character wire code understood by the rules engine.
    pub fn code(self) -> char {
        match self {
            Direction::None => 'x',
            Direction::Up => 'u',
            Direction::Down => 'd',
            Direction::Left => 'l',
            Direction::Right => 'r',
            Direction::Invalid => 'e',
        }
    }
}

/// Position of a piece id.
/// Id calculation: `(line - 1) * dimension + (column - 1)`.
pub fn position_of(id: usize, dimension: usize) -> Position {
    Position {
        column: id % dimension + 1,
        line: id / dimension + 1,
    }
}

/// Inverse of [`position_of`] for 1-based coordinates.
pub fn id_of(column: usize, line: usize, dimension: usize) -> usize {
    (line - 1) * dimension + (column - 1)
}

/// Classifies the step from `origin` to `destin`. Anything other than
/// staying put or moving exactly one tile orthogonally is `Invalid`.
pub fn derive_direction(origin: Position, destin: Position) -> Direction {
    if origin.column == destin.column {
        if destin.line == origin.line {
            Direction::None
        } else if destin.line == origin.line + 1 {
            Direction::Up
        } else if destin.line + 1 == origin.line {
            Direction::Down
        } else {
            Direction::Invalid
        }
    } else if origin.line == destin.line {
        if destin.column == origin.column + 1 {
            Direction::Right
        } else if destin.column + 1 == origin.column {
            Direction::Left
        } else {
            Direction::Invalid
        }
    } else {
        Direction::Invalid
    }
}

/// Immutable record of one proposed move. Created on move intent,
/// retained in the undo history after commit, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Move {
    pub player: Color,
    pub origin_id: usize,
    pub destin_id: usize,
    pub dimension: usize,
    pub column: usize,
    pub line: usize,
    pub direction: Direction,
    pub board_before: String,
    pub board_before_crc: u32,
}

impl Move {
    /// Resolves a move intent from piece ids. Out-of-range ids are a
    /// structural error; an `Invalid` direction is not: it is recorded
    /// on the move and rejected by the session before any engine query.
    pub fn from_ids(
        player: Color,
        origin_id: usize,
        destin_id: usize,
        dimension: usize,
        board_before: String,
    ) -> Result<Self, MoveError> {
        let cells = dimension * dimension;
        for id in [origin_id, destin_id] {
            if id >= cells {
                return Err(MoveError::IdOutOfRange { id, dimension });
            }
        }

        let origin = position_of(origin_id, dimension);
        let destin = position_of(destin_id, dimension);
        let board_before_crc = crc32fast::hash(board_before.as_bytes());

        Ok(Self {
            player,
            origin_id,
            destin_id,
            dimension,
            column: origin.column,
            line: origin.line,
            direction: derive_direction(origin, destin),
            board_before,
            board_before_crc,
        })
    }

    /// Verifies the stored snapshot against its checksum. A mismatch
    /// means the undo history can no longer be trusted.
    pub fn snapshot_intact(&self) -> bool {
        crc32fast::hash(self.board_before.as_bytes()) == self.board_before_crc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(column: usize, line: usize) -> Position {
        Position { column, line }
    }

    #[test]
    fn t01_id_position_mapping_is_a_bijection() {
        for dimension in [6usize, 8, 10] {
            for id in 0..dimension * dimension {
                let p = position_of(id, dimension);
                assert!((1..=dimension).contains(&p.column));
                assert!((1..=dimension).contains(&p.line));
                assert_eq!(id_of(p.column, p.line, dimension), id);
            }
        }
    }

    #[test]
    fn t02_direction_table_is_exact() {
        assert_eq!(derive_direction(pos(3, 4), pos(3, 5)), Direction::Up);
        assert_eq!(derive_direction(pos(3, 4), pos(3, 3)), Direction::Down);
        assert_eq!(derive_direction(pos(3, 4), pos(4, 4)), Direction::Right);
        assert_eq!(derive_direction(pos(3, 4), pos(2, 4)), Direction::Left);
        assert_eq!(derive_direction(pos(3, 4), pos(3, 4)), Direction::None);
        // distance 2 on one axis
        assert_eq!(derive_direction(pos(3, 4), pos(5, 4)), Direction::Invalid);
        assert_eq!(derive_direction(pos(3, 4), pos(3, 6)), Direction::Invalid);
        // diagonal
        assert_eq!(derive_direction(pos(3, 4), pos(4, 5)), Direction::Invalid);
        // both axes differ by more than one
        assert_eq!(derive_direction(pos(1, 1), pos(4, 6)), Direction::Invalid);
    }

    #[test]
    fn direction_never_underflows_at_the_low_edge() {
        assert_eq!(derive_direction(pos(1, 1), pos(1, 2)), Direction::Up);
        assert_eq!(derive_direction(pos(1, 2), pos(1, 1)), Direction::Down);
        assert_eq!(derive_direction(pos(2, 1), pos(1, 1)), Direction::Left);
    }

    #[test]
    fn from_ids_derives_origin_coordinates_and_direction() {
        // dimension 8: id 26 -> (3, 4), id 34 -> (3, 5)
        let mv = Move::from_ids(Color::Red, 26, 34, 8, "[]".to_string()).unwrap();

        assert_eq!(mv.column, 3);
        assert_eq!(mv.line, 4);
        assert_eq!(mv.direction, Direction::Up);
        assert_eq!(mv.direction.code(), 'u');
    }

    #[test]
    fn from_ids_rejects_out_of_range_ids() {
        let err = Move::from_ids(Color::Red, 64, 0, 8, String::new()).unwrap_err();
        assert_eq!(
            err,
            MoveError::IdOutOfRange {
                id: 64,
                dimension: 8
            }
        );
    }

    #[test]
    fn same_origin_and_destination_is_structurally_valid() {
        let mv = Move::from_ids(Color::Blue, 10, 10, 6, String::new()).unwrap();
        assert_eq!(mv.direction, Direction::None);
        assert_eq!(mv.direction.code(), 'x');
    }

    #[test]
    fn snapshot_checksum_detects_tampering() {
        let mut mv = Move::from_ids(Color::Red, 0, 1, 6, "[[E]]".to_string()).unwrap();
        assert!(mv.snapshot_intact());

        mv.board_before.push('!');
        assert!(!mv.snapshot_intact());
    }
}
