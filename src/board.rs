use crate::error::BoardError;
use crate::types::Color;

/// Board sides offered by the session controls.
pub const DIMENSIONS: [usize; 3] = [6, 8, 10];

const EMPTY_SYMBOL: char = 'E';
const RED_SYMBOL: char = 'X';
const BLUE_SYMBOL: char = 'O';

/// A piece standing on a tile, captured into the tray, or carried by the
/// animator while in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    color: Color,
    pub selected: bool,
    pub moving: bool,
}

impl Piece {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            selected: false,
            moving: false,
        }
    }

    pub fn color(&self) -> Color {
        self.color
    }
}

/// One board square, holding at most one piece.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    column: usize,
    line: usize,
    piece: Option<Piece>,
}

impl Tile {
    fn new(column: usize, line: usize, piece: Option<Piece>) -> Self {
        Self {
            column,
            line,
            piece,
        }
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn piece(&self) -> Option<&Piece> {
        self.piece.as_ref()
    }

    pub fn piece_mut(&mut self) -> Option<&mut Piece> {
        self.piece.as_mut()
    }

    /// Lifts the piece off the tile, transferring ownership to the caller.
    pub fn take_piece(&mut self) -> Option<Piece> {
        self.piece.take()
    }

    /// Puts a piece down on the tile. A piece may never be referenced by
    /// two tiles, so the tile must be empty.
    pub fn set_piece(&mut self, piece: Piece) {
        debug_assert!(
            self.piece.is_none(),
            "tile ({}, {}) already holds a piece",
            self.column,
            self.line
        );
        self.piece = Some(piece);
    }
}

/// Talpa board: a square grid of `dimension * dimension` tiles, rebuilt
/// wholesale from each authoritative board text. The captured-piece tray
/// survives rebuilds.
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    dimension: usize,
    tiles: Vec<Tile>,
    removed: Vec<Piece>,
}

impl Board {
    /// Builds the opening position: every tile filled, colors alternating
    /// in a checkerboard, red on tiles where `column + line` is even.
    ///
    /// Caller contract: `dimension` is one of [`DIMENSIONS`]; session
    /// setters validate before reaching here.
    pub fn starting_position(dimension: usize) -> Self {
        assert!(
            DIMENSIONS.contains(&dimension),
            "unsupported board dimension {dimension}"
        );

        let mut tiles = Vec::with_capacity(dimension * dimension);
        for line in 1..=dimension {
            for column in 1..=dimension {
                let color = if (column + line) % 2 == 0 {
                    Color::Red
                } else {
                    Color::Blue
                };
                tiles.push(Tile::new(column, line, Some(Piece::new(color))));
            }
        }

        Self {
            dimension,
            tiles,
            removed: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Replaces every tile and piece from an authoritative board text.
    /// The board is left untouched when the text does not parse.
    pub fn rebuild_from(&mut self, text: &str) -> Result<(), BoardError> {
        let tiles = parse_board_text(text, self.dimension)?;
        self.tiles = tiles;
        Ok(())
    }

    /// Produces the row-major wire text, e.g. `[[X,O,E],[E,E,X],...]`.
    /// Inverse of [`Board::rebuild_from`] on symbols.
    pub fn serialize(&self) -> String {
        let mut out = String::with_capacity(self.tiles.len() * 2 + self.dimension * 2 + 2);
        out.push('[');
        for line in 1..=self.dimension {
            if line > 1 {
                out.push(',');
            }
            out.push('[');
            for column in 1..=self.dimension {
                if column > 1 {
                    out.push(',');
                }
                out.push(match self.tile_at(column, line).piece() {
                    None => EMPTY_SYMBOL,
                    Some(piece) if piece.color() == Color::Red => RED_SYMBOL,
                    Some(_) => BLUE_SYMBOL,
                });
            }
            out.push(']');
        }
        out.push(']');
        out
    }

    /// Looks up the tile at a 1-based coordinate.
    ///
    /// Caller contract: `1 <= column, line <= dimension`. Ids are validated
    /// by the move resolver before they reach the board, so an
    /// out-of-range coordinate is a programming error and panics.
    pub fn tile_at(&self, column: usize, line: usize) -> &Tile {
        assert!(
            self.in_bounds(column, line),
            "tile ({column}, {line}) out of range for dimension {}",
            self.dimension
        );
        &self.tiles[(line - 1) * self.dimension + (column - 1)]
    }

    /// Mutable variant of [`Board::tile_at`], same contract.
    pub fn tile_at_mut(&mut self, column: usize, line: usize) -> &mut Tile {
        assert!(
            self.in_bounds(column, line),
            "tile ({column}, {line}) out of range for dimension {}",
            self.dimension
        );
        &mut self.tiles[(line - 1) * self.dimension + (column - 1)]
    }

    /// Converts the board to cell codes where 0=empty, 1=red, 2=blue,
    /// row-major with line 1 first.
    pub fn cells(&self) -> Vec<u8> {
        self.tiles
            .iter()
            .map(|tile| match tile.piece() {
                None => 0,
                Some(piece) => piece.color().code(),
            })
            .collect()
    }

    /// Pieces captured off the board, in capture order.
    pub fn removed(&self) -> &[Piece] {
        &self.removed
    }

    /// Adds a captured piece to the tray.
    pub fn push_removed(&mut self, mut piece: Piece) {
        piece.moving = false;
        piece.selected = false;
        self.removed.push(piece);
    }

    /// Takes the most recently captured piece of the given color back out
    /// of the tray, for an undo flight onto the board.
    pub fn take_removed(&mut self, color: Color) -> Option<Piece> {
        let idx = self.removed.iter().rposition(|p| p.color() == color)?;
        Some(self.removed.remove(idx))
    }

    fn in_bounds(&self, column: usize, line: usize) -> bool {
        (1..=self.dimension).contains(&column) && (1..=self.dimension).contains(&line)
    }
}

/// Parses a wire board text into tiles, enforcing the configured
/// dimension on both axes.
pub(crate) fn parse_board_text(text: &str, dimension: usize) -> Result<Vec<Tile>, BoardError> {
    let mut chars = text.chars().filter(|c| !c.is_ascii_whitespace());

    if chars.next() != Some('[') {
        return Err(BoardError::Malformed("expected opening '['"));
    }

    let mut tiles = Vec::with_capacity(dimension * dimension);
    let mut line = 0usize;

    loop {
        line += 1;
        if chars.next() != Some('[') {
            return Err(BoardError::Malformed("expected row opening '['"));
        }

        let mut column = 0usize;
        loop {
            column += 1;
            let symbol = chars
                .next()
                .ok_or(BoardError::Malformed("unexpected end of board text"))?;
            let piece = match symbol {
                s if s == EMPTY_SYMBOL => None,
                s if s == RED_SYMBOL => Some(Piece::new(Color::Red)),
                s if s == BLUE_SYMBOL => Some(Piece::new(Color::Blue)),
                other => {
                    return Err(BoardError::UnknownSymbol {
                        symbol: other,
                        column,
                        line,
                    });
                }
            };
            tiles.push(Tile::new(column, line, piece));

            match chars.next() {
                Some(',') => {}
                Some(']') => break,
                _ => return Err(BoardError::Malformed("expected ',' or ']' after symbol")),
            }
        }

        if column != dimension {
            return Err(BoardError::ColumnCountMismatch {
                line,
                columns: column,
                expected: dimension,
            });
        }

        match chars.next() {
            Some(',') => {}
            Some(']') => break,
            _ => return Err(BoardError::Malformed("expected ',' or ']' after row")),
        }
    }

    if line != dimension {
        return Err(BoardError::RowCountMismatch {
            rows: line,
            expected: dimension,
        });
    }
    if chars.next().is_some() {
        return Err(BoardError::Malformed("trailing characters after board text"));
    }

    Ok(tiles)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_board_text(dimension: usize) -> String {
        let row = format!("[{}]", vec!["E"; dimension].join(","));
        format!("[{}]", vec![row; dimension].join(","))
    }

    #[test]
    fn starting_position_fills_every_tile_in_checkerboard() {
        let board = Board::starting_position(6);
        let cells = board.cells();

        assert_eq!(cells.len(), 36);
        assert!(cells.iter().all(|&c| c == 1 || c == 2));
        // (1,1) -> red, (2,1) -> blue
        assert_eq!(cells[0], 1);
        assert_eq!(cells[1], 2);
        // first tile of line 2 alternates against line 1
        assert_eq!(cells[6], 2);
    }

    #[test]
    fn serialize_rebuild_round_trips_on_symbols() {
        let board = Board::starting_position(8);
        let text = board.serialize();

        let mut rebuilt = Board::starting_position(8);
        rebuilt.rebuild_from(&empty_board_text(8)).unwrap();
        rebuilt.rebuild_from(&text).unwrap();

        assert_eq!(rebuilt.serialize(), text);
    }

    #[test]
    fn rebuild_accepts_interior_whitespace() {
        let mut board = Board::starting_position(6);
        let spaced = board
            .serialize()
            .replace("],", "],\n ")
            .replace(",", ", ");

        assert!(board.rebuild_from(&spaced).is_ok());
    }

    #[test]
    fn rebuild_rejects_row_count_mismatch() {
        let mut board = Board::starting_position(8);
        let text = empty_board_text(6);

        let err = board.rebuild_from(&text).unwrap_err();
        assert_eq!(
            err,
            BoardError::ColumnCountMismatch {
                line: 1,
                columns: 6,
                expected: 8
            }
        );
    }

    #[test]
    fn rebuild_rejects_missing_rows() {
        let mut board = Board::starting_position(6);
        let row = "[E,E,E,E,E,E]";
        let text = format!("[{}]", vec![row; 5].join(","));

        let err = board.rebuild_from(&text).unwrap_err();
        assert_eq!(
            err,
            BoardError::RowCountMismatch {
                rows: 5,
                expected: 6
            }
        );
    }

    #[test]
    fn rebuild_rejects_unknown_symbol_with_position() {
        let mut board = Board::starting_position(6);
        let text = empty_board_text(6).replacen('E', "Z", 1);

        let err = board.rebuild_from(&text).unwrap_err();
        assert_eq!(
            err,
            BoardError::UnknownSymbol {
                symbol: 'Z',
                column: 1,
                line: 1
            }
        );
    }

    #[test]
    fn rebuild_rejects_trailing_garbage_and_keeps_board() {
        let mut board = Board::starting_position(6);
        let before = board.serialize();
        let text = format!("{}]", empty_board_text(6));

        let err = board.rebuild_from(&text).unwrap_err();
        assert_eq!(
            err,
            BoardError::Malformed("trailing characters after board text")
        );
        assert_eq!(board.serialize(), before);
    }

    #[test]
    fn take_piece_transfers_ownership() {
        let mut board = Board::starting_position(6);

        let piece = board.tile_at_mut(3, 4).take_piece().unwrap();
        assert!(board.tile_at(3, 4).piece().is_none());

        board.tile_at_mut(3, 4).set_piece(piece);
        assert!(board.tile_at(3, 4).piece().is_some());
    }

    #[test]
    fn removed_tray_survives_rebuild() {
        let mut board = Board::starting_position(6);
        board.push_removed(Piece::new(Color::Blue));
        board.push_removed(Piece::new(Color::Red));

        board.rebuild_from(&empty_board_text(6)).unwrap();

        assert_eq!(board.removed().len(), 2);
        let taken = board.take_removed(Color::Blue).unwrap();
        assert_eq!(taken.color(), Color::Blue);
        assert_eq!(board.removed().len(), 1);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn tile_at_panics_out_of_range() {
        let board = Board::starting_position(6);
        board.tile_at(7, 1);
    }
}
