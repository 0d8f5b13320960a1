use thiserror::Error;

use crate::types::SessionState;

/// Board-text failures. Fatal for the session: the authoritative source
/// of truth can no longer be trusted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("board dimension {0} is not supported (expected 6, 8 or 10)")]
    UnsupportedDimension(usize),
    #[error("board text has {rows} rows, expected {expected}")]
    RowCountMismatch { rows: usize, expected: usize },
    #[error("row {line} has {columns} columns, expected {expected}")]
    ColumnCountMismatch {
        line: usize,
        columns: usize,
        expected: usize,
    },
    #[error("unknown board symbol {symbol:?} at column {column}, line {line}")]
    UnknownSymbol {
        symbol: char,
        column: usize,
        line: usize,
    },
    #[error("malformed board text: {0}")]
    Malformed(&'static str),
}

/// Structural move failures, rejected locally without contacting the
/// engine. Minor, per-attempt errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("piece id {id} is out of range for dimension {dimension}")]
    IdOutOfRange { id: usize, dimension: usize },
    #[error("origin and destination do not describe a one-step orthogonal move")]
    InvalidDirection,
    #[error("tile {id} holds no piece to select")]
    OriginEmpty { id: usize },
}

/// Failures of the external rules engine or its transport. Recoverable:
/// the session reverts to awaiting input and is never retried silently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("rules engine unreachable: {0}")]
    Unreachable(String),
    #[error("malformed engine reply: {0}")]
    MalformedReply(String),
    #[error("a query is already outstanding")]
    Busy,
}

/// History blob decode failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    #[error("history data too short: expected at least {expected} bytes, got {got}")]
    TooShort { expected: usize, got: usize },
    #[error("invalid history magic (expected TLPA)")]
    BadMagic,
    #[error("unsupported history version: expected {expected}, got {got}")]
    UnsupportedVersion { expected: u32, got: u32 },
    #[error("CRC32 mismatch: expected {expected:#010x}, got {actual:#010x}")]
    CrcMismatch { expected: u32, actual: u32 },
    #[error("unexpected EOF while reading {0}")]
    UnexpectedEof(&'static str),
    #[error("history payload has trailing bytes")]
    TrailingBytes,
    #[error("record #{index} is invalid: {message}")]
    InvalidRecord { index: usize, message: String },
}

/// Umbrella error returned by direct session calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Move(#[from] MoveError),
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("operation not allowed while {state:?}")]
    NotAllowed { state: SessionState },
    #[error("no move to undo")]
    EmptyHistory,
    #[error("undo snapshot failed integrity check")]
    CorruptSnapshot,
}
