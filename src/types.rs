use serde::Serialize;

/// Piece and player color. Red moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Red,
    Blue,
}

impl Color {
    pub fn opponent(self) -> Self {
        match self {
            Color::Red => Color::Blue,
            Color::Blue => Color::Red,
        }
    }

    /// Wire encoding used in engine queries and cell snapshots.
    pub fn code(self) -> u8 {
        match self {
            Color::Red => 1,
            Color::Blue => 2,
        }
    }

    /// Inverse of [`Color::code`]. Codes other than 1 and 2 mean "no color"
    /// (empty cell, drawn game).
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Color::Red),
            2 => Some(Color::Blue),
            _ => None,
        }
    }
}

/// How one side of the session is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerKind {
    Human,
    BotRandom,
    BotGreedy,
}

impl PlayerKind {
    /// Difficulty forwarded to the engine's bot-move search.
    /// `None` for humans, who never reach that query.
    pub fn difficulty(self) -> Option<u8> {
        match self {
            PlayerKind::Human => None,
            PlayerKind::BotRandom => Some(1),
            PlayerKind::BotGreedy => Some(2),
        }
    }
}

/// A board coordinate, 1-based in both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub column: usize,
    pub line: usize,
}

/// Session state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Menu,
    AwaitingInput,
    ValidatingMove,
    Animating,
    AwaitingBotMove,
    GameOver,
}

/// Observable outcome of a frame update. Everything that happens
/// asynchronously (engine replies, clock expiry) surfaces here; direct
/// calls report through their `Result` instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    MoveAccepted { origin_id: usize, destin_id: usize },
    MoveRejected { origin_id: usize, destin_id: usize },
    BotMoveChosen { origin_id: usize, destin_id: usize },
    MoveCommitted { player: Color, origin_id: usize, destin_id: usize },
    UndoCompleted { player: Color },
    TurnExpired { player: Color },
    EngineFailed { message: String },
    Fatal { message: String },
    GameOver { winner: Option<Color> },
}

/// Public session state returned to the host.
///
/// Contract:
/// - `cells` is row-major, line 1 first; 0 = empty, 1 = red, 2 = blue.
/// - `current_player` uses the same 1/2 codes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub cells: Vec<u8>,
    pub dimension: usize,
    pub state: SessionState,
    pub current_player: u8,
    pub red: PlayerKind,
    pub blue: PlayerKind,
    pub moves_played: usize,
    pub removed_red: usize,
    pub removed_blue: usize,
}

/// Interpolated positions of the active animation.
///
/// Contract:
/// - `moving` is `[column, line]` in board coordinates.
/// - `capture` is `[x, y, z]` in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnimationSnapshot {
    pub moving: Option<[f32; 2]>,
    pub capture: Option<[f32; 3]>,
    pub finished: bool,
}
