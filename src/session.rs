use log::{debug, info, warn};

use crate::animation::{MoveAnimator, Playback};
use crate::board::{self, Board, Piece};
use crate::engine::{EngineReply, EngineRequest, RulesEngine};
use crate::error::{BoardError, EngineError, MoveError, SessionError};
use crate::moves::{self, Direction, Move};
use crate::replay;
use crate::types::{
    AnimationSnapshot, Color, PlayerKind, SessionEvent, SessionSnapshot, SessionState,
};

const DEFAULT_DIMENSION: usize = 8;

/// Which reply the session is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingQuery {
    Validate,
    Apply,
    BotMove,
}

/// What happens once the active animation finishes: fetch the
/// authoritative board from the engine, or restore the undone move's
/// stored snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Commit {
    QueryEngine,
    RestoreSnapshot,
}

/// The session state machine. Owns the board, the undo history and the
/// active animation; reaches the rules engine only through the injected
/// [`RulesEngine`]. Time enters exclusively through [`GameSession::update`],
/// so tests substitute a scripted engine and a controlled clock.
pub struct GameSession {
    dimension: usize,
    board: Board,
    state: SessionState,
    current_player: Color,
    red: PlayerKind,
    blue: PlayerKind,
    engine: Box<dyn RulesEngine>,
    pending: Option<PendingQuery>,
    active_move: Option<Move>,
    animator: Option<MoveAnimator>,
    commit: Option<Commit>,
    history: Vec<Move>,
    selection: Option<usize>,
    turn_limit: Option<f64>,
    turn_started: Option<f64>,
    bots_suspended: bool,
}

impl GameSession {
    /// Creates a session in the menu state, both sides human, on the
    /// default board.
    pub fn new(engine: Box<dyn RulesEngine>) -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            board: Board::starting_position(DEFAULT_DIMENSION),
            state: SessionState::Menu,
            current_player: Color::Red,
            red: PlayerKind::Human,
            blue: PlayerKind::Human,
            engine,
            pending: None,
            active_move: None,
            animator: None,
            commit: None,
            history: Vec::new(),
            selection: None,
            turn_limit: None,
            turn_started: None,
            bots_suspended: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn current_player(&self) -> Color {
        self.current_player
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn history(&self) -> &[Move] {
        &self.history
    }

    /// Opens play from the menu: builds the starting board and hands
    /// the first turn to red.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Menu {
            return Err(SessionError::NotAllowed { state: self.state });
        }
        self.reset();
        Ok(())
    }

    /// Restarts the game. Rejected while a move or query is in flight.
    pub fn restart(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Menu | SessionState::AwaitingInput | SessionState::GameOver => {
                self.reset();
                Ok(())
            }
            state => Err(SessionError::NotAllowed { state }),
        }
    }

    /// Changes the board side. Permitted between moves only; resets the
    /// game when one is underway.
    pub fn set_dimension(&mut self, dimension: usize) -> Result<(), SessionError> {
        match self.state {
            SessionState::Menu | SessionState::AwaitingInput | SessionState::GameOver => {}
            state => return Err(SessionError::NotAllowed { state }),
        }
        if !board::DIMENSIONS.contains(&dimension) {
            return Err(BoardError::UnsupportedDimension(dimension).into());
        }
        self.dimension = dimension;
        if self.state == SessionState::Menu {
            self.board = Board::starting_position(dimension);
        } else {
            self.reset();
        }
        Ok(())
    }

    /// Configures one side as human or bot. Permitted between moves
    /// only. Also lifts any bot suspension, since the host is visibly
    /// reconfiguring the session.
    pub fn set_player(&mut self, side: Color, kind: PlayerKind) -> Result<(), SessionError> {
        match self.state {
            SessionState::Menu | SessionState::AwaitingInput | SessionState::GameOver => {
                match side {
                    Color::Red => self.red = kind,
                    Color::Blue => self.blue = kind,
                }
                self.bots_suspended = false;
                Ok(())
            }
            state => Err(SessionError::NotAllowed { state }),
        }
    }

    /// Enables (positive seconds) or disables the per-turn clock.
    /// Expiry forfeits the game to the opponent.
    pub fn set_turn_limit(&mut self, limit: Option<f64>) -> Result<(), SessionError> {
        match self.state {
            SessionState::Menu | SessionState::AwaitingInput | SessionState::GameOver => {
                self.turn_limit = limit.filter(|l| *l > 0.0);
                Ok(())
            }
            state => Err(SessionError::NotAllowed { state }),
        }
    }

    /// Lifts the bot suspension installed after an engine failure,
    /// letting the pending bot turn re-issue its query on the next
    /// update.
    pub fn resume_bots(&mut self) {
        self.bots_suspended = false;
    }

    /// Two-pick move entry: the first pick selects the origin piece,
    /// the second names the destination and submits the move. Picking
    /// the selected tile again submits the self-removal move.
    pub fn pick(&mut self, id: usize) -> Result<(), SessionError> {
        if self.state != SessionState::AwaitingInput {
            return Err(SessionError::NotAllowed { state: self.state });
        }
        if id >= self.dimension * self.dimension {
            return Err(MoveError::IdOutOfRange {
                id,
                dimension: self.dimension,
            }
            .into());
        }
        match self.selection.take() {
            None => {
                let position = moves::position_of(id, self.dimension);
                let tile = self.board.tile_at_mut(position.column, position.line);
                let Some(piece) = tile.piece_mut() else {
                    return Err(MoveError::OriginEmpty { id }.into());
                };
                piece.selected = true;
                self.selection = Some(id);
                Ok(())
            }
            Some(origin_id) => {
                self.clear_selection_flag(origin_id);
                self.submit_move(origin_id, id)
            }
        }
    }

    /// Proposes a move for the current player. Structural failures are
    /// rejected locally without contacting the engine; otherwise the
    /// legality query goes out and the session awaits the verdict.
    pub fn submit_move(&mut self, origin_id: usize, destin_id: usize) -> Result<(), SessionError> {
        if self.state != SessionState::AwaitingInput {
            return Err(SessionError::NotAllowed { state: self.state });
        }
        let mv = Move::from_ids(
            self.current_player,
            origin_id,
            destin_id,
            self.dimension,
            self.board.serialize(),
        )?;
        if mv.direction == Direction::Invalid {
            return Err(MoveError::InvalidDirection.into());
        }

        let request = EngineRequest::ValidateMove {
            dimension: mv.dimension,
            board: mv.board_before.clone(),
            player: mv.player.code(),
            column: mv.column,
            line: mv.line,
            direction: mv.direction.code(),
        };
        self.engine.submit(request)?;
        debug!(
            "validating {origin_id} -> {destin_id} for {:?}",
            self.current_player
        );
        self.active_move = Some(mv);
        self.pending = Some(PendingQuery::Validate);
        self.state = SessionState::ValidatingMove;
        Ok(())
    }

    /// Undoes the last committed move: plays the reverse animation, then
    /// restores the move's stored snapshot and hands the turn back to
    /// the move's player. No engine query is involved.
    pub fn request_undo(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::AwaitingInput {
            return Err(SessionError::NotAllowed { state: self.state });
        }
        let Some(mv) = self.history.pop() else {
            return Err(SessionError::EmptyHistory);
        };
        if !mv.snapshot_intact() {
            warn!("undo snapshot failed integrity check");
            self.state = SessionState::GameOver;
            return Err(SessionError::CorruptSnapshot);
        }
        let snapshot_tiles = match board::parse_board_text(&mv.board_before, mv.dimension) {
            Ok(tiles) => tiles,
            Err(err) => {
                self.state = SessionState::GameOver;
                return Err(err.into());
            }
        };

        // The captured piece re-enters at the destination; its color is
        // whatever the pre-move snapshot holds there.
        let captured_color = snapshot_tiles[mv.destin_id].piece().map(Piece::color);
        let captured_piece = captured_color.map(|color| {
            self.board
                .take_removed(color)
                .unwrap_or_else(|| Piece::new(color))
        });
        let destin = moves::position_of(mv.destin_id, mv.dimension);
        let mover = if mv.origin_id != mv.destin_id {
            let tile = self.board.tile_at_mut(destin.column, destin.line);
            tile.take_piece().or_else(|| Some(Piece::new(mv.player)))
        } else {
            None
        };

        info!("undoing move {} -> {}", mv.origin_id, mv.destin_id);
        self.animator = Some(MoveAnimator::new(
            &mv,
            Playback::Reverse,
            mover,
            captured_piece,
        ));
        self.commit = Some(Commit::RestoreSnapshot);
        self.active_move = Some(mv);
        self.state = SessionState::Animating;
        Ok(())
    }

    /// Advances the session by one frame at time `t` (seconds,
    /// monotonic). Polls the engine, drives the animation and the turn
    /// clock, and triggers bot queries. Returned events are the
    /// observable outcomes of everything asynchronous.
    pub fn update(&mut self, t: f64) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        match self.state {
            SessionState::Menu | SessionState::GameOver => {}
            SessionState::AwaitingInput => self.update_awaiting_input(t, &mut events),
            SessionState::ValidatingMove => self.update_validating(&mut events),
            SessionState::Animating => self.update_animating(t, &mut events),
            SessionState::AwaitingBotMove => self.update_awaiting_bot(&mut events),
        }
        events
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let removed_red = self
            .board
            .removed()
            .iter()
            .filter(|p| p.color() == Color::Red)
            .count();
        SessionSnapshot {
            cells: self.board.cells(),
            dimension: self.dimension,
            state: self.state,
            current_player: self.current_player.code(),
            red: self.red,
            blue: self.blue,
            moves_played: self.history.len(),
            removed_red,
            removed_blue: self.board.removed().len() - removed_red,
        }
    }

    pub fn animation(&self) -> Option<AnimationSnapshot> {
        self.animator.as_ref().map(MoveAnimator::snapshot)
    }

    /// Encodes the committed move list for save/replay.
    pub fn export_history(&self) -> Vec<u8> {
        replay::encode_history(&self.history)
    }

    fn reset(&mut self) {
        self.board = Board::starting_position(self.dimension);
        self.history.clear();
        self.selection = None;
        self.active_move = None;
        self.animator = None;
        self.commit = None;
        self.pending = None;
        self.current_player = Color::Red;
        self.turn_started = None;
        self.bots_suspended = false;
        self.state = SessionState::AwaitingInput;
        info!("session started on a {0}x{0} board", self.dimension);
    }

    fn player_kind(&self, side: Color) -> PlayerKind {
        match side {
            Color::Red => self.red,
            Color::Blue => self.blue,
        }
    }

    fn clear_selection_flag(&mut self, id: usize) {
        let position = moves::position_of(id, self.dimension);
        if let Some(piece) = self
            .board
            .tile_at_mut(position.column, position.line)
            .piece_mut()
        {
            piece.selected = false;
        }
    }

    fn update_awaiting_input(&mut self, t: f64, events: &mut Vec<SessionEvent>) {
        let started = *self.turn_started.get_or_insert(t);
        if let Some(limit) = self.turn_limit
            && t - started >= limit
        {
            let loser = self.current_player;
            info!("turn clock expired for {loser:?}");
            events.push(SessionEvent::TurnExpired { player: loser });
            events.push(SessionEvent::GameOver {
                winner: Some(loser.opponent()),
            });
            self.state = SessionState::GameOver;
            return;
        }

        let kind = self.player_kind(self.current_player);
        if kind == PlayerKind::Human || self.bots_suspended {
            return;
        }
        let Some(difficulty) = kind.difficulty() else {
            return;
        };
        let request = EngineRequest::RequestBotMove {
            dimension: self.dimension,
            board: self.board.serialize(),
            player: self.current_player.code(),
            difficulty,
        };
        match self.engine.submit(request) {
            Ok(()) => {
                debug!("requested bot move for {:?}", self.current_player);
                self.pending = Some(PendingQuery::BotMove);
                self.state = SessionState::AwaitingBotMove;
            }
            Err(err) => {
                warn!("engine failure: {err}");
                self.bots_suspended = true;
                events.push(SessionEvent::EngineFailed {
                    message: err.to_string(),
                });
            }
        }
    }

    fn update_validating(&mut self, events: &mut Vec<SessionEvent>) {
        match self.engine.poll() {
            None => {}
            Some(Ok(EngineReply::Verdict { accepted })) => {
                self.pending = None;
                if accepted {
                    self.begin_animation(events);
                } else {
                    let Some(mv) = self.active_move.take() else {
                        unreachable!("verdict for a move that was never active");
                    };
                    debug!("engine rejected {} -> {}", mv.origin_id, mv.destin_id);
                    events.push(SessionEvent::MoveRejected {
                        origin_id: mv.origin_id,
                        destin_id: mv.destin_id,
                    });
                    self.state = SessionState::AwaitingInput;
                }
            }
            Some(Ok(other)) => self.engine_failed(
                events,
                EngineError::MalformedReply(format!(
                    "unexpected reply to validate query: {other:?}"
                )),
            ),
            Some(Err(err)) => self.engine_failed(events, err),
        }
    }

    fn update_animating(&mut self, t: f64, events: &mut Vec<SessionEvent>) {
        if self.pending == Some(PendingQuery::Apply) {
            self.poll_apply(events);
            return;
        }

        let finished_now = match self.animator.as_mut() {
            Some(animator) => animator.update(t),
            None => unreachable!("animating without an animator"),
        };
        if !finished_now {
            return;
        }
        // moving flags are clear; the session may now advance state
        match self.commit {
            Some(Commit::QueryEngine) => self.submit_apply(events),
            Some(Commit::RestoreSnapshot) => self.finish_undo(events),
            None => unreachable!("animation finished without a commit strategy"),
        }
    }

    fn update_awaiting_bot(&mut self, events: &mut Vec<SessionEvent>) {
        match self.engine.poll() {
            None => {}
            Some(Ok(EngineReply::BotMove {
                origin_id,
                destin_id,
            })) => {
                self.pending = None;
                events.push(SessionEvent::BotMoveChosen {
                    origin_id,
                    destin_id,
                });
                // a bot move rides the same validate/animate/commit path
                self.state = SessionState::AwaitingInput;
                if let Err(err) = self.submit_move(origin_id, destin_id) {
                    self.engine_failed(
                        events,
                        EngineError::MalformedReply(format!(
                            "engine proposed an unusable bot move: {err}"
                        )),
                    );
                }
            }
            Some(Ok(other)) => self.engine_failed(
                events,
                EngineError::MalformedReply(format!(
                    "unexpected reply to bot-move query: {other:?}"
                )),
            ),
            Some(Err(err)) => self.engine_failed(events, err),
        }
    }

    /// Lifts the involved pieces off their tiles and starts the forward
    /// animation for the accepted move.
    fn begin_animation(&mut self, events: &mut Vec<SessionEvent>) {
        let Some(mv) = self.active_move.take() else {
            unreachable!("accepted move vanished before animation");
        };
        let origin = moves::position_of(mv.origin_id, mv.dimension);
        let destin = moves::position_of(mv.destin_id, mv.dimension);

        let captured = self
            .board
            .tile_at_mut(destin.column, destin.line)
            .take_piece();
        let mover = if mv.origin_id != mv.destin_id {
            self.board
                .tile_at_mut(origin.column, origin.line)
                .take_piece()
        } else {
            None
        };

        info!(
            "move {} -> {} accepted, animating",
            mv.origin_id, mv.destin_id
        );
        events.push(SessionEvent::MoveAccepted {
            origin_id: mv.origin_id,
            destin_id: mv.destin_id,
        });
        self.animator = Some(MoveAnimator::new(&mv, Playback::Forward, mover, captured));
        self.commit = Some(Commit::QueryEngine);
        self.active_move = Some(mv);
        self.state = SessionState::Animating;
    }

    /// Second phase of the two-phase commit: the animation is done, now
    /// fetch the authoritative post-move board.
    fn submit_apply(&mut self, events: &mut Vec<SessionEvent>) {
        let request = match self.active_move.as_ref() {
            Some(mv) => EngineRequest::ApplyMove {
                dimension: mv.dimension,
                board: mv.board_before.clone(),
                player: mv.player.code(),
                column: mv.column,
                line: mv.line,
                direction: mv.direction.code(),
            },
            None => unreachable!("apply requested without an active move"),
        };
        match self.engine.submit(request) {
            Ok(()) => self.pending = Some(PendingQuery::Apply),
            Err(err) => {
                self.revert_uncommitted();
                self.engine_failed(events, err);
            }
        }
    }

    fn poll_apply(&mut self, events: &mut Vec<SessionEvent>) {
        match self.engine.poll() {
            None => {}
            Some(Ok(EngineReply::Applied { board, winner })) => {
                self.pending = None;
                if let Err(err) = self.board.rebuild_from(&board) {
                    self.fatal(events, err.to_string());
                    return;
                }
                if let Some(mut animator) = self.animator.take() {
                    let (_mover, captured) = animator.take_pieces();
                    if let Some(piece) = captured {
                        self.board.push_removed(piece);
                    }
                }
                self.commit = None;
                let Some(mv) = self.active_move.take() else {
                    unreachable!("applied a move that was never active");
                };
                info!(
                    "committed {:?} move {} -> {}",
                    mv.player, mv.origin_id, mv.destin_id
                );
                events.push(SessionEvent::MoveCommitted {
                    player: mv.player,
                    origin_id: mv.origin_id,
                    destin_id: mv.destin_id,
                });
                self.history.push(mv);
                self.turn_started = None;
                self.selection = None;
                match winner {
                    Some(code) => {
                        let winner = Color::from_code(code);
                        info!("engine signalled terminal board, winner {winner:?}");
                        events.push(SessionEvent::GameOver { winner });
                        self.state = SessionState::GameOver;
                    }
                    None => {
                        self.current_player = self.current_player.opponent();
                        self.state = SessionState::AwaitingInput;
                    }
                }
            }
            Some(Ok(EngineReply::Verdict { accepted: false })) => {
                // the decoupled second confirmation rejected the animated
                // move; nothing was committed, the snapshot stays
                // authoritative and the pieces return to their tiles
                if let Some((origin_id, destin_id)) = self.revert_uncommitted() {
                    events.push(SessionEvent::MoveRejected {
                        origin_id,
                        destin_id,
                    });
                }
                self.turn_started = None;
                self.state = SessionState::AwaitingInput;
            }
            Some(Ok(other)) => {
                self.revert_uncommitted();
                self.engine_failed(
                    events,
                    EngineError::MalformedReply(format!(
                        "unexpected reply to apply query: {other:?}"
                    )),
                );
            }
            Some(Err(err)) => {
                self.revert_uncommitted();
                self.engine_failed(events, err);
            }
        }
    }

    fn finish_undo(&mut self, events: &mut Vec<SessionEvent>) {
        self.animator = None;
        self.commit = None;
        let Some(mv) = self.active_move.take() else {
            unreachable!("undo finished without an active move");
        };
        if let Err(err) = self.board.rebuild_from(&mv.board_before) {
            self.fatal(events, err.to_string());
            return;
        }
        self.current_player = mv.player;
        self.turn_started = None;
        self.selection = None;
        self.state = SessionState::AwaitingInput;
        info!("undid move {} -> {}", mv.origin_id, mv.destin_id);
        events.push(SessionEvent::UndoCompleted { player: mv.player });
    }

    /// Puts the in-flight pieces back on their tiles and drops the
    /// uncommitted move. Returns the move's ids for event reporting.
    fn revert_uncommitted(&mut self) -> Option<(usize, usize)> {
        self.pending = None;
        self.commit = None;
        let pieces = self.animator.take().map(|mut a| a.take_pieces());
        let mv = self.active_move.take()?;
        if let Some((mover, captured)) = pieces {
            let origin = moves::position_of(mv.origin_id, mv.dimension);
            let destin = moves::position_of(mv.destin_id, mv.dimension);
            if let Some(piece) = mover {
                self.board
                    .tile_at_mut(origin.column, origin.line)
                    .set_piece(piece);
            }
            if let Some(piece) = captured {
                self.board
                    .tile_at_mut(destin.column, destin.line)
                    .set_piece(piece);
            }
        }
        Some((mv.origin_id, mv.destin_id))
    }

    fn engine_failed(&mut self, events: &mut Vec<SessionEvent>, err: EngineError) {
        warn!("engine failure: {err}");
        self.pending = None;
        self.active_move = None;
        if self.player_kind(self.current_player) != PlayerKind::Human {
            // returning to input would immediately re-issue the bot
            // query; hold it until the host explicitly resumes
            self.bots_suspended = true;
        }
        self.turn_started = None;
        self.state = SessionState::AwaitingInput;
        events.push(SessionEvent::EngineFailed {
            message: err.to_string(),
        });
    }

    fn fatal(&mut self, events: &mut Vec<SessionEvent>, message: String) {
        warn!("fatal session error: {message}");
        self.pending = None;
        self.animator = None;
        self.active_move = None;
        self.commit = None;
        events.push(SessionEvent::Fatal { message });
        self.state = SessionState::GameOver;
    }
}
