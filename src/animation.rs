use crate::board::Piece;
use crate::moves::{Move, position_of};
use crate::types::{AnimationSnapshot, Position};

/// Every move animates over one fixed time unit, regardless of distance.
pub const TOTAL_TIME: f64 = 1.0;

/// Peak height of the capture arc, in world units.
pub const ARC_PEAK_HEIGHT: f32 = 5.0;

/// Playback direction of the trajectory engine. `Reverse` swaps both
/// paths' endpoints for an undo: the moved piece returns to its origin
/// and the captured piece re-enters the board from the rest position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    Forward,
    Reverse,
}

/// Linear relocation path in board coordinates `[column, line]`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LinePath {
    start: [f32; 2],
    end: [f32; 2],
    current: [f32; 2],
}

impl LinePath {
    fn new(start: Position, end: Position) -> Self {
        let start = [start.column as f32, start.line as f32];
        let end = [end.column as f32, end.line as f32];
        Self {
            start,
            end,
            current: start,
        }
    }

    fn advance(&mut self, fraction: f32) {
        for axis in 0..2 {
            self.current[axis] = self.start[axis] + fraction * (self.end[axis] - self.start[axis]);
        }
    }
}

/// Capture flight path in world coordinates `[x, y, z]`.
///
/// Planar travel is linear; height follows the parabola fitted through
/// zero at both ends and [`ARC_PEAK_HEIGHT`] at half distance:
/// with `dh = d / 2`, `a = ymax / (dh * (dh - d))`, `b = -a * d`, `c = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ArcPath {
    start: [f32; 3],
    end: [f32; 3],
    current: [f32; 3],
    a: f32,
    b: f32,
    c: f32,
    degenerate: bool,
}

impl ArcPath {
    fn fit(start: [f32; 3], end: [f32; 3]) -> Self {
        let d = planar_distance(start, end);
        if d == 0.0 {
            // The piece is already at its endpoint; the coefficients are
            // ill-defined and must never be evaluated.
            return Self {
                start,
                end,
                current: end,
                a: 0.0,
                b: 0.0,
                c: 0.0,
                degenerate: true,
            };
        }

        let dh = d / 2.0;
        let a = ARC_PEAK_HEIGHT / (dh * (dh - d));
        Self {
            start,
            end,
            current: start,
            a,
            b: -a * d,
            c: 0.0,
            degenerate: false,
        }
    }

    fn advance(&mut self, fraction: f32) {
        if self.degenerate {
            return;
        }
        for axis in [0, 2] {
            self.current[axis] = self.start[axis] + fraction * (self.end[axis] - self.start[axis]);
        }
        let travelled = planar_distance(self.start, self.current);
        self.current[1] = self.a * travelled * travelled + self.b * travelled + self.c;
    }

    /// Height at planar travel distance `x`, for the fitted arc.
    #[cfg(test)]
    fn height_at(&self, x: f32) -> f32 {
        self.a * x * x + self.b * x + self.c
    }
}

/// Trajectory engine for one move: owns the in-flight pieces, computes
/// time-parameterized positions, and reports completion exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveAnimator {
    start_time: Option<f64>,
    finished: bool,
    moving: Option<LinePath>,
    capture: Option<ArcPath>,
    moving_piece: Option<Piece>,
    captured_piece: Option<Piece>,
}

impl MoveAnimator {
    /// Builds the trajectories for one accepted move. Starting the
    /// animation marks every involved piece `moving`; the pieces are
    /// owned here until the animation finishes.
    pub fn new(
        mv: &Move,
        playback: Playback,
        mut moving_piece: Option<Piece>,
        mut captured_piece: Option<Piece>,
    ) -> Self {
        let dimension = mv.dimension;
        let (from_id, to_id) = match playback {
            Playback::Forward => (mv.origin_id, mv.destin_id),
            Playback::Reverse => (mv.destin_id, mv.origin_id),
        };

        let moving = (from_id != to_id && moving_piece.is_some()).then(|| {
            LinePath::new(position_of(from_id, dimension), position_of(to_id, dimension))
        });

        let capture = captured_piece.is_some().then(|| {
            let tile = world_of(position_of(mv.destin_id, dimension), dimension);
            let rest = rest_position(dimension);
            let (start, end) = match playback {
                Playback::Forward => (tile, rest),
                Playback::Reverse => (rest, tile),
            };
            ArcPath::fit(start, end)
        });

        if let Some(piece) = moving_piece.as_mut() {
            piece.moving = true;
        }
        if let Some(piece) = captured_piece.as_mut() {
            piece.moving = true;
        }

        Self {
            start_time: None,
            finished: false,
            moving,
            capture,
            moving_piece,
            captured_piece,
        }
    }

    /// Advances the trajectories to time `t` (seconds). The first call
    /// latches the start time. Returns `true` on the call that finishes
    /// the animation; later calls are no-ops.
    pub fn update(&mut self, t: f64) -> bool {
        if self.finished {
            return false;
        }

        let start = *self.start_time.get_or_insert(t);
        let elapsed = t - start;

        if elapsed >= TOTAL_TIME || !self.has_live_paths() {
            if let Some(path) = self.moving.as_mut() {
                path.current = path.end;
            }
            if let Some(arc) = self.capture.as_mut() {
                arc.current = arc.end;
            }
            self.clear_moving_flags();
            self.finished = true;
            return true;
        }

        let fraction = (elapsed / TOTAL_TIME) as f32;
        if let Some(path) = self.moving.as_mut() {
            path.advance(fraction);
        }
        if let Some(arc) = self.capture.as_mut() {
            arc.advance(fraction);
        }
        false
    }

    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Hands back the in-flight pieces, `moving` flags cleared.
    ///
    /// Caller contract: the animation has finished.
    pub fn take_pieces(&mut self) -> (Option<Piece>, Option<Piece>) {
        debug_assert!(self.finished, "pieces taken before the animation finished");
        (self.moving_piece.take(), self.captured_piece.take())
    }

    pub fn snapshot(&self) -> AnimationSnapshot {
        AnimationSnapshot {
            moving: self.moving.map(|path| path.current),
            capture: self.capture.map(|arc| arc.current),
            finished: self.finished,
        }
    }

    fn has_live_paths(&self) -> bool {
        self.moving.is_some() || self.capture.is_some_and(|arc| !arc.degenerate)
    }

    fn clear_moving_flags(&mut self) {
        if let Some(piece) = self.moving_piece.as_mut() {
            piece.moving = false;
        }
        if let Some(piece) = self.captured_piece.as_mut() {
            piece.moving = false;
        }
    }
}

/// Board position to world coordinates on the table plane.
fn world_of(position: Position, dimension: usize) -> [f32; 3] {
    let offset = dimension as f32 / 2.0 + 0.5;
    [offset - position.line as f32, 0.0, offset - position.column as f32]
}

/// Off-board resting spot for captured pieces, past the board edge.
fn rest_position(dimension: usize) -> [f32; 3] {
    [dimension as f32, 0.0, 0.0]
}

fn planar_distance(from: [f32; 3], to: [f32; 3]) -> f32 {
    let dx = to[0] - from[0];
    let dz = to[2] - from[2];
    (dx * dx + dz * dz).sqrt()
}
