//! WebAssembly boundary: free functions over one global session.
//!
//! The JS host drives the frame loop (`session_update`), renders from
//! `session_snapshot`/`session_animation`, and owns the engine
//! transport: it drains `pending_engine_request`, performs the query
//! against the rules server, and hands the result back through
//! `deliver_engine_reply` or `engine_unreachable`.

use once_cell::sync::Lazy;
use std::sync::{Mutex, MutexGuard, PoisonError};
use wasm_bindgen::prelude::*;
use web_time::Instant;

use crate::engine::{EngineReply, HostBridge};
use crate::error::EngineError;
use crate::session::GameSession;
use crate::types::{Color, PlayerKind};

struct HostSession {
    session: GameSession,
    bridge: HostBridge,
    epoch: Instant,
}

static SESSION: Lazy<Mutex<Option<HostSession>>> = Lazy::new(|| Mutex::new(None));

fn slot() -> MutexGuard<'static, Option<HostSession>> {
    SESSION.lock().unwrap_or_else(PoisonError::into_inner)
}

fn with_session<T>(f: impl FnOnce(&mut HostSession) -> Result<T, JsValue>) -> Result<T, JsValue> {
    let mut slot = slot();
    let host = slot
        .as_mut()
        .ok_or_else(|| JsValue::from_str("no session started"))?;
    f(host)
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn parse_side(code: u8) -> Result<Color, JsValue> {
    Color::from_code(code).ok_or_else(|| JsValue::from_str("player code must be 1 (red) or 2 (blue)"))
}

fn parse_kind(kind: &str) -> Result<PlayerKind, JsValue> {
    match kind {
        "human" => Ok(PlayerKind::Human),
        "bot_random" => Ok(PlayerKind::BotRandom),
        "bot_greedy" => Ok(PlayerKind::BotGreedy),
        other => Err(JsValue::from_str(&format!("unknown player kind {other:?}"))),
    }
}

/// Creates the global session on a board of the given side and opens
/// play. Replaces any previous session.
#[wasm_bindgen]
pub fn session_start(dimension: usize) -> Result<(), JsValue> {
    let bridge = HostBridge::new();
    let mut session = GameSession::new(Box::new(bridge.clone()));
    session.set_dimension(dimension).map_err(to_js)?;
    session.start().map_err(to_js)?;
    *slot() = Some(HostSession {
        session,
        bridge,
        epoch: Instant::now(),
    });
    Ok(())
}

/// Advances the session one frame and returns the events it produced.
#[wasm_bindgen]
pub fn session_update() -> Result<JsValue, JsValue> {
    with_session(|host| {
        let t = host.epoch.elapsed().as_secs_f64();
        let events = host.session.update(t);
        serde_wasm_bindgen::to_value(&events).map_err(to_js)
    })
}

#[wasm_bindgen]
pub fn session_pick(id: usize) -> Result<(), JsValue> {
    with_session(|host| host.session.pick(id).map_err(to_js))
}

#[wasm_bindgen]
pub fn session_submit_move(origin_id: usize, destin_id: usize) -> Result<(), JsValue> {
    with_session(|host| host.session.submit_move(origin_id, destin_id).map_err(to_js))
}

#[wasm_bindgen]
pub fn session_undo() -> Result<(), JsValue> {
    with_session(|host| host.session.request_undo().map_err(to_js))
}

#[wasm_bindgen]
pub fn session_restart() -> Result<(), JsValue> {
    with_session(|host| host.session.restart().map_err(to_js))
}

#[wasm_bindgen]
pub fn session_set_dimension(dimension: usize) -> Result<(), JsValue> {
    with_session(|host| host.session.set_dimension(dimension).map_err(to_js))
}

/// Configures one side; `side` is the 1/2 color code and `kind` one of
/// `"human"`, `"bot_random"`, `"bot_greedy"`.
#[wasm_bindgen]
pub fn session_set_player(side: u8, kind: &str) -> Result<(), JsValue> {
    let side = parse_side(side)?;
    let kind = parse_kind(kind)?;
    with_session(|host| host.session.set_player(side, kind).map_err(to_js))
}

/// Per-turn clock in seconds; zero or negative disables it.
#[wasm_bindgen]
pub fn session_set_turn_limit(seconds: f64) -> Result<(), JsValue> {
    let limit = (seconds > 0.0).then_some(seconds);
    with_session(|host| host.session.set_turn_limit(limit).map_err(to_js))
}

#[wasm_bindgen]
pub fn session_resume_bots() -> Result<(), JsValue> {
    with_session(|host| {
        host.session.resume_bots();
        Ok(())
    })
}

#[wasm_bindgen]
pub fn session_snapshot() -> Result<JsValue, JsValue> {
    with_session(|host| serde_wasm_bindgen::to_value(&host.session.snapshot()).map_err(to_js))
}

#[wasm_bindgen]
pub fn session_animation() -> Result<JsValue, JsValue> {
    with_session(|host| serde_wasm_bindgen::to_value(&host.session.animation()).map_err(to_js))
}

/// Returns the engine query waiting for transport, or `null`.
#[wasm_bindgen]
pub fn pending_engine_request() -> Result<JsValue, JsValue> {
    with_session(|host| serde_wasm_bindgen::to_value(&host.bridge.take_request()).map_err(to_js))
}

/// Hands the rules server's reply back to the session.
#[wasm_bindgen]
pub fn deliver_engine_reply(reply: JsValue) -> Result<(), JsValue> {
    let reply: EngineReply = serde_wasm_bindgen::from_value(reply).map_err(to_js)?;
    with_session(|host| host.bridge.deliver(Ok(reply)).map_err(to_js))
}

/// Reports a transport failure for the outstanding query.
#[wasm_bindgen]
pub fn engine_unreachable(message: String) -> Result<(), JsValue> {
    with_session(|host| {
        host.bridge
            .deliver(Err(EngineError::Unreachable(message.clone())))
            .map_err(to_js)
    })
}

/// Encodes the committed move list for save/replay.
#[wasm_bindgen]
pub fn session_export_history() -> Result<Vec<u8>, JsValue> {
    with_session(|host| Ok(host.session.export_history()))
}
