use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// One query to the external rules engine. The board travels as the
/// row-major wire text of [`crate::board::Board::serialize`]; players
/// use the 1/2 color codes and directions their single-character codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineRequest {
    ValidateMove {
        dimension: usize,
        board: String,
        player: u8,
        column: usize,
        line: usize,
        direction: char,
    },
    ApplyMove {
        dimension: usize,
        board: String,
        player: u8,
        column: usize,
        line: usize,
        direction: char,
    },
    RequestBotMove {
        dimension: usize,
        board: String,
        player: u8,
        difficulty: u8,
    },
}

/// Reply to the corresponding request.
///
/// Contract:
/// - `Applied.winner` is absent while the game continues; `Some(1)` /
///   `Some(2)` name the winning color, `Some(0)` a drawn terminal board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineReply {
    Verdict { accepted: bool },
    Applied { board: String, winner: Option<u8> },
    BotMove { origin_id: usize, destin_id: usize },
}

/// Non-blocking gateway to the external rules engine.
///
/// Contract:
/// - `submit` hands the query to the transport and returns immediately.
/// - At most one query is outstanding; a submitted query resolves to
///   exactly one `poll` result. There is no cancellation.
pub trait RulesEngine: Send {
    fn submit(&mut self, request: EngineRequest) -> Result<(), EngineError>;
    fn poll(&mut self) -> Option<Result<EngineReply, EngineError>>;
}

#[derive(Debug, Default)]
struct BridgeState {
    outstanding: bool,
    outgoing: Option<EngineRequest>,
    incoming: Option<Result<EngineReply, EngineError>>,
}

/// Engine adapter for hosts that own the actual transport (the JS side
/// of the WASM build). The session submits here; the host drains
/// [`HostBridge::take_request`], performs the query, and hands the
/// reply back through [`HostBridge::deliver`], where the session's next
/// poll picks it up. Clones share the same bridge.
#[derive(Debug, Clone, Default)]
pub struct HostBridge {
    shared: Arc<Mutex<BridgeState>>,
}

impl HostBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns the request waiting for transport, if any.
    pub fn take_request(&self) -> Option<EngineRequest> {
        self.lock().outgoing.take()
    }

    /// Hands the host-produced reply (or transport failure) back to the
    /// session. Rejected when no query is outstanding.
    pub fn deliver(&self, reply: Result<EngineReply, EngineError>) -> Result<(), EngineError> {
        let mut state = self.lock();
        if !state.outstanding {
            return Err(EngineError::MalformedReply(
                "reply delivered with no outstanding query".to_string(),
            ));
        }
        state.incoming = Some(reply);
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BridgeState> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RulesEngine for HostBridge {
    fn submit(&mut self, request: EngineRequest) -> Result<(), EngineError> {
        let mut state = self.lock();
        if state.outstanding {
            return Err(EngineError::Busy);
        }
        state.outstanding = true;
        state.outgoing = Some(request);
        Ok(())
    }

    fn poll(&mut self) -> Option<Result<EngineReply, EngineError>> {
        let mut state = self.lock();
        let reply = state.incoming.take()?;
        state.outstanding = false;
        state.outgoing = None;
        Some(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate_request() -> EngineRequest {
        EngineRequest::ValidateMove {
            dimension: 6,
            board: "[[E]]".to_string(),
            player: 1,
            column: 3,
            line: 4,
            direction: 'u',
        }
    }

    #[test]
    fn bridge_round_trips_one_query() {
        let bridge = HostBridge::new();
        let mut engine: Box<dyn RulesEngine> = Box::new(bridge.clone());

        assert!(bridge.take_request().is_none());
        engine.submit(validate_request()).unwrap();

        let request = bridge.take_request().unwrap();
        assert_eq!(request, validate_request());

        assert!(engine.poll().is_none());
        bridge
            .deliver(Ok(EngineReply::Verdict { accepted: true }))
            .unwrap();

        let reply = engine.poll().unwrap().unwrap();
        assert_eq!(reply, EngineReply::Verdict { accepted: true });
    }

    #[test]
    fn bridge_rejects_second_submit_while_outstanding() {
        let bridge = HostBridge::new();
        let mut engine: Box<dyn RulesEngine> = Box::new(bridge.clone());

        engine.submit(validate_request()).unwrap();
        let err = engine.submit(validate_request()).unwrap_err();
        assert_eq!(err, EngineError::Busy);
    }

    #[test]
    fn bridge_rejects_unsolicited_reply() {
        let bridge = HostBridge::new();

        let err = bridge
            .deliver(Ok(EngineReply::Verdict { accepted: false }))
            .unwrap_err();
        assert!(matches!(err, EngineError::MalformedReply(_)));
    }

    #[test]
    fn bridge_clears_outstanding_after_poll() {
        let bridge = HostBridge::new();
        let mut engine: Box<dyn RulesEngine> = Box::new(bridge.clone());

        engine.submit(validate_request()).unwrap();
        bridge
            .deliver(Err(EngineError::Unreachable("socket closed".to_string())))
            .unwrap();
        assert!(matches!(engine.poll(), Some(Err(EngineError::Unreachable(_)))));

        // the slot is free again
        engine.submit(validate_request()).unwrap();
    }
}
