#![cfg(target_arch = "wasm32")]

use wasm_bindgen_test::*;

use talpa::api::{
    deliver_engine_reply, pending_engine_request, session_export_history, session_snapshot,
    session_start, session_submit_move, session_update,
};
use talpa::wasm_ready;

#[wasm_bindgen_test]
fn ready_probe_answers() {
    assert!(wasm_ready());
}

#[wasm_bindgen_test]
fn session_round_trips_over_the_boundary() {
    session_start(6).unwrap();

    let snapshot = session_snapshot().unwrap();
    assert!(snapshot.is_object());

    // structurally invalid intent rejects at the boundary
    assert!(session_submit_move(0, 2).is_err());

    // a valid intent parks a validate query for the host transport
    session_submit_move(0, 1).unwrap();
    let request = pending_engine_request().unwrap();
    assert!(!request.is_null());

    let reply = js_sys::JSON::parse(r#"{"kind":"verdict","accepted":true}"#).unwrap();
    deliver_engine_reply(reply).unwrap();

    let events = session_update().unwrap();
    assert!(js_sys::Array::is_array(&events));

    let history = session_export_history().unwrap();
    assert_eq!(&history[0..4], b"TLPA");
}
