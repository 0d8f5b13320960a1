use wasm_bindgen::prelude::*;

pub mod animation;
pub mod api;
pub mod board;
pub mod engine;
pub mod error;
pub mod moves;
pub mod replay;
pub mod session;
pub mod types;

#[wasm_bindgen]
pub fn wasm_ready() -> bool {
    true
}
