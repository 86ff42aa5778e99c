//! Poster shop Web Frontend
//!
//! Leptos-based WASM frontend: catalog, checkout redirect, purchase success
//! page and the cookie-consent banner.

mod api;
mod app;
mod components;
pub mod consent;
mod pages;

pub use app::App;

use wasm_bindgen::prelude::*;

/// WASM entry point
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    leptos::mount::mount_to_body(App);
}
