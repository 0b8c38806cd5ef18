//! Browser example for Lodestone.
//!
//! Mounts a map view into the `#map` element of the host page. The access
//! token and an optional style identifier are read from globals the page
//! defines before loading the module (`LODESTONE_ACCESS_TOKEN`,
//! `LODESTONE_STYLE_ID`).

#[cfg(target_arch = "wasm32")]
mod app;

#[cfg(target_arch = "wasm32")]
pub use app::main;
