//! Lodestone renders an interactive, stylistically themed map inside a web
//! page, centered on the device location when it can be acquired, with a
//! single marker that tracks the user.
//!
//! The heart of the crate is the `MapView` lifecycle controller. Mounting a
//! view kicks off a fixed sequence on the browser event loop:
//!
//! 1. the device position is requested once, with a bounded timeout, falling
//!    back to a fixed default location so the view always proceeds;
//! 2. the external mapping SDK script and stylesheet are loaded through a
//!    memoized initializer shared by all mounts and retries;
//! 3. the map is created against the container, the configured style is
//!    applied (with a one-shot automatic fallback to the built-in default
//!    style), and a watchdog timeout guards the load;
//! 4. on load completion the user marker is placed and the view becomes
//!    ready.
//!
//! Every failure surfaces as in-band presentation state with a retry
//! control; nothing is thrown at the host page.
//!
//! # Quick start
//!
//! ```no_run
//! # #[cfg(target_arch = "wasm32")]
//! # fn mount(container: &web_sys::HtmlElement) -> Result<(), lodestone::LodestoneError> {
//! use lodestone::{MapOptions, MapView};
//!
//! let options = MapOptions::new("pk.my-access-token")
//!     .with_style_id("mapbox://styles/acme/parchment");
//! let view = MapView::mount(container, options)?;
//! # std::mem::forget(view);
//! # Ok(())
//! # }
//! ```
//!
//! The support modules are plain types deliberately kept free of platform
//! bindings: [`style`] decides which style to use and classifies SDK errors,
//! and the presentation state machine ([`ViewState`], [`ControllerState`])
//! owns the `loading → ready / error` transition table. Both are unit tested
//! on native targets.

#![warn(clippy::unwrap_used)]
#![warn(missing_docs)]

mod coordinates;
pub mod error;
mod options;
pub mod resources;
mod state;
pub mod style;

pub mod loader;
#[cfg(target_arch = "wasm32")]
pub mod location;
#[cfg(target_arch = "wasm32")]
mod sdk;
#[cfg(target_arch = "wasm32")]
mod view;

pub use coordinates::Coordinates;
pub use error::LodestoneError;
pub use options::MapOptions;
pub use state::{ControllerState, LoadingHint, ViewState, RETRY_DISPLAY_CAP};
pub use style::StyleSource;

#[cfg(target_arch = "wasm32")]
pub use view::MapView;
