//! Error types used by the crate.

use thiserror::Error;

/// Lodestone error type.
///
/// None of these are ever propagated to the host page as exceptions; the view
/// controller converts every failure into presentation state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LodestoneError {
    /// The access token was missing or empty at mount time.
    #[error("map access token is not configured")]
    MissingToken,
    /// The mapping SDK script or stylesheet failed to load.
    #[error("failed to load the mapping SDK: {0}")]
    AssetLoad(String),
    /// The map never reported load completion within the allowed window.
    #[error("the map did not finish loading in time")]
    LoadTimeout,
    /// Constructing the map or marker raised an exception.
    #[error("failed to create the map: {0}")]
    MapCreation(String),
    /// A required browser API is not available.
    #[error("browser capability is not available: {0}")]
    Platform(String),
    /// Error interacting with the WASM runtime.
    #[error("wasm error: {0:?}")]
    Wasm(Option<String>),
}

#[cfg(target_arch = "wasm32")]
impl From<wasm_bindgen::JsValue> for LodestoneError {
    fn from(value: wasm_bindgen::JsValue) -> Self {
        LodestoneError::Wasm(value.as_string().or_else(|| Some(format!("{value:?}"))))
    }
}

#[cfg(target_arch = "wasm32")]
impl From<web_sys::Element> for LodestoneError {
    fn from(value: web_sys::Element) -> Self {
        LodestoneError::Wasm(Some(format!("failed to cast {value:?} into target type")))
    }
}

#[cfg(target_arch = "wasm32")]
impl From<js_sys::Object> for LodestoneError {
    fn from(value: js_sys::Object) -> Self {
        LodestoneError::Wasm(Some(format!("failed to cast {value:?} into target type")))
    }
}
