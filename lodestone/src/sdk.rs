//! Typed access to the dynamically loaded mapping SDK.
//!
//! The SDK arrives by script injection after this module is instantiated, so
//! the namespace and the constructors are looked up reflectively at call
//! time. Instance methods use wasm-bindgen's structural lookup and therefore
//! work on objects created that way.

use js_sys::{Array, Function, Object, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::error::LodestoneError;
use crate::resources::SDK_GLOBAL;
use crate::Coordinates;

#[wasm_bindgen]
extern "C" {
    /// Handle to a live map created by the SDK.
    pub type SdkMap;

    #[wasm_bindgen(method, js_name = on)]
    fn on_js(this: &SdkMap, event: &str, listener: &Function);

    #[wasm_bindgen(method, catch, js_name = setStyle)]
    fn set_style_js(this: &SdkMap, style: &JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(method, js_name = remove)]
    fn map_remove_js(this: &SdkMap);

    /// Handle to a marker created by the SDK.
    pub type SdkMarker;

    #[wasm_bindgen(method, js_name = setLngLat)]
    fn set_lng_lat_js(this: &SdkMarker, lng_lat: &Array) -> SdkMarker;

    #[wasm_bindgen(method, js_name = addTo)]
    fn add_to_js(this: &SdkMarker, map: &SdkMap) -> SdkMarker;

    #[wasm_bindgen(method, js_name = remove)]
    fn marker_remove_js(this: &SdkMarker) -> SdkMarker;
}

impl SdkMap {
    /// Subscribes a listener to a named SDK event.
    pub fn subscribe(&self, event: &str, listener: &Function) {
        self.on_js(event, listener);
    }

    /// Replaces the style of the live map.
    pub fn set_style(&self, style_url: &str) -> Result<(), LodestoneError> {
        self.set_style_js(&JsValue::from_str(style_url))
            .map_err(LodestoneError::from)
    }

    /// Releases the map and its resources.
    pub fn release(&self) {
        self.map_remove_js();
    }
}

impl SdkMarker {
    /// Moves the marker to the given position.
    pub fn set_position(&self, position: Coordinates) {
        self.set_lng_lat_js(&lng_lat(position));
    }

    /// Attaches the marker to a map.
    pub fn attach(&self, map: &SdkMap) {
        self.add_to_js(map);
    }

    /// Detaches the marker from its map and releases it.
    pub fn release(&self) {
        self.marker_remove_js();
    }
}

/// Sets the access token process-wide on the SDK namespace.
pub fn set_access_token(token: &str) -> Result<(), LodestoneError> {
    let ns = namespace()?;
    Reflect::set(
        &ns,
        &JsValue::from_str("accessToken"),
        &JsValue::from_str(token),
    )?;
    Ok(())
}

/// Creates a map bound to the given container element.
pub fn create_map(
    container: &web_sys::Element,
    center: Coordinates,
    zoom: f64,
    style_url: &str,
) -> Result<SdkMap, LodestoneError> {
    let options = Object::new();
    Reflect::set(&options, &JsValue::from_str("container"), container.as_ref())?;
    Reflect::set(&options, &JsValue::from_str("center"), &lng_lat(center))?;
    Reflect::set(
        &options,
        &JsValue::from_str("zoom"),
        &JsValue::from_f64(zoom),
    )?;
    Reflect::set(
        &options,
        &JsValue::from_str("style"),
        &JsValue::from_str(style_url),
    )?;

    let map = Reflect::construct(&constructor("Map")?, &Array::of1(&options))
        .map_err(|error| LodestoneError::MapCreation(describe(&error)))?;
    Ok(map.unchecked_into())
}

/// Creates a marker carrying the given visual element, positioned but not yet
/// attached to any map.
pub fn create_marker(
    element: &web_sys::Element,
    position: Coordinates,
) -> Result<SdkMarker, LodestoneError> {
    let options = Object::new();
    Reflect::set(&options, &JsValue::from_str("element"), element.as_ref())?;

    let marker: SdkMarker = Reflect::construct(&constructor("Marker")?, &Array::of1(&options))
        .map_err(|error| LodestoneError::MapCreation(describe(&error)))?
        .unchecked_into();
    marker.set_position(position);
    Ok(marker)
}

fn namespace() -> Result<Object, LodestoneError> {
    let window =
        web_sys::window().ok_or_else(|| LodestoneError::Platform("window".to_string()))?;
    let ns = Reflect::get(&window, &JsValue::from_str(SDK_GLOBAL))?;
    ns.dyn_into::<Object>().map_err(|_| {
        LodestoneError::AssetLoad(format!("SDK namespace `{SDK_GLOBAL}` is not available"))
    })
}

fn constructor(name: &str) -> Result<Function, LodestoneError> {
    let ns = namespace()?;
    Reflect::get(&ns, &JsValue::from_str(name))?
        .dyn_into::<Function>()
        .map_err(|_| LodestoneError::MapCreation(format!("SDK does not provide `{name}`")))
}

fn lng_lat(position: Coordinates) -> Array {
    Array::of2(
        &JsValue::from_f64(position.lon),
        &JsValue::from_f64(position.lat),
    )
}

fn describe(error: &JsValue) -> String {
    error
        .as_string()
        .unwrap_or_else(|| format!("{error:?}"))
}
