use std::cell::RefCell;

use lodestone::{MapOptions, MapView};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

thread_local! {
    // Keeps the mounted view alive for the lifetime of the page.
    static VIEW: RefCell<Option<MapView>> = const { RefCell::new(None) };
}

/// Entry point called by the host page once the module is initialized.
#[wasm_bindgen]
pub fn main() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Debug).expect("Couldn't init logger");

    let window = web_sys::window().expect("no global `window` exists");
    let document = window.document().expect("no document on window");
    let container: web_sys::HtmlElement = document
        .get_element_by_id("map")
        .expect("the page does not have a #map container")
        .dyn_into()?;

    // The host page configures the view with a plain object on `window`.
    let raw = js_sys::Reflect::get(&window, &JsValue::from_str("LODESTONE_OPTIONS"))?;
    let options = if raw.is_undefined() || raw.is_null() {
        MapOptions::new("")
    } else {
        MapOptions::from_js(&raw).map_err(|error| JsValue::from_str(&error.to_string()))?
    };

    let view = MapView::mount(&container, options)
        .map_err(|error| JsValue::from_str(&error.to_string()))?;
    VIEW.with(|cell| *cell.borrow_mut() = Some(view));

    Ok(())
}
