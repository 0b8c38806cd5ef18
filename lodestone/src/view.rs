//! The map view lifecycle controller.
//!
//! [`MapView`] owns everything a mounted view consists of: the presentation
//! state, the DOM it renders into, the live SDK map and marker handles and
//! the callbacks wired into the platform. The asynchronous lifecycle runs on
//! the single browser event loop; a generation counter guards every
//! continuation so that late callbacks from a torn-down or retried view are
//! discarded instead of mutating released state.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use js_sys::Reflect;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlElement};

use crate::error::LodestoneError;
use crate::loader;
use crate::location;
use crate::options::MapOptions;
use crate::resources::{
    DEFAULT_ZOOM, FALLBACK_LOCATION, MAP_LOAD_TIMEOUT_MS, MARKER_ICON, MARKER_SIZE_PX,
    STATIC_ASSET_ROOT,
};
use crate::sdk::{self, SdkMap, SdkMarker};
use crate::state::{ControllerState, LoadingHint, ViewState, RETRY_DISPLAY_CAP};
use crate::style::{classify_sdk_error, on_load_timeout, SdkErrorCause, StyleSource, TimeoutAction};
use crate::Coordinates;

/// A map view mounted into a container element.
///
/// Dropping the value unmounts the view: the marker is released before the
/// map, pending callbacks are disarmed and the DOM the view created is
/// removed from the container.
pub struct MapView {
    inner: Rc<RefCell<Inner>>,
}

/// The live SDK handles of one creation attempt.
///
/// The marker is stored inside the map's slot so it can never outlive the
/// map: releasing the pair always detaches the marker first, and both go
/// away together.
struct MapHandles {
    map: SdkMap,
    marker: Option<SdkMarker>,
}

impl MapHandles {
    fn release(self) {
        if let Some(marker) = self.marker {
            marker.release();
        }
        self.map.release();
    }
}

struct LoadTimeout {
    handle: i32,
    _callback: Closure<dyn FnMut()>,
}

impl Drop for LoadTimeout {
    fn drop(&mut self) {
        if let Some(window) = web_sys::window() {
            window.clear_timeout_with_handle(self.handle);
        }
    }
}

struct Inner {
    options: MapOptions,
    map_container: HtmlElement,
    overlay: HtmlElement,
    state: ControllerState,
    handles: Option<MapHandles>,
    listeners: Vec<Closure<dyn FnMut(JsValue)>>,
    retry_listener: Option<Closure<dyn FnMut()>>,
    timeout: Option<LoadTimeout>,
    active_style: StyleSource,
    style_fallback_used: bool,
    generation: u64,
}

impl Inner {
    /// Releases the SDK handles and disarms everything wired to them.
    ///
    /// Called on every exit path: unmount, retry and terminal errors.
    fn teardown_map(&mut self) {
        self.timeout = None;
        self.listeners.clear();
        if let Some(handles) = self.handles.take() {
            handles.release();
        }
    }
}

impl MapView {
    /// Mounts a new map view into the given container.
    ///
    /// The container's previous content is replaced by the view's own DOM.
    /// A missing access token is not an `Err`: it puts the view into its
    /// error state, the same surface every other failure uses.
    pub fn mount(container: &HtmlElement, options: MapOptions) -> Result<Self, LodestoneError> {
        let document = document()?;

        container.set_inner_html("");
        let map_container = create_div(&document, "lodestone-map")?;
        let style = map_container.style();
        style.set_property("width", "100%")?;
        style.set_property("height", "100%")?;
        let overlay = create_div(&document, "lodestone-overlay")?;
        container.append_child(&map_container)?;
        container.append_child(&overlay)?;

        let active_style = options.style();
        let has_token = options.has_access_token();
        let inner = Rc::new(RefCell::new(Inner {
            options,
            map_container,
            overlay,
            state: ControllerState::new(),
            handles: None,
            listeners: Vec::new(),
            retry_listener: None,
            timeout: None,
            active_style,
            style_fallback_used: false,
            generation: 0,
        }));

        if has_token {
            render(&inner);
            spawn_lifecycle(&inner);
        } else {
            inner
                .borrow_mut()
                .state
                .fail(LodestoneError::MissingToken.to_string());
            render(&inner);
        }

        Ok(Self { inner })
    }

    /// Current presentation state of the view.
    pub fn state(&self) -> ViewState {
        self.inner.borrow().state.view_state()
    }

    /// Number of retries performed so far.
    pub fn retry_count(&self) -> u8 {
        self.inner.borrow().state.retry_count()
    }

    /// User-initiated retry. Does nothing unless the view is in error state.
    pub fn retry(&self) {
        retry(&self.inner);
    }
}

impl Drop for MapView {
    fn drop(&mut self) {
        let mut inner = self.inner.borrow_mut();
        inner.generation += 1;
        inner.teardown_map();
        inner.retry_listener = None;
        inner.map_container.remove();
        inner.overlay.remove();
    }
}

fn spawn_lifecycle(inner: &Rc<RefCell<Inner>>) {
    let weak = Rc::downgrade(inner);
    let generation = inner.borrow().generation;
    wasm_bindgen_futures::spawn_local(run_lifecycle(weak, generation));
}

/// Drives one creation attempt: location, then assets, then the map itself.
///
/// Map creation never starts before the location is resolved, successfully
/// or by fallback. The location request is issued at most once per mount, so
/// a retry picks up the previously resolved coordinates.
async fn run_lifecycle(weak: Weak<RefCell<Inner>>, generation: u64) {
    let needs_location = match weak.upgrade() {
        Some(rc) => {
            {
                let inner = rc.borrow();
                if inner.generation != generation {
                    return;
                }
            }
            // A retry without a token re-fails the same way the mount did.
            if !rc.borrow().options.has_access_token() {
                rc.borrow_mut()
                    .state
                    .fail(LodestoneError::MissingToken.to_string());
                render(&rc);
                return;
            }
            !rc.borrow().state.location_requested()
        }
        None => return,
    };

    if needs_location {
        {
            let Some(rc) = weak.upgrade() else {
                return;
            };
            rc.borrow_mut().state.mark_location_requested();
            render(&rc);
        }

        let fix = location::acquire().await;

        let Some(rc) = weak.upgrade() else {
            return;
        };
        {
            let mut inner = rc.borrow_mut();
            if inner.generation != generation {
                return;
            }
            inner
                .state
                .resolve_location(fix.coordinates, fix.error.map(|error| error.to_string()));
        }
        render(&rc);
    }

    // Themed fonts never block map creation.
    wasm_bindgen_futures::spawn_local(loader::load_fonts());

    let sdk_result = loader::ensure_sdk().await;

    let Some(rc) = weak.upgrade() else {
        return;
    };
    if rc.borrow().generation != generation {
        return;
    }

    if let Err(error) = sdk_result {
        rc.borrow_mut().state.fail(error.to_string());
        render(&rc);
        return;
    }

    if let StyleSource::Local(_) = rc.borrow().options.style() {
        wasm_bindgen_futures::spawn_local(loader::load_sprite());
    }

    if let Err(error) = create_map(&rc, generation) {
        log::error!("map creation failed: {error}");
        {
            let mut inner = rc.borrow_mut();
            inner.teardown_map();
            inner.state.fail(error.to_string());
        }
        render(&rc);
    }
}

/// Runs the creation sequence against the SDK.
///
/// Any error escaping a step here is converted into a terminal error state
/// by the caller; no partial handle survives.
fn create_map(rc: &Rc<RefCell<Inner>>, generation: u64) -> Result<(), LodestoneError> {
    let (token, style, center) = {
        let inner = rc.borrow();
        (
            inner.options.access_token.clone(),
            inner.options.style(),
            inner.state.coordinates().unwrap_or(FALLBACK_LOCATION),
        )
    };

    sdk::set_access_token(&token)?;

    let map = {
        let inner = rc.borrow();
        sdk::create_map(&inner.map_container, center, DEFAULT_ZOOM, style.url())?
    };

    {
        let mut inner = rc.borrow_mut();
        inner.active_style = style;
        inner.handles = Some(MapHandles { map, marker: None });
    }

    wire_observers(rc, generation);
    arm_load_timeout(rc, generation)?;
    Ok(())
}

fn wire_observers(rc: &Rc<RefCell<Inner>>, generation: u64) {
    let weak = Rc::downgrade(rc);

    let on_error = Closure::<dyn FnMut(JsValue)>::new({
        let weak = weak.clone();
        move |event: JsValue| handle_sdk_error(&weak, generation, &event)
    });
    let on_style_data = Closure::<dyn FnMut(JsValue)>::new(|_: JsValue| {
        log::debug!("style data event received");
    });
    let on_source_data = Closure::<dyn FnMut(JsValue)>::new(|_: JsValue| {
        log::debug!("source data event received");
    });
    let on_style_load = Closure::<dyn FnMut(JsValue)>::new(|_: JsValue| {
        log::debug!("style finished loading");
    });
    let on_load = Closure::<dyn FnMut(JsValue)>::new({
        let weak = weak.clone();
        move |_: JsValue| handle_load(&weak, generation)
    });

    let mut inner = rc.borrow_mut();
    let Some(handles) = inner.handles.as_ref() else {
        return;
    };
    handles.map.subscribe("error", on_error.as_ref().unchecked_ref());
    handles
        .map
        .subscribe("styledata", on_style_data.as_ref().unchecked_ref());
    handles
        .map
        .subscribe("sourcedata", on_source_data.as_ref().unchecked_ref());
    handles
        .map
        .subscribe("style.load", on_style_load.as_ref().unchecked_ref());
    handles.map.subscribe("load", on_load.as_ref().unchecked_ref());

    inner
        .listeners
        .extend([on_error, on_style_data, on_source_data, on_style_load, on_load]);
}

fn arm_load_timeout(rc: &Rc<RefCell<Inner>>, generation: u64) -> Result<(), LodestoneError> {
    let weak = Rc::downgrade(rc);
    let callback = Closure::<dyn FnMut()>::new(move || handle_load_timeout(&weak, generation));

    let window =
        web_sys::window().ok_or_else(|| LodestoneError::Platform("window".to_string()))?;
    let handle = window.set_timeout_with_callback_and_timeout_and_arguments_0(
        callback.as_ref().unchecked_ref(),
        MAP_LOAD_TIMEOUT_MS,
    )?;

    rc.borrow_mut().timeout = Some(LoadTimeout {
        handle,
        _callback: callback,
    });
    Ok(())
}

fn handle_sdk_error(weak: &Weak<RefCell<Inner>>, generation: u64, event: &JsValue) {
    let Some(rc) = weak.upgrade() else {
        return;
    };

    let message = sdk_error_message(event);
    log::error!("map reported an error: {message}");

    // The SDK may dispatch further events synchronously from `setStyle`, so
    // the call happens with no borrow held.
    let map = {
        let mut inner = rc.borrow_mut();
        if inner.generation != generation {
            return;
        }
        if classify_sdk_error(&message) != SdkErrorCause::Style || inner.style_fallback_used {
            return;
        }
        inner.style_fallback_used = true;
        match inner.handles.as_ref() {
            Some(handles) => handles.map.clone(),
            None => return,
        }
    };

    log::warn!("switching to the default style after a style error");
    let switched = map.set_style(StyleSource::Default.url());

    let mut inner = rc.borrow_mut();
    if inner.generation != generation {
        return;
    }
    match switched {
        Ok(()) => inner.active_style = StyleSource::Default,
        // The map may still partially render with the broken style.
        Err(error) => log::error!("default style fallback failed: {error}"),
    }
}

fn handle_load(weak: &Weak<RefCell<Inner>>, generation: u64) {
    let Some(rc) = weak.upgrade() else {
        return;
    };

    {
        let mut inner = rc.borrow_mut();
        if inner.generation != generation || inner.state.view_state() != ViewState::Loading {
            return;
        }

        // Load completed, the watchdog is no longer needed.
        inner.timeout = None;

        let position = inner.state.coordinates().unwrap_or(FALLBACK_LOCATION);
        let placed = match inner.handles.as_mut() {
            Some(handles) => {
                if let Some(previous) = handles.marker.take() {
                    previous.release();
                }
                place_marker(&handles.map, position).map(|marker| {
                    handles.marker = Some(marker);
                })
            }
            None => return,
        };

        match placed {
            Ok(()) => {
                log::info!("map is ready at {position:?}");
                inner.state.complete();
            }
            Err(error) => {
                log::error!("marker creation failed: {error}");
                inner.teardown_map();
                inner.state.fail(error.to_string());
            }
        }
    }
    render(&rc);
}

fn handle_load_timeout(weak: &Weak<RefCell<Inner>>, generation: u64) {
    let Some(rc) = weak.upgrade() else {
        return;
    };

    let map = {
        let mut inner = rc.borrow_mut();
        if inner.generation != generation || inner.state.view_state() != ViewState::Loading {
            return;
        }
        inner.timeout = None;

        match on_load_timeout(&inner.active_style, inner.style_fallback_used) {
            TimeoutAction::Fail => {
                inner.teardown_map();
                inner.state.fail(LodestoneError::LoadTimeout.to_string());
                drop(inner);
                render(&rc);
                return;
            }
            TimeoutAction::SwitchToDefault => {
                inner.style_fallback_used = true;
                inner.handles.as_ref().map(|handles| handles.map.clone())
            }
        }
    };

    // As in the error handler, `setStyle` runs with no borrow held.
    let switched = match map {
        Some(map) => map.set_style(StyleSource::Default.url()),
        None => Err(LodestoneError::MapCreation("no live map handle".to_string())),
    };

    let mut rearm = false;
    {
        let mut inner = rc.borrow_mut();
        if inner.generation != generation {
            return;
        }
        match switched {
            Ok(()) => {
                log::warn!("map load timed out; retrying with the default style");
                inner.active_style = StyleSource::Default;
                rearm = true;
            }
            Err(error) => {
                log::error!("default style fallback failed: {error}");
                inner.teardown_map();
                inner.state.fail(LodestoneError::LoadTimeout.to_string());
            }
        }
    }

    if rearm {
        if let Err(error) = arm_load_timeout(&rc, generation) {
            let mut inner = rc.borrow_mut();
            inner.teardown_map();
            inner.state.fail(error.to_string());
        }
    }
    render(&rc);
}

/// Builds the marker element and attaches a marker to the map.
///
/// The marker always sits at the resolved device position; the externally
/// selected target coordinates are never consulted here.
fn place_marker(map: &SdkMap, position: Coordinates) -> Result<SdkMarker, LodestoneError> {
    let document = document()?;
    let element = create_div(&document, "lodestone-marker")?;
    let style = element.style();
    style.set_property(
        "background-image",
        &format!("url({STATIC_ASSET_ROOT}{MARKER_ICON})"),
    )?;
    style.set_property("background-size", "contain")?;
    style.set_property("width", &format!("{MARKER_SIZE_PX}px"))?;
    style.set_property("height", &format!("{MARKER_SIZE_PX}px"))?;

    let marker = sdk::create_marker(&element, position)?;
    marker.attach(map);
    Ok(marker)
}

fn retry(rc: &Rc<RefCell<Inner>>) {
    {
        let mut inner = rc.borrow_mut();
        if !inner.state.retry() {
            return;
        }
        log::info!("retrying map creation (attempt {})", inner.state.retry_count());
        inner.generation += 1;
        inner.style_fallback_used = false;
        inner.active_style = inner.options.style();
        inner.teardown_map();
    }
    render(rc);
    spawn_lifecycle(rc);
}

fn render(rc: &Rc<RefCell<Inner>>) {
    if let Err(error) = try_render(rc) {
        log::error!("failed to render view state: {error}");
    }
}

fn try_render(rc: &Rc<RefCell<Inner>>) -> Result<(), LodestoneError> {
    let document = document()?;
    let mut inner = rc.borrow_mut();

    inner.overlay.set_inner_html("");

    match inner.state.view_state() {
        ViewState::Loading => {
            set_visible(&inner.map_container, false)?;
            set_visible(&inner.overlay, true)?;

            let spinner = create_div(&document, "lodestone-spinner")?;
            inner.overlay.append_child(&spinner)?;

            let hint = document.create_element("p")?;
            hint.set_text_content(Some(match inner.state.loading_hint() {
                LoadingHint::AwaitingLocation => "Finding your position…",
                LoadingHint::UsingDefaultLocation => "Using the default location",
            }));
            inner.overlay.append_child(&hint)?;

            if let Some(message) = inner.state.location_error() {
                let note = document.create_element("p")?;
                note.set_class_name("lodestone-note");
                note.set_text_content(Some(message));
                inner.overlay.append_child(&note)?;
            }
        }
        ViewState::Error => {
            set_visible(&inner.map_container, false)?;
            set_visible(&inner.overlay, true)?;

            let panel = create_div(&document, "lodestone-error")?;

            let message = document.create_element("p")?;
            message.set_text_content(Some(
                inner.state.error_message().unwrap_or("something went wrong"),
            ));
            panel.append_child(&message)?;

            if inner.state.retry_count() > 0 {
                let attempts = document.create_element("p")?;
                attempts.set_class_name("lodestone-attempts");
                attempts.set_text_content(Some(&format!(
                    "Attempt {} of {}",
                    inner.state.retry_count().min(RETRY_DISPLAY_CAP),
                    RETRY_DISPLAY_CAP
                )));
                panel.append_child(&attempts)?;
            }

            let button: HtmlElement = document.create_element("button")?.dyn_into()?;
            button.set_text_content(Some("Try again"));
            let weak = Rc::downgrade(rc);
            let listener = Closure::<dyn FnMut()>::new(move || {
                if let Some(rc) = weak.upgrade() {
                    retry(&rc);
                }
            });
            button.set_onclick(Some(listener.as_ref().unchecked_ref()));
            inner.retry_listener = Some(listener);
            panel.append_child(&button)?;

            inner.overlay.append_child(&panel)?;
        }
        ViewState::Ready => {
            set_visible(&inner.overlay, false)?;
            set_visible(&inner.map_container, true)?;
        }
    }

    Ok(())
}

fn sdk_error_message(event: &JsValue) -> String {
    // SDK error events carry an `error` object with a `message` field; fall
    // back to a `message` on the event itself.
    let from_error = Reflect::get(event, &JsValue::from_str("error"))
        .ok()
        .filter(|error| !error.is_undefined())
        .and_then(|error| Reflect::get(&error, &JsValue::from_str("message")).ok())
        .and_then(|message| message.as_string());

    from_error
        .or_else(|| {
            Reflect::get(event, &JsValue::from_str("message"))
                .ok()
                .and_then(|message| message.as_string())
        })
        .unwrap_or_else(|| "unknown map error".to_string())
}

fn set_visible(element: &HtmlElement, visible: bool) -> Result<(), LodestoneError> {
    element
        .style()
        .set_property("display", if visible { "block" } else { "none" })?;
    Ok(())
}

fn create_div(document: &Document, class: &str) -> Result<HtmlElement, LodestoneError> {
    let element: HtmlElement = document.create_element("div")?.dyn_into()?;
    element.set_class_name(class);
    Ok(element)
}

fn document() -> Result<Document, LodestoneError> {
    web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| LodestoneError::Platform("document".to_string()))
}
