//! One-shot loading of the mapping SDK and the themed visual assets.
//!
//! The SDK loader is a memoized asynchronous initializer: the first caller
//! starts the script and stylesheet injection, every caller (including later
//! mounts and retries) awaits the same shared completion signal. There is no
//! DOM probing and no fixed grace delay; a caller either observes the settled
//! result or waits for it. Only success is memoized: after a failed load the
//! next caller replaces the dead script element and injects again, so a user
//! retry can recover from a transient network failure.

use futures::channel::oneshot;

use crate::error::LodestoneError;

#[cfg(target_arch = "wasm32")]
use {
    js_sys::Reflect,
    std::cell::RefCell,
    wasm_bindgen::prelude::*,
    wasm_bindgen::JsCast,
    wasm_bindgen_futures::JsFuture,
    web_sys::{
        Document, HtmlLinkElement, HtmlScriptElement, Request, RequestInit, RequestMode, Response,
    },
};

#[cfg(target_arch = "wasm32")]
use crate::resources::{
    FONT_REGISTRY, SDK_GLOBAL, SDK_SCRIPT_URL, SDK_STYLESHEET_URL, STATIC_ASSET_ROOT,
};

type LoadResult = Result<(), LodestoneError>;

enum SdkLoadState {
    NotStarted,
    Loading(Vec<oneshot::Sender<LoadResult>>),
    Settled(LoadResult),
}

#[cfg(target_arch = "wasm32")]
thread_local! {
    static SDK_STATE: RefCell<SdkLoadState> = const { RefCell::new(SdkLoadState::NotStarted) };
}

#[derive(Debug)]
enum Waiter {
    Done(LoadResult),
    Pending(oneshot::Receiver<LoadResult>),
}

/// Registers one caller with the shared load state.
///
/// Returns the caller's waiter and whether this caller must start (or
/// restart) the injection. A settled failure does not satisfy anyone: the
/// next caller begins a fresh attempt.
fn register(state: &mut SdkLoadState) -> (Waiter, bool) {
    match state {
        SdkLoadState::Settled(Ok(())) => (Waiter::Done(Ok(())), false),
        SdkLoadState::Loading(waiters) => {
            let (tx, rx) = oneshot::channel();
            waiters.push(tx);
            (Waiter::Pending(rx), false)
        }
        SdkLoadState::NotStarted | SdkLoadState::Settled(Err(_)) => {
            let (tx, rx) = oneshot::channel();
            *state = SdkLoadState::Loading(vec![tx]);
            (Waiter::Pending(rx), true)
        }
    }
}

/// Records the attempt's outcome and hands back the waiters to notify.
fn drain(state: &mut SdkLoadState, result: LoadResult) -> Vec<oneshot::Sender<LoadResult>> {
    let waiters = match state {
        SdkLoadState::Loading(waiters) => std::mem::take(waiters),
        _ => Vec::new(),
    };
    *state = SdkLoadState::Settled(result);
    waiters
}

/// Ensures the mapping SDK script and stylesheet are loaded into the page.
///
/// Idempotent on success: the injection happens once per page no matter how
/// many views mount or how often one retries. A failed attempt is reported to
/// everyone waiting on it, and the next call injects again.
#[cfg(target_arch = "wasm32")]
pub async fn ensure_sdk() -> LoadResult {
    let (waiter, start) = SDK_STATE.with(|cell| register(&mut cell.borrow_mut()));

    if start {
        if let Err(error) = begin_sdk_load() {
            settle(Err(error));
        }
    }

    match waiter {
        Waiter::Done(result) => result,
        Waiter::Pending(rx) => rx.await.unwrap_or_else(|_| {
            Err(LodestoneError::AssetLoad(
                "SDK load was abandoned".to_string(),
            ))
        }),
    }
}

#[cfg(target_arch = "wasm32")]
fn settle(result: LoadResult) {
    let waiters = SDK_STATE.with(|cell| drain(&mut cell.borrow_mut(), result.clone()));
    for waiter in waiters {
        let _ = waiter.send(result.clone());
    }
}

#[cfg(target_arch = "wasm32")]
const SDK_SCRIPT_ID: &str = "lodestone-sdk-script";
#[cfg(target_arch = "wasm32")]
const SDK_STYLESHEET_ID: &str = "lodestone-sdk-stylesheet";

#[cfg(target_arch = "wasm32")]
fn begin_sdk_load() -> LoadResult {
    let document = document()?;
    let head = document
        .head()
        .ok_or_else(|| LodestoneError::Platform("document head".to_string()))?;

    // A previous failed attempt leaves its dead script element behind.
    if let Some(stale) = document.get_element_by_id(SDK_SCRIPT_ID) {
        stale.remove();
    }

    if document.get_element_by_id(SDK_STYLESHEET_ID).is_none() {
        let stylesheet: HtmlLinkElement = document.create_element("link")?.dyn_into()?;
        stylesheet.set_id(SDK_STYLESHEET_ID);
        stylesheet.set_rel("stylesheet");
        stylesheet.set_href(SDK_STYLESHEET_URL);
        head.append_child(&stylesheet)?;
    }

    let script: HtmlScriptElement = document.create_element("script")?.dyn_into()?;
    script.set_id(SDK_SCRIPT_ID);
    script.set_src(SDK_SCRIPT_URL);
    script.set_attribute("async", "")?;
    script.set_attribute("defer", "")?;

    let on_load = Closure::<dyn FnMut()>::new(move || {
        settle(check_sdk_global());
    });
    let on_error = Closure::<dyn FnMut()>::new(move || {
        settle(Err(LodestoneError::AssetLoad(format!(
            "failed to fetch {SDK_SCRIPT_URL}"
        ))));
    });
    script.set_onload(Some(on_load.as_ref().unchecked_ref()));
    script.set_onerror(Some(on_error.as_ref().unchecked_ref()));

    // Each attempt settles at most once; the handlers are leaked with it.
    on_load.forget();
    on_error.forget();

    head.append_child(&script)?;
    log::debug!("mapping SDK injection started");
    Ok(())
}

/// Verifies the freshly loaded script actually attached the SDK namespace.
#[cfg(target_arch = "wasm32")]
fn check_sdk_global() -> LoadResult {
    let window =
        web_sys::window().ok_or_else(|| LodestoneError::Platform("window".to_string()))?;
    let global = Reflect::get(&window, &JsValue::from_str(SDK_GLOBAL))?;
    if global.is_undefined() || global.is_null() {
        Err(LodestoneError::AssetLoad(format!(
            "SDK script loaded but did not define `{SDK_GLOBAL}`"
        )))
    } else {
        log::info!("mapping SDK is ready");
        Ok(())
    }
}

/// Registers the themed font faces with the page.
///
/// Each registration is independent: a font that fails to load is logged and
/// skipped, and the map degrades to the browser fallback fonts.
#[cfg(target_arch = "wasm32")]
pub async fn load_fonts() {
    let Ok(document) = document() else {
        return;
    };
    let font_set = document.fonts();

    for (family, file) in FONT_REGISTRY {
        let source = format!("url({STATIC_ASSET_ROOT}{file})");
        let face = match web_sys::FontFace::new_with_str(family, &source) {
            Ok(face) => face,
            Err(error) => {
                log::warn!("failed to define font face {family}: {error:?}");
                continue;
            }
        };

        let loading = match face.load() {
            Ok(promise) => promise,
            Err(error) => {
                log::warn!("failed to start loading font {family}: {error:?}");
                continue;
            }
        };

        match JsFuture::from(loading).await {
            Ok(_) => {
                if let Err(error) = font_set.add(&face) {
                    log::warn!("failed to register font {family}: {error:?}");
                } else {
                    log::debug!("registered font {family}");
                }
            }
            Err(error) => log::warn!("failed to load font {family}: {error:?}"),
        }
    }
}

/// Prefetches the sprite descriptor and image used by a local style.
///
/// Failures are non-fatal: the map renders without custom iconography.
#[cfg(target_arch = "wasm32")]
pub async fn load_sprite() {
    let descriptor_url = format!("{STATIC_ASSET_ROOT}sprite.json");
    let image_url = format!("{STATIC_ASSET_ROOT}sprite.png");

    match fetch_text(&descriptor_url).await {
        Ok(descriptor) => match serde_json::from_str::<serde_json::Value>(&descriptor) {
            Ok(_) => log::debug!("sprite descriptor loaded"),
            Err(error) => {
                log::warn!("sprite descriptor is not valid JSON: {error}");
                return;
            }
        },
        Err(error) => {
            log::warn!("failed to fetch sprite descriptor: {error}");
            return;
        }
    }

    match fetch_bytes(&image_url).await {
        Ok(bytes) => log::debug!("sprite image loaded ({} bytes)", bytes.len()),
        Err(error) => log::warn!("failed to fetch sprite image: {error}"),
    }
}

#[cfg(target_arch = "wasm32")]
async fn fetch_response(url: &str) -> Result<Response, LodestoneError> {
    let window =
        web_sys::window().ok_or_else(|| LodestoneError::Platform("window".to_string()))?;

    let opts = RequestInit::new();
    opts.set_method("GET");
    opts.set_mode(RequestMode::Cors);
    let request = Request::new_with_str_and_init(url, &opts)?;

    let response: Response = JsFuture::from(window.fetch_with_request(&request))
        .await?
        .dyn_into()?;
    if !response.ok() {
        return Err(LodestoneError::AssetLoad(format!(
            "{url} returned status {}",
            response.status()
        )));
    }
    Ok(response)
}

#[cfg(target_arch = "wasm32")]
async fn fetch_text(url: &str) -> Result<String, LodestoneError> {
    let response = fetch_response(url).await?;
    let text = JsFuture::from(response.text()?).await?;
    text.as_string()
        .ok_or_else(|| LodestoneError::AssetLoad(format!("{url} did not return text")))
}

#[cfg(target_arch = "wasm32")]
async fn fetch_bytes(url: &str) -> Result<Vec<u8>, LodestoneError> {
    let response = fetch_response(url).await?;
    let buffer = JsFuture::from(response.array_buffer()?).await?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

#[cfg(target_arch = "wasm32")]
fn document() -> Result<Document, LodestoneError> {
    web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| LodestoneError::Platform("document".to_string()))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn receive(waiter: Waiter) -> Option<LoadResult> {
        match waiter {
            Waiter::Done(result) => Some(result),
            Waiter::Pending(mut rx) => rx.try_recv().ok().flatten(),
        }
    }

    #[test]
    fn first_caller_starts_the_load() {
        let mut state = SdkLoadState::NotStarted;
        let (waiter, start) = register(&mut state);
        assert!(start);
        assert_matches!(waiter, Waiter::Pending(_));
    }

    #[test]
    fn concurrent_callers_share_one_attempt() {
        let mut state = SdkLoadState::NotStarted;
        let (first, _) = register(&mut state);
        let (second, start) = register(&mut state);
        assert!(!start);

        let waiters = drain(&mut state, Ok(()));
        assert_eq!(waiters.len(), 2);
        for tx in waiters {
            let _ = tx.send(Ok(()));
        }
        assert_matches!(receive(first), Some(Ok(())));
        assert_matches!(receive(second), Some(Ok(())));
    }

    #[test]
    fn success_is_memoized() {
        let mut state = SdkLoadState::NotStarted;
        let (_, _) = register(&mut state);
        drain(&mut state, Ok(()));

        let (waiter, start) = register(&mut state);
        assert!(!start);
        assert_matches!(receive(waiter), Some(Ok(())));
    }

    #[test]
    fn failed_load_is_reported_then_retried() {
        let mut state = SdkLoadState::NotStarted;
        let (waiter, _) = register(&mut state);
        for tx in drain(
            &mut state,
            Err(LodestoneError::AssetLoad("offline".to_string())),
        ) {
            let _ = tx.send(Err(LodestoneError::AssetLoad("offline".to_string())));
        }
        assert_matches!(receive(waiter), Some(Err(LodestoneError::AssetLoad(_))));

        // The failure is not memoized: the next caller injects again.
        let (waiter, start) = register(&mut state);
        assert!(start);
        assert_matches!(waiter, Waiter::Pending(_));
    }
}
