//! Device location acquisition through the browser geolocation API.

use std::cell::RefCell;
use std::rc::Rc;

use futures::channel::oneshot;
use thiserror::Error;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::resources::{FALLBACK_LOCATION, LOCATION_MAX_AGE_MS, LOCATION_TIMEOUT_MS};
use crate::Coordinates;

/// Why the device position could not be acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LocationError {
    /// The browser does not expose the geolocation capability.
    #[error("geolocation is not supported by this browser")]
    Unsupported,
    /// The user denied the location permission prompt.
    #[error("location access was denied")]
    PermissionDenied,
    /// The platform could not determine a position.
    #[error("device position is unavailable")]
    Unavailable,
    /// No position was produced within the allowed time.
    #[error("location request timed out")]
    Timeout,
}

/// Outcome of one acquisition attempt.
///
/// Acquisition never blocks the rest of the lifecycle: when the device
/// position cannot be obtained the fix carries the fixed fallback location
/// together with the reason.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    /// The resolved position, possibly the fallback.
    pub coordinates: Coordinates,
    /// Why the fallback is used, if it is.
    pub error: Option<LocationError>,
}

/// Requests the device position once.
///
/// High-accuracy mode, a bounded timeout and a cached-position tolerance are
/// requested from the platform; see the constants in
/// [`resources`](crate::resources).
pub async fn acquire() -> LocationFix {
    match request_position().await {
        Ok(coordinates) => LocationFix {
            coordinates,
            error: None,
        },
        Err(error) => {
            log::warn!("falling back to the default location: {error}");
            LocationFix {
                coordinates: FALLBACK_LOCATION,
                error: Some(error),
            }
        }
    }
}

async fn request_position() -> Result<Coordinates, LocationError> {
    let window = web_sys::window().ok_or(LocationError::Unsupported)?;
    let geolocation = window
        .navigator()
        .geolocation()
        .map_err(|_| LocationError::Unsupported)?;

    let options = web_sys::PositionOptions::new();
    options.set_enable_high_accuracy(true);
    options.set_timeout(LOCATION_TIMEOUT_MS);
    options.set_maximum_age(LOCATION_MAX_AGE_MS);

    // The two platform callbacks race for the same oneshot sender; whichever
    // fires first settles the request.
    let (tx, rx) = oneshot::channel();
    let tx = Rc::new(RefCell::new(Some(tx)));

    let on_success = {
        let tx = tx.clone();
        Closure::<dyn FnMut(web_sys::Position)>::new(move |position: web_sys::Position| {
            let coords = position.coords();
            let reading = Coordinates::from_lat_lon(coords.latitude(), coords.longitude());
            if let Some(tx) = tx.borrow_mut().take() {
                let _ = tx.send(Ok(reading));
            }
        })
    };

    let on_failure = {
        let tx = tx.clone();
        Closure::<dyn FnMut(web_sys::PositionError)>::new(move |error: web_sys::PositionError| {
            if let Some(tx) = tx.borrow_mut().take() {
                let _ = tx.send(Err(classify_position_error(error.code())));
            }
        })
    };

    geolocation
        .get_current_position_with_error_callback_and_options(
            on_success.as_ref().unchecked_ref(),
            Some(on_failure.as_ref().unchecked_ref()),
            &options,
        )
        .map_err(|_| LocationError::Unsupported)?;

    on_success.forget();
    on_failure.forget();

    let reading = rx
        .await
        .unwrap_or(Err(LocationError::Unavailable))?;

    if reading.is_valid() {
        Ok(reading)
    } else {
        log::warn!("geolocation reported an out-of-range position: {reading:?}");
        Err(LocationError::Unavailable)
    }
}

fn classify_position_error(code: u16) -> LocationError {
    match code {
        web_sys::PositionError::PERMISSION_DENIED => LocationError::PermissionDenied,
        web_sys::PositionError::TIMEOUT => LocationError::Timeout,
        _ => LocationError::Unavailable,
    }
}
