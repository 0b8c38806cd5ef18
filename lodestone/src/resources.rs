//! Fixed resource locations and tuning constants for the map view.

use crate::Coordinates;

/// Root path all static visual assets are resolved against.
pub const STATIC_ASSET_ROOT: &str = "/assets/";

/// Icon shown as the user position marker, relative to [`STATIC_ASSET_ROOT`].
pub const MARKER_ICON: &str = "compass-rose.png";

/// Rendered size of the user marker element, in CSS pixels.
pub const MARKER_SIZE_PX: u32 = 48;

/// Themed fonts registered with the page before the map is created.
///
/// Each entry is a (family name, file name) pair resolved against
/// [`STATIC_ASSET_ROOT`]. Registrations are independent of each other, and a
/// failed font only degrades labels to the browser fallback fonts.
pub const FONT_REGISTRY: &[(&str, &str)] = &[
    ("MedievalSharp", "MedievalSharp-Regular.ttf"),
    ("IM Fell English", "IMFellEnglish-Regular.ttf"),
    ("IM Fell English SC", "IMFellEnglishSC-Regular.ttf"),
];

/// URL of the mapping SDK script.
pub const SDK_SCRIPT_URL: &str = "https://api.mapbox.com/mapbox-gl-js/v2.15.0/mapbox-gl.js";

/// URL of the mapping SDK stylesheet.
pub const SDK_STYLESHEET_URL: &str = "https://api.mapbox.com/mapbox-gl-js/v2.15.0/mapbox-gl.css";

/// Name of the global object the SDK script attaches itself to.
pub const SDK_GLOBAL: &str = "mapboxgl";

/// Style used when no style is configured, and as the fallback target when a
/// configured style fails to load.
pub const DEFAULT_STYLE_ID: &str = "mapbox://styles/mapbox/dark-v11";

/// Zoom level the map opens at.
pub const DEFAULT_ZOOM: f64 = 15.0;

/// Center used when the device position cannot be acquired.
pub const FALLBACK_LOCATION: Coordinates = Coordinates {
    lon: -0.09,
    lat: 51.505,
};

/// How long a geolocation request may take before the platform reports a
/// timeout, in milliseconds.
pub const LOCATION_TIMEOUT_MS: u32 = 8_000;

/// Maximum age of a cached position the geolocation request will accept, in
/// milliseconds.
pub const LOCATION_MAX_AGE_MS: u32 = 60_000;

/// How long the controller waits for the map `load` event before assuming the
/// style will never finish loading, in milliseconds.
pub const MAP_LOAD_TIMEOUT_MS: i32 = 8_000;
