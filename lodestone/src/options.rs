//! Per-mount configuration of the map view.

use serde::Deserialize;

use crate::style::{resolve_style, StyleSource};
use crate::Coordinates;

/// Immutable configuration of one mounted map view.
///
/// Built once with the `with_*` methods and handed to the view's `mount`
/// function; nothing here changes for the lifetime of the mount.
///
/// ```no_run
/// use lodestone::MapOptions;
///
/// let options = MapOptions::new("pk.my-access-token")
///     .with_style_id("mapbox://styles/acme/parchment");
/// ```
///
/// The struct also derives `Deserialize` so a host page can pass the options
/// as a plain JS object through [`MapOptions::from_js`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MapOptions {
    /// Access token set process-wide on the SDK before map creation.
    pub access_token: String,
    /// Identifier of a style hosted by the mapping service.
    #[serde(default)]
    pub style_id: Option<String>,
    /// Path to a style document served from the application's static assets.
    ///
    /// Only consulted when [`MapOptions::style_id`] is not set.
    #[serde(default)]
    pub local_style_path: Option<String>,
    /// Externally selected coordinates, e.g. a search result.
    ///
    /// Stored but deliberately inert: the map centers on the device position
    /// and the marker always tracks it, never this value.
    #[serde(default)]
    pub target: Option<Coordinates>,
}

impl MapOptions {
    /// Creates options with the given access token and no custom style.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            style_id: None,
            local_style_path: None,
            target: None,
        }
    }

    /// Sets the remote style identifier.
    ///
    /// Takes precedence over [`MapOptions::with_local_style_path`].
    pub fn with_style_id(mut self, style_id: impl Into<String>) -> Self {
        self.style_id = Some(style_id.into());
        self
    }

    /// Sets the local style document path.
    pub fn with_local_style_path(mut self, path: impl Into<String>) -> Self {
        self.local_style_path = Some(path.into());
        self
    }

    /// Stores externally selected coordinates.
    pub fn with_target(mut self, target: Coordinates) -> Self {
        self.target = Some(target);
        self
    }

    /// Builds options from a plain JS object.
    ///
    /// Expects the field names of this struct as keys; everything but
    /// `access_token` is optional. An object that does not fit reports the
    /// shape error instead of silently mounting a misconfigured view.
    #[cfg(target_arch = "wasm32")]
    pub fn from_js(value: &wasm_bindgen::JsValue) -> Result<Self, crate::LodestoneError> {
        serde_wasm_bindgen::from_value(value.clone())
            .map_err(|error| wasm_bindgen::JsValue::from(error).into())
    }

    /// Whether a non-empty access token is configured.
    pub fn has_access_token(&self) -> bool {
        !self.access_token.trim().is_empty()
    }

    /// Resolves the style this mount will use.
    pub fn style(&self) -> StyleSource {
        resolve_style(self.style_id.as_deref(), self.local_style_path.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sets_token_only() {
        let options = MapOptions::new("pk.token");
        assert!(options.has_access_token());
        assert_eq!(options.style(), StyleSource::Default);
        assert!(options.target.is_none());
    }

    #[test]
    fn blank_token_is_rejected() {
        assert!(!MapOptions::new("").has_access_token());
        assert!(!MapOptions::new("   ").has_access_token());
    }

    #[test]
    fn style_id_wins_over_local_path() {
        let options = MapOptions::new("pk.token")
            .with_local_style_path("/style.json")
            .with_style_id("mapbox://styles/acme/parchment");
        assert_eq!(
            options.style(),
            StyleSource::Remote("mapbox://styles/acme/parchment".into())
        );
    }

    #[test]
    fn local_path_used_without_style_id() {
        let options = MapOptions::new("pk.token").with_local_style_path("/style.json");
        assert_eq!(options.style(), StyleSource::Local("/style.json".into()));
    }

    #[test]
    fn deserializes_from_host_object() {
        let options: MapOptions = serde_json::from_str(
            r#"{
                "access_token": "pk.token",
                "style_id": "mapbox://styles/acme/parchment",
                "target": { "lon": 2.35, "lat": 48.86 }
            }"#,
        )
        .unwrap();
        assert!(options.has_access_token());
        assert_eq!(
            options.style(),
            StyleSource::Remote("mapbox://styles/acme/parchment".into())
        );
        assert_eq!(options.target, Some(Coordinates::new(2.35, 48.86)));

        // Only the token is required.
        let minimal: MapOptions = serde_json::from_str(r#"{ "access_token": "pk.token" }"#)
            .unwrap();
        assert_eq!(minimal.style(), StyleSource::Default);
        assert!(minimal.local_style_path.is_none());
    }

    #[test]
    fn target_is_stored() {
        let target = Coordinates::new(2.35, 48.86);
        let options = MapOptions::new("pk.token").with_target(target);
        assert_eq!(options.target, Some(target));
    }
}
