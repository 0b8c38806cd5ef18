//! Presentation state machine for the map view.
//!
//! [`ControllerState`] is a plain value type holding everything the view
//! needs to decide what to render. The DOM layer observes it; the lifecycle
//! code drives it. Keeping it free of any platform types lets the whole
//! transition table be tested on native targets.

use crate::Coordinates;

/// Number of retry attempts shown to the user. The counter itself keeps
/// counting past this value; the cap is informational only.
pub const RETRY_DISPLAY_CAP: u8 = 3;

/// What the view should currently render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    /// Waiting for location, assets or the map `load` event.
    Loading,
    /// The map is live and the user marker is placed.
    Ready,
    /// A terminal failure; a retry control is offered.
    Error,
}

/// Sub-text displayed under the loading spinner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingHint {
    /// The device position has not been resolved yet.
    AwaitingLocation,
    /// Location acquisition failed and the fixed default location is used.
    UsingDefaultLocation,
}

/// Full presentation state of one mounted map view.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerState {
    view_state: ViewState,
    coordinates: Option<Coordinates>,
    location_error: Option<String>,
    location_requested: bool,
    retry_count: u8,
    error_message: Option<String>,
}

impl Default for ControllerState {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerState {
    /// Creates the state a freshly mounted view starts in.
    pub fn new() -> Self {
        Self {
            view_state: ViewState::Loading,
            coordinates: None,
            location_error: None,
            location_requested: false,
            retry_count: 0,
            error_message: None,
        }
    }

    /// Current state of the view.
    pub fn view_state(&self) -> ViewState {
        self.view_state
    }

    /// The most recently resolved device coordinates, if any.
    pub fn coordinates(&self) -> Option<Coordinates> {
        self.coordinates
    }

    /// Message describing why location acquisition failed, if it did.
    pub fn location_error(&self) -> Option<&str> {
        self.location_error.as_deref()
    }

    /// Whether a geolocation request has been issued for this mount.
    pub fn location_requested(&self) -> bool {
        self.location_requested
    }

    /// Number of retries performed so far.
    pub fn retry_count(&self) -> u8 {
        self.retry_count
    }

    /// Message of the current terminal error, if the view is in error state.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// What the loading spinner should say.
    pub fn loading_hint(&self) -> LoadingHint {
        if self.location_error.is_some() {
            LoadingHint::UsingDefaultLocation
        } else {
            LoadingHint::AwaitingLocation
        }
    }

    /// Records that the single per-mount geolocation request was issued.
    pub fn mark_location_requested(&mut self) {
        self.location_requested = true;
    }

    /// Stores the outcome of location acquisition.
    ///
    /// Acquisition always produces coordinates: either the device position or
    /// the fixed fallback. A successful reading clears any previous location
    /// error; a fallback records the reason.
    pub fn resolve_location(&mut self, coordinates: Coordinates, error: Option<String>) {
        self.coordinates = Some(coordinates);
        self.location_error = error;
    }

    /// Transitions to `Ready` after the map reported load completion.
    ///
    /// Ignored unless the view is loading: a late `load` event must not
    /// resurrect a view that has already failed.
    pub fn complete(&mut self) {
        if self.view_state == ViewState::Loading {
            self.view_state = ViewState::Ready;
        }
    }

    /// Transitions to `Error` with the given message.
    ///
    /// Ignored once the view is ready; a ready view only resets by a full
    /// unmount and remount.
    pub fn fail(&mut self, message: impl Into<String>) {
        if self.view_state == ViewState::Ready {
            return;
        }
        self.view_state = ViewState::Error;
        self.error_message = Some(message.into());
    }

    /// User-initiated retry: clears the error and re-enters `Loading`.
    ///
    /// Returns false (and does nothing) unless the view is in error state.
    pub fn retry(&mut self) -> bool {
        if self.view_state != ViewState::Error {
            return false;
        }
        self.view_state = ViewState::Loading;
        self.error_message = None;
        self.retry_count = self.retry_count.saturating_add(1);
        true
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn starts_loading() {
        let state = ControllerState::new();
        assert_eq!(state.view_state(), ViewState::Loading);
        assert!(state.coordinates().is_none());
        assert!(state.error_message().is_none());
        assert_eq!(state.retry_count(), 0);
    }

    #[test]
    fn denied_location_still_reaches_ready() {
        // Scenario A: geolocation denied, fallback location used.
        let mut state = ControllerState::new();
        state.mark_location_requested();
        state.resolve_location(
            Coordinates::new(-0.09, 51.505),
            Some("location access was denied".into()),
        );

        assert_eq!(state.loading_hint(), LoadingHint::UsingDefaultLocation);
        assert_matches!(state.location_error(), Some(_));

        state.complete();
        assert_eq!(state.view_state(), ViewState::Ready);
        assert_eq!(state.coordinates(), Some(Coordinates::new(-0.09, 51.505)));
    }

    #[test]
    fn successful_location_clears_previous_error() {
        // Scenario B: geolocation succeeds.
        let mut state = ControllerState::new();
        state.mark_location_requested();
        state.resolve_location(Coordinates::new(0.0, 0.0), Some("timed out".into()));
        state.resolve_location(Coordinates::new(12.34, 56.78), None);

        assert!(state.location_error().is_none());
        assert_eq!(state.loading_hint(), LoadingHint::AwaitingLocation);
        assert_eq!(state.coordinates(), Some(Coordinates::new(12.34, 56.78)));
    }

    #[test]
    fn missing_token_fails_and_retry_is_available() {
        // Scenario D: no credential.
        let mut state = ControllerState::new();
        state.fail("map access token is not configured");
        assert_eq!(state.view_state(), ViewState::Error);
        assert_matches!(state.error_message(), Some(_));

        assert!(state.retry());
        assert_eq!(state.view_state(), ViewState::Loading);
        assert!(state.error_message().is_none());
        assert_eq!(state.retry_count(), 1);

        state.fail("map access token is not configured");
        assert_eq!(state.view_state(), ViewState::Error);
    }

    #[test]
    fn timeout_failure_retries_with_counter() {
        // Scenario E: terminal load timeout, then a retry.
        let mut state = ControllerState::new();
        state.resolve_location(Coordinates::new(-0.09, 51.505), None);
        state.fail("the map did not finish loading in time");

        assert!(state.retry());
        assert_eq!(state.retry_count(), 1);
        assert_eq!(state.view_state(), ViewState::Loading);
        // The previously resolved coordinates survive the retry.
        assert!(state.coordinates().is_some());
    }

    #[test]
    fn retry_only_works_from_error() {
        let mut state = ControllerState::new();
        assert!(!state.retry());
        state.complete();
        assert!(!state.retry());
        assert_eq!(state.retry_count(), 0);
    }

    #[test]
    fn ready_is_terminal() {
        let mut state = ControllerState::new();
        state.complete();
        state.fail("late failure");
        assert_eq!(state.view_state(), ViewState::Ready);
        assert!(state.error_message().is_none());
    }

    #[test]
    fn late_load_does_not_resurrect_failed_view() {
        let mut state = ControllerState::new();
        state.fail("failed to load the mapping SDK: network error");
        state.complete();
        assert_eq!(state.view_state(), ViewState::Error);
    }

    #[test]
    fn retry_counter_keeps_counting_past_display_cap() {
        let mut state = ControllerState::new();
        for _ in 0..5 {
            state.fail("boom");
            assert!(state.retry());
        }
        assert_eq!(state.retry_count(), 5);
        assert!(state.retry_count() > RETRY_DISPLAY_CAP);
    }
}
