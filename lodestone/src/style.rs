//! Style selection and SDK error classification.
//!
//! Both of these are decision points the map lifecycle depends on, so they
//! are kept as plain functions over plain types and tested without the SDK.

use crate::resources::DEFAULT_STYLE_ID;

/// Where the active map style comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleSource {
    /// A style identifier hosted by the mapping service.
    Remote(String),
    /// A style document served from the application's own static assets.
    Local(String),
    /// The built-in default style.
    Default,
}

impl StyleSource {
    /// The value handed to the SDK as the `style` option.
    pub fn url(&self) -> &str {
        match self {
            StyleSource::Remote(id) => id,
            StyleSource::Local(path) => path,
            StyleSource::Default => DEFAULT_STYLE_ID,
        }
    }

    /// Returns true for the built-in default style.
    pub fn is_default(&self) -> bool {
        matches!(self, StyleSource::Default)
    }
}

/// Resolves the style to use for a mount.
///
/// The precedence is fixed: an explicit remote identifier wins over a local
/// style path, and the built-in default is used when neither is given.
pub fn resolve_style(remote: Option<&str>, local: Option<&str>) -> StyleSource {
    if let Some(id) = remote.filter(|id| !id.is_empty()) {
        StyleSource::Remote(id.to_string())
    } else if let Some(path) = local.filter(|path| !path.is_empty()) {
        StyleSource::Local(path.to_string())
    } else {
        StyleSource::Default
    }
}

/// Cause of an `error` event reported by the SDK, as far as it can be
/// determined from the event message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdkErrorCause {
    /// The active style failed to load or parse.
    Style,
    /// The access token was rejected.
    Credential,
    /// Anything else; logged and otherwise ignored.
    Unknown,
}

/// Classifies an SDK `error` event message.
pub fn classify_sdk_error(message: &str) -> SdkErrorCause {
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("style") {
        SdkErrorCause::Style
    } else if lowered.contains("token") || lowered.contains("unauthorized") {
        SdkErrorCause::Credential
    } else {
        SdkErrorCause::Unknown
    }
}

/// What to do when the map load timeout fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutAction {
    /// Switch to the default style once and keep waiting.
    SwitchToDefault,
    /// Give up and surface a terminal timeout error.
    Fail,
}

/// Decides the reaction to the load timeout firing.
///
/// A non-default style gets one chance to be replaced with the default; once
/// the default style is active (or the one fallback was already spent) the
/// timeout is terminal.
pub fn on_load_timeout(active: &StyleSource, fallback_used: bool) -> TimeoutAction {
    if active.is_default() || fallback_used {
        TimeoutAction::Fail
    } else {
        TimeoutAction::SwitchToDefault
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn remote_style_wins_over_local() {
        let style = resolve_style(Some("mapbox://styles/acme/parchment"), Some("/style.json"));
        assert_eq!(
            style,
            StyleSource::Remote("mapbox://styles/acme/parchment".into())
        );
    }

    #[test]
    fn local_style_used_without_remote() {
        let style = resolve_style(None, Some("/style.json"));
        assert_eq!(style, StyleSource::Local("/style.json".into()));
        assert_eq!(style.url(), "/style.json");
    }

    #[test]
    fn default_style_used_when_nothing_configured() {
        assert_eq!(resolve_style(None, None), StyleSource::Default);
        assert_eq!(resolve_style(None, None).url(), DEFAULT_STYLE_ID);
    }

    #[test]
    fn empty_identifiers_are_ignored() {
        assert_eq!(resolve_style(Some(""), Some("")), StyleSource::Default);
        assert_eq!(
            resolve_style(Some(""), Some("/style.json")),
            StyleSource::Local("/style.json".into())
        );
    }

    #[test]
    fn style_errors_are_classified() {
        assert_matches!(
            classify_sdk_error("Failed to fetch the map Style"),
            SdkErrorCause::Style
        );
        assert_matches!(
            classify_sdk_error("error loading style sources"),
            SdkErrorCause::Style
        );
    }

    #[test]
    fn credential_errors_are_classified() {
        assert_matches!(
            classify_sdk_error("Unauthorized: check your credentials"),
            SdkErrorCause::Credential
        );
        assert_matches!(
            classify_sdk_error("invalid access token"),
            SdkErrorCause::Credential
        );
    }

    #[test]
    fn other_errors_are_unknown() {
        assert_matches!(classify_sdk_error("tile fetch aborted"), SdkErrorCause::Unknown);
    }

    #[test]
    fn timeout_on_custom_style_switches_to_default() {
        let active = StyleSource::Remote("mapbox://styles/acme/parchment".into());
        assert_eq!(on_load_timeout(&active, false), TimeoutAction::SwitchToDefault);
    }

    #[test]
    fn timeout_on_default_style_is_terminal() {
        assert_eq!(on_load_timeout(&StyleSource::Default, false), TimeoutAction::Fail);
    }

    #[test]
    fn fallback_is_attempted_only_once() {
        let active = StyleSource::Local("/style.json".into());
        assert_eq!(on_load_timeout(&active, true), TimeoutAction::Fail);
    }
}
