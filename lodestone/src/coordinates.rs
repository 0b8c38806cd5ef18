//! Geographical coordinates as used by the map view.

use serde::{Deserialize, Serialize};

/// A geographical position in longitude-first ordering.
///
/// The browser geolocation API reports positions latitude-first, while the
/// mapping SDK expects longitude-first pairs. Everything inside this crate
/// uses this type, and the conversion happens once, at the point where a
/// position is received from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Longitude in degrees, in the range `[-180, 180]`.
    pub lon: f64,
    /// Latitude in degrees, in the range `[-90, 90]`.
    pub lat: f64,
}

impl Coordinates {
    /// Creates a new coordinate pair. The values are not checked, use
    /// [`Coordinates::is_valid`] before handing the pair to the SDK.
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Creates a coordinate pair from a latitude-first reading, as reported
    /// by the geolocation API.
    pub fn from_lat_lon(lat: f64, lon: f64) -> Self {
        Self { lon, lat }
    }

    /// Returns true if both components are finite and within the valid
    /// geographical ranges.
    pub fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn from_lat_lon_swaps_ordering() {
        let position = Coordinates::from_lat_lon(56.78, 12.34);
        assert_relative_eq!(position.lon, 12.34);
        assert_relative_eq!(position.lat, 56.78);
    }

    #[test]
    fn valid_ranges_are_accepted() {
        assert!(Coordinates::new(0.0, 0.0).is_valid());
        assert!(Coordinates::new(-180.0, -90.0).is_valid());
        assert!(Coordinates::new(180.0, 90.0).is_valid());
        assert!(Coordinates::new(-0.09, 51.505).is_valid());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(!Coordinates::new(180.1, 0.0).is_valid());
        assert!(!Coordinates::new(0.0, -90.1).is_valid());
        assert!(!Coordinates::new(f64::NAN, 0.0).is_valid());
        assert!(!Coordinates::new(0.0, f64::INFINITY).is_valid());
    }
}
