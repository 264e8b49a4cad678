// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Geographic value types: coordinates, distances, and unit conversion.
//!
//! Distances are carried in meters internally. Backends convert at
//! compile time: Solr wants kilometers, Sphinx wants meters and radian
//! coordinates.
//!
//! # Example
//!
//! ```
//! use search_criteria::geo::{Coordinates, DistanceUnit};
//!
//! let center = Coordinates::new(53.5748, 10.0347);
//! assert!((center.lat_radians() - 0.935056656097458).abs() < 1e-12);
//!
//! let d = 7.0.km();
//! assert_eq!(d.meters(), 7_000.0);
//! assert_eq!(d.kilometers(), 7.0);
//! ```

pub const KM_TO_METER: f64 = 1000.0;
pub const MILE_TO_METER: f64 = 1609.3472;
pub const DEG_TO_RADIAN: f64 = std::f64::consts::PI / 180.0;

/// A geographic center in floating degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn lat_radians(&self) -> f64 {
        self.lat * DEG_TO_RADIAN
    }

    pub fn lng_radians(&self) -> f64 {
        self.lng * DEG_TO_RADIAN
    }
}

/// Anything a geo center can be read from.
///
/// Implemented for coordinate pairs and arrays out of the box; implement
/// it for your own location-bearing types to pass them to
/// [`Criteria::near`](crate::Criteria::near) directly. Returning `None`
/// from either accessor makes `near` a silent no-op, mirroring inputs
/// that cannot be normalized.
pub trait CoordinateSource {
    fn latitude(&self) -> Option<f64>;
    fn longitude(&self) -> Option<f64>;

    /// Resolve both coordinates, or nothing.
    fn to_coordinates(&self) -> Option<Coordinates> {
        match (self.latitude(), self.longitude()) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
            _ => None,
        }
    }
}

impl CoordinateSource for Coordinates {
    fn latitude(&self) -> Option<f64> {
        Some(self.lat)
    }
    fn longitude(&self) -> Option<f64> {
        Some(self.lng)
    }
}

impl CoordinateSource for (f64, f64) {
    fn latitude(&self) -> Option<f64> {
        Some(self.0)
    }
    fn longitude(&self) -> Option<f64> {
        Some(self.1)
    }
}

impl CoordinateSource for [f64; 2] {
    fn latitude(&self) -> Option<f64> {
        Some(self[0])
    }
    fn longitude(&self) -> Option<f64> {
        Some(self[1])
    }
}

impl CoordinateSource for &[f64] {
    fn latitude(&self) -> Option<f64> {
        self.first().copied()
    }
    fn longitude(&self) -> Option<f64> {
        self.get(1).copied()
    }
}

impl CoordinateSource for (Option<f64>, Option<f64>) {
    fn latitude(&self) -> Option<f64> {
        self.0
    }
    fn longitude(&self) -> Option<f64> {
        self.1
    }
}

/// A scalar distance, stored in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Distance(f64);

impl Distance {
    pub fn meters(self) -> f64 {
        self.0
    }

    pub fn kilometers(self) -> f64 {
        self.0 / KM_TO_METER
    }

    pub fn from_meters(meters: f64) -> Self {
        Self(meters)
    }

    pub fn from_kilometers(km: f64) -> Self {
        Self(km * KM_TO_METER)
    }

    pub fn from_miles(miles: f64) -> Self {
        Self(miles * MILE_TO_METER)
    }
}

/// A meter range, e.g. "between 7 and 10 km away".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceRange {
    pub from: Distance,
    pub to: Distance,
}

/// A scalar upper bound or an explicit range, as stored on the criteria.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeoDistance {
    Within(Distance),
    Between(DistanceRange),
}

impl From<Distance> for GeoDistance {
    fn from(d: Distance) -> Self {
        GeoDistance::Within(d)
    }
}

impl From<DistanceRange> for GeoDistance {
    fn from(r: DistanceRange) -> Self {
        GeoDistance::Between(r)
    }
}

impl From<std::ops::Range<Distance>> for GeoDistance {
    fn from(r: std::ops::Range<Distance>) -> Self {
        GeoDistance::Between(DistanceRange {
            from: r.start,
            to: r.end,
        })
    }
}

impl GeoDistance {
    /// The meter bounds as `(from, to)`. Scalar distances start at zero.
    pub fn meter_bounds(&self) -> (f64, f64) {
        match self {
            GeoDistance::Within(d) => (0.0, d.meters()),
            GeoDistance::Between(r) => (r.from.meters(), r.to.meters()),
        }
    }

    /// The outer bound in meters.
    pub fn outer_meters(&self) -> f64 {
        self.meter_bounds().1
    }
}

/// Unit-conversion helpers on plain numbers.
///
/// ```
/// use search_criteria::geo::DistanceUnit;
/// assert_eq!(49.0.km().meters(), 49_000.0);
/// assert_eq!(1.0.miles().meters(), 1609.3472);
/// ```
pub trait DistanceUnit {
    fn km(self) -> Distance;
    fn miles(self) -> Distance;
    fn meters(self) -> Distance;
}

impl DistanceUnit for f64 {
    fn km(self) -> Distance {
        Distance::from_kilometers(self)
    }

    fn miles(self) -> Distance {
        Distance::from_miles(self)
    }

    fn meters(self) -> Distance {
        Distance::from_meters(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_conversion() {
        assert_eq!(5.0.km().meters(), 5_000.0);
        assert_eq!(2.0.miles().meters(), 3218.6944);
        assert_eq!(DistanceUnit::meters(100.0).meters(), 100.0);
    }

    #[test]
    fn test_radians() {
        let c = Coordinates::new(53.5748, 10.0347);
        assert!((c.lat_radians() - 0.935056656097458).abs() < 1e-12);
        assert!((c.lng_radians() - 0.175138554449875).abs() < 1e-12);
    }

    #[test]
    fn test_coordinate_source_pair() {
        let c = (47.0, 11.0).to_coordinates().unwrap();
        assert_eq!(c, Coordinates::new(47.0, 11.0));
    }

    #[test]
    fn test_coordinate_source_slice_too_short() {
        let v: Vec<f64> = vec![47.0];
        assert!(v.as_slice().to_coordinates().is_none());
    }

    #[test]
    fn test_coordinate_source_partial_accessor() {
        // One missing coordinate resolves to no center at all
        assert!((Some(47.0), None).to_coordinates().is_none());
    }

    #[test]
    fn test_geo_distance_bounds() {
        assert_eq!(GeoDistance::from(49.0.km()).meter_bounds(), (0.0, 49_000.0));
        let range = GeoDistance::from(7.0.km()..10.0.km());
        assert_eq!(range.meter_bounds(), (7_000.0, 10_000.0));
    }
}
