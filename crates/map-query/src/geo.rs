//! Geographic primitives and the spherical-earth bounding-box deriver.

use serde::{Deserialize, Serialize};

/// Mean earth radius used by the spherical approximation, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Lower bound applied to `cos(lat)` so the longitude offset stays finite at the poles.
const MIN_COS_LAT: f64 = 1e-9;

/// Half-width cap for the longitude span; anything wider already covers every meridian.
const MAX_LNG_OFFSET_DEG: f64 = 180.0;

/// A latitude/longitude pair in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether the point lies within `[-90, 90] x [-180, 180]`.
    pub fn is_in_range(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }

    /// The `[lat, lng]` pair layout used by the intersection endpoint.
    pub fn to_pair(self) -> [f64; 2] {
        [self.lat, self.lng]
    }
}

/// Axis-aligned lat/lng rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Derive a box that conservatively covers the circle of `radius_km`
    /// around `center`.
    ///
    /// Uses the spherical approximation with [`EARTH_RADIUS_KM`]. Near the
    /// poles `cos(lat)` is clamped and the longitude half-width is capped at
    /// 180 degrees, so the result is always finite: a polar box spans the
    /// whole longitude range. Latitude offsets are not clamped.
    pub fn around(center: GeoPoint, radius_km: f64) -> Self {
        let angular_deg = (radius_km / EARTH_RADIUS_KM).to_degrees();
        let lat_offset = angular_deg;
        let cos_lat = center.lat.to_radians().cos().abs().max(MIN_COS_LAT);
        let lng_offset = (angular_deg / cos_lat).min(MAX_LNG_OFFSET_DEG);

        Self {
            min_lat: center.lat - lat_offset,
            max_lat: center.lat + lat_offset,
            min_lng: center.lng - lng_offset,
            max_lng: center.lng + lng_offset,
        }
    }

    /// Smallest box enclosing every point, or `None` for an empty slice.
    pub fn from_points(points: &[GeoPoint]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bounds = Self {
            min_lat: first.lat,
            max_lat: first.lat,
            min_lng: first.lng,
            max_lng: first.lng,
        };
        for point in rest {
            bounds.min_lat = bounds.min_lat.min(point.lat);
            bounds.max_lat = bounds.max_lat.max(point.lat);
            bounds.min_lng = bounds.min_lng.min(point.lng);
            bounds.max_lng = bounds.max_lng.max(point.lng);
        }
        Some(bounds)
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lng..=self.max_lng).contains(&point.lng)
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    /// South-west and north-east corners, the order map widgets expect.
    pub fn corners(&self) -> (GeoPoint, GeoPoint) {
        (
            GeoPoint::new(self.min_lat, self.min_lng),
            GeoPoint::new(self.max_lat, self.max_lng),
        )
    }
}
