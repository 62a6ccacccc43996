//! Free-text coordinate parsing.
//!
//! Accepted forms:
//! - point: `"lat, lng"`
//! - area: `"lat, lng; lat, lng; lat, lng"` (at least three points, a trailing `;` is ignored)
//! - radius: a bare number of kilometres, strictly positive
//!
//! Values outside the valid lat/lng range are passed through unchanged and
//! only logged; hosts that want to reject them can use [`GeoPoint::is_in_range`].

use tracing::{debug, warn};

use crate::{error::ParseError, geo::GeoPoint};

/// Minimum number of vertices accepted for an area.
pub const MIN_POLYGON_VERTICES: usize = 3;

/// Parse a single `"lat, lng"` pair.
pub fn parse_point(input: &str) -> Result<GeoPoint, ParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(rejected(input, "no input"));
    }

    let mut fields = trimmed.split(',');
    let (Some(lat), Some(lng), None) = (fields.next(), fields.next(), fields.next()) else {
        return Err(rejected(input, "expected \"lat, lng\""));
    };
    let lat = parse_number(input, lat, "latitude")?;
    let lng = parse_number(input, lng, "longitude")?;

    let point = GeoPoint::new(lat, lng);
    if !point.is_in_range() {
        warn!(lat, lng, "coordinates outside the valid range; passing through");
    }
    Ok(point)
}

/// Parse a `;`-separated list of points describing a polygon.
pub fn parse_polygon(input: &str) -> Result<Vec<GeoPoint>, ParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(rejected(input, "no input"));
    }

    let body = trimmed.strip_suffix(';').unwrap_or(trimmed);
    let vertices = body
        .split(';')
        .map(|segment| {
            if segment.trim().is_empty() {
                Err(rejected(input, "empty point between ';' separators"))
            } else {
                parse_point(segment)
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    if vertices.len() < MIN_POLYGON_VERTICES {
        debug!(found = vertices.len(), "rejecting area with too few vertices");
        return Err(ParseError::TooFewVertices {
            found: vertices.len(),
        });
    }
    Ok(vertices)
}

/// Parse a search radius in kilometres.
pub fn parse_radius_km(input: &str) -> Result<f64, ParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(rejected(input, "no input"));
    }
    let radius = parse_number(input, trimmed, "radius")?;
    if radius <= 0.0 {
        return Err(rejected(input, "radius must be greater than zero"));
    }
    Ok(radius)
}

fn parse_number(input: &str, field: &str, name: &str) -> Result<f64, ParseError> {
    match field.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(rejected(input, format!("{name} is not a finite number"))),
    }
}

fn rejected(input: &str, reason: impl Into<String>) -> ParseError {
    let err = ParseError::invalid(input, reason);
    debug!(%err, "rejecting coordinate input");
    err
}
