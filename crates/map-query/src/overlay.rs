//! Overlay bookkeeping between query flows and the map widget.
//!
//! [`OverlayStore`] is the single owner of what is currently drawn: an ordered
//! list of markers and at most one region (circle or polygon). Every mutation
//! is forwarded to the [`MapSurface`] immediately.

use serde::Serialize;

use crate::geo::{BoundingBox, GeoPoint};

/// Opaque handle for a layer drawn on a [`MapSurface`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LayerId(pub u64);

/// Marker fill colours used by the console.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerColor {
    /// The widget's stock pin.
    Default,
    Blue,
    Red,
    Green,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerRole {
    /// The point a query was issued for.
    Query,
    /// A point returned by the backend.
    Result,
    /// A point the user added by clicking the map.
    Added,
}

/// Visual style handed to the surface with every marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MarkerStyle {
    pub color: MarkerColor,
    pub label: Option<&'static str>,
}

impl MarkerStyle {
    pub const ADDED: Self = Self {
        color: MarkerColor::Default,
        label: None,
    };
    pub const QUERY_POINT: Self = Self {
        color: MarkerColor::Blue,
        label: Some("Query Point"),
    };
    pub const NEAREST_POINT: Self = Self {
        color: MarkerColor::Red,
        label: Some("Nearest Point"),
    };
    pub const FOUND_POINT: Self = Self {
        color: MarkerColor::Green,
        label: Some("Found Point"),
    };
    pub const INTERSECTING_POINT: Self = Self {
        color: MarkerColor::Red,
        label: Some("Intersecting Point"),
    };
}

/// Stroke and fill used for circles and polygons.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RegionStyle {
    pub stroke: &'static str,
    pub fill: &'static str,
    pub fill_opacity: f32,
}

impl Default for RegionStyle {
    fn default() -> Self {
        Self {
            stroke: "blue",
            fill: "#3388ff",
            fill_opacity: 0.2,
        }
    }
}

/// Drawing capability provided by the map widget.
pub trait MapSurface {
    fn add_marker(&mut self, point: GeoPoint, style: MarkerStyle) -> LayerId;
    fn remove_layer(&mut self, layer: LayerId);
    fn draw_circle(&mut self, center: GeoPoint, radius_m: f64, style: RegionStyle) -> LayerId;
    fn draw_polygon(&mut self, vertices: &[GeoPoint], style: RegionStyle) -> LayerId;
    fn fit_bounds(&mut self, bounds: BoundingBox, padding_px: u32);
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct OverlayMarker {
    pub point: GeoPoint,
    pub role: MarkerRole,
    pub style: MarkerStyle,
}

/// The single search area shown on the map.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RegionOverlay {
    Circle { center: GeoPoint, radius_m: f64 },
    Polygon { vertices: Vec<GeoPoint> },
}

impl RegionOverlay {
    /// Area the viewport should cover to show the whole region.
    pub fn bounds(&self) -> Option<BoundingBox> {
        match self {
            RegionOverlay::Circle { center, radius_m } => {
                Some(BoundingBox::around(*center, radius_m / 1000.0))
            }
            RegionOverlay::Polygon { vertices } => BoundingBox::from_points(vertices),
        }
    }
}

/// Current overlays and the surface they are drawn on.
pub struct OverlayStore<S> {
    surface: S,
    markers: Vec<(OverlayMarker, LayerId)>,
    region: Option<(RegionOverlay, LayerId)>,
}

impl<S: MapSurface> OverlayStore<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            markers: Vec::new(),
            region: None,
        }
    }

    /// Remove every marker and the region. Calling it on an empty store is a no-op.
    pub fn clear_all(&mut self) {
        for (_, layer) in self.markers.drain(..) {
            self.surface.remove_layer(layer);
        }
        if let Some((_, layer)) = self.region.take() {
            self.surface.remove_layer(layer);
        }
    }

    /// Draw a marker and remember it for the next [`clear_all`](Self::clear_all).
    pub fn add_marker(&mut self, point: GeoPoint, role: MarkerRole, style: MarkerStyle) -> LayerId {
        let layer = self.surface.add_marker(point, style);
        self.markers
            .push((OverlayMarker { point, role, style }, layer));
        layer
    }

    /// Replace the current region with `region`.
    pub fn set_region(&mut self, region: RegionOverlay, style: RegionStyle) -> LayerId {
        if let Some((_, previous)) = self.region.take() {
            self.surface.remove_layer(previous);
        }
        let layer = match &region {
            RegionOverlay::Circle { center, radius_m } => {
                self.surface.draw_circle(*center, *radius_m, style)
            }
            RegionOverlay::Polygon { vertices } => self.surface.draw_polygon(vertices, style),
        };
        self.region = Some((region, layer));
        layer
    }

    pub fn fit_bounds(&mut self, bounds: BoundingBox, padding_px: u32) {
        self.surface.fit_bounds(bounds, padding_px);
    }

    pub fn markers(&self) -> impl ExactSizeIterator<Item = &OverlayMarker> {
        self.markers.iter().map(|(marker, _)| marker)
    }

    pub fn region(&self) -> Option<&RegionOverlay> {
        self.region.as_ref().map(|(region, _)| region)
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty() && self.region.is_none()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}
