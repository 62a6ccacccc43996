//! Query orchestration for a spatial-index map console.
//!
//! The crate sits between free-text user input, a remote spatial-index
//! service, and a map widget:
//! - `parse`: turns `"lat, lng"`, polygon, and radius text into coordinates.
//! - `geo`: points, bounding boxes, and the spherical box derivation.
//! - `overlay`: the overlay store and the [`MapSurface`] drawing capability.
//! - `backend`: the REST client for the four service endpoints.
//! - `orchestrator`: the nearest-neighbor, range, intersection, and add-point flows.

pub mod backend;
pub mod config;
pub mod error;
pub mod geo;
pub mod orchestrator;
pub mod overlay;
pub mod parse;

pub use backend::{Endpoint, HttpBackend, SpatialBackend};
pub use config::{ClientConfig, OrchestratorConfig};
pub use error::{BackendError, ErrorClass, ParseError, QueryError};
pub use geo::{BoundingBox, GeoPoint};
pub use orchestrator::{QueryOrchestrator, QueryOutcome};
pub use overlay::{
    LayerId, MapSurface, MarkerColor, MarkerRole, MarkerStyle, OverlayMarker, OverlayStore,
    RegionOverlay, RegionStyle,
};
