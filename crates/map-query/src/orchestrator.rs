//! Query flows: validate, derive, clear, call, render.
//!
//! Every nearest-neighbor, range, and intersection query starts by bumping the
//! generation counter and clearing the map. The backend is called without
//! holding the overlay lock, so flows can overlap; when a response comes back
//! for a generation that is no longer current it is dropped and the flow
//! reports [`QueryOutcome::Superseded`]. Overlays are drawn only after the
//! backend confirms success.
//!
//! Adding a point is additive: it neither clears nor bumps the generation,
//! and the marker appears only once the backend has accepted the point.

use std::sync::{
    Mutex, MutexGuard, PoisonError,
    atomic::{AtomicU64, Ordering},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, field, info, info_span, warn};

use crate::{
    backend::SpatialBackend,
    config::OrchestratorConfig,
    error::{BackendError, QueryError},
    geo::{BoundingBox, GeoPoint},
    overlay::{
        MapSurface, MarkerRole, MarkerStyle, OverlayStore, RegionOverlay, RegionStyle,
    },
    parse::{parse_point, parse_polygon, parse_radius_km},
};

/// How a query flow ended when it did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryOutcome {
    /// Results were drawn; `results` counts backend points.
    Rendered { results: usize },
    /// A newer query started while this one was waiting; nothing was drawn.
    Superseded,
}

/// Owns the overlay state for one map and runs the query flows against it.
pub struct QueryOrchestrator<B, S> {
    backend: B,
    overlays: Mutex<OverlayStore<S>>,
    generation: AtomicU64,
    config: OrchestratorConfig,
}

impl<B, S> QueryOrchestrator<B, S>
where
    B: SpatialBackend,
    S: MapSurface,
{
    pub fn new(backend: B, surface: S, config: OrchestratorConfig) -> Self {
        Self {
            backend,
            overlays: Mutex::new(OverlayStore::new(surface)),
            generation: AtomicU64::new(0),
            config,
        }
    }

    /// Store `point` in the backend and mark it on the map once accepted.
    pub fn add_point(&self, point: GeoPoint) -> Result<(), QueryError> {
        let span = info_span!("query", kind = "add_point");
        let _guard = span.enter();

        self.backend.add_point(point).map_err(report)?;
        self.overlays()
            .add_marker(point, MarkerRole::Added, MarkerStyle::ADDED);
        info!(lat = point.lat, lng = point.lng, "point added");
        Ok(())
    }

    /// Find the stored point closest to `location` (`"lat, lng"`).
    pub fn nearest_neighbor(&self, location: &str) -> Result<QueryOutcome, QueryError> {
        let span = info_span!("query", kind = "nearest_neighbor", generation = field::Empty);
        let _guard = span.enter();

        let query = parse_point(location)?;
        let generation = self.begin();
        span.record("generation", generation);

        let nearest = self.backend.nearest_neighbor(query).map_err(report)?;
        let padding = self.config.fit_padding_px;
        Ok(self.finish(generation, |overlays| {
            overlays.add_marker(query, MarkerRole::Query, MarkerStyle::QUERY_POINT);
            overlays.add_marker(nearest, MarkerRole::Result, MarkerStyle::NEAREST_POINT);
            if let Some(bounds) = BoundingBox::from_points(&[query, nearest]) {
                overlays.fit_bounds(bounds, padding);
            }
            1
        }))
    }

    /// Find every stored point inside the box around `center` (`"lat, lng"`)
    /// with a radius of `radius_km` kilometres.
    pub fn range_query(&self, center: &str, radius_km: &str) -> Result<QueryOutcome, QueryError> {
        let span = info_span!("query", kind = "range_query", generation = field::Empty);
        let _guard = span.enter();

        let center = parse_point(center)?;
        let radius_km = parse_radius_km(radius_km)?;
        let bounds = BoundingBox::around(center, radius_km);
        debug!(?bounds, "derived search box");

        let generation = self.begin();
        span.record("generation", generation);

        let found = self.backend.range_query(bounds).map_err(report)?;
        let padding = self.config.fit_padding_px;
        Ok(self.finish(generation, |overlays| {
            let region = RegionOverlay::Circle {
                center,
                radius_m: radius_km * 1000.0,
            };
            let fit = region.bounds();
            overlays.set_region(region, RegionStyle::default());
            for point in &found {
                overlays.add_marker(*point, MarkerRole::Result, MarkerStyle::FOUND_POINT);
            }
            if let Some(fit) = fit {
                overlays.fit_bounds(fit, padding);
            }
            found.len()
        }))
    }

    /// Find every stored point inside the polygon described by `area`
    /// (`"lat, lng; lat, lng; lat, lng; ..."`).
    pub fn intersection(&self, area: &str) -> Result<QueryOutcome, QueryError> {
        let span = info_span!("query", kind = "intersection", generation = field::Empty);
        let _guard = span.enter();

        let vertices = parse_polygon(area)?;
        let generation = self.begin();
        span.record("generation", generation);

        let found = self.backend.intersection(&vertices).map_err(report)?;
        let padding = self.config.fit_padding_px;
        Ok(self.finish(generation, |overlays| {
            let fit = BoundingBox::from_points(&vertices);
            overlays.set_region(RegionOverlay::Polygon { vertices }, RegionStyle::default());
            if let Some(fit) = fit {
                overlays.fit_bounds(fit, padding);
            }
            for point in &found {
                overlays.add_marker(*point, MarkerRole::Result, MarkerStyle::INTERSECTING_POINT);
            }
            found.len()
        }))
    }

    /// Remove every overlay without starting a query.
    pub fn clear(&self) {
        self.overlays().clear_all();
    }

    /// Read the overlay state under the lock.
    pub fn with_overlays<R>(&self, f: impl FnOnce(&OverlayStore<S>) -> R) -> R {
        f(&self.overlays())
    }

    /// Generation of the most recently started clearing query.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn overlays(&self) -> MutexGuard<'_, OverlayStore<S>> {
        self.overlays.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a clearing flow: claim the next generation and wipe the map.
    fn begin(&self) -> u64 {
        let mut overlays = self.overlays();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        overlays.clear_all();
        generation
    }

    /// Render with `draw` unless a newer flow has started since `generation`.
    fn finish(
        &self,
        generation: u64,
        draw: impl FnOnce(&mut OverlayStore<S>) -> usize,
    ) -> QueryOutcome {
        let mut overlays = self.overlays();
        let current = self.generation.load(Ordering::SeqCst);
        if current != generation {
            debug!(current, "discarding stale response");
            return QueryOutcome::Superseded;
        }
        let results = draw(&mut overlays);
        info!(results, "query rendered");
        QueryOutcome::Rendered { results }
    }
}

fn report(err: BackendError) -> QueryError {
    warn!(class = err.class().label(), %err, "backend request failed");
    QueryError::Backend(err)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, mpsc};
    use std::thread;

    use super::*;
    use crate::{
        backend::Endpoint,
        error::{ErrorClass, ParseError},
        overlay::{MarkerColor, tests::RecordingSurface},
    };

    #[derive(Default)]
    struct ScriptedBackend {
        fail_with: Option<u16>,
        nearest: Option<GeoPoint>,
        found: Vec<GeoPoint>,
        calls: Mutex<Vec<Endpoint>>,
        last_bounds: Mutex<Option<BoundingBox>>,
    }

    impl ScriptedBackend {
        fn failing(status: u16) -> Self {
            Self {
                fail_with: Some(status),
                ..Self::default()
            }
        }

        fn answer<T>(&self, endpoint: Endpoint, value: T) -> Result<T, BackendError> {
            self.calls.lock().unwrap().push(endpoint);
            match self.fail_with {
                Some(status) => Err(BackendError::from_status(endpoint, status)),
                None => Ok(value),
            }
        }

        fn calls(&self) -> Vec<Endpoint> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl SpatialBackend for ScriptedBackend {
        fn add_point(&self, _point: GeoPoint) -> Result<(), BackendError> {
            self.answer(Endpoint::Point, ())
        }

        fn nearest_neighbor(&self, _query: GeoPoint) -> Result<GeoPoint, BackendError> {
            let nearest = self.nearest.unwrap_or(GeoPoint::new(0.0, 0.0));
            self.answer(Endpoint::NearestNeighbor, nearest)
        }

        fn range_query(&self, bounds: BoundingBox) -> Result<Vec<GeoPoint>, BackendError> {
            *self.last_bounds.lock().unwrap() = Some(bounds);
            self.answer(Endpoint::RangeQuery, self.found.clone())
        }

        fn intersection(&self, _vertices: &[GeoPoint]) -> Result<Vec<GeoPoint>, BackendError> {
            self.answer(Endpoint::Intersection, self.found.clone())
        }
    }

    fn orchestrator(
        backend: ScriptedBackend,
    ) -> QueryOrchestrator<ScriptedBackend, RecordingSurface> {
        QueryOrchestrator::new(
            backend,
            RecordingSurface::default(),
            OrchestratorConfig::default(),
        )
    }

    #[test]
    fn test_add_point_is_additive() {
        let orchestrator = orchestrator(ScriptedBackend::default());
        orchestrator.add_point(GeoPoint::new(1.0, 1.0)).unwrap();
        orchestrator.add_point(GeoPoint::new(2.0, 2.0)).unwrap();

        orchestrator.with_overlays(|overlays| {
            assert_eq!(overlays.markers().len(), 2);
            assert!(overlays.markers().all(|m| m.role == MarkerRole::Added));
        });
        assert_eq!(orchestrator.generation(), 0);
    }

    #[test]
    fn test_failed_add_point_draws_nothing() {
        let orchestrator = orchestrator(ScriptedBackend::failing(400));
        let err = orchestrator.add_point(GeoPoint::new(1.0, 1.0)).unwrap_err();

        assert!(matches!(err, QueryError::Backend(ref e) if e.class() == ErrorClass::Client));
        assert_eq!(err.user_message(), "Failed to add point to the system");
        orchestrator.with_overlays(|overlays| assert!(overlays.is_empty()));
    }

    #[test]
    fn test_nearest_neighbor_draws_both_points() {
        let orchestrator = orchestrator(ScriptedBackend {
            nearest: Some(GeoPoint::new(26.48, 73.12)),
            ..ScriptedBackend::default()
        });
        orchestrator.add_point(GeoPoint::new(5.0, 5.0)).unwrap();

        let outcome = orchestrator.nearest_neighbor("26.4753, 73.1173").unwrap();
        assert_eq!(outcome, QueryOutcome::Rendered { results: 1 });

        orchestrator.with_overlays(|overlays| {
            let colors: Vec<_> = overlays.markers().map(|m| m.style.color).collect();
            assert_eq!(colors, vec![MarkerColor::Blue, MarkerColor::Red]);
            assert!(overlays.region().is_none());

            let fit = overlays.surface().fits.last().copied().unwrap();
            assert!(fit.contains(GeoPoint::new(26.4753, 73.1173)));
            assert!(fit.contains(GeoPoint::new(26.48, 73.12)));
        });
    }

    #[test]
    fn test_nearest_neighbor_server_error_leaves_map_cleared() {
        let orchestrator = orchestrator(ScriptedBackend::failing(500));
        orchestrator.overlays().add_marker(
            GeoPoint::new(1.0, 1.0),
            MarkerRole::Added,
            MarkerStyle::ADDED,
        );

        let err = orchestrator.nearest_neighbor("10, 10").unwrap_err();
        assert!(matches!(err, QueryError::Backend(ref e) if e.class() == ErrorClass::Server));
        assert_eq!(err.user_message(), "Failed to find nearest neighbor");

        orchestrator.with_overlays(|overlays| {
            assert_eq!(overlays.markers().len(), 0);
            assert!(overlays.surface().layers.is_empty());
        });
    }

    #[test]
    fn test_parse_error_never_reaches_backend() {
        let orchestrator = orchestrator(ScriptedBackend::default());
        orchestrator.add_point(GeoPoint::new(1.0, 1.0)).unwrap();

        let err = orchestrator.nearest_neighbor("north, east").unwrap_err();
        assert!(matches!(err, QueryError::Parse(ParseError::InvalidFormat { .. })));

        let err = orchestrator.intersection("1,1;2,2").unwrap_err();
        assert!(matches!(
            err,
            QueryError::Parse(ParseError::TooFewVertices { found: 2 })
        ));

        let err = orchestrator.range_query("1, 1", "-5").unwrap_err();
        assert!(matches!(err, QueryError::Parse(_)));

        assert_eq!(orchestrator.backend().calls(), vec![Endpoint::Point]);
        assert_eq!(orchestrator.generation(), 0);
        orchestrator.with_overlays(|overlays| assert_eq!(overlays.markers().len(), 1));
    }

    #[test]
    fn test_range_query_draws_circle_and_results() {
        let orchestrator = orchestrator(ScriptedBackend {
            found: vec![GeoPoint::new(26.47, 73.11), GeoPoint::new(26.49, 73.13)],
            ..ScriptedBackend::default()
        });

        let outcome = orchestrator.range_query("26.4753, 73.1173", "5").unwrap();
        assert_eq!(outcome, QueryOutcome::Rendered { results: 2 });

        let sent = orchestrator.backend().last_bounds.lock().unwrap().unwrap();
        assert_eq!(
            sent,
            BoundingBox::around(GeoPoint::new(26.4753, 73.1173), 5.0)
        );

        orchestrator.with_overlays(|overlays| {
            assert_eq!(
                overlays.region(),
                Some(&RegionOverlay::Circle {
                    center: GeoPoint::new(26.4753, 73.1173),
                    radius_m: 5000.0,
                })
            );
            assert!(overlays.markers().all(|m| m.style.color == MarkerColor::Green));
            assert_eq!(overlays.surface().fits.last(), Some(&sent));
        });
    }

    #[test]
    fn test_intersection_draws_polygon_after_success() {
        let orchestrator = orchestrator(ScriptedBackend {
            found: vec![GeoPoint::new(1.5, 1.5)],
            ..ScriptedBackend::default()
        });

        let outcome = orchestrator.intersection("1,1; 2,2; 2,1").unwrap();
        assert_eq!(outcome, QueryOutcome::Rendered { results: 1 });

        orchestrator.with_overlays(|overlays| {
            assert!(matches!(
                overlays.region(),
                Some(RegionOverlay::Polygon { vertices }) if vertices.len() == 3
            ));
            assert_eq!(overlays.surface().regions(), 1);
            let marker = overlays.markers().next().unwrap();
            assert_eq!(marker.style, MarkerStyle::INTERSECTING_POINT);
        });
    }

    #[test]
    fn test_failed_intersection_draws_no_polygon() {
        let orchestrator = orchestrator(ScriptedBackend::failing(503));
        assert!(orchestrator.intersection("1,1; 2,2; 2,1").is_err());

        orchestrator.with_overlays(|overlays| {
            assert!(overlays.region().is_none());
            assert!(overlays.surface().layers.is_empty());
            assert!(overlays.surface().fits.is_empty());
        });
    }

    #[test]
    fn test_single_region_across_queries() {
        let orchestrator = orchestrator(ScriptedBackend {
            found: vec![GeoPoint::new(1.5, 1.5)],
            ..ScriptedBackend::default()
        });

        orchestrator.range_query("1, 1", "10").unwrap();
        orchestrator.intersection("1,1; 2,2; 2,1").unwrap();
        orchestrator.range_query("3, 3", "1").unwrap();

        orchestrator.with_overlays(|overlays| {
            assert_eq!(overlays.surface().regions(), 1);
            assert_eq!(overlays.markers().len(), 1);
        });
        assert_eq!(orchestrator.generation(), 3);
    }

    /// Holds nearest-neighbor answers until the test releases them.
    struct GatedBackend {
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl SpatialBackend for GatedBackend {
        fn add_point(&self, _point: GeoPoint) -> Result<(), BackendError> {
            Ok(())
        }

        fn nearest_neighbor(&self, query: GeoPoint) -> Result<GeoPoint, BackendError> {
            self.entered.lock().unwrap().send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
            Ok(query)
        }

        fn range_query(&self, bounds: BoundingBox) -> Result<Vec<GeoPoint>, BackendError> {
            Ok(vec![bounds.center()])
        }

        fn intersection(&self, _vertices: &[GeoPoint]) -> Result<Vec<GeoPoint>, BackendError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let orchestrator = Arc::new(QueryOrchestrator::new(
            GatedBackend {
                entered: Mutex::new(entered_tx),
                release: Mutex::new(release_rx),
            },
            RecordingSurface::default(),
            OrchestratorConfig::default(),
        ));

        let slow = {
            let orchestrator = Arc::clone(&orchestrator);
            thread::spawn(move || orchestrator.nearest_neighbor("10, 10"))
        };
        entered_rx.recv().unwrap();

        let fast = orchestrator.range_query("20, 20", "5").unwrap();
        assert_eq!(fast, QueryOutcome::Rendered { results: 1 });

        release_tx.send(()).unwrap();
        let slow = slow.join().unwrap().unwrap();
        assert_eq!(slow, QueryOutcome::Superseded);

        orchestrator.with_overlays(|overlays| {
            assert!(matches!(overlays.region(), Some(RegionOverlay::Circle { .. })));
            assert_eq!(overlays.markers().len(), 1);
            assert!(
                overlays
                    .markers()
                    .all(|m| m.style == MarkerStyle::FOUND_POINT)
            );
        });
    }
}
