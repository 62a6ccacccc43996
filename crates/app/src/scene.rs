//! Recorded map scene shared between the orchestrator and the console server.
//!
//! `SceneSurface` is the `MapSurface` the orchestrator draws on. Instead of
//! talking to a widget directly it keeps the live layers and the last viewport
//! fit in a `SceneSnapshot`, which the browser page polls or streams and
//! replays onto Leaflet.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use map_query::{BoundingBox, GeoPoint, LayerId, MapSurface, MarkerStyle, RegionStyle};
use serde::Serialize;

pub(crate) type SharedScene = Arc<Mutex<SceneSnapshot>>;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum LayerShape {
    Marker {
        point: GeoPoint,
        style: MarkerStyle,
    },
    Circle {
        center: GeoPoint,
        radius_m: f64,
        style: RegionStyle,
    },
    Polygon {
        vertices: Vec<GeoPoint>,
        style: RegionStyle,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct SceneLayer {
    pub(crate) id: LayerId,
    #[serde(flatten)]
    pub(crate) shape: LayerShape,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub(crate) struct Viewport {
    /// Incremented on every fit so the page refits even when the bounds repeat.
    pub(crate) seq: u64,
    pub(crate) bounds: BoundingBox,
    pub(crate) padding_px: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub(crate) struct SceneSnapshot {
    pub(crate) revision: u64,
    pub(crate) updated_ms: i64,
    pub(crate) layers: Vec<SceneLayer>,
    pub(crate) viewport: Option<Viewport>,
}

impl SceneSnapshot {
    fn touch(&mut self) {
        self.revision += 1;
        self.updated_ms = Utc::now().timestamp_millis();
    }
}

pub(crate) fn shared_scene() -> SharedScene {
    Arc::new(Mutex::new(SceneSnapshot::default()))
}

/// Copy the current scene out of the shared slot.
pub(crate) fn snapshot(scene: &SharedScene) -> SceneSnapshot {
    scene
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

pub(crate) struct SceneSurface {
    scene: SharedScene,
    next_id: u64,
}

impl SceneSurface {
    pub(crate) fn new(scene: SharedScene) -> Self {
        Self { scene, next_id: 0 }
    }

    fn update<R>(&self, f: impl FnOnce(&mut SceneSnapshot) -> R) -> R {
        let mut scene = self.scene.lock().unwrap_or_else(PoisonError::into_inner);
        let result = f(&mut scene);
        scene.touch();
        result
    }

    fn push(&mut self, shape: LayerShape) -> LayerId {
        self.next_id += 1;
        let id = LayerId(self.next_id);
        self.update(|scene| scene.layers.push(SceneLayer { id, shape }));
        id
    }
}

impl MapSurface for SceneSurface {
    fn add_marker(&mut self, point: GeoPoint, style: MarkerStyle) -> LayerId {
        self.push(LayerShape::Marker { point, style })
    }

    fn remove_layer(&mut self, layer: LayerId) {
        self.update(|scene| scene.layers.retain(|entry| entry.id != layer));
    }

    fn draw_circle(&mut self, center: GeoPoint, radius_m: f64, style: RegionStyle) -> LayerId {
        self.push(LayerShape::Circle {
            center,
            radius_m,
            style,
        })
    }

    fn draw_polygon(&mut self, vertices: &[GeoPoint], style: RegionStyle) -> LayerId {
        self.push(LayerShape::Polygon {
            vertices: vertices.to_vec(),
            style,
        })
    }

    fn fit_bounds(&mut self, bounds: BoundingBox, padding_px: u32) {
        self.update(|scene| {
            let seq = scene.viewport.map_or(1, |viewport| viewport.seq + 1);
            scene.viewport = Some(Viewport {
                seq,
                bounds,
                padding_px,
            });
        });
    }
}
