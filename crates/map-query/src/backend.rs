//! Client for the spatial-index service.
//!
//! The service exposes four JSON endpoints under a common base path:
//!
//! | endpoint            | body                                       | success              |
//! |---------------------|--------------------------------------------|----------------------|
//! | `/point`            | `{lat, lng}`                               | any 2xx, body ignored|
//! | `/nearest_neighbor` | `{lat, lng}`                               | `{lat, lng}`         |
//! | `/range_query`      | `{min_lat, max_lat, min_lng, max_lng}`     | `[{lat, lng}, ...]`  |
//! | `/intersection`     | `{points: [[lat, lng], ...]}`              | `[{lat, lng}, ...]`  |

use std::fmt;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::{
    config::ClientConfig,
    error::BackendError,
    geo::{BoundingBox, GeoPoint},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Point,
    NearestNeighbor,
    RangeQuery,
    Intersection,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Point => "point",
            Endpoint::NearestNeighbor => "nearest_neighbor",
            Endpoint::RangeQuery => "range_query",
            Endpoint::Intersection => "intersection",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.path())
    }
}

/// Wire form of a point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl From<GeoPoint> for LatLng {
    fn from(point: GeoPoint) -> Self {
        Self {
            lat: point.lat,
            lng: point.lng,
        }
    }
}

impl From<LatLng> for GeoPoint {
    fn from(value: LatLng) -> Self {
        GeoPoint::new(value.lat, value.lng)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RangeRequest {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl From<BoundingBox> for RangeRequest {
    fn from(bounds: BoundingBox) -> Self {
        Self {
            min_lat: bounds.min_lat,
            max_lat: bounds.max_lat,
            min_lng: bounds.min_lng,
            max_lng: bounds.max_lng,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IntersectionRequest {
    pub points: Vec<[f64; 2]>,
}

impl IntersectionRequest {
    pub fn new(vertices: &[GeoPoint]) -> Self {
        Self {
            points: vertices.iter().map(|vertex| vertex.to_pair()).collect(),
        }
    }
}

/// The four operations of the spatial-index service.
pub trait SpatialBackend {
    fn add_point(&self, point: GeoPoint) -> Result<(), BackendError>;
    fn nearest_neighbor(&self, query: GeoPoint) -> Result<GeoPoint, BackendError>;
    fn range_query(&self, bounds: BoundingBox) -> Result<Vec<GeoPoint>, BackendError>;
    fn intersection(&self, vertices: &[GeoPoint]) -> Result<Vec<GeoPoint>, BackendError>;
}

impl<T: SpatialBackend + ?Sized> SpatialBackend for Box<T> {
    fn add_point(&self, point: GeoPoint) -> Result<(), BackendError> {
        (**self).add_point(point)
    }

    fn nearest_neighbor(&self, query: GeoPoint) -> Result<GeoPoint, BackendError> {
        (**self).nearest_neighbor(query)
    }

    fn range_query(&self, bounds: BoundingBox) -> Result<Vec<GeoPoint>, BackendError> {
        (**self).range_query(bounds)
    }

    fn intersection(&self, vertices: &[GeoPoint]) -> Result<Vec<GeoPoint>, BackendError> {
        (**self).intersection(vertices)
    }
}

/// Blocking HTTP implementation of [`SpatialBackend`].
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        // The blocking client defaults to a 30 s timeout; `None` waits forever.
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}/{}", self.base_url, endpoint.path())
    }

    /// POST `body` and return the raw body of a 2xx response.
    fn post<B: Serialize + ?Sized>(
        &self,
        endpoint: Endpoint,
        body: &B,
    ) -> Result<Vec<u8>, BackendError> {
        let url = self.url(endpoint);
        debug!(%url, "backend request");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(|err| BackendError::Network {
                endpoint,
                source: Box::new(err),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::from_status(endpoint, status.as_u16()));
        }
        let bytes = response.bytes().map_err(|err| BackendError::Network {
            endpoint,
            source: Box::new(err),
        })?;
        Ok(bytes.to_vec())
    }

    fn post_json<B, T>(&self, endpoint: Endpoint, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let bytes = self.post(endpoint, body)?;
        serde_json::from_slice(&bytes).map_err(|err| BackendError::Decode {
            endpoint,
            source: Box::new(err),
        })
    }
}

impl SpatialBackend for HttpBackend {
    fn add_point(&self, point: GeoPoint) -> Result<(), BackendError> {
        self.post(Endpoint::Point, &LatLng::from(point))?;
        Ok(())
    }

    fn nearest_neighbor(&self, query: GeoPoint) -> Result<GeoPoint, BackendError> {
        let nearest: LatLng = self.post_json(Endpoint::NearestNeighbor, &LatLng::from(query))?;
        Ok(nearest.into())
    }

    fn range_query(&self, bounds: BoundingBox) -> Result<Vec<GeoPoint>, BackendError> {
        let found: Vec<LatLng> =
            self.post_json(Endpoint::RangeQuery, &RangeRequest::from(bounds))?;
        Ok(found.into_iter().map(GeoPoint::from).collect())
    }

    fn intersection(&self, vertices: &[GeoPoint]) -> Result<Vec<GeoPoint>, BackendError> {
        let found: Vec<LatLng> =
            self.post_json(Endpoint::Intersection, &IntersectionRequest::new(vertices))?;
        Ok(found.into_iter().map(GeoPoint::from).collect())
    }
}
