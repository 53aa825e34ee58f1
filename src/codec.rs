use geo::{BoundingRect, Contains, LineString, MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};

use crate::error::{LocationError, Result};

pub mod legacy;

pub const WGS84: u32 = 4326;

/// Portable geometry document, `type`-tagged like GeoJSON. Point coordinates
/// are longitude-first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeoDocument {
    Point { coordinates: [f64; 2] },
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<[f64; 2]>>> },
}

/// A point tagged with its coordinate reference system. Always srid 4326 when
/// produced by this crate; other srids only appear while decoding legacy
/// input and are rejected before they reach storage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialPoint {
    srid: u32,
    point: Point,
}

impl SpatialPoint {
    pub(crate) fn from_parts(srid: u32, lng: f64, lat: f64) -> Self {
        Self {
            srid,
            point: Point::new(lng, lat),
        }
    }

    pub fn srid(&self) -> u32 {
        self.srid
    }

    pub fn lat(&self) -> f64 {
        self.point.y()
    }

    pub fn lng(&self) -> f64 {
        self.point.x()
    }

    pub fn point(&self) -> Point {
        self.point
    }

    pub fn require_wgs84(&self) -> Result<()> {
        if self.srid != WGS84 {
            return Err(LocationError::ReferenceSystemMismatch { srid: self.srid });
        }
        Ok(())
    }
}

/// Native polygon/multipolygon value for a merchant zone field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ZoneGeometry {
    Polygon(Polygon),
    MultiPolygon(MultiPolygon),
}

impl ZoneGeometry {
    pub fn contains(&self, point: Point) -> bool {
        match self {
            Self::Polygon(p) => p.contains(&point),
            Self::MultiPolygon(mp) => mp.contains(&point),
        }
    }

    pub fn bounding_rect(&self) -> Option<geo::Rect> {
        match self {
            Self::Polygon(p) => p.bounding_rect(),
            Self::MultiPolygon(mp) => mp.bounding_rect(),
        }
    }
}

/// Zero is the sentinel for "not set", not the equator/prime-meridian point.
pub fn is_unset(lat: f64, lng: f64) -> bool {
    lat == 0.0 || lng == 0.0
}

fn check(lat: f64, lng: f64) -> Result<()> {
    if !lat.is_finite() || !lng.is_finite() || !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(LocationError::InvalidCoordinate { lat, lng });
    }
    Ok(())
}

pub fn point_document(lat: f64, lng: f64) -> Result<GeoDocument> {
    check(lat, lng)?;
    Ok(GeoDocument::Point {
        coordinates: [lng, lat],
    })
}

pub fn spatial_point(lat: f64, lng: f64) -> Result<SpatialPoint> {
    check(lat, lng)?;
    Ok(SpatialPoint::from_parts(WGS84, lng, lat))
}

pub fn document_to_spatial(document: &GeoDocument) -> Result<SpatialPoint> {
    match document {
        GeoDocument::Point {
            coordinates: [lng, lat],
        } => spatial_point(*lat, *lng),
        other => Err(LocationError::MalformedGeometry(format!(
            "expected a point document, got {}",
            kind_of(other)
        ))),
    }
}

pub fn spatial_to_document(point: &SpatialPoint) -> Result<GeoDocument> {
    point.require_wgs84()?;
    Ok(GeoDocument::Point {
        coordinates: [point.lng(), point.lat()],
    })
}

/// Convert a polygon/multipolygon document to its native value. Ring order
/// and winding are carried over exactly as given; rings must already be
/// closed (first == last, at least four positions).
pub fn zone_geometry(document: &GeoDocument) -> Result<ZoneGeometry> {
    match document {
        GeoDocument::Polygon { coordinates } => Ok(ZoneGeometry::Polygon(polygon(coordinates)?)),
        GeoDocument::MultiPolygon { coordinates } => {
            let polygons = coordinates.iter().map(|p| polygon(p)).collect::<Result<_>>()?;
            Ok(ZoneGeometry::MultiPolygon(MultiPolygon(polygons)))
        }
        other => Err(LocationError::MalformedGeometry(format!(
            "expected a polygon document, got {}",
            kind_of(other)
        ))),
    }
}

pub fn zone_document(geometry: &ZoneGeometry) -> GeoDocument {
    match geometry {
        ZoneGeometry::Polygon(p) => GeoDocument::Polygon {
            coordinates: polygon_rings(p),
        },
        ZoneGeometry::MultiPolygon(mp) => GeoDocument::MultiPolygon {
            coordinates: mp.0.iter().map(polygon_rings).collect(),
        },
    }
}

fn polygon(rings: &[Vec<[f64; 2]>]) -> Result<Polygon> {
    let mut lines = rings.iter().map(|r| ring(r)).collect::<Result<Vec<_>>>()?;
    if lines.is_empty() {
        return Err(LocationError::MalformedGeometry(
            "polygon has no rings".into(),
        ));
    }
    let exterior = lines.remove(0);
    Ok(Polygon::new(exterior, lines))
}

fn ring(positions: &[[f64; 2]]) -> Result<LineString> {
    if positions.len() < 4 {
        return Err(LocationError::MalformedGeometry(format!(
            "ring has {} positions, need at least 4",
            positions.len()
        )));
    }
    if positions.first() != positions.last() {
        return Err(LocationError::MalformedGeometry("ring is not closed".into()));
    }
    for [lng, lat] in positions {
        if !lng.is_finite() || !lat.is_finite() {
            return Err(LocationError::MalformedGeometry(
                "ring has a non-finite position".into(),
            ));
        }
    }
    Ok(LineString::from(
        positions.iter().map(|[lng, lat]| (*lng, *lat)).collect::<Vec<_>>(),
    ))
}

fn polygon_rings(polygon: &Polygon) -> Vec<Vec<[f64; 2]>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors().iter())
        .map(|ls| ls.coords().map(|c| [c.x, c.y]).collect())
        .collect()
}

fn kind_of(document: &GeoDocument) -> &'static str {
    match document {
        GeoDocument::Point { .. } => "Point",
        GeoDocument::Polygon { .. } => "Polygon",
        GeoDocument::MultiPolygon { .. } => "MultiPolygon",
    }
}
