//! Intake for every location shape that has historically reached the
//! document column: proper point documents, the `{x, y}` shim, stringified
//! nulls, and hex-encoded EWKB that leaked out of the native column. Anything
//! else fails closed. New writers must only ever produce point documents.

use serde_json::Value;

use crate::codec::{self, GeoDocument, SpatialPoint, WGS84};
use crate::error::{LocationError, Result};

/// Normalize a legacy document column value to at most one point document.
/// `None` means "unset" (nulls, stringified nulls, zero coordinates).
pub fn normalize(value: &Value) -> Result<Option<GeoDocument>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => {
            if s.trim() == "null" {
                return Ok(None);
            }
            let point = decode_ewkb(s.trim())?;
            point.require_wgs84()?;
            from_pair(point.lat(), point.lng())
        }
        Value::Object(map) => {
            if map.contains_key("type") {
                let document: GeoDocument = serde_json::from_value(value.clone())
                    .map_err(|e| LocationError::MalformedGeometry(e.to_string()))?;
                let point = codec::document_to_spatial(&document)?;
                return from_pair(point.lat(), point.lng());
            }
            // the {x, y} shape: x is longitude, y is latitude
            match (number(map.get("x")), number(map.get("y"))) {
                (Some(lng), Some(lat)) => from_pair(lat, lng),
                _ => Err(LocationError::MalformedGeometry(
                    "object is neither a point document nor an {x, y} pair".into(),
                )),
            }
        }
        other => Err(LocationError::MalformedGeometry(format!(
            "unexpected document value: {other}"
        ))),
    }
}

fn from_pair(lat: f64, lng: f64) -> Result<Option<GeoDocument>> {
    if codec::is_unset(lat, lng) {
        return Ok(None);
    }
    codec::point_document(lat, lng).map(Some)
}

fn number(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64)
}

// EWKB point: endianness byte, u32 type word (bit 0x20000000 marks an
// embedded srid), optional u32 srid, then x/y as f64. A bare WKB point with
// no srid word is taken as 4326, matching how the rows were written.
fn decode_ewkb(hex: &str) -> Result<SpatialPoint> {
    let bytes = unhex(hex)
        .ok_or_else(|| LocationError::MalformedGeometry("not a hex geometry string".into()))?;
    let mut reader = Reader::new(&bytes)?;

    let type_word = reader.u32()?;
    if type_word & 0xC000_0000 != 0 {
        return Err(LocationError::MalformedGeometry(
            "Z/M point geometry is not supported".into(),
        ));
    }
    let srid = if type_word & 0x2000_0000 != 0 {
        reader.u32()?
    } else {
        WGS84
    };
    if type_word & 0x1FFF_FFFF != 1 {
        return Err(LocationError::MalformedGeometry(format!(
            "geometry type {} is not a point",
            type_word & 0x1FFF_FFFF
        )));
    }

    let lng = reader.f64()?;
    let lat = reader.f64()?;
    reader.finish()?;

    Ok(SpatialPoint::from_parts(srid, lng, lat))
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
    little: bool,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Result<Self> {
        let little = match bytes.first() {
            Some(0) => false,
            Some(1) => true,
            _ => {
                return Err(LocationError::MalformedGeometry(
                    "bad endianness byte".into(),
                ))
            }
        };
        Ok(Self {
            bytes,
            pos: 1,
            little,
        })
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos + n;
        if end > self.bytes.len() {
            return Err(LocationError::MalformedGeometry(
                "truncated geometry bytes".into(),
            ));
        }
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32> {
        let raw = self.take(4)?.try_into().expect("sized slice");
        Ok(if self.little {
            u32::from_le_bytes(raw)
        } else {
            u32::from_be_bytes(raw)
        })
    }

    fn f64(&mut self) -> Result<f64> {
        let raw = self.take(8)?.try_into().expect("sized slice");
        Ok(if self.little {
            f64::from_le_bytes(raw)
        } else {
            f64::from_be_bytes(raw)
        })
    }

    fn finish(&self) -> Result<()> {
        if self.pos != self.bytes.len() {
            return Err(LocationError::MalformedGeometry(
                "trailing geometry bytes".into(),
            ));
        }
        Ok(())
    }
}

fn unhex(s: &str) -> Option<Vec<u8>> {
    if s.is_empty() || s.len() % 2 != 0 {
        return None;
    }
    s.as_bytes()
        .chunks(2)
        .map(|pair| {
            let hi = (pair[0] as char).to_digit(16)?;
            let lo = (pair[1] as char).to_digit(16)?;
            Some((hi * 16 + lo) as u8)
        })
        .collect()
}
