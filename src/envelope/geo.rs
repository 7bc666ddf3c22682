use super::EnvelopeError;
use fixed::types::I32F32;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// A geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoPoint {
    lat: I32F32,
    lon: I32F32,
}

impl GeoPoint {
    pub fn new(lat: I32F32, lon: I32F32) -> Self { Self { lat, lon } }
    pub fn lat(&self) -> I32F32 { self.lat }
    pub fn lon(&self) -> I32F32 { self.lon }

    /// Parses a `<lat>_<lon>` pair.
    pub fn parse_pair(raw: &str) -> Result<Self, EnvelopeError> {
        let values = parse_numbers(raw)?;
        match values.as_slice() {
            [lat, lon] => Ok(Self::new(*lat, *lon)),
            _ => Err(EnvelopeError::Malformed),
        }
    }
}

impl Display for GeoPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.7}, {:.7})", self.lat, self.lon)
    }
}

/// A geographic position with an altitude in meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoPoint3 {
    pos: GeoPoint,
    alt: I32F32,
}

impl GeoPoint3 {
    pub fn new(pos: GeoPoint, alt: I32F32) -> Self { Self { pos, alt } }
    pub fn pos(&self) -> GeoPoint { self.pos }
    pub fn alt(&self) -> I32F32 { self.alt }

    /// Parses a `<lat>_<lon>_<alt>` triple.
    pub fn parse_triple(raw: &str) -> Result<Self, EnvelopeError> {
        let values = parse_numbers(raw)?;
        match values.as_slice() {
            [lat, lon, alt] => Ok(Self::new(GeoPoint::new(*lat, *lon), *alt)),
            _ => Err(EnvelopeError::Malformed),
        }
    }
}

impl Display for GeoPoint3 {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} @ {:.2}m", self.pos, self.alt)
    }
}

/// Splits an underscore separated list of decimal numbers.
pub(super) fn parse_numbers(raw: &str) -> Result<Vec<I32F32>, EnvelopeError> {
    raw.split('_')
        .map(|num| I32F32::from_str(num.trim()).map_err(|_| EnvelopeError::Malformed))
        .collect()
}
