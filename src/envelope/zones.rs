use super::EnvelopeError;
use super::geo::GeoPoint;

/// A named polygon the aircraft must not enter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoFlightArea {
    name: String,
    vertices: Vec<GeoPoint>,
}

impl NoFlightArea {
    pub fn new(name: String, vertices: Vec<GeoPoint>) -> Self { Self { name, vertices } }
    pub fn name(&self) -> &str { &self.name }
    pub fn vertices(&self) -> &[GeoPoint] { &self.vertices }
}

/// Parses `<count>&<name>&<vertexCount>&<lat_lon>...` repeated `count` times.
///
/// Both the zone count and every vertex count have to match the number of
/// fields actually present, trailing fields are rejected.
pub(super) fn parse_zones(body: &str) -> Result<Vec<NoFlightArea>, EnvelopeError> {
    let mut fields = body.split('&');
    let count: usize = fields
        .next()
        .and_then(|c| c.trim().parse().ok())
        .ok_or(EnvelopeError::Malformed)?;

    let mut zones = Vec::with_capacity(count);
    for _ in 0..count {
        let name = fields.next().ok_or(EnvelopeError::Malformed)?.to_string();
        let vertex_count: usize = fields
            .next()
            .and_then(|c| c.trim().parse().ok())
            .ok_or(EnvelopeError::Malformed)?;
        let vertices = fields
            .by_ref()
            .take(vertex_count)
            .map(GeoPoint::parse_pair)
            .collect::<Result<Vec<_>, _>>()?;
        if vertices.len() != vertex_count {
            return Err(EnvelopeError::Malformed);
        }
        zones.push(NoFlightArea::new(name, vertices));
    }

    if fields.next().is_some() {
        return Err(EnvelopeError::Malformed);
    }
    Ok(zones)
}
