//! Simple polygons with a single exterior ring.

use glam::DVec2;

use super::Extent;

/// A polygon described by one closed exterior ring.
///
/// The ring is stored closed (first vertex repeated as the last one) and
/// in counter-clockwise order, which is what GeoJSON writers expect.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    exterior: Vec<DVec2>,
}

impl Polygon {
    /// Creates a polygon from a ring of vertices.
    ///
    /// The ring is closed if needed and reoriented counter-clockwise.
    /// Rings with fewer than three distinct vertices produce an empty polygon.
    pub fn new(mut ring: Vec<DVec2>) -> Self {
        if ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }
        if ring.len() < 3 {
            return Self { exterior: Vec::new() };
        }
        if signed_area(&ring) < 0.0 {
            ring.reverse();
        }
        ring.push(ring[0]);
        Self { exterior: ring }
    }

    /// Creates the rectangle covering an extent.
    pub fn from_extent(extent: &Extent) -> Self {
        Self::new(vec![
            DVec2::new(extent.min_x, extent.min_y),
            DVec2::new(extent.max_x, extent.min_y),
            DVec2::new(extent.max_x, extent.max_y),
            DVec2::new(extent.min_x, extent.max_y),
        ])
    }

    /// Returns the closed exterior ring.
    pub fn exterior(&self) -> &[DVec2] {
        &self.exterior
    }

    /// Number of distinct vertices (the closing vertex is not counted).
    pub fn vertex_count(&self) -> usize {
        self.exterior.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.exterior.is_empty()
    }

    /// Unsigned area using the shoelace formula.
    pub fn area(&self) -> f64 {
        signed_area(self.open_ring()).abs()
    }

    /// Area-weighted centroid. Empty polygons return `None`.
    pub fn centroid(&self) -> Option<DVec2> {
        let ring = self.open_ring();
        let area = signed_area(ring);
        if ring.is_empty() || area == 0.0 {
            return None;
        }

        let mut acc = DVec2::ZERO;
        for i in 0..ring.len() {
            let a = ring[i];
            let b = ring[(i + 1) % ring.len()];
            let cross = a.perp_dot(b);
            acc += (a + b) * cross;
        }
        Some(acc / (6.0 * area))
    }

    /// Bounding box of the ring, or `None` for an empty polygon.
    pub fn bounds(&self) -> Option<Extent> {
        Extent::from_points(&self.exterior)
    }

    /// Even-odd point-in-polygon test. Points on the boundary may land on
    /// either side.
    pub fn contains(&self, point: DVec2) -> bool {
        let ring = self.open_ring();
        let mut inside = false;
        let mut j = ring.len().wrapping_sub(1);
        for i in 0..ring.len() {
            let (a, b) = (ring[i], ring[j]);
            if (a.y > point.y) != (b.y > point.y) {
                let x = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
                if point.x < x {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    fn open_ring(&self) -> &[DVec2] {
        match self.exterior.len() {
            0 => &[],
            n => &self.exterior[..n - 1],
        }
    }
}

/// Signed area of an open ring; positive for counter-clockwise order.
fn signed_area(ring: &[DVec2]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[(i + 1) % ring.len()];
        sum += a.perp_dot(b);
    }
    sum * 0.5
}
