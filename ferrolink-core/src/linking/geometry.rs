//! Local equirectangular projection and linear referencing.
//!
//! Distances used for ranking candidates are planar distances in degrees
//! of latitude after scaling longitudes by `cos(latitude)` of the point
//! being linked. The scale is fixed per linking call so every comparison
//! inside one call is consistent.

use geo::{Coord, Distance, Haversine, LineString, Point};
use itertools::Itertools;
use rstar::AABB;

use crate::{Meters, Millimeters};

/// Earth radius used to convert between metres and degrees of latitude
pub const EARTH_RADIUS_METERS: f64 = 6_371_010.0;

/// Smallest longitude scale, keeps envelopes finite near the poles
const MIN_XSCALE: f64 = 1e-6;

pub fn meters_to_degrees(meters: Meters) -> f64 {
    meters / EARTH_RADIUS_METERS.to_radians()
}

pub fn degrees_to_meters(degrees: f64) -> Meters {
    degrees * EARTH_RADIUS_METERS.to_radians()
}

/// Great-circle distance between two points
pub fn geodesic_distance(a: Point<f64>, b: Point<f64>) -> Meters {
    Haversine.distance(a, b)
}

/// Great-circle length of a line
pub fn line_length(line: &LineString<f64>) -> Meters {
    line.0
        .iter()
        .tuple_windows()
        .map(|(a, b)| Haversine.distance(Point::from(*a), Point::from(*b)))
        .sum()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn to_millimeters(meters: Meters) -> Millimeters {
    (meters * 1000.0).round().max(0.0) as Millimeters
}

/// Position on a line as a segment index and a fraction along that segment.
///
/// A fraction of 1 is normalised to the start of the next segment, so a
/// location at the very end of a line has `segment_index == points - 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearLocation {
    pub segment_index: usize,
    pub segment_fraction: f64,
}

impl LinearLocation {
    pub fn new(segment_index: usize, segment_fraction: f64) -> Self {
        if segment_fraction >= 1.0 {
            Self {
                segment_index: segment_index + 1,
                segment_fraction: 0.0,
            }
        } else {
            Self {
                segment_index,
                segment_fraction: segment_fraction.max(0.0),
            }
        }
    }

    /// Within `epsilon` of the first point
    pub fn is_at_start(&self, epsilon: f64) -> bool {
        self.segment_index == 0 && self.segment_fraction < epsilon
    }

    /// On the last point, either exactly or within `epsilon` of the end of
    /// the last segment
    pub fn is_at_end(&self, num_points: usize, epsilon: f64) -> bool {
        if num_points == 0 {
            return true;
        }
        self.segment_index >= num_points - 1
            || (num_points >= 2
                && self.segment_index == num_points - 2
                && self.segment_fraction > 1.0 - epsilon)
    }

    /// Coordinate of this location on `line`
    pub fn coordinate(&self, line: &LineString<f64>) -> Option<Coord<f64>> {
        let coords = &line.0;
        let last = coords.len().checked_sub(1)?;
        if self.segment_index >= last {
            return coords.last().copied();
        }
        let a = coords[self.segment_index];
        let b = coords[self.segment_index + 1];
        Some(Coord {
            x: a.x + (b.x - a.x) * self.segment_fraction,
            y: a.y + (b.y - a.y) * self.segment_fraction,
        })
    }
}

/// Splits `line` at `location` into the part before and the part after it.
///
/// Both halves keep at least two points and share the split coordinate.
pub fn split_line(
    line: &LineString<f64>,
    location: LinearLocation,
) -> Option<(LineString<f64>, LineString<f64>)> {
    let coords = &line.0;
    if coords.len() < 2 {
        return None;
    }
    let split = location.coordinate(line)?;
    let segment = location.segment_index.min(coords.len() - 2);

    let mut first: Vec<Coord<f64>> = coords[..=segment].to_vec();
    if first.len() < 2 || first.last() != Some(&split) {
        first.push(split);
    }
    let mut second = vec![split];
    second.extend_from_slice(&coords[segment + 1..]);
    if second.len() < 2 {
        second.push(split);
    }
    Some((LineString::from(first), LineString::from(second)))
}

/// Equirectangular projection centred on the point being linked
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalProjection {
    xscale: f64,
}

impl LocalProjection {
    pub fn around(origin: Point<f64>) -> Self {
        Self {
            xscale: origin.y().to_radians().cos().max(MIN_XSCALE),
        }
    }

    pub fn xscale(&self) -> f64 {
        self.xscale
    }

    pub fn project(&self, coord: Coord<f64>) -> Coord<f64> {
        Coord {
            x: coord.x * self.xscale,
            y: coord.y,
        }
    }

    /// Box around `center` reaching `radius_deg` north and south and
    /// `radius_deg / cos(lat)` east and west
    pub fn search_envelope(&self, center: Point<f64>, radius_deg: f64) -> AABB<[f64; 2]> {
        let dx = radius_deg / self.xscale;
        AABB::from_corners(
            [center.x() - dx, center.y() - radius_deg],
            [center.x() + dx, center.y() + radius_deg],
        )
    }

    /// Projected distance between two points, in degrees of latitude
    pub fn distance_to_point(&self, a: Point<f64>, b: Point<f64>) -> f64 {
        let a = self.project(a.0);
        let b = self.project(b.0);
        (a.x - b.x).hypot(a.y - b.y)
    }

    /// Projected distance from `point` to the closest point of `line`
    pub fn distance_to_line(&self, point: Point<f64>, line: &LineString<f64>) -> f64 {
        let p = self.project(point.0);
        match line.0.as_slice() {
            [] => f64::INFINITY,
            [only] => {
                let q = self.project(*only);
                (p.x - q.x).hypot(p.y - q.y)
            }
            coords => coords
                .iter()
                .tuple_windows()
                .map(|(a, b)| project_on_segment(p, self.project(*a), self.project(*b)).1)
                .fold(f64::INFINITY, f64::min),
        }
    }

    /// Linear location of the projection of `point` onto `line`.
    ///
    /// The closest segment wins; on an exact tie the earlier segment is kept.
    pub fn locate(&self, point: Point<f64>, line: &LineString<f64>) -> LinearLocation {
        let p = self.project(point.0);
        let mut best = (0, 0.0, f64::INFINITY);
        for (index, (a, b)) in line.0.iter().tuple_windows().enumerate() {
            let (fraction, distance) = project_on_segment(p, self.project(*a), self.project(*b));
            if distance < best.2 {
                best = (index, fraction, distance);
            }
        }
        LinearLocation::new(best.0, best.1)
    }
}

/// Fraction along `a -> b` of the point closest to `p`, and the distance to it
fn project_on_segment(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> (f64, f64) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx * dx + dy * dy;
    let fraction = if length_sq == 0.0 {
        0.0
    } else {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / length_sq).clamp(0.0, 1.0)
    };
    let closest_x = a.x + fraction * dx;
    let closest_y = a.y + fraction * dy;
    (fraction, (p.x - closest_x).hypot(p.y - closest_y))
}

#[cfg(test)]
mod tests {
    use geo::{line_string, point};

    use super::*;

    #[test]
    fn metre_degree_conversion_round_trips() {
        let degrees = meters_to_degrees(1000.0);
        assert!((degrees - 0.008_993).abs() < 1e-6);
        assert!((degrees_to_meters(degrees) - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn envelope_widens_with_latitude() {
        let equator = LocalProjection::around(point!(x: 0.0, y: 0.0));
        let north = LocalProjection::around(point!(x: 30.0, y: 60.0));
        let env = north.search_envelope(point!(x: 30.0, y: 60.0), 0.01);

        assert!((equator.xscale() - 1.0).abs() < 1e-12);
        assert!((north.xscale() - 0.5).abs() < 1e-12);
        assert!((env.lower()[0] - 29.98).abs() < 1e-9);
        assert!((env.upper()[1] - 60.01).abs() < 1e-9);
    }

    #[test]
    fn locates_projection_on_middle_segment() {
        let projection = LocalProjection::around(point!(x: 0.0, y: 0.0));
        let line = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 2.0, y: 0.0)];
        let location = projection.locate(point!(x: 1.25, y: 0.1), &line);

        assert_eq!(location.segment_index, 1);
        assert!((location.segment_fraction - 0.25).abs() < 1e-12);
        assert!((projection.distance_to_line(point!(x: 1.25, y: 0.1), &line) - 0.1).abs() < 1e-12);
        let coord = location.coordinate(&line).unwrap();
        assert!((coord.x - 1.25).abs() < 1e-12 && coord.y == 0.0);
    }

    #[test]
    fn location_past_the_end_is_normalised_to_last_point() {
        let projection = LocalProjection::around(point!(x: 0.0, y: 0.0));
        let line = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 2.0, y: 0.0)];
        let location = projection.locate(point!(x: 3.0, y: 0.5), &line);

        assert_eq!(location.segment_index, 2);
        assert!(location.is_at_end(3, 1e-8));
        assert!(!location.is_at_start(1e-8));

        let before_start = projection.locate(point!(x: -1.0, y: 0.0), &line);
        assert!(before_start.is_at_start(1e-8));
        assert!(LinearLocation::new(1, 1.0 - 1e-9).is_at_end(3, 1e-8));
        assert!(!LinearLocation::new(1, 0.5).is_at_end(3, 1e-8));
    }

    #[test]
    fn split_keeps_all_coordinates() {
        let line = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 2.0, y: 1.0)];
        let (first, second) = split_line(&line, LinearLocation::new(0, 0.5)).unwrap();

        assert_eq!(first, line_string![(x: 0.0, y: 0.0), (x: 0.5, y: 0.0)]);
        assert_eq!(
            second,
            line_string![(x: 0.5, y: 0.0), (x: 1.0, y: 0.0), (x: 2.0, y: 1.0)]
        );
    }

    #[test]
    fn split_at_interior_vertex_does_not_duplicate_it() {
        let line = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 2.0, y: 0.0)];
        let (first, second) = split_line(&line, LinearLocation::new(1, 0.0)).unwrap();

        assert_eq!(first.0.len(), 2);
        assert_eq!(second.0.len(), 2);
        assert_eq!(first.0[1], second.0[0]);
    }

    #[test]
    fn zero_length_segments_do_not_produce_nan() {
        let projection = LocalProjection::around(point!(x: 0.0, y: 0.0));
        let line = line_string![(x: 1.0, y: 1.0), (x: 1.0, y: 1.0)];
        let location = projection.locate(point!(x: 0.0, y: 0.0), &line);

        assert_eq!(location.segment_index, 0);
        assert_eq!(location.segment_fraction, 0.0);
        assert!(projection.distance_to_line(point!(x: 0.0, y: 0.0), &line).is_finite());
    }

    #[test]
    fn line_length_sums_segments() {
        let line = line_string![(x: 30.0, y: 60.0), (x: 30.001, y: 60.0), (x: 30.002, y: 60.0)];
        let direct = geodesic_distance(point!(x: 30.0, y: 60.0), point!(x: 30.002, y: 60.0));
        assert!((line_length(&line) - direct).abs() < 1e-6);
        assert_eq!(to_millimeters(2.5), 2500);
        assert_eq!(to_millimeters(-1.0), 0);
    }
}
