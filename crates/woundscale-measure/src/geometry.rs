use serde::{Deserialize, Serialize};
use woundscale_image::Point;

/// A rectangle of arbitrary orientation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RotatedRect {
    /// Center of the rectangle.
    pub center: Point,
    /// Extent along the direction given by `angle`.
    pub width: f64,
    /// Extent perpendicular to the direction given by `angle`.
    pub height: f64,
    /// Orientation of the `width` side in radians.
    pub angle: f64,
}

impl RotatedRect {
    /// Area of the rectangle.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// The longer side.
    #[inline]
    pub fn long_side(&self) -> f64 {
        self.width.max(self.height)
    }

    /// The shorter side.
    #[inline]
    pub fn short_side(&self) -> f64 {
        self.width.min(self.height)
    }
}

/// Z component of the cross product of `a - o` and `b - o`.
#[inline]
fn cross(o: &Point, a: &Point, b: &Point) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Computes the convex hull of a point set with a Graham scan.
///
/// The anchor is the point with the smallest `y`, ties broken by the smallest `x`. The
/// remaining points are swept by polar angle around it and only strict turns are kept,
/// so the hull has no collinear vertices. Fewer than three distinct points, or points
/// on a single line, yield a degenerate hull of at most two vertices.
///
/// # Arguments
///
/// * `points` - The input points, in any order.
///
/// # Returns
///
/// The hull vertices starting at the anchor.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut pts = points.to_vec();
    pts.retain(|p| p.x.is_finite() && p.y.is_finite());
    pts.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));
    pts.dedup();

    if pts.len() < 3 {
        return pts;
    }

    let anchor = pts[0];
    let polar = |p: &Point| (p.y - anchor.y).atan2(p.x - anchor.x);
    let mut rest = pts.split_off(1);
    rest.sort_by(|a, b| {
        polar(a)
            .total_cmp(&polar(b))
            .then(anchor.distance_squared(a).total_cmp(&anchor.distance_squared(b)))
    });

    let last_angle = polar(&rest[rest.len() - 1]);
    let tail = rest
        .iter()
        .rev()
        .take_while(|p| polar(p) == last_angle)
        .count();
    if tail == rest.len() {
        // every point lies on one ray from the anchor
        return vec![anchor, rest[rest.len() - 1]];
    }
    // walk the closing edge from the far end back towards the anchor
    let n = rest.len();
    rest[n - tail..].reverse();

    let mut hull: Vec<Point> = Vec::with_capacity(rest.len() + 1);
    hull.push(anchor);
    for p in rest {
        while hull.len() >= 2 && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], &p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    while hull.len() >= 3 && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], &anchor) <= 0.0 {
        hull.pop();
    }

    hull
}

/// Finds the minimum area bounding rectangle of a convex polygon with rotating calipers.
///
/// For every hull edge the hull is rotated by the negated edge angle about its first
/// vertex and the axis aligned box of the rotated points is measured. The box of
/// smallest area wins. A hull with fewer than two vertices gives a zero rectangle.
///
/// # Arguments
///
/// * `hull` - The vertices of a convex polygon, see [`convex_hull`].
pub fn min_area_rect(hull: &[Point]) -> RotatedRect {
    let Some(origin) = hull.first().copied() else {
        return RotatedRect::default();
    };
    let n = hull.len();
    if n < 2 {
        return RotatedRect {
            center: origin,
            ..Default::default()
        };
    }

    let mut best: Option<(f64, RotatedRect)> = None;

    for i in 0..n {
        let (p1, p2) = (hull[i], hull[(i + 1) % n]);
        let (ex, ey) = (p2.x - p1.x, p2.y - p1.y);
        if ex.hypot(ey) < f64::EPSILON {
            continue;
        }

        let angle = ey.atan2(ex);
        let (sin, cos) = angle.sin_cos();

        let (mut min_x, mut max_x) = (f64::MAX, f64::MIN);
        let (mut min_y, mut max_y) = (f64::MAX, f64::MIN);
        for p in hull {
            let (dx, dy) = (p.x - origin.x, p.y - origin.y);
            let rx = dx * cos + dy * sin;
            let ry = -dx * sin + dy * cos;
            min_x = min_x.min(rx);
            max_x = max_x.max(rx);
            min_y = min_y.min(ry);
            max_y = max_y.max(ry);
        }

        let (width, height) = (max_x - min_x, max_y - min_y);
        let area = width * height;
        if best.as_ref().is_some_and(|(a, _)| area >= *a) {
            continue;
        }

        let (cx, cy) = ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);
        let center = Point::new(
            origin.x + cx * cos - cy * sin,
            origin.y + cx * sin + cy * cos,
        );
        best = Some((
            area,
            RotatedRect {
                center,
                width,
                height,
                angle,
            },
        ));
    }

    best.map(|(_, rect)| rect).unwrap_or(RotatedRect {
        center: origin,
        ..Default::default()
    })
}

/// Area of a simple polygon with the shoelace formula.
pub fn polygon_area(polygon: &[Point]) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }
    let twice = polygon
        .iter()
        .zip(polygon.iter().cycle().skip(1))
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum::<f64>();
    twice.abs() / 2.0
}

/// Length of a polygon, including the edge from the last point back to the first.
pub fn closed_perimeter(polygon: &[Point]) -> f64 {
    if polygon.len() < 2 {
        return 0.0;
    }
    polygon
        .iter()
        .zip(polygon.iter().cycle().skip(1))
        .map(|(a, b)| a.distance(b))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn points(coords: &[(f64, f64)]) -> Vec<Point> {
        coords.iter().copied().map(Point::from).collect()
    }

    // a fixed cloud spread over a 100x100 box
    fn scattered(n: usize) -> Vec<Point> {
        let mut state: u64 = 0x2545_f491;
        let mut next = || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            ((state >> 33) % 1000) as f64 / 10.0
        };
        (0..n).map(|_| Point::new(next(), next())).collect()
    }

    fn sorted(mut pts: Vec<Point>) -> Vec<Point> {
        pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
        pts
    }

    #[test]
    fn test_hull_square_with_interior() {
        let pts = points(&[
            (0.0, 0.0),
            (10.0, 0.0),
            (5.0, 5.0),
            (10.0, 10.0),
            (5.0, 0.0),
            (0.0, 10.0),
        ]);
        let hull = convex_hull(&pts);
        assert_eq!(
            hull,
            points(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)])
        );
    }

    #[test]
    fn test_hull_drops_collinear_closing_edge() {
        // (0, 5) sits on the edge from (0, 10) back to the anchor
        let pts = points(&[(0.0, 0.0), (4.0, 0.0), (4.0, 10.0), (0.0, 10.0), (0.0, 5.0)]);
        let hull = convex_hull(&pts);
        assert_eq!(hull.len(), 4);
        assert!(!hull.contains(&Point::new(0.0, 5.0)));
        assert_relative_eq!(polygon_area(&hull), 40.0);
    }

    #[test]
    fn test_hull_is_idempotent() {
        let hull = convex_hull(&scattered(200));
        assert!(hull.len() >= 3);
        let again = convex_hull(&hull);
        assert_eq!(sorted(hull), sorted(again));
    }

    #[test]
    fn test_hull_degenerate() {
        assert!(convex_hull(&[]).is_empty());
        let line = points(&[(0.0, 0.0), (2.0, 2.0), (1.0, 1.0), (3.0, 3.0)]);
        assert_eq!(convex_hull(&line), points(&[(0.0, 0.0), (3.0, 3.0)]));
        let twice = points(&[(1.0, 1.0), (1.0, 1.0)]);
        assert_eq!(convex_hull(&twice).len(), 1);
    }

    #[test]
    fn test_hull_near_collinear_float_points() {
        let mut state: u64 = 0x9e37_79b9;
        let mut next = || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            (state >> 11) as f64 / (1u64 << 53) as f64
        };
        for _ in 0..50 {
            let pts: Vec<Point> = (0..500)
                .map(|_| {
                    let t = next();
                    let jitter = (next() - 0.5) * 2e-15;
                    Point::new(0.1 + 0.3 * t + jitter, 0.7 + 0.9 * t - jitter)
                })
                .collect();
            let hull = convex_hull(&pts);
            assert!(!hull.is_empty());
            assert!(hull.iter().all(|p| pts.contains(p)));
            let rect = min_area_rect(&hull);
            assert!(rect.area().is_finite());
            assert!(rect.area() < 1e-6);
        }
    }

    #[test]
    fn test_min_area_rect_axis_aligned() {
        let hull = convex_hull(&points(&[(0.0, 0.0), (10.0, 0.0), (10.0, 5.0), (0.0, 5.0)]));
        let rect = min_area_rect(&hull);
        assert_relative_eq!(rect.area(), 50.0, epsilon = 1e-9);
        assert_relative_eq!(rect.long_side(), 10.0, epsilon = 1e-9);
        assert_relative_eq!(rect.short_side(), 5.0, epsilon = 1e-9);
        assert_relative_eq!(rect.center.x, 5.0, epsilon = 1e-9);
        assert_relative_eq!(rect.center.y, 2.5, epsilon = 1e-9);
    }

    #[test]
    fn test_min_area_rect_diamond() {
        // the axis aligned box would be 10x10
        let hull = convex_hull(&points(&[(5.0, 0.0), (10.0, 5.0), (5.0, 10.0), (0.0, 5.0)]));
        let rect = min_area_rect(&hull);
        assert_relative_eq!(rect.area(), 50.0, epsilon = 1e-9);
        assert_relative_eq!(rect.width, 50f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_min_area_rect_bounds() {
        let pts = scattered(150);
        let hull = convex_hull(&pts);
        let rect = min_area_rect(&hull);

        let (min_x, max_x) = pts
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), p| (lo.min(p.x), hi.max(p.x)));
        let (min_y, max_y) = pts
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));
        let aabb = (max_x - min_x) * (max_y - min_y);

        assert!(rect.area() >= polygon_area(&hull) - 1e-6);
        assert!(rect.area() <= aabb + 1e-6);
    }

    #[test]
    fn test_min_area_rect_segment() {
        let rect = min_area_rect(&points(&[(0.0, 0.0), (3.0, 4.0)]));
        assert_relative_eq!(rect.long_side(), 5.0, epsilon = 1e-9);
        assert_eq!(rect.area(), 0.0);
        assert_eq!(min_area_rect(&[]), RotatedRect::default());
    }

    #[test]
    fn test_area_and_perimeter() {
        let square = points(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        assert_relative_eq!(polygon_area(&square), 100.0);
        assert_relative_eq!(closed_perimeter(&square), 40.0);
        assert_eq!(polygon_area(&square[..2]), 0.0);
        assert_relative_eq!(closed_perimeter(&square[..2]), 20.0);
        assert_eq!(closed_perimeter(&square[..1]), 0.0);
    }
}
